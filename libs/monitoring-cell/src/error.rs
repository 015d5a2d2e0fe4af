use chrono::{DateTime, Utc};
use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum MetricsError {
    #[error("Monitoring backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("Host not found in monitoring backend: {0}")]
    HostNotFound(String),

    #[error("Invalid time range: from {from} is after to {to}")]
    InvalidTimeRange {
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    },

    #[error("Monitoring backend protocol error: {0}")]
    Protocol(String),
}

impl MetricsError {
    /// Errors worth retrying with backoff.
    pub fn is_transient(&self) -> bool {
        matches!(self, MetricsError::BackendUnavailable(_))
    }
}

impl From<reqwest::Error> for MetricsError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            MetricsError::Protocol(err.to_string())
        } else {
            MetricsError::BackendUnavailable(err.to_string())
        }
    }
}
