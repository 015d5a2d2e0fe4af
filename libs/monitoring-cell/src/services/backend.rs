use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::MetricsError;
use crate::models::{BackendItem, HistoryPoint, HostInfo};

/// Raw access to a time-series monitoring service. Authentication and wire
/// format belong to the implementation.
#[async_trait]
pub trait MonitoringBackend: Send + Sync {
    /// `Ok(None)` when the host id is unknown to the backend.
    async fn query_host_info(&self, host_id: &str) -> Result<Option<HostInfo>, MetricsError>;

    /// Items on `host_id` whose key matches `metric_key`.
    async fn query_items(
        &self,
        host_id: &str,
        metric_key: &str,
    ) -> Result<Vec<BackendItem>, MetricsError>;

    /// History of one item between `from` and `to`, oldest first.
    async fn query_history(
        &self,
        item: &BackendItem,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<HistoryPoint>, MetricsError>;
}
