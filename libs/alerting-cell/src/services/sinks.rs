// =====================================================================================
// NOTIFICATION SINKS
// =====================================================================================

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{error, instrument, warn};

use shared_models::{AlertEvent, RiskLevel};

use crate::error::AlertingError;

#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn publish(&self, event: &AlertEvent) -> Result<(), AlertingError>;
}

/// Writes alerts to the log only. Used when no webhook is configured.
#[derive(Debug, Default, Clone)]
pub struct LogSink;

#[async_trait]
impl NotificationSink for LogSink {
    async fn publish(&self, event: &AlertEvent) -> Result<(), AlertingError> {
        match event.risk_level {
            RiskLevel::Critical => {
                error!(
                    alert_id = %event.alert_id,
                    asset_id = %event.asset_id,
                    health_score = event.health_score,
                    "CRITICAL MAINTENANCE ALERT: {}", event.title
                );
            }
            _ => {
                warn!(
                    alert_id = %event.alert_id,
                    asset_id = %event.asset_id,
                    health_score = event.health_score,
                    "MAINTENANCE ALERT: {}", event.title
                );
            }
        }
        Ok(())
    }
}

/// POSTs each alert as JSON to an external notification endpoint.
pub struct WebhookSink {
    client: Client,
    url: String,
}

impl WebhookSink {
    pub fn new(url: &str, timeout: Duration) -> Result<Self, AlertingError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AlertingError::PublishFailed(format!("HTTP client setup failed: {}", e)))?;

        Ok(Self {
            client,
            url: url.to_string(),
        })
    }
}

#[async_trait]
impl NotificationSink for WebhookSink {
    #[instrument(skip(self, event), fields(alert_id = %event.alert_id))]
    async fn publish(&self, event: &AlertEvent) -> Result<(), AlertingError> {
        let response = self.client.post(&self.url).json(event).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AlertingError::PublishFailed(format!(
                "notification endpoint returned {}: {}",
                status, body
            )));
        }

        Ok(())
    }
}
