// =====================================================================================
// HEALTH ANALYSIS SERVICE - ONE BOUNDED CYCLE PER ASSET
// =====================================================================================

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, error, info, instrument, warn};

use alerting_cell::AlertDispatcher;
use health_analysis_cell::{HealthAnalyzer, MetricStreams};
use monitoring_cell::{MetricsClient, MetricsError};
use shared_config::{clamp_setting, AppConfig, CYCLE_TIMEOUT_SECS_RANGE, LOOKBACK_DAYS_RANGE};
use shared_models::{Asset, HealthAssessment};

use crate::error::MaintenanceError;
use crate::models::AnalysisOutcome;
use crate::ports::{AssetDirectory, MaintenanceHistoryStore};

pub struct HealthAnalysisService {
    directory: Arc<dyn AssetDirectory>,
    history: Arc<dyn MaintenanceHistoryStore>,
    metrics: Arc<MetricsClient>,
    analyzer: HealthAnalyzer,
    dispatcher: Arc<AlertDispatcher>,
    metric_keys: Vec<String>,
    lookback: chrono::Duration,
    cycle_timeout: Duration,
}

impl HealthAnalysisService {
    pub fn new(
        config: &AppConfig,
        directory: Arc<dyn AssetDirectory>,
        history: Arc<dyn MaintenanceHistoryStore>,
        metrics: Arc<MetricsClient>,
        analyzer: HealthAnalyzer,
        dispatcher: Arc<AlertDispatcher>,
    ) -> Self {
        Self {
            directory,
            history,
            metrics,
            analyzer,
            dispatcher,
            metric_keys: config.metric_keys.clone(),
            lookback: chrono::Duration::days(clamp_setting(
                "lookback_days",
                config.lookback_days,
                LOOKBACK_DAYS_RANGE,
            )),
            cycle_timeout: config
                .cycle_timeout
                .clamp(Duration::from_millis(1), Duration::from_secs(CYCLE_TIMEOUT_SECS_RANGE.1)),
        }
    }

    pub fn directory(&self) -> &Arc<dyn AssetDirectory> {
        &self.directory
    }

    pub fn metrics(&self) -> &Arc<MetricsClient> {
        &self.metrics
    }

    pub fn dispatcher(&self) -> &Arc<AlertDispatcher> {
        &self.dispatcher
    }

    /// On-demand analysis of a single asset by id.
    #[instrument(skip(self))]
    pub async fn analyze_asset(&self, asset_id: &str) -> Result<AnalysisOutcome, MaintenanceError> {
        let asset = self
            .directory
            .get_asset(asset_id)
            .await?
            .ok_or_else(|| MaintenanceError::AssetNotFound(asset_id.to_string()))?;

        Ok(self.run_cycle(&asset).await)
    }

    /// Assess then alert. Never fails: backend trouble shows up as a partial
    /// assessment rather than an error.
    #[instrument(skip(self, asset), fields(asset_id = %asset.id))]
    pub async fn run_cycle(&self, asset: &Asset) -> AnalysisOutcome {
        let deadline = Instant::now() + self.cycle_timeout;
        let assessment = self.assess(asset, deadline).await;
        let alert_emitted = self.dispatcher.maybe_alert(&assessment).await;

        AnalysisOutcome::assessed(assessment, alert_emitted)
    }

    async fn assess(&self, asset: &Asset, deadline: Instant) -> HealthAssessment {
        let now = Utc::now();

        let Some(host_ref) = asset.monitored_host() else {
            return self.analyzer.evaluate(asset, &MetricStreams::new(), &[], Vec::new(), now);
        };

        let from = now - self.lookback;
        let mut streams = MetricStreams::new();
        let mut skipped = Vec::new();

        for (index, metric_key) in self.metric_keys.iter().enumerate() {
            let fetch = self.metrics.fetch_history(&asset.id, host_ref, metric_key, from, now);

            match timeout_at(deadline, fetch).await {
                Ok(Ok(samples)) => {
                    debug!(metric = %metric_key, samples = samples.len(), "metric history fetched");
                    streams.insert(metric_key.clone(), samples);
                }
                Ok(Err(MetricsError::HostNotFound(host))) => {
                    warn!(host = %host, "host unknown to monitoring backend, skipping all metrics");
                    skipped.extend(self.metric_keys[index..].iter().cloned());
                    break;
                }
                Ok(Err(e)) => {
                    warn!(metric = %metric_key, "metric fetch failed, skipping: {}", e);
                    skipped.push(metric_key.clone());
                }
                Err(_) => {
                    warn!(
                        metric = %metric_key,
                        remaining = self.metric_keys.len() - index,
                        "analysis cycle deadline reached, skipping remaining metrics"
                    );
                    skipped.extend(self.metric_keys[index..].iter().cloned());
                    break;
                }
            }
        }

        let history = match timeout_at(deadline, self.history.list_completed_events(&asset.id)).await {
            Ok(Ok(events)) => events,
            Ok(Err(e)) => {
                error!("maintenance history unavailable, predicting without it: {}", e);
                Vec::new()
            }
            Err(_) => {
                warn!("analysis cycle deadline reached reading maintenance history, predicting without it");
                Vec::new()
            }
        };

        let assessment = self.analyzer.evaluate(asset, &streams, &history, skipped, now);
        if assessment.partial {
            info!(skipped = assessment.skipped_metrics.len(), "partial assessment produced");
        }
        assessment
    }
}
