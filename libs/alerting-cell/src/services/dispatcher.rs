// =====================================================================================
// ALERT DISPATCHER
// =====================================================================================

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{debug, error, info, instrument, warn};

use shared_config::AppConfig;
use shared_models::{AlertEvent, AlertKey, HealthAssessment};

use crate::services::dedup::{DedupStore, InMemoryDedupStore, RedisDedupStore};
use crate::services::sinks::{LogSink, NotificationSink, WebhookSink};
use crate::error::AlertingError;

const HISTORY_CAPACITY: usize = 200;

#[derive(Debug, Clone, Serialize)]
pub struct AlertSummary {
    pub emitted: u64,
    pub suppressed: u64,
    pub publish_failures: u64,
    pub by_risk_level: HashMap<String, u64>,
}

/// Emits at most one alert per (asset, risk level, window bucket). Publishing
/// is best-effort: failures are logged and counted, never returned.
pub struct AlertDispatcher {
    dedup: Arc<dyn DedupStore>,
    sink: Arc<dyn NotificationSink>,
    window: Duration,
    history: RwLock<VecDeque<AlertEvent>>,
    by_risk_level: RwLock<HashMap<String, u64>>,
    emitted: AtomicU64,
    suppressed: AtomicU64,
    publish_failures: AtomicU64,
}

impl AlertDispatcher {
    pub fn new(dedup: Arc<dyn DedupStore>, sink: Arc<dyn NotificationSink>, window: Duration) -> Self {
        Self {
            dedup,
            sink,
            window: window.max(Duration::from_secs(1)),
            history: RwLock::new(VecDeque::with_capacity(HISTORY_CAPACITY)),
            by_risk_level: RwLock::new(HashMap::new()),
            emitted: AtomicU64::new(0),
            suppressed: AtomicU64::new(0),
            publish_failures: AtomicU64::new(0),
        }
    }

    /// Redis de-dup when `REDIS_URL` is set, webhook delivery when
    /// `ALERT_WEBHOOK_URL` is set; in-memory and log otherwise.
    pub async fn from_config(config: &AppConfig) -> Result<Self, AlertingError> {
        let dedup: Arc<dyn DedupStore> = match &config.redis_url {
            Some(url) => Arc::new(RedisDedupStore::new(url).await?),
            None => Arc::new(InMemoryDedupStore::new()),
        };

        let sink: Arc<dyn NotificationSink> = match &config.alert_webhook_url {
            Some(url) => Arc::new(WebhookSink::new(url, config.backend.timeout)?),
            None => Arc::new(LogSink),
        };

        Ok(Self::new(dedup, sink, config.alert_window))
    }

    #[instrument(skip(self, assessment), fields(asset_id = %assessment.asset_id, risk = %assessment.risk_level))]
    pub async fn maybe_alert(&self, assessment: &HealthAssessment) -> bool {
        if !assessment.risk_level.is_alertable() {
            return false;
        }

        let key = AlertKey::for_assessment(assessment, self.window.as_secs() as i64);

        match self.dedup.try_claim(&key, self.window).await {
            Ok(true) => {}
            Ok(false) => {
                self.suppressed.fetch_add(1, Ordering::Relaxed);
                debug!(key = %key, "alert already emitted for this window");
                return false;
            }
            Err(e) => {
                // Without a claim the at-most-once guarantee cannot hold.
                error!(key = %key, "alert de-dup store failed, skipping alert: {}", e);
                return false;
            }
        }

        let event = AlertEvent::from_assessment(assessment);

        if let Err(e) = self.sink.publish(&event).await {
            self.publish_failures.fetch_add(1, Ordering::Relaxed);
            error!(alert_id = %event.alert_id, key = %key, "alert publish failed: {}", e);

            if let Err(release_err) = self.dedup.release(&key).await {
                warn!(key = %key, "could not release alert claim: {}", release_err);
            }
            return false;
        }

        self.record(event).await;
        info!(key = %key, "maintenance alert emitted");
        true
    }

    async fn record(&self, event: AlertEvent) {
        self.emitted.fetch_add(1, Ordering::Relaxed);
        *self
            .by_risk_level
            .write()
            .await
            .entry(event.risk_level.to_string())
            .or_insert(0) += 1;

        let mut history = self.history.write().await;
        if history.len() >= HISTORY_CAPACITY {
            history.pop_front();
        }
        history.push_back(event);
    }

    /// Most recent first.
    pub async fn recent_alerts(&self, limit: usize) -> Vec<AlertEvent> {
        let history = self.history.read().await;
        history.iter().rev().take(limit).cloned().collect()
    }

    pub async fn summary(&self) -> AlertSummary {
        AlertSummary {
            emitted: self.emitted.load(Ordering::Relaxed),
            suppressed: self.suppressed.load(Ordering::Relaxed),
            publish_failures: self.publish_failures.load(Ordering::Relaxed),
            by_risk_level: self.by_risk_level.read().await.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Duration as ChronoDuration;
    use shared_models::RiskLevel;
    use shared_utils::test_utils::{assessment_with_risk, base_time};
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingSink {
        events: Mutex<Vec<AlertEvent>>,
    }

    #[async_trait]
    impl NotificationSink for RecordingSink {
        async fn publish(&self, event: &AlertEvent) -> Result<(), AlertingError> {
            self.events.lock().unwrap().push(event.clone());
            Ok(())
        }
    }

    struct FailingSink;

    #[async_trait]
    impl NotificationSink for FailingSink {
        async fn publish(&self, _event: &AlertEvent) -> Result<(), AlertingError> {
            Err(AlertingError::PublishFailed("connection refused".to_string()))
        }
    }

    fn dispatcher(sink: Arc<dyn NotificationSink>) -> AlertDispatcher {
        AlertDispatcher::new(
            Arc::new(InMemoryDedupStore::new()),
            sink,
            Duration::from_secs(24 * 3600),
        )
    }

    #[tokio::test]
    async fn same_day_same_risk_emits_once() {
        let sink = Arc::new(RecordingSink::default());
        let dispatcher = dispatcher(sink.clone());
        let morning = base_time() + ChronoDuration::hours(8);

        let first = assessment_with_risk("asset-1", RiskLevel::Critical, 25.0, morning);
        let later = assessment_with_risk("asset-1", RiskLevel::Critical, 22.0, morning + ChronoDuration::hours(6));

        assert!(dispatcher.maybe_alert(&first).await);
        assert!(!dispatcher.maybe_alert(&later).await);
        assert_eq!(sink.events.lock().unwrap().len(), 1);

        let summary = dispatcher.summary().await;
        assert_eq!(summary.emitted, 1);
        assert_eq!(summary.suppressed, 1);
    }

    #[tokio::test]
    async fn next_day_or_new_risk_level_emits_again() {
        let sink = Arc::new(RecordingSink::default());
        let dispatcher = dispatcher(sink.clone());
        let at = base_time() + ChronoDuration::hours(8);

        assert!(dispatcher.maybe_alert(&assessment_with_risk("asset-1", RiskLevel::High, 45.0, at)).await);
        assert!(dispatcher.maybe_alert(&assessment_with_risk("asset-1", RiskLevel::Critical, 20.0, at)).await);
        assert!(dispatcher
            .maybe_alert(&assessment_with_risk("asset-1", RiskLevel::High, 45.0, at + ChronoDuration::days(1)))
            .await);

        assert_eq!(sink.events.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn low_and_medium_risk_never_alert() {
        let sink = Arc::new(RecordingSink::default());
        let dispatcher = dispatcher(sink.clone());

        for risk in [RiskLevel::Low, RiskLevel::Medium, RiskLevel::Unknown] {
            assert!(!dispatcher.maybe_alert(&assessment_with_risk("asset-1", risk, 80.0, base_time())).await);
        }
        assert!(sink.events.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn event_carries_top_three_recommendations() {
        let sink = Arc::new(RecordingSink::default());
        let dispatcher = dispatcher(sink.clone());

        dispatcher
            .maybe_alert(&assessment_with_risk("asset-9", RiskLevel::Critical, 12.0, base_time()))
            .await;

        let events = sink.events.lock().unwrap();
        assert_eq!(events[0].recommendations.len(), 3);
        assert_eq!(events[0].title, "Maintenance Alert: Asset asset-9");
        assert_eq!(events[0].risk_level, RiskLevel::Critical);
    }

    #[tokio::test]
    async fn publish_failure_is_counted_and_claim_released() {
        let dispatcher = dispatcher(Arc::new(FailingSink));
        let assessment = assessment_with_risk("asset-1", RiskLevel::Critical, 10.0, base_time());

        assert!(!dispatcher.maybe_alert(&assessment).await);
        assert!(!dispatcher.maybe_alert(&assessment).await);

        let summary = dispatcher.summary().await;
        assert_eq!(summary.publish_failures, 2);
        assert_eq!(summary.suppressed, 0);
        assert!(dispatcher.recent_alerts(10).await.is_empty());
    }

    #[tokio::test]
    async fn concurrent_cycles_for_one_asset_emit_once() {
        let sink = Arc::new(RecordingSink::default());
        let dispatcher = Arc::new(dispatcher(sink.clone()));
        let mut handles = Vec::new();

        for _ in 0..8 {
            let dispatcher = dispatcher.clone();
            handles.push(tokio::spawn(async move {
                let assessment = assessment_with_risk("asset-1", RiskLevel::High, 40.0, base_time());
                dispatcher.maybe_alert(&assessment).await
            }));
        }

        let mut emitted = 0;
        for handle in handles {
            if handle.await.unwrap() {
                emitted += 1;
            }
        }

        assert_eq!(emitted, 1);
        assert_eq!(sink.events.lock().unwrap().len(), 1);
        assert_eq!(dispatcher.summary().await.by_risk_level.get("high"), Some(&1));
    }
}
