// =====================================================================================
// MAINTENANCE CELL - WORKER POOL BOUNDS AND CYCLE ISOLATION
// =====================================================================================

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};

use alerting_cell::{AlertDispatcher, InMemoryDedupStore, LogSink};
use health_analysis_cell::HealthAnalyzer;
use maintenance_cell::{
    AnalysisScheduler, HealthAnalysisService, InventoryDocument, JsonInventory, MaintenanceError,
    MaintenanceHistoryStore, OutcomeStatus,
};
use monitoring_cell::{
    BackendItem, HistoryPoint, HostInfo, HostStatus, MetricsClient, MetricsError, MonitoringBackend,
    RetryPolicy,
};
use shared_config::AppConfig;
use shared_models::{Asset, MaintenanceEvent};
use shared_utils::test_utils::{base_time, TestAsset, TestConfig};

/// Backend whose history calls take a while and record how many overlap.
#[derive(Default)]
struct CountingBackend {
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    history_calls: AtomicUsize,
}

#[async_trait]
impl MonitoringBackend for CountingBackend {
    async fn query_host_info(&self, host_id: &str) -> Result<Option<HostInfo>, MetricsError> {
        Ok(Some(HostInfo {
            host_id: host_id.to_string(),
            host: format!("host-{}", host_id),
            name: format!("Host {}", host_id),
            status: HostStatus::Monitored,
            interfaces: Vec::new(),
        }))
    }

    async fn query_items(&self, host_id: &str, metric_key: &str) -> Result<Vec<BackendItem>, MetricsError> {
        Ok(vec![BackendItem {
            item_id: format!("{}-{}", host_id, metric_key),
            host_id: host_id.to_string(),
            name: metric_key.to_string(),
            key: metric_key.to_string(),
            value_type: 0,
            units: "%".to_string(),
        }])
    }

    async fn query_history(
        &self,
        _item: &BackendItem,
        _from: DateTime<Utc>,
        _to: DateTime<Utc>,
    ) -> Result<Vec<HistoryPoint>, MetricsError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        self.history_calls.fetch_add(1, Ordering::SeqCst);

        tokio::time::sleep(Duration::from_millis(40)).await;

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok((0..12)
            .map(|hour| HistoryPoint {
                clock: base_time() + ChronoDuration::hours(hour),
                value: 40.0,
            })
            .collect())
    }
}

/// Panics for one asset, returns an empty history for the rest.
struct PanickingHistory {
    broken_asset: String,
}

#[async_trait]
impl MaintenanceHistoryStore for PanickingHistory {
    async fn list_completed_events(&self, asset_id: &str) -> Result<Vec<MaintenanceEvent>, MaintenanceError> {
        if asset_id == self.broken_asset {
            panic!("maintenance history corrupted for {}", asset_id);
        }
        Ok(Vec::new())
    }
}

/// Never answers.
struct StalledHistory;

#[async_trait]
impl MaintenanceHistoryStore for StalledHistory {
    async fn list_completed_events(&self, _asset_id: &str) -> Result<Vec<MaintenanceEvent>, MaintenanceError> {
        std::future::pending().await
    }
}

fn fleet(count: usize) -> Vec<Asset> {
    (0..count)
        .map(|i| TestAsset::monitored(&format!("asset-{}", i), &format!("{}", 10_100 + i)).to_asset())
        .collect()
}

fn build(
    config: &AppConfig,
    backend: Arc<CountingBackend>,
    assets: Vec<Asset>,
    history: Option<Arc<dyn MaintenanceHistoryStore>>,
) -> (Arc<HealthAnalysisService>, Arc<AnalysisScheduler>) {
    let metrics = Arc::new(MetricsClient::with_policy(
        backend,
        Duration::from_secs(60),
        Duration::from_secs(60),
        RetryPolicy {
            max_attempts: 1,
            base_backoff: Duration::from_millis(1),
        },
    ));
    let inventory = Arc::new(JsonInventory::from_document(InventoryDocument {
        assets,
        maintenance_events: Vec::new(),
    }));
    let history = history.unwrap_or_else(|| inventory.clone() as Arc<dyn MaintenanceHistoryStore>);
    let dispatcher = Arc::new(AlertDispatcher::new(
        Arc::new(InMemoryDedupStore::new()),
        Arc::new(LogSink),
        config.alert_window,
    ));

    let service = Arc::new(HealthAnalysisService::new(
        config,
        inventory,
        history,
        metrics,
        HealthAnalyzer::from_config(config),
        dispatcher,
    ));
    let scheduler = Arc::new(AnalysisScheduler::new(service.clone(), config));

    (service, scheduler)
}

#[tokio::test]
async fn test_batch_never_exceeds_concurrency_limit() {
    let config = TestConfig {
        concurrency_limit: 2,
        ..TestConfig::default()
    }
    .to_app_config();
    let backend = Arc::new(CountingBackend::default());
    let (_, scheduler) = build(&config, backend.clone(), fleet(8), None);

    let report = tokio_test::assert_ok!(scheduler.run_batch().await);

    assert_eq!(report.total, 8);
    assert_eq!(report.failed, 0);
    assert_eq!(backend.history_calls.load(Ordering::SeqCst), 16);
    assert_eq!(backend.peak.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_single_worker_runs_assets_one_at_a_time() {
    let config = TestConfig {
        concurrency_limit: 1,
        ..TestConfig::default()
    }
    .to_app_config();
    let backend = Arc::new(CountingBackend::default());
    let (_, scheduler) = build(&config, backend.clone(), fleet(4), None);

    let report = tokio_test::assert_ok!(scheduler.run_batch().await);

    assert_eq!(report.total, 4);
    assert_eq!(backend.peak.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_panicking_cycle_fails_only_its_asset() {
    let config = TestConfig::default().to_app_config();
    let backend = Arc::new(CountingBackend::default());
    let history: Arc<dyn MaintenanceHistoryStore> = Arc::new(PanickingHistory {
        broken_asset: "asset-2".to_string(),
    });
    let (_, scheduler) = build(&config, backend, fleet(5), Some(history));

    let report = tokio_test::assert_ok!(scheduler.run_batch().await);

    assert_eq!(report.total, 5);
    assert_eq!(report.failed, 1);
    assert_eq!(report.completed, 4);

    let failed = report
        .outcomes
        .iter()
        .find(|o| o.status == OutcomeStatus::Failed)
        .unwrap();
    assert_eq!(failed.asset_id, "asset-2");
    assert!(failed.assessment.is_none());
    assert!(failed.error.as_deref().unwrap().contains("analysis cycle failed"));

    for outcome in report.outcomes.iter().filter(|o| o.asset_id != "asset-2") {
        assert_eq!(outcome.status, OutcomeStatus::Completed);
        assert!(outcome.assessment.is_some());
    }
}

#[tokio::test]
async fn test_stalled_history_store_is_cut_off_at_cycle_deadline() {
    let config = TestConfig {
        cycle_timeout: Duration::from_millis(300),
        ..TestConfig::default()
    }
    .to_app_config();
    let backend = Arc::new(CountingBackend::default());
    let history: Arc<dyn MaintenanceHistoryStore> = Arc::new(StalledHistory);
    let (service, _) = build(&config, backend, fleet(1), Some(history));

    let finished = tokio::time::timeout(Duration::from_secs(2), service.analyze_asset("asset-0")).await;
    let outcome = tokio_test::assert_ok!(tokio_test::assert_ok!(finished));

    // Both metrics arrived before the deadline; only the history read was dropped.
    assert_eq!(outcome.status, OutcomeStatus::Completed);
    let assessment = outcome.assessment.unwrap();
    assert!(assessment.skipped_metrics.is_empty());
    assert!(assessment.predicted_failure_date.is_none());
}

#[tokio::test]
async fn test_zero_poll_interval_still_schedules_and_stops() {
    let mut config = TestConfig::default().to_app_config();
    config.poll_interval = Duration::ZERO;
    let backend = Arc::new(CountingBackend::default());
    let (_, scheduler) = build(&config, backend, fleet(2), None);

    let running = scheduler.clone();
    let handle = tokio::spawn(async move { running.start().await });

    let mut waited = Duration::ZERO;
    while scheduler.last_summary().await.is_none() && waited < Duration::from_secs(2) {
        tokio::time::sleep(Duration::from_millis(10)).await;
        waited += Duration::from_millis(10);
    }
    assert_eq!(scheduler.last_summary().await.unwrap().total, 2);

    scheduler.shutdown();
    let stopped = tokio::time::timeout(Duration::from_secs(2), handle).await;
    tokio_test::assert_ok!(tokio_test::assert_ok!(stopped));
}
