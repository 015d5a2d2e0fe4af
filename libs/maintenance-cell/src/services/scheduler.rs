// =====================================================================================
// ANALYSIS SCHEDULER - PERIODIC BATCHES OVER A BOUNDED WORKER POOL
// =====================================================================================

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{mpsc, watch, Mutex, RwLock};
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, instrument};

use shared_config::{clamp_setting, AppConfig, POLL_INTERVAL_SECS_RANGE};
use shared_models::Asset;

use crate::error::MaintenanceError;
use crate::models::{AnalysisOutcome, BatchReport, BatchSummary};
use crate::services::analysis::HealthAnalysisService;

/// Enqueues one job per monitored asset; `concurrency_limit` workers pull jobs
/// off the shared queue and send outcomes back over a channel.
pub struct AnalysisScheduler {
    service: Arc<HealthAnalysisService>,
    concurrency_limit: usize,
    poll_interval: Duration,
    last_report: RwLock<Option<BatchReport>>,
    shutdown_tx: watch::Sender<bool>,
}

impl AnalysisScheduler {
    pub fn new(service: Arc<HealthAnalysisService>, config: &AppConfig) -> Self {
        let (shutdown_tx, _) = watch::channel(false);

        Self {
            service,
            concurrency_limit: config.concurrency_limit.max(1),
            poll_interval: Duration::from_secs(clamp_setting(
                "poll_interval",
                config.poll_interval.as_secs(),
                POLL_INTERVAL_SECS_RANGE,
            )),
            last_report: RwLock::new(None),
            shutdown_tx,
        }
    }

    /// Runs a batch every `poll_interval` until [`shutdown`](Self::shutdown).
    /// The first batch starts immediately.
    pub async fn start(&self) {
        info!(
            interval_secs = self.poll_interval.as_secs(),
            workers = self.concurrency_limit,
            "Starting analysis scheduler"
        );

        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut shutdown = self.shutdown_tx.subscribe();

        loop {
            if *shutdown.borrow_and_update() {
                break;
            }

            tokio::select! {
                _ = ticker.tick() => {
                    match self.run_batch().await {
                        Ok(report) => info!(
                            total = report.total,
                            partial = report.partial,
                            failed = report.failed,
                            alerts = report.alerts_emitted,
                            "Scheduled analysis batch finished"
                        ),
                        Err(e) => error!("Scheduled analysis batch could not start: {}", e),
                    }
                }
                _ = shutdown.changed() => {
                    info!("Shutdown signal received, stopping analysis scheduler");
                    break;
                }
            }
        }

        info!("Analysis scheduler stopped");
    }

    pub fn shutdown(&self) {
        self.shutdown_tx.send_replace(true);
    }

    /// One analysis cycle per monitored asset. Always yields exactly one
    /// outcome per asset (a panicking cycle is reported as failed); only
    /// listing the assets can fail.
    #[instrument(skip(self))]
    pub async fn run_batch(&self) -> Result<BatchReport, MaintenanceError> {
        let started_at = Utc::now();
        let assets = self.service.directory().list_monitored_assets().await?;
        let total = assets.len();

        info!(assets = total, workers = self.concurrency_limit, "Analysis batch started");

        let (job_tx, job_rx) = mpsc::channel::<Asset>(total.max(1));
        for asset in assets {
            if job_tx.send(asset).await.is_err() {
                break;
            }
        }
        drop(job_tx);

        let job_rx = Arc::new(Mutex::new(job_rx));
        let (result_tx, mut result_rx) = mpsc::channel::<AnalysisOutcome>(total.max(1));

        let worker_count = self.concurrency_limit.min(total).max(1);
        let workers: Vec<_> = (0..worker_count)
            .map(|worker| {
                let jobs = job_rx.clone();
                let results = result_tx.clone();
                let service = self.service.clone();
                tokio::spawn(worker_loop(worker, jobs, results, service))
            })
            .collect();
        drop(result_tx);

        let mut outcomes = Vec::with_capacity(total);
        while let Some(outcome) = result_rx.recv().await {
            outcomes.push(outcome);
        }

        for joined in futures::future::join_all(workers).await {
            if let Err(e) = joined {
                error!("Analysis worker terminated abnormally: {}", e);
            }
        }

        let report = BatchReport::from_outcomes(started_at, outcomes);
        *self.last_report.write().await = Some(report.clone());

        Ok(report)
    }

    pub async fn last_report(&self) -> Option<BatchReport> {
        self.last_report.read().await.clone()
    }

    pub async fn last_summary(&self) -> Option<BatchSummary> {
        self.last_report.read().await.as_ref().map(BatchSummary::from)
    }
}

async fn worker_loop(
    worker: usize,
    jobs: Arc<Mutex<mpsc::Receiver<Asset>>>,
    results: mpsc::Sender<AnalysisOutcome>,
    service: Arc<HealthAnalysisService>,
) {
    debug!(worker, "Analysis worker started");

    loop {
        let next = jobs.lock().await.recv().await;
        let Some(asset) = next else {
            break;
        };

        let asset_id = asset.id.clone();
        let service = service.clone();

        // Each cycle runs in its own task so a panic fails one asset only.
        let outcome = match tokio::spawn(async move { service.run_cycle(&asset).await }).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(worker, asset_id = %asset_id, "Analysis cycle panicked: {}", e);
                AnalysisOutcome::failed(&asset_id, format!("analysis cycle failed: {}", e))
            }
        };

        if results.send(outcome).await.is_err() {
            break;
        }
    }

    debug!(worker, "Analysis worker finished");
}
