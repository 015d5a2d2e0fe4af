// =====================================================================================
// MAINTENANCE CELL HANDLERS
// =====================================================================================

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};

use alerting_cell::{AlertDispatcher, AlertSummary};
use monitoring_cell::{CacheStats, MetricsClient};
use shared_models::{AlertEvent, AppError};

use crate::models::{AnalysisOutcome, BatchReport, BatchSummary};
use crate::services::{analysis::HealthAnalysisService, scheduler::AnalysisScheduler};

const DEFAULT_ALERT_LIMIT: usize = 50;

pub struct MaintenanceHandlers {
    analysis: Arc<HealthAnalysisService>,
    scheduler: Arc<AnalysisScheduler>,
    dispatcher: Arc<AlertDispatcher>,
    metrics: Arc<MetricsClient>,
    started_at: DateTime<Utc>,
}

impl MaintenanceHandlers {
    pub fn new(analysis: Arc<HealthAnalysisService>, scheduler: Arc<AnalysisScheduler>) -> Self {
        Self {
            dispatcher: analysis.dispatcher().clone(),
            metrics: analysis.metrics().clone(),
            analysis,
            scheduler,
            started_at: Utc::now(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ServiceHealthResponse {
    pub status: String,
    pub uptime_seconds: i64,
    pub last_batch: Option<BatchSummary>,
    pub caches: Vec<CacheStats>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct AlertQuery {
    pub limit: Option<usize>,
}

// =====================================================================================
// ANALYSIS TRIGGERS
// =====================================================================================

#[instrument(skip(handlers))]
pub async fn analyze_asset(
    State(handlers): State<Arc<MaintenanceHandlers>>,
    Path(asset_id): Path<String>,
) -> Result<Json<AnalysisOutcome>, AppError> {
    let outcome = handlers.analysis.analyze_asset(&asset_id).await?;
    Ok(Json(outcome))
}

#[instrument(skip(handlers))]
pub async fn analyze_all_assets(
    State(handlers): State<Arc<MaintenanceHandlers>>,
) -> Result<Json<BatchReport>, AppError> {
    info!("On-demand analysis batch requested");
    let report = handlers.scheduler.run_batch().await?;
    Ok(Json(report))
}

// =====================================================================================
// SERVICE HEALTH
// =====================================================================================

pub async fn get_service_health(
    State(handlers): State<Arc<MaintenanceHandlers>>,
) -> Result<Json<ServiceHealthResponse>, AppError> {
    let now = Utc::now();
    let last_batch = handlers.scheduler.last_summary().await;

    let status = match &last_batch {
        Some(batch) if batch.total > 0 && batch.failed == batch.total => "degraded",
        _ => "healthy",
    };

    Ok(Json(ServiceHealthResponse {
        status: status.to_string(),
        uptime_seconds: (now - handlers.started_at).num_seconds(),
        last_batch,
        caches: handlers.metrics.cache_stats().await,
        timestamp: now,
    }))
}

// =====================================================================================
// ALERT ENDPOINTS
// =====================================================================================

pub async fn get_recent_alerts(
    State(handlers): State<Arc<MaintenanceHandlers>>,
    Query(query): Query<AlertQuery>,
) -> Result<Json<Vec<AlertEvent>>, AppError> {
    let limit = query.limit.unwrap_or(DEFAULT_ALERT_LIMIT);
    Ok(Json(handlers.dispatcher.recent_alerts(limit).await))
}

pub async fn get_alert_summary(
    State(handlers): State<Arc<MaintenanceHandlers>>,
) -> Result<Json<AlertSummary>, AppError> {
    Ok(Json(handlers.dispatcher.summary().await))
}
