// =====================================================================================
// MAINTENANCE CELL ROUTER
// =====================================================================================

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::handlers::{
    analyze_all_assets, analyze_asset, get_alert_summary, get_recent_alerts, get_service_health,
    MaintenanceHandlers,
};

pub fn create_maintenance_router(handlers: Arc<MaintenanceHandlers>) -> Router {
    let analysis_routes = Router::new()
        .route("/analysis", post(analyze_all_assets))
        .route("/analysis/{asset_id}", post(analyze_asset))
        .with_state(handlers.clone());

    let status_routes = Router::new()
        .route("/health", get(get_service_health))
        .route("/alerts", get(get_recent_alerts))
        .route("/alerts/summary", get(get_alert_summary))
        .with_state(handlers);

    Router::new()
        .merge(analysis_routes)
        .merge(status_routes)
        .layer(CorsLayer::permissive())
}
