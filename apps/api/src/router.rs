use std::sync::Arc;

use axum::{routing::get, Router};

use maintenance_cell::{create_maintenance_router, MaintenanceHandlers};

pub fn create_router(handlers: Arc<MaintenanceHandlers>) -> Router {
    Router::new()
        .route("/", get(|| async { "Fleet health API is running!" }))
        .merge(create_maintenance_router(handlers))
}
