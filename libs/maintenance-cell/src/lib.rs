// =====================================================================================
// MAINTENANCE CELL - PER-ASSET ANALYSIS CYCLES, WORKER POOL AND HTTP TRIGGERS
// =====================================================================================

pub mod error;
pub mod handlers;
pub mod models;
pub mod ports;
pub mod router;
pub mod services;

pub use error::MaintenanceError;
pub use handlers::MaintenanceHandlers;
pub use models::{AnalysisOutcome, BatchReport, BatchSummary, OutcomeStatus};
pub use ports::{AssetDirectory, InventoryDocument, JsonInventory, MaintenanceHistoryStore};
pub use router::create_maintenance_router;
pub use services::{analysis::HealthAnalysisService, scheduler::AnalysisScheduler};
