// =====================================================================================
// MONITORING CELL - MONITORING BACKEND ACCESS
// =====================================================================================
//
// Talks to the external time-series monitoring backend on behalf of the
// analysis engine:
// - Host and item lookups, cached with a short TTL
// - Time-ranged history queries (never cached)
// - Bounded retry with exponential backoff for transient failures
//
// =====================================================================================

pub mod error;
pub mod models;
pub mod services;

pub use error::MetricsError;
pub use models::{BackendItem, HistoryPoint, HostInfo, HostInterface, HostStatus};
pub use services::{
    CacheStats, MetricsClient, MonitoringBackend, RetryPolicy, TtlCache, ZabbixBackend,
};
