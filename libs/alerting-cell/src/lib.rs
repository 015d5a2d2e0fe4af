// =====================================================================================
// ALERTING CELL - DE-DUPLICATED, BEST-EFFORT MAINTENANCE ALERTS
// =====================================================================================

pub mod error;
pub mod services;

pub use error::AlertingError;
pub use services::{
    dedup::{DedupStore, InMemoryDedupStore, RedisDedupStore},
    dispatcher::{AlertDispatcher, AlertSummary},
    sinks::{LogSink, NotificationSink, WebhookSink},
};
