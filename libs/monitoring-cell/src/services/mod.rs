pub mod backend;
pub mod cache;
pub mod client;
pub mod zabbix;

pub use backend::MonitoringBackend;
pub use cache::{CacheStats, TtlCache};
pub use client::{MetricsClient, RetryPolicy};
pub use zabbix::ZabbixBackend;
