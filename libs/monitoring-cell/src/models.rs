// =====================================================================================
// MONITORING CELL MODELS
// =====================================================================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HostStatus {
    Monitored,
    Unmonitored,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostInterface {
    pub interface_id: String,
    pub ip: String,
    pub dns: String,
    pub port: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostInfo {
    pub host_id: String,
    pub host: String,
    pub name: String,
    pub status: HostStatus,
    pub interfaces: Vec<HostInterface>,
}

/// A metric item registered on a backend host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendItem {
    pub item_id: String,
    pub host_id: String,
    pub name: String,
    pub key: String,
    /// Backend storage type: 0 float, 1 character, 2 log, 3 unsigned, 4 text.
    pub value_type: u8,
    pub units: String,
}

impl BackendItem {
    pub fn is_numeric(&self) -> bool {
        matches!(self.value_type, 0 | 3)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HistoryPoint {
    pub clock: DateTime<Utc>,
    pub value: f64,
}
