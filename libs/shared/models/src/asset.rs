use std::net::IpAddr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AssetCategory {
    Server,
    Desktop,
    Laptop,
    Network,
    Printer,
    Monitor,
    #[default]
    #[serde(other)]
    Other,
}

/// A managed piece of equipment. Owned by the asset directory; read-only here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Asset {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub asset_tag: Option<String>,
    #[serde(default)]
    pub category: AssetCategory,
    #[serde(default)]
    pub ip_address: Option<IpAddr>,
    /// Host identifier registered in the monitoring backend.
    #[serde(default)]
    pub monitoring_host_id: Option<String>,
    #[serde(default)]
    pub monitoring_enabled: bool,
    #[serde(default)]
    pub last_maintenance: Option<NaiveDate>,
}

impl Asset {
    /// The backend host reference, only when monitoring is switched on.
    pub fn monitored_host(&self) -> Option<&str> {
        if !self.monitoring_enabled {
            return None;
        }
        self.monitoring_host_id
            .as_deref()
            .filter(|host| !host.trim().is_empty())
    }
}

/// A completed maintenance intervention, as reported by the history store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaintenanceEvent {
    pub asset_id: String,
    pub completed_at: DateTime<Utc>,
}
