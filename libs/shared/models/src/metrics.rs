use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Broad grouping of a backend item key, used to pick thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricFamily {
    Cpu,
    Memory,
    Disk,
    Temperature,
    Uptime,
    Network,
    Other,
}

impl MetricFamily {
    pub fn classify(metric_key: &str) -> Self {
        let key = metric_key.to_ascii_lowercase();
        if key.contains("cpu") {
            MetricFamily::Cpu
        } else if key.contains("memory") {
            MetricFamily::Memory
        } else if key.contains("disk") || key.starts_with("vfs.fs") {
            MetricFamily::Disk
        } else if key.contains("temp") {
            MetricFamily::Temperature
        } else if key.contains("uptime") {
            MetricFamily::Uptime
        } else if key.starts_with("net.") || key.contains("network") {
            MetricFamily::Network
        } else {
            MetricFamily::Other
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            MetricFamily::Cpu => "CPU",
            MetricFamily::Memory => "memory",
            MetricFamily::Disk => "disk",
            MetricFamily::Temperature => "temperature",
            MetricFamily::Uptime => "uptime",
            MetricFamily::Network => "network",
            MetricFamily::Other => "metric",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSample {
    pub asset_id: String,
    pub metric_name: String,
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

/// Summary statistics of one metric stream over the analysis window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSummary {
    pub metric_name: String,
    pub family: MetricFamily,
    pub sample_count: usize,
    pub avg: f64,
    pub min: f64,
    pub max: f64,
    pub p95: f64,
    /// OLS slope of value against sample index.
    pub trend_slope: f64,
    pub latest: Option<f64>,
    /// Samples reporting less than one day of uptime. Uptime streams only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub restart_count: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Stable,
    Increasing,
    Decreasing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendSignificance {
    Low,
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendAnalysis {
    pub direction: TrendDirection,
    pub slope: f64,
    pub significance: TrendSignificance,
    pub recent_change_percent: f64,
}
