use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::asset::Asset;
use crate::metrics::{MetricSummary, TrendAnalysis};

/// Declaration order is the severity order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalySeverity {
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Anomaly {
    pub asset_id: String,
    pub metric_name: String,
    pub timestamp: DateTime<Utc>,
    pub value: f64,
    pub severity: AnomalySeverity,
    pub description: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
    Unknown,
}

impl RiskLevel {
    /// Risk levels that warrant a notification.
    pub fn is_alertable(&self) -> bool {
        matches!(self, RiskLevel::High | RiskLevel::Critical)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
            RiskLevel::Critical => "critical",
            RiskLevel::Unknown => "unknown",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub const NEUTRAL_HEALTH_SCORE: f64 = 50.0;

/// Result of one analysis cycle for one asset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthAssessment {
    pub asset_id: String,
    pub asset_name: String,
    #[serde(default)]
    pub asset_tag: Option<String>,
    pub health_score: f64,
    pub risk_level: RiskLevel,
    pub predicted_failure_date: Option<DateTime<Utc>>,
    pub recommendations: Vec<String>,
    pub anomalies: Vec<Anomaly>,
    pub summaries: BTreeMap<String, MetricSummary>,
    pub trends: BTreeMap<String, TrendAnalysis>,
    /// Metrics that could not be fetched this cycle (backend failure or deadline).
    pub skipped_metrics: Vec<String>,
    pub partial: bool,
    pub assessed_at: DateTime<Utc>,
}

impl HealthAssessment {
    fn neutral(asset: &Asset, recommendations: Vec<String>, assessed_at: DateTime<Utc>) -> Self {
        Self {
            asset_id: asset.id.clone(),
            asset_name: asset.name.clone(),
            asset_tag: asset.asset_tag.clone(),
            health_score: NEUTRAL_HEALTH_SCORE,
            risk_level: RiskLevel::Unknown,
            predicted_failure_date: None,
            recommendations,
            anomalies: Vec::new(),
            summaries: BTreeMap::new(),
            trends: BTreeMap::new(),
            skipped_metrics: Vec::new(),
            partial: false,
            assessed_at,
        }
    }

    pub fn monitoring_disabled(asset: &Asset, assessed_at: DateTime<Utc>) -> Self {
        Self::neutral(
            asset,
            vec!["Enable monitoring to get health insights".to_string()],
            assessed_at,
        )
    }

    pub fn no_data(asset: &Asset, assessed_at: DateTime<Utc>) -> Self {
        Self::neutral(
            asset,
            vec![
                "No monitoring data available".to_string(),
                "Enable monitoring backend collection to get detailed health insights".to_string(),
                "Ensure network connectivity to the monitoring server".to_string(),
            ],
            assessed_at,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_orders_critical_highest() {
        assert!(AnomalySeverity::Critical > AnomalySeverity::High);
        assert!(AnomalySeverity::High > AnomalySeverity::Medium);
    }

    #[test]
    fn only_high_and_critical_are_alertable() {
        assert!(RiskLevel::Critical.is_alertable());
        assert!(RiskLevel::High.is_alertable());
        assert!(!RiskLevel::Medium.is_alertable());
        assert!(!RiskLevel::Low.is_alertable());
        assert!(!RiskLevel::Unknown.is_alertable());
    }

    #[test]
    fn risk_level_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&RiskLevel::Critical).unwrap(), "\"critical\"");
    }
}
