use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::assessment::{HealthAssessment, RiskLevel};

/// Idempotency key: at most one alert per asset, condition and time bucket.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AlertKey {
    pub asset_id: String,
    pub condition: RiskLevel,
    /// Index of the de-dup window since the Unix epoch.
    pub bucket: i64,
}

impl AlertKey {
    pub fn for_assessment(assessment: &HealthAssessment, window_seconds: i64) -> Self {
        let window = window_seconds.max(1);
        Self {
            asset_id: assessment.asset_id.clone(),
            condition: assessment.risk_level,
            bucket: assessment.assessed_at.timestamp().div_euclid(window),
        }
    }
}

impl fmt::Display for AlertKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "alert:{}:{}:{}", self.asset_id, self.condition, self.bucket)
    }
}

/// Structured notification published for a high or critical assessment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertEvent {
    pub alert_id: Uuid,
    pub asset_id: String,
    pub asset_name: String,
    pub asset_tag: Option<String>,
    pub title: String,
    pub message: String,
    pub health_score: f64,
    pub risk_level: RiskLevel,
    pub recommendations: Vec<String>,
    pub predicted_failure_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl AlertEvent {
    pub fn from_assessment(assessment: &HealthAssessment) -> Self {
        let label = match &assessment.asset_tag {
            Some(tag) => format!("{} ({})", assessment.asset_name, tag),
            None => assessment.asset_name.clone(),
        };

        Self {
            alert_id: Uuid::new_v4(),
            asset_id: assessment.asset_id.clone(),
            asset_name: assessment.asset_name.clone(),
            asset_tag: assessment.asset_tag.clone(),
            title: format!("Maintenance Alert: {}", assessment.asset_name),
            message: format!(
                "Equipment {} requires attention. Health score: {:.1}/100. Risk level: {}.",
                label, assessment.health_score, assessment.risk_level
            ),
            health_score: assessment.health_score,
            risk_level: assessment.risk_level,
            recommendations: assessment.recommendations.iter().take(3).cloned().collect(),
            predicted_failure_date: assessment.predicted_failure_date,
            created_at: Utc::now(),
        }
    }
}
