// =====================================================================================
// MAINTENANCE CELL MODELS
// =====================================================================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use shared_models::HealthAssessment;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    Completed,
    /// Some metrics were skipped (backend failure or deadline).
    Partial,
    Failed,
}

/// One asset's result from an analysis cycle. Batch runs yield exactly one per
/// asset, whatever happened to it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisOutcome {
    pub asset_id: String,
    pub status: OutcomeStatus,
    pub assessment: Option<HealthAssessment>,
    pub alert_emitted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AnalysisOutcome {
    pub fn assessed(assessment: HealthAssessment, alert_emitted: bool) -> Self {
        Self {
            asset_id: assessment.asset_id.clone(),
            status: if assessment.partial {
                OutcomeStatus::Partial
            } else {
                OutcomeStatus::Completed
            },
            assessment: Some(assessment),
            alert_emitted,
            error: None,
        }
    }

    pub fn failed(asset_id: &str, error: impl Into<String>) -> Self {
        Self {
            asset_id: asset_id.to_string(),
            status: OutcomeStatus::Failed,
            assessment: None,
            alert_emitted: false,
            error: Some(error.into()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub total: usize,
    pub completed: usize,
    pub partial: usize,
    pub failed: usize,
    pub alerts_emitted: usize,
    pub outcomes: Vec<AnalysisOutcome>,
}

impl BatchReport {
    pub fn from_outcomes(started_at: DateTime<Utc>, mut outcomes: Vec<AnalysisOutcome>) -> Self {
        outcomes.sort_by(|a, b| a.asset_id.cmp(&b.asset_id));
        let count = |status: OutcomeStatus| outcomes.iter().filter(|o| o.status == status).count();

        Self {
            started_at,
            finished_at: Utc::now(),
            total: outcomes.len(),
            completed: count(OutcomeStatus::Completed),
            partial: count(OutcomeStatus::Partial),
            failed: count(OutcomeStatus::Failed),
            alerts_emitted: outcomes.iter().filter(|o| o.alert_emitted).count(),
            outcomes,
        }
    }
}

/// Counters of a batch without the per-asset payloads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchSummary {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub total: usize,
    pub completed: usize,
    pub partial: usize,
    pub failed: usize,
    pub alerts_emitted: usize,
}

impl From<&BatchReport> for BatchSummary {
    fn from(report: &BatchReport) -> Self {
        Self {
            started_at: report.started_at,
            finished_at: report.finished_at,
            total: report.total,
            completed: report.completed,
            partial: report.partial,
            failed: report.failed,
            alerts_emitted: report.alerts_emitted,
        }
    }
}
