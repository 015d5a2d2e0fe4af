pub mod alert;
pub mod assessment;
pub mod asset;
pub mod error;
pub mod metrics;

pub use alert::{AlertEvent, AlertKey};
pub use assessment::{Anomaly, AnomalySeverity, HealthAssessment, RiskLevel, NEUTRAL_HEALTH_SCORE};
pub use asset::{Asset, AssetCategory, MaintenanceEvent};
pub use error::AppError;
pub use metrics::{
    MetricFamily, MetricSample, MetricSummary, TrendAnalysis, TrendDirection, TrendSignificance,
};
