// =====================================================================================
// HEALTH ANALYSIS CELL - AGGREGATION, ANOMALIES, SCORING, PREDICTION
// =====================================================================================

pub mod services;

pub use services::{
    aggregator::{analyze_trend, summarize},
    analyzer::{HealthAnalyzer, MetricStreams},
    anomaly::{rank_anomalies, AnomalyDetector, MAX_REPORTED_ANOMALIES},
    prediction::FailurePredictor,
    recommendations::build_recommendations,
    scoring::HealthScorer,
};
