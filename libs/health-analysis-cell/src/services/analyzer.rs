// =====================================================================================
// HEALTH ANALYZER - SUMMARIZE, DETECT, SCORE, PREDICT, RECOMMEND
// =====================================================================================

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use shared_config::AppConfig;
use shared_models::{Asset, HealthAssessment, MaintenanceEvent, MetricSample};

use crate::services::aggregator::{analyze_trend, summarize};
use crate::services::anomaly::{AnomalyDetector, MAX_REPORTED_ANOMALIES};
use crate::services::prediction::FailurePredictor;
use crate::services::recommendations::build_recommendations;
use crate::services::scoring::HealthScorer;

/// Samples per metric key for one asset, oldest first within each stream.
pub type MetricStreams = BTreeMap<String, Vec<MetricSample>>;

/// Runs the in-memory stages of one analysis cycle. Every call builds a fresh
/// assessment; nothing carries over between cycles.
#[derive(Debug, Clone)]
pub struct HealthAnalyzer {
    detector: AnomalyDetector,
    scorer: HealthScorer,
    predictor: FailurePredictor,
}

impl HealthAnalyzer {
    pub fn new(detector: AnomalyDetector, scorer: HealthScorer, predictor: FailurePredictor) -> Self {
        Self {
            detector,
            scorer,
            predictor,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            AnomalyDetector::from_config(config),
            HealthScorer::new(config.scoring.clone()),
            FailurePredictor::new(config.scoring.clone()),
        )
    }

    /// `skipped_metrics` lists streams that could not be fetched; a non-empty
    /// list marks the assessment partial.
    pub fn evaluate(
        &self,
        asset: &Asset,
        streams: &MetricStreams,
        history: &[MaintenanceEvent],
        skipped_metrics: Vec<String>,
        now: DateTime<Utc>,
    ) -> HealthAssessment {
        if asset.monitored_host().is_none() {
            debug!(asset_id = %asset.id, "monitoring disabled, returning neutral assessment");
            return HealthAssessment::monitoring_disabled(asset, now);
        }

        let partial = !skipped_metrics.is_empty();
        let populated: Vec<(&String, &Vec<MetricSample>)> =
            streams.iter().filter(|(_, samples)| !samples.is_empty()).collect();

        if populated.is_empty() {
            info!(asset_id = %asset.id, partial, "no monitoring data for asset");
            let mut assessment = HealthAssessment::no_data(asset, now);
            assessment.skipped_metrics = skipped_metrics;
            assessment.partial = partial;
            return assessment;
        }

        let summaries: BTreeMap<_, _> = populated
            .iter()
            .map(|(name, samples)| ((*name).clone(), summarize(samples)))
            .collect();

        let trends: BTreeMap<_, _> = populated
            .iter()
            .filter_map(|(name, samples)| analyze_trend(samples).map(|t| ((*name).clone(), t)))
            .collect();

        let all_samples: Vec<MetricSample> = populated
            .iter()
            .flat_map(|(_, samples)| samples.iter().cloned())
            .collect();
        let mut anomalies = self.detector.detect(&all_samples);
        anomalies.truncate(MAX_REPORTED_ANOMALIES);

        let (health_score, risk_level) = self.scorer.score(&summaries, &anomalies);
        let predicted_failure_date = self.predictor.predict(history, &summaries, now);
        let recommendations = build_recommendations(
            asset,
            &summaries,
            &anomalies,
            &trends,
            self.scorer.thresholds(),
            now.date_naive(),
        );

        if risk_level.is_alertable() {
            warn!(
                asset_id = %asset.id,
                health_score,
                risk = %risk_level,
                anomalies = anomalies.len(),
                "asset health degraded"
            );
        } else {
            info!(asset_id = %asset.id, health_score, risk = %risk_level, "asset assessed");
        }

        HealthAssessment {
            asset_id: asset.id.clone(),
            asset_name: asset.name.clone(),
            asset_tag: asset.asset_tag.clone(),
            health_score,
            risk_level,
            predicted_failure_date,
            recommendations,
            anomalies,
            summaries,
            trends,
            skipped_metrics,
            partial,
            assessed_at: now,
        }
    }
}

impl Default for HealthAnalyzer {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}
