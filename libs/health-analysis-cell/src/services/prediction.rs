// =====================================================================================
// FAILURE PREDICTOR
// =====================================================================================

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use shared_config::ScoringThresholds;
use shared_models::{MaintenanceEvent, MetricFamily, MetricSummary};

use crate::services::scoring::family_average;

pub const MIN_HISTORY_EVENTS: usize = 3;
pub const HISTORY_WINDOW: usize = 10;
pub const PREDICTION_HORIZON_DAYS: i64 = 365;
const STRESS_FACTOR: f64 = 0.8;

/// Estimates the next failure from maintenance cadence, shortened when cpu or
/// memory run above their warning threshold.
#[derive(Debug, Clone, Default)]
pub struct FailurePredictor {
    thresholds: ScoringThresholds,
}

impl FailurePredictor {
    pub fn new(thresholds: ScoringThresholds) -> Self {
        Self { thresholds }
    }

    pub fn predict(
        &self,
        history: &[MaintenanceEvent],
        summaries: &BTreeMap<String, MetricSummary>,
        now: DateTime<Utc>,
    ) -> Option<DateTime<Utc>> {
        let mut events: Vec<&MaintenanceEvent> = history.iter().collect();
        events.sort_by(|a, b| b.completed_at.cmp(&a.completed_at));
        events.truncate(HISTORY_WINDOW);

        if events.len() < MIN_HISTORY_EVENTS {
            debug!(events = events.len(), "not enough maintenance history to predict");
            return None;
        }

        let intervals: Vec<i64> = events
            .windows(2)
            .map(|pair| (pair[0].completed_at - pair[1].completed_at).num_days())
            .collect();
        let mean_interval = intervals.iter().sum::<i64>() as f64 / intervals.len() as f64;

        let adjusted_days = (mean_interval * self.health_factor(summaries)) as i64;
        let predicted = events[0].completed_at + Duration::days(adjusted_days);

        if predicted > now + Duration::days(PREDICTION_HORIZON_DAYS) {
            debug!(%predicted, "prediction beyond horizon, discarding");
            return None;
        }

        Some(predicted)
    }

    fn health_factor(&self, summaries: &BTreeMap<String, MetricSummary>) -> f64 {
        [
            (MetricFamily::Cpu, self.thresholds.cpu.warning),
            (MetricFamily::Memory, self.thresholds.memory.warning),
        ]
        .into_iter()
        .filter(|(family, warning)| {
            family_average(summaries, *family).is_some_and(|avg| avg > *warning)
        })
        .fold(1.0, |factor, _| factor * STRESS_FACTOR)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_utils::test_utils::{base_time, maintenance_history, summary_with_avg};

    fn summaries(entries: &[(&str, f64)]) -> BTreeMap<String, MetricSummary> {
        entries
            .iter()
            .map(|(name, avg)| (name.to_string(), summary_with_avg(name, *avg)))
            .collect()
    }

    #[test]
    fn fewer_than_three_events_predicts_nothing() {
        let now = base_time();
        let history = maintenance_history("a", now, &[10, 40]);
        assert_eq!(FailurePredictor::default().predict(&history, &BTreeMap::new(), now), None);
    }

    #[test]
    fn mean_interval_from_most_recent_event() {
        let now = base_time();
        let history = maintenance_history("a", now, &[10, 40, 70]);

        let predicted = FailurePredictor::default()
            .predict(&history, &summaries(&[("system.cpu.util", 30.0)]), now)
            .unwrap();

        assert_eq!(predicted, now - Duration::days(10) + Duration::days(30));
    }

    #[test]
    fn stressed_cpu_and_memory_compound() {
        let now = base_time();
        let history = maintenance_history("a", now, &[0, 100, 200]);

        let predicted = FailurePredictor::default()
            .predict(
                &history,
                &summaries(&[("system.cpu.util", 85.0), ("vm.memory.util", 90.0)]),
                now,
            )
            .unwrap();

        // 100 * 0.8 * 0.8 = 64
        assert_eq!(predicted, now + Duration::days(64));
    }

    #[test]
    fn beyond_a_year_is_discarded() {
        let now = base_time();
        let history = maintenance_history("a", now, &[1, 401, 801]);
        assert_eq!(FailurePredictor::default().predict(&history, &BTreeMap::new(), now), None);
    }

    #[test]
    fn only_ten_most_recent_events_count() {
        let now = base_time();
        let mut days: Vec<i64> = (0..10).map(|i| i * 10).collect();
        days.push(5_000);
        let history = maintenance_history("a", now, &days);

        let predicted = FailurePredictor::default().predict(&history, &BTreeMap::new(), now);
        assert_eq!(predicted, Some(now + Duration::days(10)));
    }
}
