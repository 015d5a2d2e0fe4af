// =====================================================================================
// HEALTH SCORER
// =====================================================================================

use std::collections::BTreeMap;

use shared_config::{ScoringThresholds, ThresholdPair};
use shared_models::{
    Anomaly, AnomalySeverity, MetricFamily, MetricSummary, RiskLevel, NEUTRAL_HEALTH_SCORE,
};

const MAX_SCORE: f64 = 100.0;
const CRITICAL_ANOMALY_PENALTY: f64 = 10.0;
const HIGH_ANOMALY_PENALTY: f64 = 5.0;
const FREQUENT_RESTART_PENALTY: f64 = 15.0;

/// (critical, warning) penalties per scored family.
const FAMILY_PENALTIES: [(MetricFamily, f64, f64); 4] = [
    (MetricFamily::Cpu, 30.0, 15.0),
    (MetricFamily::Memory, 25.0, 12.0),
    (MetricFamily::Disk, 20.0, 10.0),
    (MetricFamily::Temperature, 25.0, 10.0),
];

/// Additive-penalty health model. Pure and deterministic.
#[derive(Debug, Clone, Default)]
pub struct HealthScorer {
    thresholds: ScoringThresholds,
}

impl HealthScorer {
    pub fn new(thresholds: ScoringThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &ScoringThresholds {
        &self.thresholds
    }

    pub fn score(
        &self,
        summaries: &BTreeMap<String, MetricSummary>,
        anomalies: &[Anomaly],
    ) -> (f64, RiskLevel) {
        let has_data = summaries.values().any(|s| s.sample_count > 0);
        if !has_data && anomalies.is_empty() {
            return (NEUTRAL_HEALTH_SCORE, RiskLevel::Unknown);
        }

        let mut score = MAX_SCORE;

        for (family, critical_penalty, warning_penalty) in FAMILY_PENALTIES {
            let Some(avg) = family_average(summaries, family) else {
                continue;
            };
            let threshold = self.threshold_for(family);
            if avg > threshold.critical {
                score -= critical_penalty;
            } else if avg > threshold.warning {
                score -= warning_penalty;
            }
        }

        let critical = count_severity(anomalies, AnomalySeverity::Critical);
        let high = count_severity(anomalies, AnomalySeverity::High);
        score -= critical as f64 * CRITICAL_ANOMALY_PENALTY;
        score -= high as f64 * HIGH_ANOMALY_PENALTY;

        if restart_count(summaries) > self.thresholds.restart_limit {
            score -= FREQUENT_RESTART_PENALTY;
        }

        let score = score.clamp(0.0, MAX_SCORE);
        (score, risk_level(score, critical > 0))
    }

    fn threshold_for(&self, family: MetricFamily) -> &ThresholdPair {
        match family {
            MetricFamily::Memory => &self.thresholds.memory,
            MetricFamily::Disk => &self.thresholds.disk,
            MetricFamily::Temperature => &self.thresholds.temperature,
            _ => &self.thresholds.cpu,
        }
    }
}

/// Critical anomalies force `Critical` regardless of the score band.
pub fn risk_level(score: f64, has_critical_anomaly: bool) -> RiskLevel {
    if has_critical_anomaly || score < 30.0 {
        RiskLevel::Critical
    } else if score < 50.0 {
        RiskLevel::High
    } else if score < 70.0 {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    }
}

/// Highest average among non-empty summaries of `family`.
pub(crate) fn family_average(
    summaries: &BTreeMap<String, MetricSummary>,
    family: MetricFamily,
) -> Option<f64> {
    summaries
        .values()
        .filter(|s| s.family == family && s.sample_count > 0)
        .map(|s| s.avg)
        .reduce(f64::max)
}

fn restart_count(summaries: &BTreeMap<String, MetricSummary>) -> usize {
    summaries
        .values()
        .filter_map(|s| s.restart_count)
        .max()
        .unwrap_or(0)
}

fn count_severity(anomalies: &[Anomaly], severity: AnomalySeverity) -> usize {
    anomalies.iter().filter(|a| a.severity == severity).count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_utils::test_utils::{anomaly, summary_with_avg};

    fn summaries(entries: &[(&str, f64)]) -> BTreeMap<String, MetricSummary> {
        entries
            .iter()
            .map(|(name, avg)| (name.to_string(), summary_with_avg(name, *avg)))
            .collect()
    }

    #[test]
    fn no_data_is_neutral_unknown() {
        let scorer = HealthScorer::default();
        assert_eq!(scorer.score(&BTreeMap::new(), &[]), (50.0, RiskLevel::Unknown));
    }

    #[test]
    fn healthy_metrics_score_full_marks() {
        let scorer = HealthScorer::default();
        let (score, risk) = scorer.score(&summaries(&[("system.cpu.util", 35.0), ("vm.memory.util", 40.0)]), &[]);
        assert_eq!(score, 100.0);
        assert_eq!(risk, RiskLevel::Low);
    }

    #[test]
    fn family_penalties_are_two_tier() {
        let scorer = HealthScorer::default();

        let (warning, _) = scorer.score(&summaries(&[("system.cpu.util", 85.0)]), &[]);
        assert_eq!(warning, 85.0);

        let (critical, _) = scorer.score(
            &summaries(&[
                ("system.cpu.util", 92.0),
                ("vm.memory.util", 96.0),
                ("vfs.fs.size[/,pused]", 90.0),
                ("sensor.temp.value", 75.0),
            ]),
            &[],
        );
        // 100 - 30 - 25 - 10 - 10
        assert_eq!(critical, 25.0);
    }

    #[test]
    fn cpu_critical_with_one_critical_anomaly() {
        let scorer = HealthScorer::default();
        let (score, risk) = scorer.score(
            &summaries(&[("system.cpu.util", 92.0)]),
            &[anomaly("system.cpu.util", AnomalySeverity::Critical, 99.0)],
        );

        assert_eq!(score, 60.0);
        assert_eq!(risk, RiskLevel::Critical);
    }

    #[test]
    fn more_critical_anomalies_never_raise_the_score() {
        let scorer = HealthScorer::default();
        let base = summaries(&[("system.cpu.util", 70.0)]);
        let mut anomalies = Vec::new();
        let mut previous = scorer.score(&base, &anomalies).0;

        for _ in 0..15 {
            anomalies.push(anomaly("system.cpu.util", AnomalySeverity::Critical, 99.0));
            let (score, risk) = scorer.score(&base, &anomalies);
            assert!(score <= previous);
            assert!((0.0..=100.0).contains(&score));
            assert_eq!(risk, RiskLevel::Critical);
            previous = score;
        }
        assert_eq!(previous, 0.0);
    }

    #[test]
    fn frequent_restarts_cost_fifteen() {
        let scorer = HealthScorer::default();
        let mut map = summaries(&[("system.cpu.util", 20.0)]);
        let mut uptime = summary_with_avg("system.uptime", 40_000.0);
        uptime.restart_count = Some(6);
        map.insert("system.uptime".to_string(), uptime);

        assert_eq!(scorer.score(&map, &[]).0, 85.0);
    }

    #[test]
    fn risk_bands() {
        assert_eq!(risk_level(29.9, false), RiskLevel::Critical);
        assert_eq!(risk_level(30.0, false), RiskLevel::High);
        assert_eq!(risk_level(49.9, false), RiskLevel::High);
        assert_eq!(risk_level(50.0, false), RiskLevel::Medium);
        assert_eq!(risk_level(70.0, false), RiskLevel::Low);
        assert_eq!(risk_level(95.0, true), RiskLevel::Critical);
    }
}
