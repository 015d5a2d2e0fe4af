use std::collections::BTreeMap;

use chrono::NaiveDate;

use shared_config::ScoringThresholds;
use shared_models::{
    Anomaly, AnomalySeverity, Asset, AssetCategory, MetricFamily, MetricSummary, TrendAnalysis,
    TrendDirection, TrendSignificance,
};

use crate::services::scoring::family_average;

pub const MAX_RECOMMENDATIONS: usize = 10;
const ROUTINE_MAINTENANCE_DAYS: i64 = 90;

/// Ordered maintenance advice for one assessment, at most ten entries.
pub fn build_recommendations(
    asset: &Asset,
    summaries: &BTreeMap<String, MetricSummary>,
    anomalies: &[Anomaly],
    trends: &BTreeMap<String, TrendAnalysis>,
    thresholds: &ScoringThresholds,
    today: NaiveDate,
) -> Vec<String> {
    let mut recommendations = Vec::new();

    if let Some(avg) = family_average(summaries, MetricFamily::Cpu).filter(|avg| *avg > thresholds.cpu.warning) {
        recommendations.push(format!(
            "High CPU utilization detected ({:.1}%). Consider checking for resource-intensive processes or upgrading hardware.",
            avg
        ));
    }
    if let Some(avg) = family_average(summaries, MetricFamily::Memory).filter(|avg| *avg > thresholds.memory.warning) {
        recommendations.push(format!(
            "High memory utilization detected ({:.1}%). Consider adding more RAM or optimizing memory usage.",
            avg
        ));
    }
    if let Some(avg) = family_average(summaries, MetricFamily::Disk).filter(|avg| *avg > thresholds.disk.warning) {
        recommendations.push(format!(
            "High disk utilization detected ({:.1}%). Consider cleaning up disk space or adding more storage.",
            avg
        ));
    }
    if let Some(avg) = family_average(summaries, MetricFamily::Temperature)
        .filter(|avg| *avg > thresholds.temperature.warning)
    {
        recommendations.push(format!(
            "High temperature detected ({:.1}°C). Check cooling systems and clean dust from fans.",
            avg
        ));
    }

    for (metric_name, trend) in trends {
        if trend.direction != TrendDirection::Increasing || trend.significance != TrendSignificance::High {
            continue;
        }
        let advice = match MetricFamily::classify(metric_name) {
            MetricFamily::Cpu => "CPU usage is trending upward. Monitor for performance issues.",
            MetricFamily::Memory => "Memory usage is trending upward. Monitor for memory leaks.",
            MetricFamily::Disk => "Disk usage is trending upward. Plan for storage expansion.",
            _ => continue,
        };
        recommendations.push(advice.to_string());
    }

    if anomalies.iter().any(|a| a.severity == AnomalySeverity::Critical) {
        recommendations.push(
            "Critical anomalies detected in system metrics. Schedule immediate inspection.".to_string(),
        );
    }

    if let Some(last) = asset.last_maintenance {
        let days_since = (today - last).num_days();
        if days_since > ROUTINE_MAINTENANCE_DAYS {
            recommendations.push(format!(
                "Last maintenance was {} days ago. Schedule routine maintenance check.",
                days_since
            ));
        }
    }

    match asset.category {
        AssetCategory::Server => {
            recommendations.push("Verify backup systems and disaster recovery procedures.".to_string())
        }
        AssetCategory::Laptop => {
            recommendations.push("Check battery health and consider replacement if degraded.".to_string())
        }
        AssetCategory::Network => {
            recommendations.push("Monitor network traffic patterns and security events.".to_string())
        }
        _ => {}
    }

    recommendations.truncate(MAX_RECOMMENDATIONS);
    recommendations
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use shared_utils::test_utils::{anomaly, base_time, summary_with_avg, TestAsset};

    fn today() -> NaiveDate {
        base_time().date_naive()
    }

    #[test]
    fn breaches_trends_and_category_in_order() {
        let asset = TestAsset::server("srv-1", "10105").to_asset();
        let summaries: BTreeMap<String, MetricSummary> = [
            ("system.cpu.util", 88.0),
            ("vm.memory.util", 40.0),
        ]
        .iter()
        .map(|(name, avg)| (name.to_string(), summary_with_avg(name, *avg)))
        .collect();
        let trends = BTreeMap::from([(
            "vm.memory.util".to_string(),
            TrendAnalysis {
                direction: TrendDirection::Increasing,
                slope: 0.2,
                significance: TrendSignificance::High,
                recent_change_percent: 12.0,
            },
        )]);

        let recs = build_recommendations(
            &asset,
            &summaries,
            &[anomaly("system.cpu.util", AnomalySeverity::Critical, 99.0)],
            &trends,
            &ScoringThresholds::default(),
            today(),
        );

        assert_eq!(recs.len(), 4);
        assert!(recs[0].starts_with("High CPU utilization detected (88.0%)"));
        assert!(recs[1].starts_with("Memory usage is trending upward"));
        assert!(recs[2].starts_with("Critical anomalies detected"));
        assert_eq!(recs[3], "Verify backup systems and disaster recovery procedures.");
    }

    #[test]
    fn stale_maintenance_is_flagged() {
        let mut fixture = TestAsset::monitored("ws-1", "10200");
        fixture.last_maintenance = Some(today() - Duration::days(120));

        let recs = build_recommendations(
            &fixture.to_asset(),
            &BTreeMap::new(),
            &[],
            &BTreeMap::new(),
            &ScoringThresholds::default(),
            today(),
        );

        assert_eq!(recs, vec!["Last maintenance was 120 days ago. Schedule routine maintenance check.".to_string()]);
    }

    #[test]
    fn healthy_desktop_gets_no_advice() {
        let recs = build_recommendations(
            &TestAsset::monitored("ws-2", "10201").to_asset(),
            &BTreeMap::new(),
            &[],
            &BTreeMap::new(),
            &ScoringThresholds::default(),
            today(),
        );
        assert!(recs.is_empty());
    }
}
