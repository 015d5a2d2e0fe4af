// =====================================================================================
// METRICS AGGREGATOR
// =====================================================================================

use shared_models::{
    MetricFamily, MetricSample, MetricSummary, TrendAnalysis, TrendDirection, TrendSignificance,
};

const SECONDS_PER_DAY: f64 = 86_400.0;
const MIN_TREND_SAMPLES: usize = 5;
const STABLE_SLOPE: f64 = 0.001;
const SIGNIFICANT_SLOPE: f64 = 0.01;

/// Summary statistics of one metric stream. The metric name is taken from the
/// first sample; non-finite values are ignored.
pub fn summarize(samples: &[MetricSample]) -> MetricSummary {
    let metric_name = samples
        .first()
        .map(|s| s.metric_name.clone())
        .unwrap_or_default();
    let family = MetricFamily::classify(&metric_name);
    let values = finite_values(samples);

    if values.is_empty() {
        return MetricSummary {
            metric_name,
            family,
            sample_count: 0,
            avg: 0.0,
            min: 0.0,
            max: 0.0,
            p95: 0.0,
            trend_slope: 0.0,
            latest: None,
            restart_count: (family == MetricFamily::Uptime).then_some(0),
        };
    }

    let mut sorted = values.clone();
    sorted.sort_by(f64::total_cmp);

    let min = sorted[0];
    let max = sorted[sorted.len() - 1];
    // Rounding in the sum can push the mean a hair outside [min, max].
    let avg = (values.iter().sum::<f64>() / values.len() as f64).clamp(min, max);

    let restart_count = (family == MetricFamily::Uptime)
        .then(|| values.iter().filter(|v| **v < SECONDS_PER_DAY).count());

    MetricSummary {
        metric_name,
        family,
        sample_count: values.len(),
        avg,
        min,
        max,
        p95: percentile(&sorted, 95.0),
        trend_slope: index_slope(&values),
        latest: values.last().copied(),
        restart_count,
    }
}

/// Direction and strength of a stream's trend. `None` below five samples.
pub fn analyze_trend(samples: &[MetricSample]) -> Option<TrendAnalysis> {
    let values = finite_values(samples);
    if values.len() < MIN_TREND_SAMPLES {
        return None;
    }

    let slope = index_slope(&values);
    let direction = if slope.abs() < STABLE_SLOPE {
        TrendDirection::Stable
    } else if slope > 0.0 {
        TrendDirection::Increasing
    } else {
        TrendDirection::Decreasing
    };

    let first = values[0];
    let last = values[values.len() - 1];
    let recent_change_percent = if first != 0.0 {
        (last - first) / first * 100.0
    } else {
        0.0
    };

    Some(TrendAnalysis {
        direction,
        slope,
        significance: if slope.abs() > SIGNIFICANT_SLOPE {
            TrendSignificance::High
        } else {
            TrendSignificance::Low
        },
        recent_change_percent,
    })
}

fn finite_values(samples: &[MetricSample]) -> Vec<f64> {
    samples
        .iter()
        .map(|s| s.value)
        .filter(|v| v.is_finite())
        .collect()
}

/// Linear-interpolation percentile over an ascending slice.
pub(crate) fn percentile(sorted: &[f64], pct: f64) -> f64 {
    match sorted.len() {
        0 => 0.0,
        1 => sorted[0],
        n => {
            let rank = (pct / 100.0).clamp(0.0, 1.0) * (n - 1) as f64;
            let lower = rank.floor() as usize;
            let upper = rank.ceil() as usize;
            let weight = rank - lower as f64;
            sorted[lower] + (sorted[upper] - sorted[lower]) * weight
        }
    }
}

// Ordinary least squares against the sample index, not wall-clock time.
fn index_slope(values: &[f64]) -> f64 {
    let n = values.len();
    if n < 2 {
        return 0.0;
    }

    let x_mean = (n - 1) as f64 / 2.0;
    let y_mean = values.iter().sum::<f64>() / n as f64;

    let (covariance, variance) = values.iter().enumerate().fold((0.0, 0.0), |(cov, var), (i, y)| {
        let dx = i as f64 - x_mean;
        (cov + dx * (y - y_mean), var + dx * dx)
    });

    if variance == 0.0 {
        0.0
    } else {
        covariance / variance
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_utils::test_utils::sample_stream;

    #[test]
    fn empty_and_single_sample_streams_have_flat_trend() {
        let empty = summarize(&[]);
        assert_eq!(empty.trend_slope, 0.0);
        assert_eq!(empty.sample_count, 0);

        let single = summarize(&sample_stream("a", "system.cpu.util", &[42.0]));
        assert_eq!(single.trend_slope, 0.0);
        assert_eq!(single.avg, 42.0);
        assert_eq!(single.p95, 42.0);
    }

    #[test]
    fn max_dominates_avg_which_dominates_min() {
        let streams: [&[f64]; 4] = [
            &[0.1, 0.1, 0.1],
            &[1.0, 2.0, 3.0, 100.0],
            &[-5.0, 5.0],
            &[33.3, 33.3, 33.3, 33.3, 33.3, 33.3, 33.3],
        ];

        for values in streams {
            let summary = summarize(&sample_stream("a", "vm.memory.util", values));
            assert!(summary.max >= summary.avg, "{:?}", values);
            assert!(summary.avg >= summary.min, "{:?}", values);
        }
    }

    #[test]
    fn p95_interpolates_between_ranks() {
        let values: Vec<f64> = (1..=10).map(f64::from).collect();
        let summary = summarize(&sample_stream("a", "system.cpu.util", &values));

        // rank 0.95 * 9 = 8.55 -> 9 + 0.55 * (10 - 9)
        assert!((summary.p95 - 9.55).abs() < 1e-9);
        assert_eq!(summary.max, 10.0);
        assert!((summary.avg - 5.5).abs() < 1e-9);
    }

    #[test]
    fn slope_follows_sample_index() {
        let summary = summarize(&sample_stream("a", "system.cpu.util", &[10.0, 12.0, 14.0, 16.0]));
        assert!((summary.trend_slope - 2.0).abs() < 1e-9);
    }

    #[test]
    fn uptime_streams_count_restarts() {
        let summary = summarize(&sample_stream(
            "a",
            "system.uptime",
            &[3_600.0, 90_000.0, 7_200.0, 200_000.0, 100.0],
        ));
        assert_eq!(summary.restart_count, Some(3));

        let cpu = summarize(&sample_stream("a", "system.cpu.util", &[1.0, 2.0]));
        assert_eq!(cpu.restart_count, None);
    }

    #[test]
    fn trend_requires_five_samples() {
        assert!(analyze_trend(&sample_stream("a", "system.cpu.util", &[1.0, 2.0, 3.0, 4.0])).is_none());

        let trend = analyze_trend(&sample_stream("a", "system.cpu.util", &[10.0, 11.0, 12.0, 13.0, 15.0]))
            .unwrap();
        assert_eq!(trend.direction, TrendDirection::Increasing);
        assert_eq!(trend.significance, TrendSignificance::High);
        assert!((trend.recent_change_percent - 50.0).abs() < 1e-9);
    }

    #[test]
    fn flat_trend_is_stable_and_zero_start_has_no_change_percent() {
        let trend = analyze_trend(&sample_stream("a", "vm.memory.util", &[0.0, 0.0, 0.0, 0.0, 0.0])).unwrap();
        assert_eq!(trend.direction, TrendDirection::Stable);
        assert_eq!(trend.significance, TrendSignificance::Low);
        assert_eq!(trend.recent_change_percent, 0.0);
    }
}
