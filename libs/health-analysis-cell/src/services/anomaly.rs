// =====================================================================================
// ANOMALY DETECTOR - SEEDED ISOLATION FOREST OVER 1-D METRIC STREAMS
// =====================================================================================

use std::collections::BTreeMap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use shared_config::{AppConfig, SeverityCutoffs, ThresholdPair};
use shared_models::{Anomaly, AnomalySeverity, MetricFamily, MetricSample};

use crate::services::aggregator::percentile;

pub const MIN_DETECTION_SAMPLES: usize = 10;
pub const MAX_REPORTED_ANOMALIES: usize = 20;

const TREE_COUNT: usize = 100;
const MAX_SUBSAMPLE: usize = 256;
const EULER_GAMMA: f64 = 0.577_215_664_901_532_9;

/// Flags statistically unusual samples per metric stream. Deterministic for a
/// fixed input and seed.
#[derive(Debug, Clone)]
pub struct AnomalyDetector {
    contamination: f64,
    seed: u64,
    cutoffs: SeverityCutoffs,
}

impl AnomalyDetector {
    pub fn new(contamination: f64, seed: u64, cutoffs: SeverityCutoffs) -> Self {
        Self {
            contamination: contamination.clamp(0.0, 0.5),
            seed,
            cutoffs,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.contamination, config.anomaly_seed, config.severity.clone())
    }

    /// Anomalies across every stream in `samples`, sorted by severity then
    /// timestamp, newest first. Streams shorter than ten samples are skipped.
    pub fn detect(&self, samples: &[MetricSample]) -> Vec<Anomaly> {
        let mut streams: BTreeMap<&str, Vec<&MetricSample>> = BTreeMap::new();
        for sample in samples.iter().filter(|s| s.value.is_finite()) {
            streams.entry(sample.metric_name.as_str()).or_default().push(sample);
        }

        let mut anomalies = Vec::new();
        for (metric_name, stream) in streams {
            if stream.len() < MIN_DETECTION_SAMPLES {
                debug!(metric = metric_name, samples = stream.len(), "stream too short for anomaly detection");
                continue;
            }

            let family = MetricFamily::classify(metric_name);
            let values: Vec<f64> = stream.iter().map(|s| s.value).collect();

            for index in self.outlier_indices(&values) {
                let sample = stream[index];
                anomalies.push(Anomaly {
                    asset_id: sample.asset_id.clone(),
                    metric_name: sample.metric_name.clone(),
                    timestamp: sample.timestamp,
                    value: sample.value,
                    severity: self.severity(family, sample.value),
                    description: describe(family, metric_name, sample.value),
                });
            }
        }

        rank_anomalies(&mut anomalies);
        anomalies
    }

    pub fn severity(&self, family: MetricFamily, value: f64) -> AnomalySeverity {
        let cutoff = match family {
            MetricFamily::Cpu => &self.cutoffs.cpu,
            MetricFamily::Memory => &self.cutoffs.memory,
            MetricFamily::Disk => &self.cutoffs.disk,
            MetricFamily::Temperature => &self.cutoffs.temperature,
            _ => return AnomalySeverity::Medium,
        };
        classify_against(cutoff, value)
    }

    // Points whose isolation score lies strictly above the (1 - contamination)
    // quantile of all scores. A constant stream therefore yields nothing.
    fn outlier_indices(&self, values: &[f64]) -> Vec<usize> {
        if self.contamination <= 0.0 {
            return Vec::new();
        }

        let forest = IsolationForest::fit(values, self.seed);
        let scores: Vec<f64> = values.iter().map(|v| forest.score(*v)).collect();

        let mut sorted = scores.clone();
        sorted.sort_by(f64::total_cmp);
        let threshold = percentile(&sorted, (1.0 - self.contamination) * 100.0);

        scores
            .iter()
            .enumerate()
            .filter(|(_, score)| **score > threshold)
            .map(|(index, _)| index)
            .collect()
    }
}

fn classify_against(cutoff: &ThresholdPair, value: f64) -> AnomalySeverity {
    if value > cutoff.critical {
        AnomalySeverity::Critical
    } else if value > cutoff.warning {
        AnomalySeverity::High
    } else {
        AnomalySeverity::Medium
    }
}

fn describe(family: MetricFamily, metric_name: &str, value: f64) -> String {
    match family {
        MetricFamily::Cpu | MetricFamily::Memory | MetricFamily::Disk => {
            format!("Unusually high {} utilization: {:.1}%", family.label(), value)
        }
        MetricFamily::Temperature => format!("Unusually high temperature: {:.1}°C", value),
        MetricFamily::Network => format!("Unusual network activity detected: {:.1}", value),
        MetricFamily::Uptime | MetricFamily::Other => {
            format!("Unusual value detected in {}: {:.1}", metric_name, value)
        }
    }
}

/// Severity descending, then timestamp descending.
pub fn rank_anomalies(anomalies: &mut [Anomaly]) {
    anomalies.sort_by(|a, b| {
        b.severity
            .cmp(&a.severity)
            .then_with(|| b.timestamp.cmp(&a.timestamp))
    });
}

// -------------------------------------------------------------------------------------
// Isolation forest
// -------------------------------------------------------------------------------------

enum IsolationNode {
    Leaf { size: usize },
    Split { at: f64, left: Box<IsolationNode>, right: Box<IsolationNode> },
}

struct IsolationForest {
    trees: Vec<IsolationNode>,
    subsample: usize,
}

impl IsolationForest {
    fn fit(values: &[f64], seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let subsample = values.len().min(MAX_SUBSAMPLE);
        let height_limit = (subsample as f64).log2().ceil() as usize;

        let trees = (0..TREE_COUNT)
            .map(|_| {
                let picked: Vec<f64> = rand::seq::index::sample(&mut rng, values.len(), subsample)
                    .into_iter()
                    .map(|i| values[i])
                    .collect();
                build_node(picked, 0, height_limit, &mut rng)
            })
            .collect();

        Self { trees, subsample }
    }

    /// Anomaly score in (0, 1]; higher means easier to isolate.
    fn score(&self, value: f64) -> f64 {
        let normaliser = average_path_length(self.subsample);
        if normaliser == 0.0 {
            return 0.0;
        }

        let mean_depth = self
            .trees
            .iter()
            .map(|tree| path_length(tree, value, 0))
            .sum::<f64>()
            / self.trees.len() as f64;

        2f64.powf(-mean_depth / normaliser)
    }
}

fn build_node(values: Vec<f64>, depth: usize, height_limit: usize, rng: &mut StdRng) -> IsolationNode {
    if values.len() <= 1 || depth >= height_limit {
        return IsolationNode::Leaf { size: values.len() };
    }

    let (min, max) = values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(*v), hi.max(*v)));
    if min >= max {
        return IsolationNode::Leaf { size: values.len() };
    }

    let at = rng.gen_range(min..max);
    let (left, right): (Vec<f64>, Vec<f64>) = values.into_iter().partition(|v| *v < at);

    IsolationNode::Split {
        at,
        left: Box::new(build_node(left, depth + 1, height_limit, rng)),
        right: Box::new(build_node(right, depth + 1, height_limit, rng)),
    }
}

fn path_length(node: &IsolationNode, value: f64, depth: usize) -> f64 {
    match node {
        IsolationNode::Leaf { size } => depth as f64 + average_path_length(*size),
        IsolationNode::Split { at, left, right } => {
            let next = if value < *at { left } else { right };
            path_length(next, value, depth + 1)
        }
    }
}

// Expected path length of an unsuccessful BST search over n points.
fn average_path_length(n: usize) -> f64 {
    match n {
        0 | 1 => 0.0,
        2 => 1.0,
        _ => {
            let n = n as f64;
            2.0 * ((n - 1.0).ln() + EULER_GAMMA) - 2.0 * (n - 1.0) / n
        }
    }
}
