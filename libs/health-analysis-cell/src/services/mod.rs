pub mod aggregator;
pub mod analyzer;
pub mod anomaly;
pub mod prediction;
pub mod recommendations;
pub mod scoring;
