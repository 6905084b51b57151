//! Anomalous movement tagging

use crate::app::config::AnalysisConfig;
use crate::data::types::ScoredSample;

/// Hops shorter than this (hours) are suspicious when they also cover distance
pub const SHORT_HOP_HOURS: f64 = 0.1;

/// Whether one hop is physically implausible
pub fn is_anomalous(sample: &ScoredSample, max_speed_kmh: f64, min_jump_distance_km: f64) -> bool {
    sample.speed_kmh > max_speed_kmh
        || (sample.distance_km > min_jump_distance_km && sample.elapsed_hours < SHORT_HOP_HOURS)
}

/// Return a copy of `scored` with the anomaly flag set; the first sample is never anomalous
pub fn tag_anomalies(scored: &[ScoredSample], config: &AnalysisConfig) -> Vec<ScoredSample> {
    scored
        .iter()
        .enumerate()
        .map(|(i, sample)| ScoredSample {
            is_anomalous: i > 0
                && is_anomalous(sample, config.max_speed_kmh, config.min_jump_distance_km),
            ..sample.clone()
        })
        .collect()
}

/// Fraction of anomalous samples (0 for empty input)
pub fn anomaly_rate(scored: &[ScoredSample]) -> f64 {
    if scored.is_empty() {
        return 0.0;
    }
    scored.iter().filter(|s| s.is_anomalous).count() as f64 / scored.len() as f64
}
