//! Window Classification
//!
//! Per time window: the most likely region, whether the window shows a
//! tower-jump pattern, and a heuristic confidence score.
//!
//! # Jump Pattern
//!
//! A window is only considered when it holds at least two samples and more
//! than one distinct region. It is then flagged if any of these holds:
//!
//! 1. some sample exceeds the speed limit
//! 2. some sample is tagged anomalous
//! 3. the region changes more than [`MAX_REGION_CHANGES`] times
//!
//! # Confidence
//!
//! A weighted sum of region consistency, sample density (saturating at
//! [`FULL_DENSITY_SAMPLES`]) and an anomaly penalty, clamped to [0, 1]. It
//! is a linear scoring rule, not a calibrated probability.

use crate::app::config::AnalysisConfig;
use crate::data::types::{ClassifiedInterval, ScoredSample, TimeWindow, UNKNOWN_REGION};
use std::collections::BTreeSet;
use tracing::debug;

/// Region changes tolerated within one window
pub const MAX_REGION_CHANGES: usize = 2;

/// Sample count at which the density factor saturates
pub const FULL_DENSITY_SAMPLES: f64 = 10.0;

/// Samples with `window.start <= t < window.end`; `sorted` must be ordered by UTC time
pub fn select_window_samples<'a>(sorted: &'a [ScoredSample], window: &TimeWindow) -> &'a [ScoredSample] {
    let lo = sorted.partition_point(|s| s.utc_time() < window.start);
    let hi = sorted.partition_point(|s| s.utc_time() < window.end);
    &sorted[lo..hi.max(lo)]
}

/// Most frequent non-empty region.
///
/// Ties go to the region encountered first.
pub fn estimate_region(samples: &[ScoredSample]) -> Option<&str> {
    let mut counts: Vec<(&str, usize)> = Vec::new();
    for region in samples.iter().filter_map(ScoredSample::region) {
        match counts.iter_mut().find(|(r, _)| *r == region) {
            Some((_, n)) => *n += 1,
            None => counts.push((region, 1)),
        }
    }

    let mut best: Option<(&str, usize)> = None;
    for (region, n) in counts {
        if best.map_or(true, |(_, top)| n > top) {
            best = Some((region, n));
        }
    }
    best.map(|(region, _)| region)
}

/// Changes between consecutive non-empty regions
pub fn count_region_changes(samples: &[ScoredSample]) -> usize {
    let regions: Vec<&str> = samples.iter().filter_map(ScoredSample::region).collect();
    regions.windows(2).filter(|pair| pair[0] != pair[1]).count()
}

/// Distinct non-empty regions
pub fn observed_regions(samples: &[ScoredSample]) -> BTreeSet<String> {
    samples
        .iter()
        .filter_map(ScoredSample::region)
        .map(str::to_string)
        .collect()
}

/// Whether the window shows a tower-jump pattern
pub fn detect_tower_jump(samples: &[ScoredSample], config: &AnalysisConfig) -> bool {
    if samples.len() < 2 {
        return false;
    }

    let distinct: BTreeSet<&str> = samples.iter().filter_map(ScoredSample::region).collect();
    if distinct.len() <= 1 {
        return false;
    }

    if samples.iter().any(|s| s.speed_kmh > config.max_speed_kmh) {
        debug!(speed_threshold = config.max_speed_kmh, "Tower jump detected: high speed violations");
        return true;
    }

    let anomalous = samples.iter().filter(|s| s.is_anomalous).count();
    if anomalous > 0 {
        debug!(anomalous_count = anomalous, "Tower jump detected: anomalous movements");
        return true;
    }

    let changes = count_region_changes(samples);
    if changes > MAX_REGION_CHANGES {
        debug!(region_changes = changes, "Tower jump detected: rapid region changes");
        return true;
    }

    false
}

/// Heuristic confidence in `estimated` for this window, in [0, 1]
pub fn calculate_confidence(samples: &[ScoredSample], estimated: &str, config: &AnalysisConfig) -> f64 {
    let with_region: Vec<&str> = samples.iter().filter_map(ScoredSample::region).collect();
    if with_region.is_empty() {
        return 0.0;
    }

    let matching = with_region.iter().filter(|r| **r == estimated).count();
    let consistency = matching as f64 / with_region.len() as f64;

    let total = samples.len() as f64;
    let density = (total / FULL_DENSITY_SAMPLES).min(1.0);

    let anomalous = samples.iter().filter(|s| s.is_anomalous).count() as f64;
    let anomaly_penalty = (1.0 - anomalous / total).max(0.0);

    let confidence = config.consistency_weight * consistency
        + config.sample_count_weight * density
        + config.anomaly_weight * anomaly_penalty;

    confidence.clamp(0.0, 1.0)
}

/// Classify one window over the samples it contains
pub fn classify_window(window: &TimeWindow, samples: &[ScoredSample], config: &AnalysisConfig) -> ClassifiedInterval {
    if samples.is_empty() {
        return ClassifiedInterval::empty(window);
    }

    let estimated = estimate_region(samples).unwrap_or(UNKNOWN_REGION).to_string();
    let is_tower_jump = detect_tower_jump(samples, config);
    let confidence = calculate_confidence(samples, &estimated, config);

    let max_distance_km = samples.iter().map(|s| s.distance_km).reduce(f64::max);
    let max_speed_kmh = samples.iter().map(|s| s.speed_kmh).reduce(f64::max);

    debug!(
        start_time = %window.start,
        samples = samples.len(),
        estimated_region = %estimated,
        is_tower_jump,
        confidence,
        "Window classified"
    );

    ClassifiedInterval {
        start_time: window.start,
        end_time: window.end,
        estimated_region: estimated,
        is_tower_jump,
        confidence,
        sample_count: samples.len(),
        regions_observed: observed_regions(samples),
        max_distance_km,
        max_speed_kmh,
    }
}
