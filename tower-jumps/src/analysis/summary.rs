//! Run summary across classified intervals

use crate::data::types::{ClassifiedInterval, UNKNOWN_REGION};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Aggregate statistics for a completed run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisSummary {
    pub total_intervals: usize,
    pub tower_jump_intervals: usize,
    /// Share of intervals flagged as jumps (percent)
    pub tower_jump_percentage: f64,
    /// Most frequent known region estimate, or "Unknown"
    #[serde(rename = "most_common_state")]
    pub most_common_region: String,
    /// Mean confidence over all intervals
    pub average_confidence: f64,
    /// Known region estimates in first-seen order
    #[serde(rename = "states_observed")]
    pub regions_observed: Vec<String>,
}

/// Summarize `intervals`; `None` for empty input
pub fn generate_summary(intervals: &[ClassifiedInterval]) -> Option<AnalysisSummary> {
    if intervals.is_empty() {
        warn!("No intervals provided for summary generation");
        return None;
    }

    let total = intervals.len();
    let jumps = intervals.iter().filter(|i| i.is_tower_jump).count();

    let mut frequency: Vec<(&str, usize)> = Vec::new();
    for interval in intervals.iter().filter(|i| i.has_known_region()) {
        let region = interval.estimated_region.as_str();
        match frequency.iter_mut().find(|(r, _)| *r == region) {
            Some((_, n)) => *n += 1,
            None => frequency.push((region, 1)),
        }
    }

    let most_common_region = frequency
        .iter()
        .fold(None, |best: Option<(&str, usize)>, &(region, n)| match best {
            Some((_, top)) if top >= n => best,
            _ => Some((region, n)),
        })
        .map_or(UNKNOWN_REGION, |(region, _)| region)
        .to_string();

    let average_confidence = intervals.iter().map(|i| i.confidence).sum::<f64>() / total as f64;

    let summary = AnalysisSummary {
        total_intervals: total,
        tower_jump_intervals: jumps,
        tower_jump_percentage: jump_percentage(jumps, total),
        most_common_region,
        average_confidence,
        regions_observed: frequency.iter().map(|(r, _)| r.to_string()).collect(),
    };

    info!(
        total_intervals = summary.total_intervals,
        tower_jump_intervals = summary.tower_jump_intervals,
        most_common_region = %summary.most_common_region,
        unique_regions = summary.regions_observed.len(),
        "Analysis summary generated"
    );

    Some(summary)
}

/// `jumps / total` as a percentage (0 when `total` is 0)
pub fn jump_percentage(jumps: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        jumps as f64 / total as f64 * 100.0
    }
}
