//! Interval report output
//!
//! One row per classified interval, formatted for spreadsheets: yes/no jump
//! flags, a percent-suffixed confidence and pipe-joined region lists.

use super::types::ClassifiedInterval;
use crate::Result;
use serde::Serialize;
use std::io::Write;
use std::path::Path;
use tracing::info;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Report column order
pub const REPORT_COLUMNS: [&str; 9] = [
    "start_time",
    "end_time",
    "estimated_state",
    "is_tower_jump",
    "confidence_percentage",
    "record_count",
    "states_observed",
    "max_distance_km",
    "max_speed_kmh",
];

/// A report row as written to disk
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportRow {
    pub start_time: String,
    pub end_time: String,
    pub estimated_state: String,
    pub is_tower_jump: String,
    pub confidence_percentage: String,
    pub record_count: usize,
    pub states_observed: String,
    pub max_distance_km: String,
    pub max_speed_kmh: String,
}

impl From<&ClassifiedInterval> for ReportRow {
    fn from(interval: &ClassifiedInterval) -> Self {
        let two_decimals = |v: Option<f64>| v.map(|v| format!("{:.2}", v)).unwrap_or_default();

        Self {
            start_time: interval.start_time.format(TIMESTAMP_FORMAT).to_string(),
            end_time: interval.end_time.format(TIMESTAMP_FORMAT).to_string(),
            estimated_state: interval.estimated_region.clone(),
            is_tower_jump: if interval.is_tower_jump { "yes" } else { "no" }.to_string(),
            confidence_percentage: format!("{:.1}%", interval.confidence * 100.0),
            record_count: interval.sample_count,
            states_observed: interval
                .regions_observed
                .iter()
                .map(String::as_str)
                .collect::<Vec<_>>()
                .join("|"),
            max_distance_km: two_decimals(interval.max_distance_km),
            max_speed_kmh: two_decimals(interval.max_speed_kmh),
        }
    }
}

/// Write the report to any sink; the header is written even with no rows
pub fn write_rows<W: Write>(intervals: &[ClassifiedInterval], sink: W) -> Result<()> {
    let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(sink);
    writer.write_record(REPORT_COLUMNS)?;
    for interval in intervals {
        writer.serialize(ReportRow::from(interval))?;
    }
    writer.flush()?;
    Ok(())
}

/// Write the report to `path`, creating parent directories
pub fn write_report(intervals: &[ClassifiedInterval], path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let file = std::fs::File::create(path)?;
    write_rows(intervals, file)?;

    info!(output = %path.display(), intervals = intervals.len(), "Report written");
    Ok(())
}
