//! Dataset statistics for display before analysis

use super::types::LocationSample;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeSet;
use tracing::{debug, info, warn};

/// Basic counts over a loaded dataset
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DatasetStats {
    pub total_records: usize,
    pub records_with_location: usize,
    pub records_without_location: usize,
    pub unique_regions: BTreeSet<String>,
    /// Earliest and latest UTC timestamps
    pub date_range: Option<(DateTime<Utc>, DateTime<Utc>)>,
    pub cell_types: BTreeSet<String>,
}

impl DatasetStats {
    /// Share of records carrying usable coordinates (percent)
    pub fn location_coverage(&self) -> f64 {
        if self.total_records == 0 {
            0.0
        } else {
            self.records_with_location as f64 / self.total_records as f64 * 100.0
        }
    }
}

/// Collect statistics over `samples`
pub fn validate_data(samples: &[LocationSample]) -> DatasetStats {
    let mut stats = DatasetStats {
        total_records: samples.len(),
        ..Default::default()
    };

    if samples.is_empty() {
        warn!("No records provided for validation");
        return stats;
    }

    for (i, sample) in samples.iter().enumerate() {
        if (i + 1) % 5000 == 0 {
            debug!(processed_records = i + 1, total_records = samples.len(), "Validation progress");
        }

        if sample.has_location() {
            stats.records_with_location += 1;
        } else {
            stats.records_without_location += 1;
        }

        if let Some(region) = sample.region() {
            stats.unique_regions.insert(region.to_string());
        }
        stats.cell_types.insert(sample.cell_type.clone());
    }

    let earliest = samples.iter().map(|s| s.utc_time).min();
    let latest = samples.iter().map(|s| s.utc_time).max();
    stats.date_range = earliest.zip(latest);

    info!(
        total_records = stats.total_records,
        records_with_location = stats.records_with_location,
        records_without_location = stats.records_without_location,
        unique_regions = stats.unique_regions.len(),
        unique_cell_types = stats.cell_types.len(),
        "Data validation completed"
    );

    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, h, 0, 0).unwrap()
    }

    #[test]
    fn test_empty_dataset() {
        let stats = validate_data(&[]);
        assert_eq!(stats.total_records, 0);
        assert!(stats.date_range.is_none());
        assert_eq!(stats.location_coverage(), 0.0);
    }

    #[test]
    fn test_counts_and_ranges() {
        let mut lte = LocationSample::new(at(3)).with_location(40.0, -74.0).with_region("NY");
        lte.cell_type = "LTE".to_string();
        let samples = vec![
            lte,
            LocationSample::new(at(1)).with_region("NJ"),
            LocationSample::new(at(5)).with_location(34.0, -118.0).with_region("CA"),
        ];

        let stats = validate_data(&samples);
        assert_eq!(stats.total_records, 3);
        assert_eq!(stats.records_with_location, 2);
        assert_eq!(stats.records_without_location, 1);
        assert_eq!(stats.unique_regions.len(), 3);
        assert_eq!(stats.date_range, Some((at(1), at(5))));
        assert!(stats.cell_types.contains("LTE"));
        assert!(stats.cell_types.contains("Unknown"));
        assert!((stats.location_coverage() - 66.666).abs() < 0.01);
    }
}
