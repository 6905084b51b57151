//! Core types for location analysis
//!
//! Defines the records flowing through the pipeline: raw carrier samples,
//! samples scored with movement metrics, time windows, and classified
//! output intervals.

use crate::geo::Coordinate;
use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Sentinel region for windows without a usable estimate
pub const UNKNOWN_REGION: &str = "Unknown";

/// Sentinel cell technology when the carrier export omits it
pub const UNKNOWN_CELL_TYPE: &str = "Unknown";

/// A single location observation from a carrier export
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationSample {
    /// Source page (provenance only)
    pub page: i64,
    /// Source item within the page (provenance only)
    pub item: i64,
    /// Observation time (UTC)
    pub utc_time: DateTime<Utc>,
    /// Observation time in the subscriber's local zone
    pub local_time: NaiveDateTime,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub timezone: Option<String>,
    pub city: Option<String>,
    pub county: Option<String>,
    /// Administrative region (US state in carrier exports)
    pub region: Option<String>,
    pub country: Option<String>,
    /// Cell technology tag (LTE, 5G, ...)
    pub cell_type: String,
}

impl LocationSample {
    /// Create a sample with only a timestamp; local time mirrors UTC
    pub fn new(utc_time: DateTime<Utc>) -> Self {
        Self {
            page: 0,
            item: 0,
            utc_time,
            local_time: utc_time.naive_utc(),
            latitude: None,
            longitude: None,
            timezone: None,
            city: None,
            county: None,
            region: None,
            country: None,
            cell_type: UNKNOWN_CELL_TYPE.to_string(),
        }
    }

    pub fn with_location(mut self, latitude: f64, longitude: f64) -> Self {
        self.latitude = Some(latitude);
        self.longitude = Some(longitude);
        self
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    /// Both coordinates present, finite and non-zero
    pub fn has_location(&self) -> bool {
        matches!(
            (self.latitude, self.longitude),
            (Some(lat), Some(lon)) if lat.is_finite() && lon.is_finite() && lat != 0.0 && lon != 0.0
        )
    }

    /// Coordinate pair, if this sample has a usable location
    pub fn coordinate(&self) -> Option<Coordinate> {
        if self.has_location() {
            Some(Coordinate::new(self.latitude?, self.longitude?))
        } else {
            None
        }
    }

    /// Region name, treating empty strings as absent
    pub fn region(&self) -> Option<&str> {
        self.region.as_deref().filter(|r| !r.trim().is_empty())
    }
}

/// A located sample extended with movement metrics relative to its predecessor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredSample {
    pub sample: LocationSample,
    /// Distance from the preceding sample (km, 0 for the first)
    pub distance_km: f64,
    /// Time since the preceding sample (hours)
    pub elapsed_hours: f64,
    /// Implied speed (km/h, 0 when no time elapsed)
    pub speed_kmh: f64,
    /// Flagged as physically implausible movement
    pub is_anomalous: bool,
}

impl ScoredSample {
    pub fn utc_time(&self) -> DateTime<Utc> {
        self.sample.utc_time
    }

    pub fn region(&self) -> Option<&str> {
        self.sample.region()
    }
}

/// Half-open time interval `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, t: DateTime<Utc>) -> bool {
        self.start <= t && t < self.end
    }

    pub fn width(&self) -> Duration {
        self.end - self.start
    }
}

/// One classified time window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedInterval {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    /// Most likely region, or [`UNKNOWN_REGION`]
    #[serde(rename = "estimated_state")]
    pub estimated_region: String,
    pub is_tower_jump: bool,
    /// Heuristic score in [0, 1]
    pub confidence: f64,
    #[serde(rename = "record_count")]
    pub sample_count: usize,
    /// Distinct non-empty regions seen in the window
    #[serde(rename = "states_observed")]
    pub regions_observed: BTreeSet<String>,
    pub max_distance_km: Option<f64>,
    pub max_speed_kmh: Option<f64>,
}

impl ClassifiedInterval {
    /// Interval for a window with no samples
    pub fn empty(window: &TimeWindow) -> Self {
        Self {
            start_time: window.start,
            end_time: window.end,
            estimated_region: UNKNOWN_REGION.to_string(),
            is_tower_jump: false,
            confidence: 0.0,
            sample_count: 0,
            regions_observed: BTreeSet::new(),
            max_distance_km: None,
            max_speed_kmh: None,
        }
    }

    pub fn window(&self) -> TimeWindow {
        TimeWindow::new(self.start_time, self.end_time)
    }

    /// Confidence scaled to percent, one decimal
    pub fn confidence_percentage(&self) -> f64 {
        round1(self.confidence * 100.0)
    }

    pub fn has_known_region(&self) -> bool {
        self.estimated_region != UNKNOWN_REGION
    }
}

/// Round to one decimal place
pub(crate) fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
