//! Time Windowing
//!
//! Buckets samples into fixed-width windows on a grid anchored at midnight
//! (UTC) of the earliest sample's day. Only windows holding at least one
//! sample are produced, in ascending order.

use crate::data::types::{ScoredSample, TimeWindow};
use crate::{Error, Result};
use chrono::{DateTime, Duration, Utc};
use std::collections::BTreeSet;

/// Non-empty windows of `window_minutes` covering `samples`
pub fn create_windows(samples: &[ScoredSample], window_minutes: u32) -> Result<Vec<TimeWindow>> {
    if window_minutes == 0 {
        return Err(Error::Config("window_minutes must be > 0".to_string()));
    }
    let Some(earliest) = samples.iter().map(ScoredSample::utc_time).min() else {
        return Ok(Vec::new());
    };

    let origin = day_start(earliest)?;
    let width = Duration::minutes(i64::from(window_minutes));
    let width_secs = width.num_seconds();

    let bins: BTreeSet<i64> = samples
        .iter()
        .map(|s| (s.utc_time() - origin).num_seconds().div_euclid(width_secs))
        .collect();

    bins.into_iter()
        .map(|bin| {
            let start = origin
                .checked_add_signed(Duration::seconds(bin * width_secs))
                .ok_or_else(|| Error::Analysis(format!("window {} out of range", bin)))?;
            let end = start
                .checked_add_signed(width)
                .ok_or_else(|| Error::Analysis(format!("window {} out of range", bin)))?;
            Ok(TimeWindow::new(start, end))
        })
        .collect()
}

fn day_start(t: DateTime<Utc>) -> Result<DateTime<Utc>> {
    t.date_naive()
        .and_hms_opt(0, 0, 0)
        .map(|naive| naive.and_utc())
        .ok_or_else(|| Error::Analysis(format!("cannot align {} to day start", t)))
}
