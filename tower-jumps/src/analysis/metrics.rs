//! Distance & Speed Derivation
//!
//! Orders located samples by UTC time and annotates each with the distance,
//! elapsed time and implied speed relative to its predecessor. The first
//! sample always carries zeros.

use crate::data::types::{LocationSample, ScoredSample};
use crate::geo::{pairwise_distances_km, speed_kmh, Coordinate};
use crate::{Error, Result};

/// Keep only samples with usable coordinates
pub fn filter_located(samples: &[LocationSample]) -> Vec<LocationSample> {
    samples.iter().filter(|s| s.has_location()).cloned().collect()
}

/// Derive movement metrics for a sequence of located samples.
///
/// The input is left untouched; the output is sorted ascending by UTC
/// timestamp (stable for equal timestamps). Every sample must have a
/// location.
pub fn score_samples(samples: &[LocationSample]) -> Result<Vec<ScoredSample>> {
    let mut ordered: Vec<&LocationSample> = samples.iter().collect();
    ordered.sort_by_key(|s| s.utc_time);

    let coordinates = ordered
        .iter()
        .map(|s| {
            s.coordinate().ok_or_else(|| {
                Error::Analysis(format!("sample at {} has no usable location", s.utc_time))
            })
        })
        .collect::<Result<Vec<Coordinate>>>()?;

    let mut distances = vec![0.0; ordered.len()];
    if ordered.len() > 1 {
        let hops = pairwise_distances_km(&coordinates[..coordinates.len() - 1], &coordinates[1..])?;
        distances[1..].copy_from_slice(&hops);
    }

    let scored = ordered
        .iter()
        .enumerate()
        .map(|(i, sample)| {
            let elapsed_hours = if i == 0 {
                0.0
            } else {
                elapsed_hours(ordered[i - 1], sample)
            };
            ScoredSample {
                sample: (*sample).clone(),
                distance_km: distances[i],
                elapsed_hours,
                speed_kmh: speed_kmh(distances[i], elapsed_hours),
                is_anomalous: false,
            }
        })
        .collect();

    Ok(scored)
}

fn elapsed_hours(prev: &LocationSample, next: &LocationSample) -> f64 {
    (next.utc_time - prev.utc_time).num_milliseconds() as f64 / 3_600_000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, TimeZone, Utc};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap()
    }

    fn sample(minutes: i64, lat: f64, lon: f64) -> LocationSample {
        LocationSample::new(t0() + Duration::minutes(minutes)).with_location(lat, lon)
    }

    #[test]
    fn test_empty_input() {
        assert!(score_samples(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_first_sample_is_zero() {
        let scored = score_samples(&[sample(0, 40.0, -74.0)]).unwrap();
        assert_eq!(scored.len(), 1);
        assert_eq!(scored[0].distance_km, 0.0);
        assert_eq!(scored[0].elapsed_hours, 0.0);
        assert_eq!(scored[0].speed_kmh, 0.0);
    }

    #[test]
    fn test_sorts_before_deriving() {
        let input = vec![sample(60, 34.0522, -118.2437), sample(0, 40.7128, -74.0060)];
        let scored = score_samples(&input).unwrap();

        assert_eq!(scored[0].utc_time(), t0());
        assert_eq!(scored[0].speed_kmh, 0.0);
        assert!((scored[1].elapsed_hours - 1.0).abs() < 1e-12);
        assert!(scored[1].speed_kmh > 1000.0);

        // Input order is preserved
        assert_eq!(input[0].utc_time, t0() + Duration::minutes(60));
    }

    #[test]
    fn test_identical_timestamps_give_zero_speed() {
        let scored = score_samples(&[sample(0, 40.0, -74.0), sample(0, 41.0, -74.0)]).unwrap();
        assert!(scored[1].distance_km > 100.0);
        assert_eq!(scored[1].elapsed_hours, 0.0);
        assert_eq!(scored[1].speed_kmh, 0.0);
    }

    #[test]
    fn test_unlocated_sample_is_an_error() {
        let input = vec![sample(0, 40.0, -74.0), LocationSample::new(t0())];
        assert!(matches!(score_samples(&input), Err(Error::Analysis(_))));
    }

    #[test]
    fn test_filter_located() {
        let input = vec![
            sample(0, 40.0, -74.0),
            LocationSample::new(t0()),
            sample(5, 0.0, -74.0),
        ];
        let located = filter_located(&input);
        assert_eq!(located.len(), 1);
    }
}
