//! Haversine Distance
//!
//! Great-circle distance between coordinate pairs on a spherical Earth, and
//! the travel speed implied by two timed fixes.

/// Mean Earth radius used for all distances (kilometers)
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// A latitude/longitude pair in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }
}

/// Great-circle distance between two points in kilometers
pub fn distance_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let lat1_rad = lat1.to_radians();
    let lat2_rad = lat2.to_radians();
    let dlat = lat2_rad - lat1_rad;
    let dlon = (lon2 - lon1).to_radians();

    let a = (dlat / 2.0).sin().powi(2) + lat1_rad.cos() * lat2_rad.cos() * (dlon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().asin();

    EARTH_RADIUS_KM * c
}

/// Element-wise distances between two equal-length coordinate sequences.
///
/// Returns an error if the sequences differ in length.
pub fn pairwise_distances_km(from: &[Coordinate], to: &[Coordinate]) -> crate::Result<Vec<f64>> {
    if from.len() != to.len() {
        return Err(crate::Error::Analysis(format!(
            "coordinate sequences differ in length: {} vs {}",
            from.len(),
            to.len()
        )));
    }

    Ok(from
        .iter()
        .zip(to)
        .map(|(a, b)| distance_km(a.latitude, a.longitude, b.latitude, b.longitude))
        .collect())
}

/// Implied speed in km/h; zero when no time has elapsed
pub fn speed_kmh(distance_km: f64, elapsed_hours: f64) -> f64 {
    if elapsed_hours > 0.0 {
        distance_km / elapsed_hours
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NEW_YORK: (f64, f64) = (40.7128, -74.0060);
    const LOS_ANGELES: (f64, f64) = (34.0522, -118.2437);

    #[test]
    fn test_same_point_is_zero() {
        let d = distance_km(NEW_YORK.0, NEW_YORK.1, NEW_YORK.0, NEW_YORK.1);
        assert_eq!(d, 0.0);
    }

    #[test]
    fn test_new_york_to_los_angeles() {
        let d = distance_km(NEW_YORK.0, NEW_YORK.1, LOS_ANGELES.0, LOS_ANGELES.1);
        // ~3936 km great-circle
        assert!((d - 3936.0).abs() < 10.0, "got {}", d);
    }

    #[test]
    fn test_distance_is_symmetric() {
        let a = distance_km(NEW_YORK.0, NEW_YORK.1, LOS_ANGELES.0, LOS_ANGELES.1);
        let b = distance_km(LOS_ANGELES.0, LOS_ANGELES.1, NEW_YORK.0, NEW_YORK.1);
        assert!((a - b).abs() < 1e-9);
    }

    #[test]
    fn test_one_degree_of_latitude() {
        let d = distance_km(0.0, 0.0, 1.0, 0.0);
        assert!((d - 111.19).abs() < 0.01, "got {}", d);
    }

    #[test]
    fn test_pairwise_distances() {
        let from = vec![Coordinate::new(NEW_YORK.0, NEW_YORK.1), Coordinate::new(0.0, 0.0)];
        let to = vec![Coordinate::new(LOS_ANGELES.0, LOS_ANGELES.1), Coordinate::new(0.0, 0.0)];

        let distances = pairwise_distances_km(&from, &to).unwrap();
        assert_eq!(distances.len(), 2);
        assert!(distances[0] > 3900.0);
        assert_eq!(distances[1], 0.0);
    }

    #[test]
    fn test_pairwise_length_mismatch() {
        let from = vec![Coordinate::new(1.0, 1.0)];
        let result = pairwise_distances_km(&from, &[]);
        assert!(result.is_err());
    }

    #[test]
    fn test_speed_zero_elapsed() {
        assert_eq!(speed_kmh(10.0, 0.0), 0.0);
        assert_eq!(speed_kmh(10.0, -1.0), 0.0);
    }

    #[test]
    fn test_speed() {
        assert!((speed_kmh(120.0, 2.0) - 60.0).abs() < 1e-12);
    }
}
