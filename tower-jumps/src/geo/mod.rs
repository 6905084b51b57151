//! Geodesic helpers
//!
//! Pure numeric functions over latitude/longitude pairs. Inputs are not
//! range-checked; this is a plausibility heuristic, not a navigation system.

pub mod haversine;

pub use haversine::{distance_km, pairwise_distances_km, speed_kmh, Coordinate, EARTH_RADIUS_KM};
