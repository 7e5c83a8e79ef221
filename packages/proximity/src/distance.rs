//! Surface distance between two coordinates.

use geo::{Distance, Geodesic, Point};
use water_map_availability_models::Coordinates;

/// Geodesic distance on the WGS84 ellipsoid, in kilometers.
#[must_use]
pub fn geodesic_distance_km(from: Coordinates, to: Coordinates) -> f64 {
    let a = Point::new(from.longitude, from.latitude);
    let b = Point::new(to.longitude, to.latitude);
    Geodesic.distance(a, b) / 1_000.0
}

/// Rounds a distance to 3 decimal places (meter precision) for display.
#[must_use]
pub fn round_distance_km(km: f64) -> f64 {
    (km * 1_000.0).round() / 1_000.0
}
