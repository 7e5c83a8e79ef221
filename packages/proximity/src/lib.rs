#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Nearest-location lookup.
//!
//! Scans every stored location, measures the geodesic distance to the query
//! point and keeps the closest one strictly inside [`SEARCH_RADIUS_KM`]. The
//! dataset is small, so there is no spatial index; a linear scan in id order
//! also makes ties deterministic (the first location seen wins).

pub mod distance;

use std::fmt;

use duckdb::Connection;
use water_map_availability_models::{AvailabilityRecord, Coordinates, Location};
use water_map_database::{DbError, queries};

pub use distance::{geodesic_distance_km, round_distance_km};

/// Locations this far away or farther never match.
pub const SEARCH_RADIUS_KM: f64 = 10.0;

/// Errors from the store while resolving a query.
#[derive(Debug, thiserror::Error)]
pub enum ProximityError {
    /// Reading locations or records failed.
    #[error("Database error: {0}")]
    Database(#[from] DbError),
}

/// Why a lookup produced no match. None of these are failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotFoundReason {
    /// Latitude outside [-90, 90] or not a number.
    LatitudeOutOfRange,
    /// Longitude outside [-180, 180] or not a number.
    LongitudeOutOfRange,
    /// No location lies within [`SEARCH_RADIUS_KM`].
    NoLocationWithinRadius,
}

impl fmt::Display for NotFoundReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::LatitudeOutOfRange => "latitude out of range",
            Self::LongitudeOutOfRange => "longitude out of range",
            Self::NoLocationWithinRadius => "no location within radius",
        })
    }
}

/// The winning location with its records.
#[derive(Debug, Clone, PartialEq)]
pub struct NearestMatch {
    /// Closest location within the radius.
    pub location: Location,
    /// Distance from the query point, rounded to 3 decimals.
    pub distance_km: f64,
    /// Records for the location, in insertion order.
    pub records: Vec<AvailabilityRecord>,
}

/// Result of [`find_nearest`].
#[derive(Debug, Clone, PartialEq)]
pub enum Proximity {
    /// A location was found.
    Found(NearestMatch),
    /// Nothing matched; the reason is user-facing.
    NotFound(NotFoundReason),
}

/// Checks a query point before scanning. Latitude is checked first.
///
/// # Errors
///
/// Returns the [`NotFoundReason`] for the first out-of-range component.
pub fn validate_query(query: Coordinates) -> Result<(), NotFoundReason> {
    if !query.has_valid_latitude() {
        return Err(NotFoundReason::LatitudeOutOfRange);
    }
    if !query.has_valid_longitude() {
        return Err(NotFoundReason::LongitudeOutOfRange);
    }
    Ok(())
}

/// Returns the closest location strictly within `radius_km` of `query`,
/// with its unrounded distance.
///
/// A later location only replaces the current best if it is strictly
/// closer, so the earliest of several equidistant locations wins.
#[must_use]
pub fn nearest_within(
    query: Coordinates,
    locations: &[Location],
    radius_km: f64,
) -> Option<(&Location, f64)> {
    let mut best: Option<(&Location, f64)> = None;

    for location in locations {
        let distance = geodesic_distance_km(query, location.coordinates);
        if distance >= radius_km {
            continue;
        }
        match best {
            Some((_, best_distance)) if distance >= best_distance => {}
            _ => best = Some((location, distance)),
        }
    }

    best
}

/// Finds the nearest stored location to (`lat`, `lon`) within
/// [`SEARCH_RADIUS_KM`] and loads its records.
///
/// Out-of-range input returns [`Proximity::NotFound`] without touching the
/// store.
///
/// # Errors
///
/// Returns [`ProximityError`] if reading the store fails.
pub fn find_nearest(conn: &Connection, lat: f64, lon: f64) -> Result<Proximity, ProximityError> {
    let query = Coordinates::new(lat, lon);
    if let Err(reason) = validate_query(query) {
        log::debug!("Rejected nearest lookup ({lat}, {lon}): {reason}");
        return Ok(Proximity::NotFound(reason));
    }

    let locations = queries::all_locations(conn)?;
    log::debug!("Scanning {} locations around ({lat}, {lon})", locations.len());

    let Some((location, distance)) = nearest_within(query, &locations, SEARCH_RADIUS_KM) else {
        return Ok(Proximity::NotFound(NotFoundReason::NoLocationWithinRadius));
    };

    let records = queries::records_for_location(conn, location)?;

    Ok(Proximity::Found(NearestMatch {
        location: location.clone(),
        distance_km: round_distance_km(distance),
        records,
    }))
}
