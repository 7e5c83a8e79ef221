#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Location and water availability record types.
//!
//! A [`Location`] is a named area with a coordinate. An
//! [`AvailabilityRecord`] is one dated observation of water conditions for
//! an area. Many records share the same area name, which is the join key
//! between the two.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Valid latitude range in degrees.
pub const LATITUDE_RANGE: std::ops::RangeInclusive<f64> = -90.0..=90.0;

/// Valid longitude range in degrees.
pub const LONGITUDE_RANGE: std::ops::RangeInclusive<f64> = -180.0..=180.0;

/// A WGS84 coordinate pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    /// Latitude, -90 to 90.
    pub latitude: f64,
    /// Longitude, -180 to 180.
    pub longitude: f64,
}

impl Coordinates {
    /// Creates a coordinate pair without validating it.
    #[must_use]
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Whether the latitude is finite and within [-90, 90].
    #[must_use]
    pub fn has_valid_latitude(&self) -> bool {
        LATITUDE_RANGE.contains(&self.latitude)
    }

    /// Whether the longitude is finite and within [-180, 180].
    #[must_use]
    pub fn has_valid_longitude(&self) -> bool {
        LONGITUDE_RANGE.contains(&self.longitude)
    }

    /// Whether both components are in range.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.has_valid_latitude() && self.has_valid_longitude()
    }
}

/// A named place with a known coordinate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    /// Stable row id, assigned in source order starting at 1.
    pub id: i64,
    /// Human-readable place name.
    pub area: String,
    /// Where the place is.
    pub coordinates: Coordinates,
}

impl Location {
    /// Normalized join key for this location's area.
    #[must_use]
    pub fn area_key(&self) -> String {
        area_key(&self.area)
    }
}

/// One dated water availability observation for an area.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityRecord {
    /// Stable row id, assigned in source order starting at 1.
    pub id: i64,
    /// The [`Location`] this record was linked to at import, if any.
    pub location_id: Option<i64>,
    /// Area name exactly as it appeared in the source.
    pub area: String,
    /// Observation date.
    pub date: NaiveDate,
    /// Where the water comes from (e.g. "Borewell", "Lake").
    pub water_source: String,
    /// Water level in meters, kept as source text.
    pub water_level: String,
    /// Measured pH.
    pub water_quality_ph: f64,
    /// Turbidity, kept as source text.
    pub water_quality_turbidity: String,
    /// Availability status (e.g. "Adequate", "Scarce").
    pub water_availability_status: String,
    /// Free-form notes.
    pub additional_notes: Option<String>,
}

/// Normalizes an area name for linking records to locations.
///
/// Trims surrounding whitespace, collapses inner runs of whitespace and
/// lower-cases the result, so `" Lake  View "` and `"lake view"` link to the
/// same place.
#[must_use]
pub fn area_key(area: &str) -> String {
    area.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}
