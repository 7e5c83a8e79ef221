#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Search dispatch for the presentation layer.
//!
//! A search carries the area picked from the selection list and an optional
//! free-text `"lat, lon"`. Non-empty text means a nearest-location lookup;
//! otherwise the selected area is looked up by exact name.

use duckdb::Connection;
use water_map_availability_models::{AvailabilityRecord, Coordinates};
use water_map_database::{DbError, queries};
use water_map_proximity::{NearestMatch, NotFoundReason, Proximity, ProximityError};

/// A raw search as submitted by a user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchRequest {
    /// Area name selected from the list.
    pub area: String,
    /// Free-text coordinate input; blank means "use `area`".
    pub coordinates: String,
}

/// User input that cannot be searched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// Coordinate text was not two comma-separated numbers.
    #[error("invalid input format")]
    InvalidInputFormat,
}

/// Errors from the store while serving a search.
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    /// Area lookup failed.
    #[error("Database error: {0}")]
    Database(#[from] DbError),

    /// Nearest-location lookup failed.
    #[error("Proximity error: {0}")]
    Proximity(#[from] ProximityError),
}

/// Result of [`dispatch`].
#[derive(Debug, Clone, PartialEq)]
pub enum SearchOutcome {
    /// Records for the selected area (possibly none).
    AreaRecords {
        /// The area that was looked up.
        area: String,
        /// Matching records in insertion order.
        records: Vec<AvailabilityRecord>,
    },
    /// A location was found near the given coordinates.
    Nearest(NearestMatch),
    /// Coordinates were valid-looking but nothing matched.
    NotFound(NotFoundReason),
    /// Coordinate text was rejected before any lookup.
    Invalid(ValidationError),
}

impl SearchOutcome {
    /// Message to show the user for outcomes that carry no results.
    #[must_use]
    pub fn message(&self) -> Option<String> {
        match self {
            Self::NotFound(reason) => Some(reason.to_string()),
            Self::Invalid(error) => Some(error.to_string()),
            Self::AreaRecords { .. } | Self::Nearest(_) => None,
        }
    }
}

/// Parses `"lat, lon"` text: exactly two comma-separated numbers, each
/// trimmed.
///
/// Range checks are left to the proximity lookup.
///
/// # Errors
///
/// Returns [`ValidationError::InvalidInputFormat`] for anything else.
pub fn parse_coordinate_text(text: &str) -> Result<Coordinates, ValidationError> {
    let mut parts = text.split(',');
    let (Some(lat), Some(lon), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err(ValidationError::InvalidInputFormat);
    };

    let latitude = lat
        .trim()
        .parse::<f64>()
        .map_err(|_| ValidationError::InvalidInputFormat)?;
    let longitude = lon
        .trim()
        .parse::<f64>()
        .map_err(|_| ValidationError::InvalidInputFormat)?;

    Ok(Coordinates::new(latitude, longitude))
}

/// Routes a search to the right lookup.
///
/// # Errors
///
/// Returns [`SearchError`] only if the store fails; bad input and empty
/// results come back as [`SearchOutcome`] variants.
pub fn dispatch(conn: &Connection, request: &SearchRequest) -> Result<SearchOutcome, SearchError> {
    let text = request.coordinates.trim();

    if text.is_empty() {
        let records = queries::records_for_area(conn, &request.area)?;
        log::debug!("Area search {:?}: {} record(s)", request.area, records.len());
        return Ok(SearchOutcome::AreaRecords {
            area: request.area.clone(),
            records,
        });
    }

    let query = match parse_coordinate_text(text) {
        Ok(query) => query,
        Err(error) => {
            log::debug!("Rejected coordinate text {text:?}: {error}");
            return Ok(SearchOutcome::Invalid(error));
        }
    };

    Ok(
        match water_map_proximity::find_nearest(conn, query.latitude, query.longitude)? {
            Proximity::Found(found) => SearchOutcome::Nearest(found),
            Proximity::NotFound(reason) => SearchOutcome::NotFound(reason),
        },
    )
}
