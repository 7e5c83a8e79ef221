#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! API request and response types for the water map server.
//!
//! These types are serialized to JSON for the REST API. They are separate
//! from the stored row types so the API contract can evolve on its own.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use water_map_availability_models::AvailabilityRecord;

/// An availability record as returned by the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiRecord {
    /// Area name as imported.
    pub area: String,
    /// Observation date (ISO 8601).
    pub date: NaiveDate,
    /// Water source.
    pub water_source: String,
    /// Water level in meters, as source text.
    pub water_level: String,
    /// pH.
    pub water_quality_ph: f64,
    /// Turbidity, as source text.
    pub water_quality_turbidity: String,
    /// Availability status.
    pub water_availability_status: String,
    /// Free-form notes.
    pub additional_notes: Option<String>,
}

impl From<AvailabilityRecord> for ApiRecord {
    fn from(record: AvailabilityRecord) -> Self {
        Self {
            area: record.area,
            date: record.date,
            water_source: record.water_source,
            water_level: record.water_level,
            water_quality_ph: record.water_quality_ph,
            water_quality_turbidity: record.water_quality_turbidity,
            water_availability_status: record.water_availability_status,
            additional_notes: record.additional_notes,
        }
    }
}

/// Converts stored records into API records.
#[must_use]
pub fn api_records(records: Vec<AvailabilityRecord>) -> Vec<ApiRecord> {
    records.into_iter().map(ApiRecord::from).collect()
}

/// Nearest-location payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiNearest {
    /// Matched area.
    pub area: String,
    /// Distance from the query point, rounded to 3 decimals.
    pub distance_km: f64,
    /// Records for the matched area.
    pub records: Vec<ApiRecord>,
}

/// Records for an explicitly selected area.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiAreaRecords {
    /// The selected area.
    pub area: String,
    /// Matching records (possibly empty).
    pub records: Vec<ApiRecord>,
}

/// A user-facing message for a search that produced no results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiMessage {
    /// Human-readable reason.
    pub error: String,
}

/// Body of a search response, tagged by kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ApiSearchResult {
    /// Area lookup result.
    Area(ApiAreaRecords),
    /// Nearest-location lookup result.
    Nearest(ApiNearest),
    /// No match or invalid input.
    Message(ApiMessage),
}

/// Search request body.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiSearchRequest {
    /// Area selected from the list.
    #[serde(default)]
    pub area: String,
    /// Free-text `"lat, lon"`.
    #[serde(default)]
    pub search_text: String,
}

/// Query parameters for `/api/records`.
#[derive(Debug, Clone, Deserialize)]
pub struct AreaQueryParams {
    /// Exact area name.
    pub area: String,
}

/// Query parameters for `/api/nearest`.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct NearestQueryParams {
    /// Latitude in degrees.
    pub lat: f64,
    /// Longitude in degrees.
    pub lon: f64,
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiHealth {
    /// Whether the service is healthy.
    pub healthy: bool,
    /// Service version.
    pub version: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_result_is_tagged() {
        let json = serde_json::to_value(ApiSearchResult::Message(ApiMessage {
            error: "invalid input format".to_string(),
        }))
        .unwrap();
        assert_eq!(json["kind"], "message");
        assert_eq!(json["error"], "invalid input format");
    }

    #[test]
    fn search_request_fields_default_to_empty() {
        let req: ApiSearchRequest = serde_json::from_str(r#"{"area":"Riverside"}"#).unwrap();
        assert_eq!(req.area, "Riverside");
        assert!(req.search_text.is_empty());
    }

    #[test]
    fn nearest_uses_camel_case() {
        let json = serde_json::to_value(ApiNearest {
            area: "Lakeview".to_string(),
            distance_km: 1.087,
            records: Vec::new(),
        })
        .unwrap();
        assert_eq!(json["distanceKm"], 1.087);
    }
}
