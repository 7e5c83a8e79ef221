//! CSV parsing for the two import sources.
//!
//! Both parsers are all-or-nothing: the first malformed row aborts with an
//! [`ImportError`] naming the source, row and column. Row numbers are
//! 1-based and count data rows only (the header is not row 1).

use std::io::Read;
use std::path::Path;

use chrono::NaiveDate;
use serde::Deserialize;
use water_map_availability_models::{AvailabilityRecord, Coordinates, Location};

use crate::ImportError;

/// Column headers of the locations table.
pub mod location_columns {
    /// Place name.
    pub const AREA: &str = "Area";
    /// Combined `"lat, lon"` text.
    pub const COORDINATES: &str = "Latitude, Longitude";
}

/// Column headers of the availability table.
pub mod availability_columns {
    /// Area name, joined to `Area` of the locations table.
    pub const AREA: &str = "Site/Area Name";
    /// `DD-MM-YYYY`.
    pub const DATE: &str = "Date";
    pub const WATER_SOURCE: &str = "Water Source";
    pub const WATER_LEVEL: &str = "Water Level (in meters)";
    pub const PH: &str = "Water Quality (pH)";
    pub const TURBIDITY: &str = "Water Quality (Turbidity)";
    pub const STATUS: &str = "Water Availability Status";
    pub const NOTES: &str = "Additional Notes/Comments";
}

/// Date format used by the availability table.
pub const SOURCE_DATE_FORMAT: &str = "%d-%m-%Y";

#[derive(Debug, Deserialize)]
struct LocationRow {
    #[serde(rename = "Area")]
    area: String,
    #[serde(rename = "Latitude, Longitude")]
    coordinates: String,
}

#[derive(Debug, Deserialize)]
struct AvailabilityRow {
    #[serde(rename = "Site/Area Name")]
    area: String,
    #[serde(rename = "Date")]
    date: String,
    #[serde(rename = "Water Source")]
    water_source: String,
    #[serde(rename = "Water Level (in meters)")]
    water_level: String,
    #[serde(rename = "Water Quality (pH)")]
    ph: String,
    #[serde(rename = "Water Quality (Turbidity)")]
    turbidity: String,
    #[serde(rename = "Water Availability Status")]
    status: String,
    #[serde(rename = "Additional Notes/Comments")]
    notes: String,
}

/// Splits a combined `"lat, lon"` field on its first comma and parses both
/// halves.
///
/// Returns `None` if there is no comma or either half is not a number.
#[must_use]
pub fn parse_combined_coordinates(text: &str) -> Option<Coordinates> {
    let (lat, lon) = text.split_once(',')?;
    let latitude = lat.trim().parse::<f64>().ok()?;
    let longitude = lon.trim().parse::<f64>().ok()?;
    Some(Coordinates::new(latitude, longitude))
}

/// Parses a `DD-MM-YYYY` date.
#[must_use]
pub fn parse_source_date(text: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(text.trim(), SOURCE_DATE_FORMAT).ok()
}

/// Parses the locations table from a file.
///
/// # Errors
///
/// Returns [`ImportError`] if the file cannot be read or any row is malformed.
pub fn parse_locations_file(path: &Path) -> Result<Vec<Location>, ImportError> {
    let file = open_source(path)?;
    parse_locations(file, &path.display().to_string())
}

/// Parses the availability table from a file.
///
/// # Errors
///
/// Returns [`ImportError`] if the file cannot be read or any row is malformed.
pub fn parse_availability_file(path: &Path) -> Result<Vec<AvailabilityRecord>, ImportError> {
    let file = open_source(path)?;
    parse_availability(file, &path.display().to_string())
}

fn open_source(path: &Path) -> Result<std::fs::File, ImportError> {
    std::fs::File::open(path).map_err(|e| ImportError::Io {
        path: path.display().to_string(),
        source: e,
    })
}

/// Parses the locations table. Ids are assigned in row order from 1.
///
/// # Errors
///
/// Returns [`ImportError`] on a missing column, a row with the wrong number
/// of fields, or coordinates that are not two in-range numbers.
pub fn parse_locations(reader: impl Read, label: &str) -> Result<Vec<Location>, ImportError> {
    let mut csv_reader = reader_for(reader);
    require_columns(
        &mut csv_reader,
        label,
        &[location_columns::AREA, location_columns::COORDINATES],
    )?;

    let mut locations = Vec::new();
    for (index, result) in csv_reader.deserialize::<LocationRow>().enumerate() {
        let row = index as u64 + 1;
        let record = result.map_err(|e| ImportError::Csv {
            label: label.to_string(),
            source: e,
        })?;

        let coordinates = parse_combined_coordinates(&record.coordinates)
            .filter(Coordinates::is_valid)
            .ok_or_else(|| {
                ImportError::invalid_field(
                    label,
                    row,
                    location_columns::COORDINATES,
                    &record.coordinates,
                    "expected \"latitude, longitude\" within [-90, 90] and [-180, 180]",
                )
            })?;

        locations.push(Location {
            id: i64::try_from(row).unwrap_or(i64::MAX),
            area: record.area,
            coordinates,
        });
    }

    log::debug!("Parsed {} locations from {label}", locations.len());

    Ok(locations)
}

/// Parses the availability table. Ids are assigned in row order from 1 and
/// records are left unlinked.
///
/// # Errors
///
/// Returns [`ImportError`] on a missing column, a row with the wrong number
/// of fields, an unparseable date, or a non-numeric pH.
pub fn parse_availability(
    reader: impl Read,
    label: &str,
) -> Result<Vec<AvailabilityRecord>, ImportError> {
    use availability_columns as col;

    let mut csv_reader = reader_for(reader);
    require_columns(
        &mut csv_reader,
        label,
        &[
            col::AREA,
            col::DATE,
            col::WATER_SOURCE,
            col::WATER_LEVEL,
            col::PH,
            col::TURBIDITY,
            col::STATUS,
            col::NOTES,
        ],
    )?;

    let mut records = Vec::new();
    for (index, result) in csv_reader.deserialize::<AvailabilityRow>().enumerate() {
        let row = index as u64 + 1;
        let raw = result.map_err(|e| ImportError::Csv {
            label: label.to_string(),
            source: e,
        })?;

        let date = parse_source_date(&raw.date).ok_or_else(|| {
            ImportError::invalid_field(label, row, col::DATE, &raw.date, "expected DD-MM-YYYY")
        })?;

        let water_quality_ph = raw.ph.parse::<f64>().map_err(|e| {
            ImportError::invalid_field(label, row, col::PH, &raw.ph, &e.to_string())
        })?;

        records.push(AvailabilityRecord {
            id: i64::try_from(row).unwrap_or(i64::MAX),
            location_id: None,
            area: raw.area,
            date,
            water_source: raw.water_source,
            water_level: raw.water_level,
            water_quality_ph,
            water_quality_turbidity: raw.turbidity,
            water_availability_status: raw.status,
            additional_notes: Some(raw.notes).filter(|n| !n.is_empty()),
        });
    }

    log::debug!("Parsed {} availability records from {label}", records.len());

    Ok(records)
}

fn reader_for<R: Read>(reader: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader)
}

fn require_columns<R: Read>(
    reader: &mut csv::Reader<R>,
    label: &str,
    columns: &[&str],
) -> Result<(), ImportError> {
    let headers = reader.headers().map_err(|e| ImportError::Csv {
        label: label.to_string(),
        source: e,
    })?;

    for column in columns {
        if !headers.iter().any(|h| h == *column) {
            return Err(ImportError::MissingColumn {
                label: label.to_string(),
                column: (*column).to_string(),
            });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const AVAILABILITY_HEADER: &str = "Site/Area Name,Date,Water Source,Water Level (in meters),\
        Water Quality (pH),Water Quality (Turbidity),Water Availability Status,\
        Additional Notes/Comments\n";

    #[test]
    fn splits_coordinates_on_first_comma() {
        let c = parse_combined_coordinates("12.5, 77.3").unwrap();
        assert!((c.latitude - 12.5).abs() < f64::EPSILON);
        assert!((c.longitude - 77.3).abs() < f64::EPSILON);
    }

    #[test]
    fn rejects_extra_coordinate_parts() {
        assert!(parse_combined_coordinates("12.5, 77.3, 4").is_none());
        assert!(parse_combined_coordinates("12.5").is_none());
        assert!(parse_combined_coordinates("north, 77.3").is_none());
    }

    #[test]
    fn parses_day_month_year_dates() {
        assert_eq!(
            parse_source_date("01-02-2023"),
            NaiveDate::from_ymd_opt(2023, 2, 1)
        );
        assert!(parse_source_date("2023-02-01").is_none());
        assert!(parse_source_date("31-02-2023").is_none());
    }

    #[test]
    fn parses_quoted_location_rows() {
        let csv = "Area,\"Latitude, Longitude\"\nLakeview,\"12.5, 77.3\"\nHilltop,\" -1.25 ,36.8 \"\n";
        let locations = parse_locations(csv.as_bytes(), "locations").unwrap();

        assert_eq!(locations.len(), 2);
        assert_eq!(locations[0].id, 1);
        assert_eq!(locations[0].area, "Lakeview");
        assert_eq!(locations[1].id, 2);
        assert!((locations[1].coordinates.latitude + 1.25).abs() < f64::EPSILON);
    }

    #[test]
    fn bad_coordinates_abort_with_row_number() {
        let csv = "Area,\"Latitude, Longitude\"\nA,\"1, 2\"\nB,\"x, 2\"\n";
        let err = parse_locations(csv.as_bytes(), "locations").unwrap_err();
        match err {
            ImportError::InvalidField { row, column, .. } => {
                assert_eq!(row, 2);
                assert_eq!(column, location_columns::COORDINATES);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn out_of_range_coordinates_are_rejected() {
        let csv = "Area,\"Latitude, Longitude\"\nA,\"95, 2\"\n";
        assert!(parse_locations(csv.as_bytes(), "locations").is_err());
    }

    #[test]
    fn missing_column_is_reported() {
        let csv = "Area,Lat\nA,1\n";
        let err = parse_locations(csv.as_bytes(), "locations").unwrap_err();
        assert!(matches!(err, ImportError::MissingColumn { ref column, .. } if column == "Latitude, Longitude"));
    }

    #[test]
    fn short_row_is_fatal() {
        let csv = "Area,\"Latitude, Longitude\"\nA\n";
        let err = parse_locations(csv.as_bytes(), "locations").unwrap_err();
        assert!(matches!(err, ImportError::Csv { .. }));
    }

    #[test]
    fn parses_availability_rows() {
        let csv = format!(
            "{AVAILABILITY_HEADER}Riverside,01-01-2023,River,4.5,7.2,Low,Adequate,\n\
             Riverside,01-02-2023,River,approx 4,6.9,High,Scarce,\"Dry, windy\"\n"
        );
        let records = parse_availability(csv.as_bytes(), "availability").unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].date, NaiveDate::from_ymd_opt(2023, 1, 1).unwrap());
        assert_eq!(records[0].additional_notes, None);
        assert_eq!(records[0].location_id, None);
        assert_eq!(records[1].id, 2);
        assert_eq!(records[1].water_level, "approx 4");
        assert_eq!(records[1].additional_notes.as_deref(), Some("Dry, windy"));
        assert!((records[1].water_quality_ph - 6.9).abs() < f64::EPSILON);
    }

    #[test]
    fn bad_date_is_fatal() {
        let csv = format!("{AVAILABILITY_HEADER}Riverside,2023/01/01,River,4.5,7.2,Low,Adequate,\n");
        let err = parse_availability(csv.as_bytes(), "availability").unwrap_err();
        assert!(matches!(err, ImportError::InvalidField { column: "Date", row: 1, .. }));
    }

    #[test]
    fn bad_ph_is_fatal() {
        let csv = format!("{AVAILABILITY_HEADER}Riverside,01-01-2023,River,4.5,neutral,Low,Adequate,\n");
        let err = parse_availability(csv.as_bytes(), "availability").unwrap_err();
        assert!(matches!(err, ImportError::InvalidField { column: "Water Quality (pH)", .. }));
    }
}
