#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! One-shot importer for the locations and availability tables.
//!
//! [`import_if_empty`] seeds an empty store from two CSV files and does
//! nothing if either table already holds a row. Parsing happens entirely
//! before the first write, and all writes share one transaction, so a bad
//! row leaves the store untouched.

pub mod parsing;

use std::collections::BTreeMap;
use std::io::Read;
use std::path::PathBuf;
use std::time::Instant;

use duckdb::Connection;
use water_map_availability_models::{AvailabilityRecord, Location};
use water_map_database::{DbError, store};

/// Errors that abort an import.
#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    /// A source file could not be opened.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path that caused the error.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The CSV reader rejected the input (bad quoting, uneven rows).
    #[error("CSV error in {label}: {source}")]
    Csv {
        /// Source file path or name.
        label: String,
        /// Underlying CSV error.
        source: csv::Error,
    },

    /// A required header is absent.
    #[error("{label} is missing required column {column:?}")]
    MissingColumn {
        /// Source file path or name.
        label: String,
        /// The missing header.
        column: String,
    },

    /// A field could not be converted to its typed value.
    #[error("{label} row {row}, column {column:?}: invalid value {value:?} ({reason})")]
    InvalidField {
        /// Source file path or name.
        label: String,
        /// 1-based data row number.
        row: u64,
        /// Column header.
        column: &'static str,
        /// Offending raw text.
        value: String,
        /// Why it was rejected.
        reason: String,
    },

    /// Writing to the store failed.
    #[error("Database error: {0}")]
    Database(#[from] DbError),
}

impl ImportError {
    fn invalid_field(
        label: &str,
        row: u64,
        column: &'static str,
        value: &str,
        reason: &str,
    ) -> Self {
        Self::InvalidField {
            label: label.to_string(),
            row,
            column,
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }
}

impl From<duckdb::Error> for ImportError {
    fn from(error: duckdb::Error) -> Self {
        Self::Database(DbError::DuckDb(error))
    }
}

/// File locations of the two import sources.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportSources {
    /// Locations CSV (`Area`, `Latitude, Longitude`).
    pub locations: PathBuf,
    /// Availability CSV.
    pub availability: PathBuf,
}

impl ImportSources {
    /// Sources at the configured default paths.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            locations: water_map_database::paths::locations_csv_path(),
            availability: water_map_database::paths::availability_csv_path(),
        }
    }
}

/// What an import call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportOutcome {
    /// The store was empty and has been seeded with these row counts.
    Imported {
        /// Locations inserted.
        locations: u64,
        /// Availability records inserted.
        records: u64,
    },
    /// The store already held data; nothing was read or written.
    AlreadySeeded {
        /// Existing locations.
        locations: u64,
        /// Existing availability records.
        records: u64,
    },
}

/// Seeds the store from the source files if both tables are empty.
///
/// Source files are only opened when an import actually happens.
///
/// # Errors
///
/// Returns [`ImportError`] if a source is unreadable or malformed, or if the
/// store cannot be queried or written. Nothing is written on error.
pub fn import_if_empty(
    conn: &mut Connection,
    sources: &ImportSources,
) -> Result<ImportOutcome, ImportError> {
    if let Some(outcome) = already_seeded(conn)? {
        return Ok(outcome);
    }

    log::info!(
        "Store is empty, importing {} and {}",
        sources.locations.display(),
        sources.availability.display()
    );

    let locations = parsing::parse_locations_file(&sources.locations)?;
    let records = parsing::parse_availability_file(&sources.availability)?;

    write_import(conn, &locations, records)
}

/// Same as [`import_if_empty`], reading the tables from in-memory readers.
///
/// # Errors
///
/// Returns [`ImportError`] if either table is malformed or the store cannot
/// be queried or written. Nothing is written on error.
pub fn import_from_readers(
    conn: &mut Connection,
    locations: impl Read,
    availability: impl Read,
) -> Result<ImportOutcome, ImportError> {
    if let Some(outcome) = already_seeded(conn)? {
        return Ok(outcome);
    }

    let locations = parsing::parse_locations(locations, "locations")?;
    let records = parsing::parse_availability(availability, "availability")?;

    write_import(conn, &locations, records)
}

fn already_seeded(conn: &Connection) -> Result<Option<ImportOutcome>, ImportError> {
    let locations = store::count_locations(conn)?;
    let records = store::count_records(conn)?;

    if locations == 0 && records == 0 {
        return Ok(None);
    }

    log::info!("Store already seeded ({locations} locations, {records} records), skipping import");

    Ok(Some(ImportOutcome::AlreadySeeded { locations, records }))
}

fn write_import(
    conn: &mut Connection,
    locations: &[Location],
    mut records: Vec<AvailabilityRecord>,
) -> Result<ImportOutcome, ImportError> {
    let start = Instant::now();

    let unlinked = link_records(locations, &mut records);
    if unlinked > 0 {
        log::warn!("{unlinked} availability record(s) match no location by area name");
    }

    let tx = conn.transaction()?;
    let inserted_locations = store::insert_locations(&tx, locations)?;
    let inserted_records = store::insert_records(&tx, &records)?;
    store::record_import_metadata(&tx)?;
    tx.commit()?;

    log::info!(
        "Imported {inserted_locations} locations and {inserted_records} availability records in {:.2}s",
        start.elapsed().as_secs_f64()
    );

    Ok(ImportOutcome::Imported {
        locations: inserted_locations,
        records: inserted_records,
    })
}

/// Sets `location_id` on each record whose area key matches a location.
///
/// When several locations share an area key, the first one wins. Returns the
/// number of records left unlinked.
fn link_records(locations: &[Location], records: &mut [AvailabilityRecord]) -> usize {
    let mut by_key: BTreeMap<String, i64> = BTreeMap::new();
    for location in locations {
        by_key.entry(location.area_key()).or_insert(location.id);
    }

    let mut unlinked = 0;
    for record in records.iter_mut() {
        record.location_id = by_key
            .get(&water_map_availability_models::area_key(&record.area))
            .copied();
        if record.location_id.is_none() {
            unlinked += 1;
        }
    }

    unlinked
}

#[cfg(test)]
mod tests {
    use water_map_database::queries;

    use super::*;

    const LOCATIONS: &str = "Area,\"Latitude, Longitude\"\n\
        Lakeview,\"12.5, 77.3\"\n\
        Riverside,\"13.0, 77.6\"\n\
        riverside,\"40.0, 10.0\"\n";

    const AVAILABILITY: &str = "Site/Area Name,Date,Water Source,Water Level (in meters),\
        Water Quality (pH),Water Quality (Turbidity),Water Availability Status,\
        Additional Notes/Comments\n\
        Riverside,01-01-2023,River,4.5,7.2,Low,Adequate,\n\
        Riverside,01-02-2023,River,4.1,7.0,Low,Adequate,\n\
        Lakeview,15-01-2023,Lake,2.0,6.5,High,Scarce,Algae\n\
        Riverside,01-03-2023,River,3.9,7.1,Medium,Limited,\n\
        Nowhere,01-03-2023,Tanker,0,7.0,Low,Critical,\n";

    fn import(conn: &mut Connection) -> ImportOutcome {
        import_from_readers(conn, LOCATIONS.as_bytes(), AVAILABILITY.as_bytes()).unwrap()
    }

    #[test]
    fn seeds_empty_store() {
        let mut conn = store::open_in_memory().unwrap();
        assert_eq!(
            import(&mut conn),
            ImportOutcome::Imported {
                locations: 3,
                records: 5
            }
        );
        assert_eq!(store::count_locations(&conn).unwrap(), 3);
        assert_eq!(store::count_records(&conn).unwrap(), 5);
        assert!(store::get_meta(&conn, "imported_at").unwrap().is_some());
    }

    #[test]
    fn second_import_is_a_no_op() {
        let mut conn = store::open_in_memory().unwrap();
        import(&mut conn);
        let outcome = import(&mut conn);

        assert_eq!(
            outcome,
            ImportOutcome::AlreadySeeded {
                locations: 3,
                records: 5
            }
        );
        assert_eq!(store::count_locations(&conn).unwrap(), 3);
        assert_eq!(store::count_records(&conn).unwrap(), 5);
    }

    #[test]
    fn seeded_store_never_reads_sources() {
        let mut conn = store::open_in_memory().unwrap();
        import(&mut conn);

        let sources = ImportSources {
            locations: PathBuf::from("/definitely/missing/locations.csv"),
            availability: PathBuf::from("/definitely/missing/availability.csv"),
        };
        assert!(matches!(
            import_if_empty(&mut conn, &sources).unwrap(),
            ImportOutcome::AlreadySeeded { .. }
        ));
    }

    #[test]
    fn missing_source_file_is_an_error_on_empty_store() {
        let mut conn = store::open_in_memory().unwrap();
        let sources = ImportSources {
            locations: PathBuf::from("/definitely/missing/locations.csv"),
            availability: PathBuf::from("/definitely/missing/availability.csv"),
        };
        assert!(matches!(
            import_if_empty(&mut conn, &sources).unwrap_err(),
            ImportError::Io { .. }
        ));
    }

    #[test]
    fn malformed_row_writes_nothing() {
        let mut conn = store::open_in_memory().unwrap();
        let bad = format!("{AVAILABILITY}Riverside,not-a-date,River,1,7,Low,Ok,\n");

        let err = import_from_readers(&mut conn, LOCATIONS.as_bytes(), bad.as_bytes()).unwrap_err();

        assert!(matches!(err, ImportError::InvalidField { row: 6, .. }));
        assert!(store::is_empty(&conn).unwrap());
    }

    #[test]
    fn records_link_to_first_location_by_area_key() {
        let mut conn = store::open_in_memory().unwrap();
        import(&mut conn);

        let riverside = queries::records_for_area(&conn, "Riverside").unwrap();
        assert_eq!(riverside.len(), 3);
        assert!(riverside.iter().all(|r| r.location_id == Some(2)));

        let lakeview = queries::records_for_area(&conn, "Lakeview").unwrap();
        assert_eq!(lakeview[0].location_id, Some(1));
        assert_eq!(lakeview[0].additional_notes.as_deref(), Some("Algae"));

        let nowhere = queries::records_for_area(&conn, "Nowhere").unwrap();
        assert_eq!(nowhere[0].location_id, None);
    }

    #[test]
    fn link_records_counts_unmatched() {
        let locations = parsing::parse_locations(LOCATIONS.as_bytes(), "l").unwrap();
        let mut records = parsing::parse_availability(AVAILABILITY.as_bytes(), "a").unwrap();
        assert_eq!(link_records(&locations, &mut records), 1);
    }
}
