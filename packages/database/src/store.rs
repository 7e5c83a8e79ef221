//! Store lifecycle and writes.
//!
//! Opens the `DuckDB` file, creates the schema, and bulk-inserts the rows
//! produced by the importer. Rows are append-only: nothing here updates or
//! deletes a location or record.

use std::path::Path;

use duckdb::Connection;
use water_map_availability_models::{AvailabilityRecord, Location};

use crate::DbError;

/// Number of rows per INSERT chunk.
const CHUNK_SIZE: usize = 2_000;

/// Opens (or creates) the store at `path` and ensures the schema exists.
///
/// # Errors
///
/// Returns [`DbError`] if the directory, connection or schema creation fails.
pub fn open(path: &Path) -> Result<Connection, DbError> {
    if let Some(parent) = path.parent() {
        crate::paths::ensure_dir(parent)?;
    }

    let conn = Connection::open(path)?;
    create_schema(&conn)?;

    log::debug!("Opened store at {}", path.display());

    Ok(conn)
}

/// Opens the store at the configured default path.
///
/// # Errors
///
/// Returns [`DbError`] if the connection or schema creation fails.
pub fn open_default() -> Result<Connection, DbError> {
    open(&crate::paths::db_path())
}

/// Opens a throwaway in-memory store with the schema in place.
///
/// # Errors
///
/// Returns [`DbError`] if the connection or schema creation fails.
pub fn open_in_memory() -> Result<Connection, DbError> {
    let conn = Connection::open_in_memory()?;
    create_schema(&conn)?;
    Ok(conn)
}

fn create_schema(conn: &Connection) -> Result<(), DbError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS locations (
            id BIGINT NOT NULL PRIMARY KEY,
            area TEXT NOT NULL,
            latitude DOUBLE NOT NULL,
            longitude DOUBLE NOT NULL
        );

        CREATE TABLE IF NOT EXISTS availability_records (
            id BIGINT NOT NULL PRIMARY KEY,
            location_id BIGINT,
            area TEXT NOT NULL,
            date DATE NOT NULL,
            water_source TEXT NOT NULL,
            water_level TEXT NOT NULL,
            water_quality_ph DOUBLE NOT NULL,
            water_quality_turbidity TEXT NOT NULL,
            water_availability_status TEXT NOT NULL,
            additional_notes TEXT
        );

        CREATE INDEX IF NOT EXISTS availability_records_area_idx
            ON availability_records (area);

        CREATE TABLE IF NOT EXISTS _meta (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );",
    )?;

    Ok(())
}

/// Inserts locations using their pre-assigned ids.
///
/// Returns the number of rows inserted.
///
/// # Errors
///
/// Returns [`DbError`] if any insert fails, including a duplicate id.
pub fn insert_locations(conn: &Connection, locations: &[Location]) -> Result<u64, DbError> {
    if locations.is_empty() {
        return Ok(0);
    }

    let mut total_inserted = 0u64;

    for chunk in locations.chunks(CHUNK_SIZE) {
        let mut sql = String::from("INSERT INTO locations (id, area, latitude, longitude) VALUES ");
        push_placeholders(&mut sql, chunk.len(), 4);

        let mut stmt = conn.prepare(&sql)?;
        let mut param_idx = 1usize;

        for location in chunk {
            stmt.raw_bind_parameter(param_idx, location.id)?;
            stmt.raw_bind_parameter(param_idx + 1, &location.area)?;
            stmt.raw_bind_parameter(param_idx + 2, location.coordinates.latitude)?;
            stmt.raw_bind_parameter(param_idx + 3, location.coordinates.longitude)?;
            param_idx += 4;
        }

        let rows = stmt.raw_execute()?;
        total_inserted += u64::try_from(rows).unwrap_or(0);
    }

    Ok(total_inserted)
}

/// Inserts availability records using their pre-assigned ids.
///
/// Dates are bound as ISO text and cast to `DATE` by `DuckDB`.
///
/// Returns the number of rows inserted.
///
/// # Errors
///
/// Returns [`DbError`] if any insert fails, including a duplicate id.
pub fn insert_records(conn: &Connection, records: &[AvailabilityRecord]) -> Result<u64, DbError> {
    if records.is_empty() {
        return Ok(0);
    }

    let mut total_inserted = 0u64;

    for chunk in records.chunks(CHUNK_SIZE) {
        let mut sql = String::from(
            "INSERT INTO availability_records (
                id, location_id, area, date, water_source, water_level,
                water_quality_ph, water_quality_turbidity,
                water_availability_status, additional_notes
            ) VALUES ",
        );

        for i in 0..chunk.len() {
            if i > 0 {
                sql.push_str(", ");
            }
            sql.push_str("(?, ?, ?, CAST(? AS DATE), ?, ?, ?, ?, ?, ?)");
        }

        let mut stmt = conn.prepare(&sql)?;
        let mut param_idx = 1usize;

        for record in chunk {
            stmt.raw_bind_parameter(param_idx, record.id)?;
            stmt.raw_bind_parameter(param_idx + 1, record.location_id)?;
            stmt.raw_bind_parameter(param_idx + 2, &record.area)?;
            stmt.raw_bind_parameter(param_idx + 3, record.date.format("%Y-%m-%d").to_string())?;
            stmt.raw_bind_parameter(param_idx + 4, &record.water_source)?;
            stmt.raw_bind_parameter(param_idx + 5, &record.water_level)?;
            stmt.raw_bind_parameter(param_idx + 6, record.water_quality_ph)?;
            stmt.raw_bind_parameter(param_idx + 7, &record.water_quality_turbidity)?;
            stmt.raw_bind_parameter(param_idx + 8, &record.water_availability_status)?;
            stmt.raw_bind_parameter(param_idx + 9, record.additional_notes.as_deref())?;
            param_idx += 10;
        }

        let rows = stmt.raw_execute()?;
        total_inserted += u64::try_from(rows).unwrap_or(0);
    }

    Ok(total_inserted)
}

fn push_placeholders(sql: &mut String, rows: usize, columns: usize) {
    let row = format!("({})", vec!["?"; columns].join(", "));
    for i in 0..rows {
        if i > 0 {
            sql.push_str(", ");
        }
        sql.push_str(&row);
    }
}

/// Returns the number of stored locations.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails.
pub fn count_locations(conn: &Connection) -> Result<u64, DbError> {
    count_rows(conn, "SELECT COUNT(*) FROM locations")
}

/// Returns the number of stored availability records.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails.
pub fn count_records(conn: &Connection) -> Result<u64, DbError> {
    count_rows(conn, "SELECT COUNT(*) FROM availability_records")
}

fn count_rows(conn: &Connection, sql: &str) -> Result<u64, DbError> {
    let mut stmt = conn.prepare(sql)?;
    let count: i64 = stmt.query_row([], |row| row.get(0))?;
    #[allow(clippy::cast_sign_loss)]
    Ok(count as u64)
}

/// Whether both tables are empty, i.e. no import has happened yet.
///
/// # Errors
///
/// Returns [`DbError`] if either count query fails.
pub fn is_empty(conn: &Connection) -> Result<bool, DbError> {
    Ok(count_locations(conn)? == 0 && count_records(conn)? == 0)
}

/// Gets a metadata value from the `_meta` table.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails.
pub fn get_meta(conn: &Connection, key: &str) -> Result<Option<String>, DbError> {
    let mut stmt = conn.prepare("SELECT value FROM _meta WHERE key = ?")?;
    let result = stmt.query_row([key], |row| row.get(0));
    match result {
        Ok(v) => Ok(Some(v)),
        Err(duckdb::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(DbError::DuckDb(e)),
    }
}

/// Sets a metadata value in the `_meta` table.
///
/// # Errors
///
/// Returns [`DbError`] if the upsert fails.
pub fn set_meta(conn: &Connection, key: &str, value: &str) -> Result<(), DbError> {
    conn.execute(
        "INSERT INTO _meta (key, value) VALUES (?, ?)
         ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value",
        duckdb::params![key, value],
    )?;
    Ok(())
}

/// Records row counts and the import time after a successful import.
///
/// # Errors
///
/// Returns [`DbError`] if the metadata update fails.
pub fn record_import_metadata(conn: &Connection) -> Result<(), DbError> {
    let locations = count_locations(conn)?;
    let records = count_records(conn)?;
    let now = chrono::Utc::now().to_rfc3339();

    set_meta(conn, "location_count", &locations.to_string())?;
    set_meta(conn, "record_count", &records.to_string())?;
    set_meta(conn, "imported_at", &now)?;

    Ok(())
}
