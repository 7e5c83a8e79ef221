//! Read queries used by the presentation layer and the proximity resolver.
//!
//! All results are ordered by row id, which is source order.

use chrono::NaiveDate;
use duckdb::{Connection, Row};
use water_map_availability_models::{AvailabilityRecord, Coordinates, Location};

use crate::DbError;

const RECORD_COLUMNS: &str = "id, location_id, area, CAST(date AS VARCHAR), water_source, \
     water_level, water_quality_ph, water_quality_turbidity, water_availability_status, \
     additional_notes";

/// Returns the area name of every availability record.
///
/// Not deduplicated: an area with N records appears N times, in insertion
/// order.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails.
pub fn list_city_names(conn: &Connection) -> Result<Vec<String>, DbError> {
    let mut stmt = conn.prepare("SELECT area FROM availability_records ORDER BY id")?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(names)
}

/// Returns every record whose area matches `area` exactly.
///
/// An unknown area yields an empty list.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails or a stored date is unreadable.
pub fn records_for_area(
    conn: &Connection,
    area: &str,
) -> Result<Vec<AvailabilityRecord>, DbError> {
    let sql = format!("SELECT {RECORD_COLUMNS} FROM availability_records WHERE area = ? ORDER BY id");
    let mut stmt = conn.prepare(&sql)?;
    stmt.raw_bind_parameter(1, area)?;
    stmt.raw_execute()?;

    collect_records(stmt.raw_query())
}

/// Returns the records belonging to `location`.
///
/// Matches rows linked to the location's id at import as well as rows whose
/// area equals the location's area exactly.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails or a stored date is unreadable.
pub fn records_for_location(
    conn: &Connection,
    location: &Location,
) -> Result<Vec<AvailabilityRecord>, DbError> {
    let sql = format!(
        "SELECT {RECORD_COLUMNS} FROM availability_records
         WHERE location_id = ? OR area = ?
         ORDER BY id"
    );
    let mut stmt = conn.prepare(&sql)?;
    stmt.raw_bind_parameter(1, location.id)?;
    stmt.raw_bind_parameter(2, &location.area)?;
    stmt.raw_execute()?;

    collect_records(stmt.raw_query())
}

/// Returns every stored location in insertion order.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails.
pub fn all_locations(conn: &Connection) -> Result<Vec<Location>, DbError> {
    let mut stmt =
        conn.prepare("SELECT id, area, latitude, longitude FROM locations ORDER BY id")?;
    let locations = stmt
        .query_map([], |row| {
            Ok(Location {
                id: row.get(0)?,
                area: row.get(1)?,
                coordinates: Coordinates::new(row.get(2)?, row.get(3)?),
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(locations)
}

fn collect_records(mut rows: duckdb::Rows<'_>) -> Result<Vec<AvailabilityRecord>, DbError> {
    let mut records = Vec::new();
    while let Some(row) = rows.next()? {
        records.push(record_from_row(row)?);
    }
    Ok(records)
}

fn record_from_row(row: &Row<'_>) -> Result<AvailabilityRecord, DbError> {
    let date_text: String = row.get(3)?;
    let date = NaiveDate::parse_from_str(&date_text, "%Y-%m-%d").map_err(|e| {
        DbError::Conversion {
            message: format!("Invalid stored date {date_text:?}: {e}"),
        }
    })?;

    Ok(AvailabilityRecord {
        id: row.get(0)?,
        location_id: row.get(1)?,
        area: row.get(2)?,
        date,
        water_source: row.get(4)?,
        water_level: row.get(5)?,
        water_quality_ph: row.get(6)?,
        water_quality_turbidity: row.get(7)?,
        water_availability_status: row.get(8)?,
        additional_notes: row.get(9)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store;

    fn record(
        id: i64,
        location_id: Option<i64>,
        area: &str,
        date: (i32, u32, u32),
    ) -> AvailabilityRecord {
        AvailabilityRecord {
            id,
            location_id,
            area: area.to_string(),
            date: NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
            water_source: "River".to_string(),
            water_level: "2.1 (approx)".to_string(),
            water_quality_ph: 6.8,
            water_quality_turbidity: "Moderate".to_string(),
            water_availability_status: "Limited".to_string(),
            additional_notes: None,
        }
    }

    fn seeded() -> Connection {
        let conn = store::open_in_memory().unwrap();
        store::insert_locations(
            &conn,
            &[
                Location {
                    id: 1,
                    area: "Riverside".to_string(),
                    coordinates: Coordinates::new(10.0, 20.0),
                },
                Location {
                    id: 2,
                    area: "Hilltop".to_string(),
                    coordinates: Coordinates::new(11.0, 21.0),
                },
            ],
        )
        .unwrap();
        store::insert_records(
            &conn,
            &[
                record(1, Some(1), "Riverside", (2023, 1, 1)),
                record(2, Some(2), "Hilltop", (2023, 1, 5)),
                record(3, Some(1), "Riverside", (2023, 2, 1)),
                record(4, Some(1), "Riverside", (2023, 3, 1)),
                record(5, Some(1), "riverside ", (2023, 4, 1)),
            ],
        )
        .unwrap();
        conn
    }

    #[test]
    fn city_names_keep_duplicates_in_insertion_order() {
        let conn = seeded();
        assert_eq!(
            list_city_names(&conn).unwrap(),
            vec!["Riverside", "Hilltop", "Riverside", "Riverside", "riverside "]
        );
    }

    #[test]
    fn records_for_area_is_exact_match() {
        let conn = seeded();
        let records = records_for_area(&conn, "Riverside").unwrap();
        let dates: Vec<String> = records.iter().map(|r| r.date.to_string()).collect();
        assert_eq!(dates, vec!["2023-01-01", "2023-02-01", "2023-03-01"]);
        assert!(records.iter().all(|r| r.water_level == "2.1 (approx)"));
    }

    #[test]
    fn unknown_area_is_empty_not_error() {
        let conn = seeded();
        assert!(records_for_area(&conn, "Unknown").unwrap().is_empty());
    }

    #[test]
    fn records_for_location_include_linked_rows() {
        let conn = seeded();
        let riverside = &all_locations(&conn).unwrap()[0];
        let records = records_for_location(&conn, riverside).unwrap();
        assert_eq!(records.len(), 4);
        assert_eq!(records[3].area, "riverside ");
    }

    #[test]
    fn records_for_location_include_unlinked_exact_matches() {
        let conn = seeded();
        store::insert_records(&conn, &[record(6, None, "Hilltop", (2023, 6, 1))]).unwrap();
        let hilltop = &all_locations(&conn).unwrap()[1];
        assert_eq!(records_for_location(&conn, hilltop).unwrap().len(), 2);
    }

    #[test]
    fn locations_come_back_in_id_order() {
        let conn = seeded();
        let locations = all_locations(&conn).unwrap();
        assert_eq!(locations.len(), 2);
        assert_eq!(locations[0].area, "Riverside");
        assert!((locations[1].coordinates.longitude - 21.0).abs() < f64::EPSILON);
    }
}
