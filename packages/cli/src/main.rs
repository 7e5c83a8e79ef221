#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for the water map toolchain.
//!
//! Every command that reads data seeds the store from the CSV sources first
//! if it is still empty, so `water_map serve` on a fresh checkout works
//! without a separate import step.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use duckdb::Connection;
use water_map_availability_models::AvailabilityRecord;
use water_map_database::{paths, queries, store};
use water_map_ingest::{ImportOutcome, ImportSources};
use water_map_proximity::Proximity;
use water_map_search::{SearchOutcome, SearchRequest};

#[derive(Parser)]
#[command(name = "water_map", about = "Water availability lookup tool")]
struct Cli {
    /// `DuckDB` store path (overrides `WATER_MAP_DB`)
    #[arg(long, global = true)]
    db: Option<PathBuf>,
    /// Locations CSV (overrides `WATER_MAP_LOCATIONS_CSV`)
    #[arg(long, global = true)]
    locations: Option<PathBuf>,
    /// Water availability CSV (overrides `WATER_MAP_AVAILABILITY_CSV`)
    #[arg(long, global = true)]
    availability: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Seed the store from the CSV sources if it is empty
    Import,
    /// Show row counts and when the store was seeded
    Stats,
    /// List the area name of every availability record
    Cities,
    /// Show the records for an area (exact name)
    Records {
        /// Area name, e.g. "Riverside"
        area: String,
    },
    /// Find the nearest location within 10 km and show its records
    Nearest {
        /// Latitude in decimal degrees
        #[arg(allow_hyphen_values = true)]
        lat: f64,
        /// Longitude in decimal degrees
        #[arg(allow_hyphen_values = true)]
        lon: f64,
    },
    /// Run a search the way the selection form does
    Search {
        /// Selected area, used when no coordinates are given
        #[arg(long, default_value = "")]
        area: String,
        /// Free-text "lat, lon"
        #[arg(long, default_value = "", allow_hyphen_values = true)]
        text: String,
    },
    /// Start the JSON API server
    Serve {
        /// Address to bind (overrides `BIND_ADDR`)
        #[arg(long)]
        bind: Option<String>,
        /// Port to listen on (overrides `PORT`)
        #[arg(long)]
        port: Option<u16>,
    },
}

impl Cli {
    fn db_path(&self) -> PathBuf {
        self.db.clone().unwrap_or_else(paths::db_path)
    }

    fn sources(&self) -> ImportSources {
        let defaults = ImportSources::from_env();
        ImportSources {
            locations: self.locations.clone().unwrap_or(defaults.locations),
            availability: self.availability.clone().unwrap_or(defaults.availability),
        }
    }

    /// Opens the store and imports the CSV sources if it holds no data yet.
    fn seeded_store(&self) -> Result<Connection, Box<dyn std::error::Error>> {
        let mut conn = store::open(&self.db_path())?;

        match water_map_ingest::import_if_empty(&mut conn, &self.sources())? {
            ImportOutcome::Imported { locations, records } => {
                log::info!("Seeded store with {locations} locations and {records} records");
            }
            ImportOutcome::AlreadySeeded { locations, records } => {
                log::debug!("Store already holds {locations} locations and {records} records");
            }
        }

        Ok(conn)
    }
}

fn print_records(records: &[AvailabilityRecord]) {
    if records.is_empty() {
        println!("No records.");
        return;
    }

    println!(
        "{:<12} {:<14} {:>8} {:>5} {:<10} {:<12} NOTES",
        "DATE", "SOURCE", "LEVEL", "PH", "TURBIDITY", "STATUS"
    );
    println!("{}", "-".repeat(80));
    for r in records {
        println!(
            "{:<12} {:<14} {:>8} {:>5.1} {:<10} {:<12} {}",
            r.date.to_string(),
            r.water_source,
            r.water_level,
            r.water_quality_ph,
            r.water_quality_turbidity,
            r.water_availability_status,
            r.additional_notes.as_deref().unwrap_or(""),
        );
    }
}

fn env_bind_addr() -> String {
    std::env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1".to_string())
}

fn env_port() -> u16 {
    std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8080)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init();
    let cli = Cli::parse();

    match &cli.command {
        Commands::Import => {
            let mut conn = store::open(&cli.db_path())?;
            match water_map_ingest::import_if_empty(&mut conn, &cli.sources())? {
                ImportOutcome::Imported { locations, records } => {
                    println!("Imported {locations} locations and {records} records.");
                }
                ImportOutcome::AlreadySeeded { locations, records } => {
                    println!(
                        "Store already seeded ({locations} locations, {records} records); nothing to do."
                    );
                }
            }
        }
        Commands::Stats => {
            let conn = store::open(&cli.db_path())?;
            println!("Store:     {}", cli.db_path().display());
            println!("Locations: {}", store::count_locations(&conn)?);
            println!("Records:   {}", store::count_records(&conn)?);
            println!(
                "Imported:  {}",
                store::get_meta(&conn, "imported_at")?.unwrap_or_else(|| "never".to_string())
            );
        }
        Commands::Cities => {
            let conn = cli.seeded_store()?;
            for name in queries::list_city_names(&conn)? {
                println!("{name}");
            }
        }
        Commands::Records { area } => {
            let conn = cli.seeded_store()?;
            print_records(&queries::records_for_area(&conn, area)?);
        }
        Commands::Nearest { lat, lon } => {
            let conn = cli.seeded_store()?;
            match water_map_proximity::find_nearest(&conn, *lat, *lon)? {
                Proximity::Found(found) => {
                    println!("{} ({:.3} km away)", found.location.area, found.distance_km);
                    print_records(&found.records);
                }
                Proximity::NotFound(reason) => println!("{reason}"),
            }
        }
        Commands::Search { area, text } => {
            let conn = cli.seeded_store()?;
            let request = SearchRequest {
                area: area.clone(),
                coordinates: text.clone(),
            };
            match water_map_search::dispatch(&conn, &request)? {
                SearchOutcome::AreaRecords { area, records } => {
                    println!("{area}");
                    print_records(&records);
                }
                SearchOutcome::Nearest(found) => {
                    println!("{} ({:.3} km away)", found.location.area, found.distance_km);
                    print_records(&found.records);
                }
                other @ (SearchOutcome::NotFound(_) | SearchOutcome::Invalid(_)) => {
                    println!("{}", other.message().unwrap_or_default());
                }
            }
        }
        Commands::Serve { bind, port } => {
            let conn = cli.seeded_store()?;
            let bind_addr = bind.clone().unwrap_or_else(env_bind_addr);
            let port = port.unwrap_or_else(env_port);

            actix_web::rt::System::new().block_on(water_map_server::serve(
                conn,
                &bind_addr,
                port,
            ))?;
        }
    }

    Ok(())
}
