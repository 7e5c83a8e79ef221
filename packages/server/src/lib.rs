#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Actix-Web JSON API for water availability lookups.
//!
//! Exposes the area list, per-area records, nearest-location lookup and the
//! combined search used by the selection form. The store is a single
//! `DuckDB` connection behind a `Mutex`, so requests touch it one at a time.

mod handlers;

use std::sync::{Mutex, MutexGuard};

use actix_web::{App, HttpServer, middleware, web};

/// Shared application state.
pub struct AppState {
    conn: Mutex<duckdb::Connection>,
}

impl AppState {
    /// Wraps an open, already-seeded store.
    #[must_use]
    pub const fn new(conn: duckdb::Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    /// Locks the store for the duration of one request.
    ///
    /// Returns `None` if a previous request panicked while holding it.
    fn acquire(&self) -> Option<MutexGuard<'_, duckdb::Connection>> {
        self.conn.lock().ok()
    }
}

/// Registers the `/api` routes.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .route("/health", web::get().to(handlers::health))
            .route("/cities", web::get().to(handlers::cities))
            .route("/records", web::get().to(handlers::records))
            .route("/nearest", web::get().to(handlers::nearest))
            .route("/search", web::post().to(handlers::search)),
    );
}

/// Serves the API on `bind_addr:port` until shut down.
///
/// # Errors
///
/// Returns an I/O error if the address cannot be bound.
pub async fn serve(conn: duckdb::Connection, bind_addr: &str, port: u16) -> std::io::Result<()> {
    let state = web::Data::new(AppState::new(conn));

    log::info!("Starting server on {bind_addr}:{port}");

    HttpServer::new(move || {
        App::new()
            .wrap(middleware::Logger::default())
            .app_data(state.clone())
            .configure(configure)
    })
    .workers(1)
    .bind((bind_addr, port))?
    .run()
    .await
}
