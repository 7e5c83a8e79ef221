#![allow(clippy::module_name_repetitions)]
//! Canonical file paths for the store and the import sources.
//!
//! Defaults live under the project root's `data/` directory and can be
//! overridden with environment variables.

use std::path::{Path, PathBuf};

/// Overrides the `DuckDB` file location.
pub const DB_PATH_ENV: &str = "WATER_MAP_DB";

/// Overrides the locations CSV location.
pub const LOCATIONS_CSV_ENV: &str = "WATER_MAP_LOCATIONS_CSV";

/// Overrides the availability CSV location.
pub const AVAILABILITY_CSV_ENV: &str = "WATER_MAP_AVAILABILITY_CSV";

/// Returns the workspace root directory.
///
/// Resolved at compile time from `CARGO_MANIFEST_DIR`.
///
/// # Panics
///
/// Panics if the project root cannot be resolved.
#[must_use]
pub fn project_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .ancestors()
        .nth(2)
        .expect("Failed to find project root from CARGO_MANIFEST_DIR")
        .to_path_buf()
}

/// Returns the `data/` directory path.
#[must_use]
pub fn data_dir() -> PathBuf {
    project_root().join("data")
}

/// Returns the `DuckDB` path, honoring [`DB_PATH_ENV`].
#[must_use]
pub fn db_path() -> PathBuf {
    env_path_or(DB_PATH_ENV, || data_dir().join("water_map.duckdb"))
}

/// Returns the locations CSV path, honoring [`LOCATIONS_CSV_ENV`].
#[must_use]
pub fn locations_csv_path() -> PathBuf {
    env_path_or(LOCATIONS_CSV_ENV, || data_dir().join("locations.csv"))
}

/// Returns the availability CSV path, honoring [`AVAILABILITY_CSV_ENV`].
#[must_use]
pub fn availability_csv_path() -> PathBuf {
    env_path_or(AVAILABILITY_CSV_ENV, || {
        data_dir().join("water_availability.csv")
    })
}

fn env_path_or(var: &str, default: impl FnOnce() -> PathBuf) -> PathBuf {
    std::env::var_os(var)
        .filter(|v| !v.is_empty())
        .map_or_else(default, PathBuf::from)
}

/// Ensures a directory exists, creating it if necessary.
///
/// # Errors
///
/// Returns an I/O error if the directory cannot be created.
pub fn ensure_dir(path: &Path) -> std::io::Result<()> {
    if !path.as_os_str().is_empty() && !path.exists() {
        std::fs::create_dir_all(path)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_live_under_data_dir() {
        assert!(data_dir().starts_with(project_root()));
        assert!(data_dir().ends_with("data"));
    }

    #[test]
    fn ensure_dir_accepts_empty_parent() {
        // `Path::new("store.duckdb").parent()` is an empty path.
        assert!(ensure_dir(Path::new("")).is_ok());
    }
}
