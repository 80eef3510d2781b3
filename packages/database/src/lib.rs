#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! `DuckDB` storage for the crash warehouse.
//!
//! A load replaces the whole star schema: every table is dropped and
//! recreated, then the nine dimensions, `season_dimension_clean`, the
//! fact table and the load's issues are written in one transaction.
//! Aggregate queries rendered by `crash_warehouse_olap` run against the
//! same file.

pub mod paths;
pub mod quality;
pub mod queries;
pub mod schema;
pub mod writer;

use std::path::Path;

pub use duckdb::Connection;
pub use quality::quality_scan;
pub use queries::{fact_count, fetch_attribute_rows, run_query};
pub use writer::write_warehouse;

/// Errors that can occur during database operations.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// `DuckDB` error.
    #[error("DuckDB error: {0}")]
    DuckDb(#[from] duckdb::Error),

    /// Filesystem error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The query could not be rendered.
    #[error(transparent)]
    Query(#[from] crash_warehouse_olap::OlapError),

    /// A stored value did not fit the expected type.
    #[error("Data conversion error: {message}")]
    Conversion {
        /// Description of what went wrong.
        message: String,
    },
}

/// Opens (or creates) a warehouse database file.
///
/// # Errors
///
/// Returns [`DbError`] if the parent directory or connection cannot be
/// created.
pub fn open(path: &Path) -> Result<Connection, DbError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        paths::ensure_dir(parent)?;
    }
    log::debug!("Opening warehouse at {}", path.display());
    Ok(Connection::open(path)?)
}

/// Opens a throwaway in-memory warehouse.
///
/// # Errors
///
/// Returns [`DbError`] if `DuckDB` cannot start.
pub fn open_in_memory() -> Result<Connection, DbError> {
    Ok(Connection::open_in_memory()?)
}
