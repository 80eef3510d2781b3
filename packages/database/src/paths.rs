//! Default locations of the warehouse database.

use std::path::{Path, PathBuf};

/// Environment variable overriding the database path.
pub const DB_PATH_ENV: &str = "CRASH_WAREHOUSE_DB";

/// Returns the workspace root directory, resolved at compile time from
/// `CARGO_MANIFEST_DIR`. Falls back to the working directory.
#[must_use]
pub fn project_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .ancestors()
        .nth(2)
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf)
}

/// Returns the `data/` directory path.
#[must_use]
pub fn data_dir() -> PathBuf {
    project_root().join("data")
}

/// Returns the default warehouse file, `data/crash_warehouse.duckdb`.
#[must_use]
pub fn default_db_path() -> PathBuf {
    data_dir().join("crash_warehouse.duckdb")
}

/// Resolves the database path: an explicit path wins, then
/// `CRASH_WAREHOUSE_DB`, then the configured path, then the default.
#[must_use]
pub fn resolve_db_path(explicit: Option<&Path>, configured: Option<&Path>) -> PathBuf {
    explicit.map_or_else(
        || {
            std::env::var_os(DB_PATH_ENV)
                .filter(|v| !v.is_empty())
                .map(PathBuf::from)
                .or_else(|| configured.map(Path::to_path_buf))
                .unwrap_or_else(default_db_path)
        },
        Path::to_path_buf,
    )
}

/// Ensures a directory exists, creating it if necessary.
///
/// # Errors
///
/// Returns an I/O error if the directory cannot be created.
pub fn ensure_dir(path: &Path) -> std::io::Result<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_path_wins() {
        let path = resolve_db_path(Some(Path::new("a.duckdb")), Some(Path::new("b.duckdb")));
        assert_eq!(path, PathBuf::from("a.duckdb"));
    }

    #[test]
    fn default_lives_under_data() {
        assert!(default_db_path().ends_with("data/crash_warehouse.duckdb"));
    }
}
