//! `crash_warehouse.toml` configuration.
//!
//! ```toml
//! [load]
//! strict = false
//! skip_rows = 0
//! min_year = 2001
//! max_year = 2023
//!
//! [mining]
//! min_support = 0.05
//! min_confidence = 0.6
//! attributes = ["time_of_day", "gender", "age_group"]
//!
//! [database]
//! path = "data/crash_warehouse.duckdb"
//! ```

use std::path::{Path, PathBuf};

use crash_warehouse_etl_models::LoadOptions;
use crash_warehouse_mining::models::MiningConfig;
use serde::Deserialize;

/// Config file read when `--config` is not given, if it exists.
pub const DEFAULT_CONFIG_FILE: &str = "crash_warehouse.toml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub load: LoadOptions,
    pub mining: MiningConfig,
    pub database: DatabaseConfig,
}

impl Config {
    /// Parses a config document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed TOML or unknown values.
    pub fn parse(text: &str, path: &Path) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Reads `explicit`, or [`DEFAULT_CONFIG_FILE`] if present, or falls
    /// back to defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if an explicit file is missing or any file
    /// fails to parse.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => {
                let default = PathBuf::from(DEFAULT_CONFIG_FILE);
                if !default.exists() {
                    return Ok(Self::default());
                }
                default
            }
        };
        let text = std::fs::read_to_string(&path).map_err(|source| ConfigError::Io {
            path: path.clone(),
            source,
        })?;
        log::debug!("Using config {}", path.display());
        Self::parse(&text, &path)
    }
}

#[cfg(test)]
mod tests {
    use crash_warehouse_models::Attribute;

    use super::*;

    #[test]
    fn sections_are_optional() {
        let config = Config::parse("", Path::new("empty.toml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn reads_all_sections() {
        let config = Config::parse(
            r#"
            [load]
            strict = true
            skip_rows = 4
            min_year = 2001
            max_year = 2023

            [mining]
            min_support = 0.02
            attributes = ["state", "season"]
            include_unknown = true

            [database]
            path = "out/warehouse.duckdb"
            "#,
            Path::new("crash_warehouse.toml"),
        )
        .unwrap();
        assert!(config.load.strict);
        assert_eq!(config.load.skip_rows, 4);
        assert_eq!(config.load.min_year, Some(2001));
        assert_eq!(config.mining.attributes, vec![Attribute::State, Attribute::Season]);
        assert!(config.mining.include_unknown);
        assert_eq!(
            config.database.path,
            Some(PathBuf::from("out/warehouse.duckdb"))
        );
    }

    #[test]
    fn unknown_attributes_are_parse_errors() {
        let err = Config::parse(
            "[mining]\nattributes = [\"colour\"]\n",
            Path::new("bad.toml"),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }
}
