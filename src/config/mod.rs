//! Configuration module for pieces
//!
//! Manages the database location, logging level, paging default and the
//! per-type refinements. Configuration is stored in the user's config
//! directory as TOML and may be overridden with `PIECES_*` environment
//! variables.

mod types;

pub use types::PieceTypeConfig;

use crate::list::DEFAULT_PER_PAGE;
use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Application configuration structure
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct PiecesConfig {
    /// Directory of the sled database
    #[serde(default)]
    pub database: Option<PathBuf>,

    /// Log filter used when `RUST_LOG` is not set
    #[serde(default)]
    pub log_level: Option<String>,

    /// Page size for types that do not set their own
    #[serde(default = "default_per_page")]
    pub per_page: usize,

    /// Per-type refinements keyed by type name
    #[serde(default)]
    pub types: BTreeMap<String, PieceTypeConfig>,
}

const fn default_per_page() -> usize {
    DEFAULT_PER_PAGE
}

impl Default for PiecesConfig {
    fn default() -> Self {
        Self {
            database: None,
            log_level: None,
            per_page: DEFAULT_PER_PAGE,
            types: BTreeMap::new(),
        }
    }
}

impl PiecesConfig {
    /// Get the path to the config file
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the system config directory cannot be determined.
    pub fn config_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| ConfigError::Message("Could not determine config directory".to_string()))?;
        Ok(config_dir.join("pieces").join("config.toml"))
    }

    /// Load configuration from the default location
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the config file cannot be read or parsed.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load configuration from `path`, layered with the environment
    ///
    /// A missing file yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file exists but cannot be parsed.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::from(path).format(FileFormat::Toml).required(false))
            .add_source(Environment::with_prefix("PIECES").separator("__").try_parsing(true))
            .build()?;

        settings.try_deserialize()
    }

    /// Save configuration to `path`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the config directory cannot be created, the configuration
    /// cannot be serialized to TOML, or the file cannot be written.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| ConfigError::Message(format!("Failed to create config directory: {e}")))?;
        }

        let toml_string = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::Message(format!("Failed to serialize config: {e}")))?;

        fs::write(path, toml_string)
            .map_err(|e| ConfigError::Message(format!("Failed to write config file: {e}")))?;

        Ok(())
    }

    /// The configured database directory, or `<data dir>/pieces/db`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if no database is configured and the system
    /// data directory cannot be determined.
    pub fn database_path(&self) -> Result<PathBuf, ConfigError> {
        if let Some(path) = &self.database {
            return Ok(path.clone());
        }
        dirs::data_local_dir()
            .map(|dir| dir.join("pieces").join("db"))
            .ok_or_else(|| ConfigError::Message("Could not determine data directory".to_string()))
    }

    /// Refinements for one type; unconfigured types get the defaults
    #[must_use]
    pub fn type_config(&self, name: &str) -> PieceTypeConfig {
        self.types.get(name).cloned().unwrap_or_default()
    }
}
