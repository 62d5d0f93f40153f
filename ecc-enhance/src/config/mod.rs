//! Application configuration
//!
//! Loaded from TOML. Lookup order:
//! 1. `--config <path>` when given
//! 2. `<config_dir>/ecc-enhance/config.toml` when it exists
//! 3. built-in defaults
//!
//! `ECC_DATABASE` (also read from `.env`) overrides `[database] path`.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

const APP_DIR: &str = "ecc-enhance";
const CONFIG_FILE: &str = "config.toml";
const DATABASE_FILE: &str = "ecc_enhance.db";
pub const DATABASE_ENV: &str = "ECC_DATABASE";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub database: DatabaseConfig,
    pub import: ImportLimits,
    pub listing: ListingConfig,
    pub export: ExportConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SQLite database file
    pub path: PathBuf,
    pub max_connections: u32,
}

/// Upper bounds on a single import, so one request cannot block forever
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportLimits {
    pub max_file_bytes: u64,
    pub max_rows: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListingConfig {
    pub default_per_page: u32,
    pub max_per_page: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Directory for generated files; current directory when unset
    pub output_dir: Option<PathBuf>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        let path = dirs::data_dir()
            .map(|dir| dir.join(APP_DIR).join(DATABASE_FILE))
            .unwrap_or_else(|| PathBuf::from(DATABASE_FILE));
        Self {
            path,
            max_connections: 5,
        }
    }
}

impl Default for ImportLimits {
    fn default() -> Self {
        Self {
            max_file_bytes: 10 * 1024 * 1024,
            max_rows: 50_000,
        }
    }
}

impl Default for ListingConfig {
    fn default() -> Self {
        Self {
            default_per_page: 20,
            max_per_page: 100,
        }
    }
}

impl Config {
    /// Default config file location
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_DIR).join(CONFIG_FILE))
    }

    /// Load configuration, falling back to defaults when no file exists
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut config = match explicit {
            Some(path) => Self::from_file(path)?,
            None => match Self::default_path() {
                Some(path) if path.exists() => Self::from_file(&path)?,
                _ => {
                    log::debug!("No config file found, using defaults");
                    Self::default()
                }
            },
        };

        if let Ok(path) = std::env::var(DATABASE_ENV) {
            if !path.trim().is_empty() {
                log::debug!("{} overrides database path: {}", DATABASE_ENV, path);
                config.database.path = PathBuf::from(path);
            }
        }

        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config = Self::parse(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        log::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }
}
