//! Configuration loading and path resolution
//!
//! Resolution priority for every path setting:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. OS-dependent compiled default (fallback)
//!
//! A missing TOML file at the default location is not an error: a warning is
//! logged and compiled defaults are used. A config file named explicitly
//! (command line or `IELTS_CONFIG`) must exist and parse.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable overriding the database file path
pub const ENV_DATABASE: &str = "IELTS_DATABASE";
/// Environment variable overriding the root data folder
pub const ENV_ROOT_FOLDER: &str = "IELTS_ROOT_FOLDER";
/// Environment variable naming an explicit TOML config file
pub const ENV_CONFIG: &str = "IELTS_CONFIG";

/// Database file name inside the root folder
pub const DATABASE_FILE_NAME: &str = "ielts.db";

/// Default bounded attempt count for a single document write
pub const DEFAULT_MAX_WRITE_ATTEMPTS: u32 = 3;

/// Bootstrap configuration loaded from TOML
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    /// Path to the SQLite database file
    #[serde(default)]
    pub database_path: Option<PathBuf>,

    /// Root folder holding the database when `database_path` is not set
    #[serde(default)]
    pub root_folder: Option<PathBuf>,

    /// Default directory for collection batch files
    #[serde(default)]
    pub collections_dir: Option<PathBuf>,

    /// Attempts per document write before counting it as skipped
    #[serde(default)]
    pub max_write_attempts: Option<u32>,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl TomlConfig {
    /// Parse a TOML config file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Cannot read config file {}: {}", path.display(), e))
        })?;
        Self::parse(&content)
            .map_err(|e| Error::Config(format!("Invalid config file {}: {}", path.display(), e)))
    }

    /// Parse TOML text
    pub fn parse(content: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Load the explicitly named config file, or fall back to the default
    /// location, or to compiled defaults when neither exists.
    pub fn load_or_default(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }

        if let Ok(path) = std::env::var(ENV_CONFIG) {
            return Self::load(Path::new(&path));
        }

        match default_config_path() {
            Some(path) if path.exists() => {
                info!("Loading config from {}", path.display());
                Self::load(&path)
            }
            Some(path) => {
                warn!(
                    "Config file {} not found, using compiled defaults",
                    path.display()
                );
                Ok(Self::default())
            }
            None => {
                warn!("Could not determine config directory, using compiled defaults");
                Ok(Self::default())
            }
        }
    }
}

/// Default config file location (`~/.config/ielts/config.toml` on Linux)
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("ielts").join("config.toml"))
}

/// OS-dependent default root folder
pub fn default_root_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("ielts"))
        .unwrap_or_else(|| PathBuf::from("./ielts_data"))
}

/// Fully resolved settings for one run
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub database_path: PathBuf,
    pub collections_dir: PathBuf,
    pub max_write_attempts: u32,
    pub log_level: String,
}

impl ResolvedConfig {
    /// Resolve settings from the command line, environment and TOML config
    pub fn resolve(cli_database: Option<&Path>, toml: &TomlConfig) -> Result<Self> {
        let database_path = resolve_database_path(cli_database, toml);

        let max_write_attempts = toml
            .max_write_attempts
            .unwrap_or(DEFAULT_MAX_WRITE_ATTEMPTS);
        if max_write_attempts == 0 {
            return Err(Error::Config(
                "max_write_attempts must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            database_path,
            collections_dir: toml
                .collections_dir
                .clone()
                .unwrap_or_else(|| PathBuf::from("export/collections")),
            max_write_attempts,
            log_level: toml.logging.level.clone(),
        })
    }
}

/// Database path resolution: CLI → `IELTS_DATABASE` → TOML `database_path`
/// → `<root folder>/ielts.db`
pub fn resolve_database_path(cli_arg: Option<&Path>, toml: &TomlConfig) -> PathBuf {
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    if let Ok(path) = std::env::var(ENV_DATABASE) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }

    if let Some(path) = &toml.database_path {
        return path.clone();
    }

    resolve_root_folder(toml).join(DATABASE_FILE_NAME)
}

/// Root folder resolution: `IELTS_ROOT_FOLDER` → TOML `root_folder` → default
pub fn resolve_root_folder(toml: &TomlConfig) -> PathBuf {
    if let Ok(path) = std::env::var(ENV_ROOT_FOLDER) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }

    if let Some(path) = &toml.root_folder {
        return path.clone();
    }

    default_root_folder()
}
