//! Configuration loading and config file resolution
//!
//! Config file resolution priority order:
//! 1. Command-line argument (highest priority)
//! 2. `INSIGHTSIM_CONFIG` environment variable
//! 3. `insightsim.toml` in the working directory (fallback)
//!
//! A missing file is not fatal: the service starts with compiled defaults and
//! logs a warning. A file that exists but cannot be parsed, or holds invalid
//! values, is a configuration error.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::{Error, Result};

/// Environment variable naming the config file
pub const CONFIG_ENV_VAR: &str = "INSIGHTSIM_CONFIG";

/// Config file used when neither CLI nor environment names one
pub const DEFAULT_CONFIG_FILE: &str = "insightsim.toml";

/// Rows per generator transaction unless configured otherwise
pub const DEFAULT_BATCH_SIZE: usize = 10_000;

/// Complete service configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub data: DataConfig,
}

/// HTTP listener settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8888,
        }
    }
}

/// SQLite database location
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("insightsim.db"),
        }
    }
}

/// Inclusive value range for synthetic generation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValueRange {
    pub min: f64,
    pub max: f64,
}

impl Default for ValueRange {
    fn default() -> Self {
        Self {
            min: 1.0,
            max: 10_000.0,
        }
    }
}

impl ValueRange {
    /// Reject ranges where `min >= max` (also catches NaN bounds)
    ///
    /// Bounds must be finite and so must their span, otherwise uniform
    /// sampling over the range is undefined.
    pub fn validate(&self) -> Result<()> {
        if !(self.min.is_finite() && self.max.is_finite()) {
            return Err(Error::InvalidInput(format!(
                "minValue ({}) and maxValue ({}) must be finite",
                self.min, self.max
            )));
        }
        if self.min >= self.max {
            return Err(Error::InvalidInput(format!(
                "minValue ({}) must be less than maxValue ({})",
                self.min, self.max
            )));
        }
        if !(self.max - self.min).is_finite() {
            return Err(Error::InvalidInput(format!(
                "value range [{}, {}] is too wide",
                self.min, self.max
            )));
        }
        Ok(())
    }
}

/// Ingestion and generation defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// Folder scanned by the feed loader for `*.json` files
    pub raw_data_folder: PathBuf,
    /// Optional legacy tag-list file used to seed the tag registry at startup
    pub tag_list_file: Option<PathBuf>,
    pub value_range: ValueRange,
    /// Default generation mode: sequential random walk instead of uniform draws
    pub use_sequential_generation: bool,
    pub generation_start_time: String,
    pub generation_end_time: String,
    /// Rows per generator transaction
    pub generation_batch_size: usize,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            raw_data_folder: PathBuf::from("raw_data"),
            tag_list_file: None,
            value_range: ValueRange::default(),
            use_sequential_generation: false,
            generation_start_time: "2025-12-01T00:00:00".to_string(),
            generation_end_time: "2026-01-31T23:59:59".to_string(),
            generation_batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

impl AppConfig {
    /// Parse and validate TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(content)
            .map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from `path`, falling back to defaults if it is missing
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            warn!(
                "Config file not found: {} - using compiled defaults",
                path.display()
            );
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
        let config = Self::from_toml_str(&content)?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Check cross-field constraints
    pub fn validate(&self) -> Result<()> {
        self.data
            .value_range
            .validate()
            .map_err(|e| Error::Config(format!("invalid value range: {}", e)))?;

        let start = crate::time::parse_timestamp(&self.data.generation_start_time)
            .map_err(|e| Error::Config(format!("generation_start_time: {}", e)))?;
        let end = crate::time::parse_timestamp(&self.data.generation_end_time)
            .map_err(|e| Error::Config(format!("generation_end_time: {}", e)))?;
        if start >= end {
            return Err(Error::Config(format!(
                "generation_start_time ({}) must be before generation_end_time ({})",
                self.data.generation_start_time, self.data.generation_end_time
            )));
        }

        if self.data.generation_batch_size == 0 {
            return Err(Error::Config(
                "generation_batch_size must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }

    /// `host:port` listener address
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

/// Resolve which config file to read
pub fn resolve_config_path(cli_arg: Option<&Path>) -> PathBuf {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }

    // Priority 3: Working-directory default
    PathBuf::from(DEFAULT_CONFIG_FILE)
}
