//! TOML configuration loading and config file resolution
//!
//! Config file resolution priority:
//! 1. Explicit path supplied by the caller (highest priority)
//! 2. `ENRICHR_CONFIG` environment variable
//! 3. `<platform config dir>/enrichr/config.toml`
//!
//! A missing config file is not an error: a warning is logged and compiled
//! defaults are used.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_PATH_ENV: &str = "ENRICHR_CONFIG";

/// Bootstrap configuration loaded from TOML
///
/// Every field is optional; consumers layer their own environment overrides
/// and compiled defaults on top.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Base URL of the enrichment service (e.g. `http://localhost:8501`)
    #[serde(default)]
    pub service_url: Option<String>,

    /// Timeout for one-shot HTTP requests, in seconds
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,

    /// Idle timeout while waiting for streaming progress, in seconds (0 disables)
    #[serde(default)]
    pub idle_timeout_secs: Option<u64>,

    /// Let the service project uploaded rows instead of projecting locally
    #[serde(default)]
    pub server_side_projection: Option<bool>,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
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

/// Resolve which config file to read
///
/// Returns `None` when no explicit path is given, the environment variable is
/// unset and the platform has no config directory.
pub fn resolve_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    // Priority 1: caller-supplied path
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }

    // Priority 2: environment variable
    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    // Priority 3: platform config directory
    dirs::config_dir().map(|d| d.join("enrichr").join("config.toml"))
}

/// Load a TOML config file
///
/// A missing file yields `TomlConfig::default()`. A file that exists but does
/// not parse is a configuration error.
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    if !path.exists() {
        warn!(
            "Config file not found at {}, using defaults",
            path.display()
        );
        return Ok(TomlConfig::default());
    }

    let content = std::fs::read_to_string(path)?;
    let config: TomlConfig = toml::from_str(&content).map_err(|e| {
        Error::Config(format!("Failed to parse {}: {}", path.display(), e))
    })?;

    info!("Loaded configuration from {}", path.display());
    Ok(config)
}

/// Resolve and load configuration in one step
pub fn load_config(explicit: Option<&Path>) -> Result<TomlConfig> {
    match resolve_config_path(explicit) {
        Some(path) => load_toml_config(&path),
        None => {
            warn!("No config directory available on this platform, using defaults");
            Ok(TomlConfig::default())
        }
    }
}
