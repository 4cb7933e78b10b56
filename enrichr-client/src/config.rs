//! Configuration resolution for enrichr-client
//!
//! Each setting resolves with priority ENV → TOML → compiled default.

use crate::error::{EnrichError, EnrichResult};
use enrichr_common::config::{load_config, TomlConfig};
use enrichr_common::{Error, Result};
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};
use url::Url;

pub const SERVICE_URL_ENV: &str = "ENRICHR_SERVICE_URL";
pub const IDLE_TIMEOUT_ENV: &str = "ENRICHR_IDLE_TIMEOUT_SECS";

const DEFAULT_SERVICE_URL: &str = "http://localhost:8501";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 120;
const DEFAULT_EVENT_CAPACITY: usize = 100;

/// Streaming channel path on the enrichment service
const CHANNEL_PATH: &str = "/ws";

/// Resolved client configuration
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// Base URL of the enrichment service
    pub service_url: Url,
    /// Timeout applied to one-shot HTTP requests
    pub request_timeout: Duration,
    /// Maximum silence while awaiting progress; `None` waits forever
    pub idle_timeout: Option<Duration>,
    /// Event bus capacity
    pub event_capacity: usize,
    /// Use `POST /upload` to project rows instead of projecting locally
    pub server_side_projection: bool,
}

impl ClientConfig {
    /// Compiled defaults, pointing at a local service
    pub fn defaults() -> Result<Self> {
        Self::with_service_url(DEFAULT_SERVICE_URL)
    }

    /// Build a config pointing at `service_url` with all other settings defaulted
    pub fn with_service_url(service_url: &str) -> Result<Self> {
        Ok(Self {
            service_url: parse_service_url(service_url)?,
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            idle_timeout: Some(Duration::from_secs(DEFAULT_IDLE_TIMEOUT_SECS)),
            event_capacity: DEFAULT_EVENT_CAPACITY,
            server_side_projection: false,
        })
    }

    /// Load the TOML file (explicit path → `ENRICHR_CONFIG` → config dir) and resolve
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        let toml_config = load_config(explicit_path)?;
        Self::resolve(&toml_config)
    }

    /// Resolve configuration from environment and TOML
    pub fn resolve(toml_config: &TomlConfig) -> Result<Self> {
        let mut config = Self::defaults()?;

        // Service URL: ENV → TOML → default
        let env_url = std::env::var(SERVICE_URL_ENV)
            .ok()
            .filter(|v| !v.trim().is_empty());
        if let Some(url) = env_url {
            config.service_url = parse_service_url(&url)?;
            info!("Service URL loaded from environment: {}", config.service_url);
        } else if let Some(url) = &toml_config.service_url {
            config.service_url = parse_service_url(url)?;
            info!("Service URL loaded from TOML config: {}", config.service_url);
        } else {
            info!("Using default service URL: {}", config.service_url);
        }

        if let Some(secs) = toml_config.request_timeout_secs {
            config.request_timeout = Duration::from_secs(secs);
        }

        // Idle timeout: ENV → TOML → default, 0 disables
        let idle_secs = match std::env::var(IDLE_TIMEOUT_ENV) {
            Ok(raw) => Some(raw.trim().parse::<u64>().map_err(|_| {
                Error::Config(format!("{} must be a number of seconds, got '{}'", IDLE_TIMEOUT_ENV, raw))
            })?),
            Err(_) => toml_config.idle_timeout_secs,
        };
        if let Some(secs) = idle_secs {
            config.idle_timeout = (secs > 0).then_some(Duration::from_secs(secs));
            if config.idle_timeout.is_none() {
                warn!("Idle timeout disabled: an unresponsive service will stall bulk jobs");
            }
        }

        if let Some(server_side) = toml_config.server_side_projection {
            config.server_side_projection = server_side;
        }

        Ok(config)
    }

    /// URL of a one-shot endpoint such as `/icp_enrich`
    pub fn endpoint(&self, path: &str) -> EnrichResult<Url> {
        self.service_url
            .join(path)
            .map_err(|e| EnrichError::Common(Error::Config(format!("Invalid endpoint {}: {}", path, e))))
    }

    /// URL of the streaming channel (`http` → `ws`, `https` → `wss`)
    pub fn channel_url(&self) -> EnrichResult<Url> {
        let mut url = self.endpoint(CHANNEL_PATH)?;
        let scheme = match url.scheme() {
            "https" => "wss",
            _ => "ws",
        };
        url.set_scheme(scheme).map_err(|_| {
            EnrichError::Common(Error::Config(format!("Cannot derive channel URL from {}", self.service_url)))
        })?;
        Ok(url)
    }
}

fn parse_service_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw.trim())
        .map_err(|e| Error::Config(format!("Invalid service URL '{}': {}", raw, e)))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(Error::Config(format!(
            "Service URL must use http or https, got '{}'",
            other
        ))),
    }
}
