//! Configuration loading and config file resolution
//!
//! Priority order for locating the config file:
//! 1. Command-line argument (highest priority)
//! 2. `DISPATCH_CONFIG` environment variable
//! 3. OS-dependent default path (`~/.config/dispatch/config.toml`)
//!
//! A missing config file never terminates startup; compiled defaults are
//! used with a warning. Only an unreadable or unparseable file is
//! reported as an error to the caller.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming the config file path
pub const CONFIG_ENV_VAR: &str = "DISPATCH_CONFIG";

/// Message broker connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrokerConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub client_id: String,
    pub keep_alive_secs: u64,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 1883,
            username: None,
            password: None,
            client_id: "dispatch-hub".to_string(),
            keep_alive_secs: 30,
        }
    }
}

/// HTTP server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self { port: 5790 }
    }
}

/// External driver-list endpoint
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DriversConfig {
    /// Upstream `GET /drivers` URL; the API proxy is disabled when unset
    pub url: Option<String>,
}

/// Forward geocoding settings (Nominatim-style search endpoint)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeocodeConfig {
    pub base_url: String,
    /// ISO country code restriction for results
    pub country_codes: String,
    /// Maximum number of ranked results returned
    pub limit: u8,
}

impl Default for GeocodeConfig {
    fn default() -> Self {
        Self {
            base_url: "https://nominatim.openstreetmap.org/search".to_string(),
            country_codes: "vn".to_string(),
            limit: 5,
        }
    }
}

/// Top-level service configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    pub broker: BrokerConfig,
    pub http: HttpConfig,
    pub drivers: DriversConfig,
    pub geocode: GeocodeConfig,
}

impl DispatchConfig {
    /// Parse configuration from a TOML string. Missing sections and
    /// fields fall back to their defaults.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("invalid config file: {}", e)))
    }

    /// Load configuration, never failing: a missing file logs a warning
    /// and yields compiled defaults; a present-but-broken file does too.
    pub fn load(cli_path: Option<&Path>) -> Self {
        match Self::try_load(cli_path) {
            Ok(config) => config,
            Err(e) => {
                warn!("Falling back to default configuration: {}", e);
                Self::default()
            }
        }
    }

    fn try_load(cli_path: Option<&Path>) -> Result<Self> {
        let Some(path) = resolve_config_path(cli_path) else {
            info!("No config file found, using compiled defaults");
            return Ok(Self::default());
        };

        info!("Loading configuration from {}", path.display());
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }
}

/// Resolve the config file path following the priority order above.
/// Returns None when no candidate exists on disk (explicit CLI/env paths
/// are returned even when missing, so the failure is visible).
pub fn resolve_config_path(cli_path: Option<&Path>) -> Option<PathBuf> {
    // Priority 1: command-line argument
    if let Some(path) = cli_path {
        return Some(path.to_path_buf());
    }

    // Priority 2: environment variable
    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        return Some(PathBuf::from(path));
    }

    // Priority 3: platform config directory
    let default = dirs::config_dir().map(|d| d.join("dispatch").join("config.toml"))?;
    default.exists().then_some(default)
}
