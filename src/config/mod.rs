//! Configuration management.
//!
//! Supports configuration from:
//! - TOML config files
//! - Environment variables
//! - CLI arguments (for the `bmp` binary)

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::client::{DEFAULT_TIMEOUT_SECS, REMOTE_HOST};
use crate::error::{BmpError, Result};

/// Client configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base URL of the BMP service
    pub host: String,

    /// API key sent with every request
    pub api_key: Option<String>,

    /// Request timeout in seconds
    pub timeout_secs: u64,

    /// BMP protocol version sent with sensor calls
    pub bmp_version: String,

    /// Application package sent with sensor calls
    pub app_package: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: REMOTE_HOST.to_string(),
            api_key: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            bmp_version: String::new(),
            app_package: String::new(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let content = std::fs::read_to_string(&path)
            .map_err(|e| BmpError::Config(format!("Failed to read config file: {e}")))?;

        toml::from_str(&content)
            .map_err(|e| BmpError::Config(format!("Failed to parse config: {e}")))
    }

    /// Default config file location (`<config dir>/bmp/config.toml`)
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("bmp").join("config.toml"))
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(host) = std::env::var("BMP_HOST") {
            config.host = host;
        }
        if let Ok(api_key) = std::env::var("BMP_API_KEY") {
            config.api_key = Some(api_key);
        }
        if let Ok(secs) = std::env::var("BMP_TIMEOUT_SECS") {
            if let Ok(secs) = secs.parse() {
                config.timeout_secs = secs;
            }
        }
        if let Ok(version) = std::env::var("BMP_VERSION") {
            config.bmp_version = version;
        }
        if let Ok(package) = std::env::var("BMP_APP_PACKAGE") {
            config.app_package = package;
        }

        config
    }

    /// Merge with another config (other takes precedence where it differs from defaults)
    pub fn merge(self, other: Self) -> Self {
        let defaults = Self::default();
        Self {
            host: if other.host == defaults.host {
                self.host
            } else {
                other.host
            },
            api_key: other.api_key.or(self.api_key),
            timeout_secs: if other.timeout_secs == defaults.timeout_secs {
                self.timeout_secs
            } else {
                other.timeout_secs
            },
            bmp_version: if other.bmp_version.is_empty() {
                self.bmp_version
            } else {
                other.bmp_version
            },
            app_package: if other.app_package.is_empty() {
                self.app_package
            } else {
                other.app_package
            },
        }
    }

    /// Request timeout as a duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
