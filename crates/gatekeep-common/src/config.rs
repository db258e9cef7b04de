//! File-based configuration.
//!
//! ## Example Configuration
//!
//! ```toml
//! base_address = "https://api.example.com"
//! timeout_seconds = 30
//! user_agent = "gatekeep"
//!
//! [anonymous]
//! paths = ["/public"]
//!
//! [anonymous.methods]
//! "/admin" = ["*"]
//!
//! [health]
//! freshness_seconds = 1800
//! ```

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::options::HttpClientOptions;
use crate::rules::AnonymousRules;

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    /// The file is not valid TOML for this schema.
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// The file parsed but a value is unusable.
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Complete client configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatekeepConfig {
    /// Transport inputs.
    #[serde(flatten)]
    pub client: HttpClientOptions,

    /// Anonymous-path rules applied to authenticated requests.
    #[serde(default)]
    pub anonymous: AnonymousRules,

    /// Health probing settings.
    #[serde(default)]
    pub health: HealthSettings,
}

/// Health probing settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthSettings {
    /// Maximum age of a cached probe result, in seconds (default: 1800).
    #[serde(default = "default_freshness_seconds")]
    pub freshness_seconds: u64,
}

impl Default for HealthSettings {
    fn default() -> Self {
        Self {
            freshness_seconds: default_freshness_seconds(),
        }
    }
}

impl HealthSettings {
    /// The freshness window as a [`Duration`].
    #[must_use]
    pub const fn freshness_window(&self) -> Duration {
        Duration::from_secs(self.freshness_seconds)
    }
}

const fn default_freshness_seconds() -> u64 {
    1800 // 30 minutes
}

impl GatekeepConfig {
    /// Creates a configuration for `base_address` with default settings.
    pub fn new(base_address: impl Into<String>) -> Self {
        Self {
            client: HttpClientOptions::new(base_address),
            anonymous: AnonymousRules::default(),
            health: HealthSettings::default(),
        }
    }

    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// Returns an error if the document does not parse or fails validation.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads and validates a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, does not parse, or fails
    /// validation.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::Invalid(format!(
                "Configuration file not found: {}",
                path.display()
            )));
        }

        let contents = fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the base address is blank or not an absolute URL.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.client.base_address.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "base_address must not be empty".to_string(),
            ));
        }

        self.client.base_url().map_err(|e| {
            ConfigError::Invalid(format!(
                "base_address '{}' is not an absolute URL: {e}",
                self.client.base_address
            ))
        })?;

        Ok(())
    }
}
