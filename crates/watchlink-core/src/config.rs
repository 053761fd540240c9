//! Relay configuration.
//!
//! Every field has a default, so an empty JSON object is a valid config:
//!
//! ```json
//! { "maxRecentUrls": 10, "publishOnActivation": true }
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// How many recent meetings the watch is sent by default.
pub const DEFAULT_MAX_RECENT_URLS: usize = 10;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {}: {}", .path.display(), .source)]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RelayConfig {
    /// Upper bound on `recentURLs` entries sent to the watch.
    pub max_recent_urls: usize,

    /// Re-publish the latest context when the watch app becomes activated.
    pub publish_on_activation: bool,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            max_recent_urls: DEFAULT_MAX_RECENT_URLS,
            publish_on_activation: true,
        }
    }
}

impl RelayConfig {
    pub fn builder() -> RelayConfigBuilder {
        RelayConfigBuilder::new()
    }

    /// Parse and validate a JSON config string.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: RelayConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_recent_urls == 0 {
            return Err(ConfigError::Invalid(
                "maxRecentUrls must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Builder for [`RelayConfig`]; unset fields keep their defaults.
#[derive(Debug, Default)]
pub struct RelayConfigBuilder {
    max_recent_urls: Option<usize>,
    publish_on_activation: Option<bool>,
}

impl RelayConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_recent_urls(mut self, max: usize) -> Self {
        self.max_recent_urls = Some(max);
        self
    }

    pub fn publish_on_activation(mut self, enabled: bool) -> Self {
        self.publish_on_activation = Some(enabled);
        self
    }

    pub fn build(self) -> Result<RelayConfig, ConfigError> {
        let defaults = RelayConfig::default();
        let config = RelayConfig {
            max_recent_urls: self.max_recent_urls.unwrap_or(defaults.max_recent_urls),
            publish_on_activation: self
                .publish_on_activation
                .unwrap_or(defaults.publish_on_activation),
        };
        config.validate()?;
        Ok(config)
    }
}
