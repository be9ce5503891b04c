//! Default endpoints and client configuration.

use std::time::Duration;

use reqwest::Url;
use serde::Deserialize;

use crate::{error::GoldKitError, Environment};

const STAGING_BASE_URL: &str = "https://api.stage.goldsavings.app";
const PRODUCTION_BASE_URL: &str = "https://api.goldsavings.app";

const DEFAULT_TIMEOUT_SECS: u64 = 15;
const DEFAULT_MAX_RETRIES: u32 = 2;

/// Connection settings for the remote API.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, uniffi::Record)]
pub struct ApiConfig {
    /// Base URL without a trailing slash, e.g. `https://api.goldsavings.app`.
    pub base_url: String,
    /// Per-request timeout.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Retries for transient failures (total attempts = `max_retries + 1`).
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

const fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

const fn default_max_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}

impl ApiConfig {
    /// Builds a config for `base_url` with default timeout and retries.
    ///
    /// # Errors
    /// Returns [`GoldKitError::InvalidInput`] if the URL does not parse or is
    /// plain HTTP to a non-loopback host.
    pub fn new(base_url: &str) -> Result<Self, GoldKitError> {
        let config = Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            max_retries: DEFAULT_MAX_RETRIES,
        };
        config.validate()?;
        Ok(config)
    }

    /// Default configuration for a deployment.
    #[must_use]
    pub fn from_environment(environment: Environment) -> Self {
        let base_url = match environment {
            Environment::Staging => STAGING_BASE_URL,
            Environment::Production => PRODUCTION_BASE_URL,
        };
        Self {
            base_url: base_url.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }

    /// Parses a JSON config such as `{"base_url": "...", "timeout_secs": 10}`.
    ///
    /// # Errors
    /// Returns [`GoldKitError::InvalidInput`] on malformed JSON or an
    /// unacceptable base URL.
    pub fn from_json(json: &str) -> Result<Self, GoldKitError> {
        let mut config: Self =
            serde_json::from_str(json).map_err(|e| GoldKitError::InvalidInput {
                attribute: "config".to_string(),
                reason: e.to_string(),
            })?;
        config.base_url = config.base_url.trim_end_matches('/').to_string();
        config.validate()?;
        Ok(config)
    }

    /// Request timeout as a [`Duration`].
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Joins `path` (which must start with `/`) onto the base URL.
    #[must_use]
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn validate(&self) -> Result<(), GoldKitError> {
        let url = Url::parse(&self.base_url).map_err(|e| GoldKitError::InvalidInput {
            attribute: "base_url".to_string(),
            reason: e.to_string(),
        })?;
        match url.scheme() {
            "https" => Ok(()),
            "http" if is_loopback(&url) => Ok(()),
            scheme => Err(GoldKitError::InvalidInput {
                attribute: "base_url".to_string(),
                reason: format!("scheme `{scheme}` is not allowed, use https"),
            }),
        }
    }
}

fn is_loopback(url: &Url) -> bool {
    matches!(
        url.host_str(),
        Some("localhost" | "127.0.0.1" | "[::1]" | "::1")
    )
}
