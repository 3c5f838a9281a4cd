//! Registry client configuration

use serde::Deserialize;
use std::env;
use std::time::Duration;
use url::Url;

use crate::error::{ClientError, Result};

pub const ENV_REGISTRY_URL: &str = "CALLSYNC_REGISTRY_URL";
pub const ENV_REQUEST_TIMEOUT_MS: &str = "CALLSYNC_REQUEST_TIMEOUT_MS";
pub const ENV_TOKEN: &str = "CALLSYNC_TOKEN";

/// Where the registry lives and how to talk to it
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Base URL; API paths are resolved against it
    pub base_url: String,
    pub request_timeout_ms: u64,
    /// Bearer token issued by the registry
    #[serde(skip)]
    pub token: Option<String>,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".to_string(),
            request_timeout_ms: 10_000,
            token: None,
        }
    }
}

impl RegistryConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Parsed base URL
    pub fn url(&self) -> Result<Url> {
        let url = Url::parse(&self.base_url)
            .map_err(|e| ClientError::config("base_url", e.to_string()))?;
        if url.cannot_be_a_base() {
            return Err(ClientError::config("base_url", "URL cannot be a base"));
        }
        Ok(url)
    }

    pub fn validate(&self) -> Result<()> {
        self.url()?;
        if self.request_timeout_ms == 0 {
            return Err(ClientError::config("request_timeout_ms", "must be greater than zero"));
        }
        Ok(())
    }

    /// Load configuration from environment, falling back to defaults
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(url) = env::var(ENV_REGISTRY_URL) {
            config.base_url = url;
        }
        if let Ok(raw) = env::var(ENV_REQUEST_TIMEOUT_MS) {
            config.request_timeout_ms = raw
                .trim()
                .parse()
                .map_err(|e: std::num::ParseIntError| ClientError::config(ENV_REQUEST_TIMEOUT_MS, e.to_string()))?;
        }
        if let Ok(token) = env::var(ENV_TOKEN) {
            if !token.trim().is_empty() {
                config.token = Some(token.trim().to_string());
            }
        }

        config.validate()?;
        Ok(config)
    }
}
