//! Configuration for talking to the remote modeling service.
//!
//! The core never reads the environment; callers (the CLI, tests) build a
//! [`ServiceConfig`] explicitly.

use serde::{Deserialize, Serialize};

/// Default endpoint of the modeling service (Flask development server).
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:5000";

/// Default timeout for a single request in seconds. The service fits the
/// model inside the `/predict` request.
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

const DEFAULT_USER_AGENT: &str = concat!("fincast/", env!("CARGO_PKG_VERSION"));

/// Connection settings for the modeling service.
///
/// # Example
///
/// ```rust,ignore
/// use fincast::ServiceConfig;
///
/// let config = ServiceConfig::builder()
///     .base_url("http://models.internal:8080")
///     .timeout_secs(120)
///     .build()?;
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Base URL; endpoint paths such as `/predict` are appended to it.
    pub base_url: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
    /// `User-Agent` header sent with every request.
    pub user_agent: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl ServiceConfig {
    pub fn builder() -> ServiceConfigBuilder {
        ServiceConfigBuilder::default()
    }

    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        let url = reqwest::Url::parse(&self.base_url).map_err(|e| {
            ConfigValidationError::InvalidBaseUrl {
                url: self.base_url.clone(),
                reason: e.to_string(),
            }
        })?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigValidationError::InvalidBaseUrl {
                url: self.base_url.clone(),
                reason: format!("unsupported scheme '{}'", url.scheme()),
            });
        }

        if self.timeout_secs == 0 {
            return Err(ConfigValidationError::InvalidTimeout(self.timeout_secs));
        }

        Ok(())
    }

    /// Full URL for an endpoint path, e.g. `endpoint("/predict")`.
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

/// Errors that can occur during configuration validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Invalid base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    #[error("Invalid timeout: {0} seconds (must be at least 1)")]
    InvalidTimeout(u64),
}

/// Builder for [`ServiceConfig`].
#[derive(Debug, Default)]
pub struct ServiceConfigBuilder {
    base_url: Option<String>,
    timeout_secs: Option<u64>,
    user_agent: Option<String>,
}

impl ServiceConfigBuilder {
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = Some(timeout_secs);
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Build and validate the configuration.
    pub fn build(self) -> Result<ServiceConfig, ConfigValidationError> {
        let config = ServiceConfig {
            base_url: self
                .base_url
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            timeout_secs: self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS),
            user_agent: self
                .user_agent
                .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()),
        };
        config.validate()?;
        Ok(config)
    }
}
