//! Client configuration
//!
//! Connection settings for a portal, loaded from YAML (or JSON, which YAML
//! parses as well) once at startup and immutable afterwards.

use crate::error::{Error, Result};
use crate::transport::{HttpCallerConfig, RateLimiterConfig};
use crate::types::BackoffType;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use url::Url;

// ============================================================================
// Client Config
// ============================================================================

/// Connection settings of one portal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Inbound webhook URL, e.g. `https://acme.bitrix24.com/rest/1/abc123/`
    pub webhook_url: String,

    /// OAuth access token, sent as the `auth` parameter
    #[serde(default)]
    pub access_token: Option<String>,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// Maximum number of retries of a failed round trip
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Retry backoff configuration
    #[serde(default)]
    pub retry_backoff: BackoffConfig,

    /// Client-side request budget, `null` disables it
    #[serde(default = "default_rate_limit")]
    pub rate_limit: Option<RateLimiterConfig>,

    /// User agent string
    #[serde(default)]
    pub user_agent: Option<String>,
}

fn default_timeout() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    3
}

fn default_rate_limit() -> Option<RateLimiterConfig> {
    Some(RateLimiterConfig::default())
}

/// Backoff configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackoffConfig {
    /// Type of backoff
    #[serde(rename = "type", default)]
    pub backoff_type: BackoffType,

    /// Initial delay in milliseconds
    #[serde(default = "default_initial_ms")]
    pub initial_ms: u64,

    /// Maximum delay in milliseconds
    #[serde(default = "default_max_ms")]
    pub max_ms: u64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            backoff_type: BackoffType::Exponential,
            initial_ms: default_initial_ms(),
            max_ms: default_max_ms(),
        }
    }
}

fn default_initial_ms() -> u64 {
    500
}

fn default_max_ms() -> u64 {
    30000
}

impl ClientConfig {
    /// Create a config with defaults for everything but the webhook URL
    pub fn new(webhook_url: impl Into<String>) -> Self {
        Self {
            webhook_url: webhook_url.into(),
            access_token: None,
            timeout_seconds: default_timeout(),
            max_retries: default_max_retries(),
            retry_backoff: BackoffConfig::default(),
            rate_limit: default_rate_limit(),
            user_agent: None,
        }
    }

    /// Create a new config builder
    pub fn builder(webhook_url: impl Into<String>) -> ClientConfigBuilder {
        ClientConfigBuilder {
            config: Self::new(webhook_url),
        }
    }

    /// Load and validate a config file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            Error::config(format!(
                "Failed to read config file '{}': {e}",
                path.display()
            ))
        })?;
        Self::from_yaml_str(&content)
    }

    /// Parse and validate a YAML (or JSON) document
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Check the settings for consistency
    pub fn validate(&self) -> Result<()> {
        if self.webhook_url.trim().is_empty() {
            return Err(Error::missing_field("webhook_url"));
        }

        let url = Url::parse(&self.webhook_url)?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(Error::config(format!(
                "webhook_url must be http or https, got '{}'",
                url.scheme()
            )));
        }

        if self.timeout_seconds == 0 {
            return Err(Error::config("timeout_seconds must be positive"));
        }

        if self.retry_backoff.initial_ms > self.retry_backoff.max_ms {
            return Err(Error::config(
                "retry_backoff.initial_ms must not exceed retry_backoff.max_ms",
            ));
        }

        if let Some(ref limit) = self.rate_limit {
            if limit.requests_per_second == 0 || limit.burst_size == 0 {
                return Err(Error::config(
                    "rate_limit values must be positive, use null to disable it",
                ));
            }
        }

        Ok(())
    }

    /// Settings of the HTTP transport
    pub fn caller_config(&self) -> Result<HttpCallerConfig> {
        self.validate()?;

        let mut config = HttpCallerConfig::new(Url::parse(&self.webhook_url)?);
        config.access_token.clone_from(&self.access_token);
        config.timeout = Duration::from_secs(self.timeout_seconds);
        config.max_retries = self.max_retries;
        config.backoff_type = self.retry_backoff.backoff_type;
        config.initial_backoff = Duration::from_millis(self.retry_backoff.initial_ms);
        config.max_backoff = Duration::from_millis(self.retry_backoff.max_ms);
        config.rate_limit.clone_from(&self.rate_limit);
        if let Some(ref agent) = self.user_agent {
            config.user_agent.clone_from(agent);
        }
        Ok(config)
    }
}

/// Builder for client config
#[derive(Debug)]
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    /// Set the access token
    pub fn access_token(mut self, token: impl Into<String>) -> Self {
        self.config.access_token = Some(token.into());
        self
    }

    /// Set the request timeout in seconds
    pub fn timeout_seconds(mut self, seconds: u64) -> Self {
        self.config.timeout_seconds = seconds;
        self
    }

    /// Set max retries
    pub fn max_retries(mut self, retries: u32) -> Self {
        self.config.max_retries = retries;
        self
    }

    /// Set backoff configuration
    pub fn backoff(mut self, backoff_type: BackoffType, initial_ms: u64, max_ms: u64) -> Self {
        self.config.retry_backoff = BackoffConfig {
            backoff_type,
            initial_ms,
            max_ms,
        };
        self
    }

    /// Set rate limiter
    pub fn rate_limit(mut self, config: RateLimiterConfig) -> Self {
        self.config.rate_limit = Some(config);
        self
    }

    /// Disable rate limiting
    pub fn no_rate_limit(mut self) -> Self {
        self.config.rate_limit = None;
        self
    }

    /// Set user agent
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.config.user_agent = Some(agent.into());
        self
    }

    /// Validate and build the config
    pub fn build(self) -> Result<ClientConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
