//! HTTP remote caller with retry and rate limiting
//!
//! Provides the default [`RemoteCaller`], which handles:
//! - Automatic retries with configurable backoff
//! - Rate limiting to stay inside the portal's request budget
//! - Classification of `{error, error_description}` bodies

use super::encode::encode_command;
use super::rate_limit::{RateLimiterConfig, RequestBudget};
use crate::batch::Command;
use crate::error::{Error, Result};
use crate::remote::{ApiResponse, BatchResponse, RemoteCaller};
use crate::types::{BackoffType, Params, BATCH_METHOD};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::{json, Map, Value};
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Configuration for the HTTP caller
#[derive(Debug, Clone)]
pub struct HttpCallerConfig {
    /// Webhook or REST base URL, methods are appended as `{method}.json`
    pub webhook_url: Url,
    /// OAuth access token, sent as the `auth` parameter
    pub access_token: Option<String>,
    /// Request timeout
    pub timeout: Duration,
    /// Maximum number of retries
    pub max_retries: u32,
    /// Initial delay for backoff
    pub initial_backoff: Duration,
    /// Maximum delay for backoff
    pub max_backoff: Duration,
    /// Type of backoff strategy
    pub backoff_type: BackoffType,
    /// Rate limiter configuration
    pub rate_limit: Option<RateLimiterConfig>,
    /// User agent string
    pub user_agent: String,
}

impl HttpCallerConfig {
    /// Create a config with defaults for everything but the URL
    pub fn new(webhook_url: Url) -> Self {
        Self {
            webhook_url,
            access_token: None,
            timeout: Duration::from_secs(30),
            max_retries: 3,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(30),
            backoff_type: BackoffType::Exponential,
            rate_limit: Some(RateLimiterConfig::default()),
            user_agent: format!("crm-batch-sdk/{}", env!("CARGO_PKG_VERSION")),
        }
    }

    /// Create a new config builder
    pub fn builder(webhook_url: &str) -> Result<HttpCallerConfigBuilder> {
        Ok(HttpCallerConfigBuilder {
            config: Self::new(Url::parse(webhook_url)?),
        })
    }
}

/// Builder for HTTP caller config
#[derive(Debug)]
pub struct HttpCallerConfigBuilder {
    config: HttpCallerConfig,
}

impl HttpCallerConfigBuilder {
    /// Set the access token
    pub fn access_token(mut self, token: impl Into<String>) -> Self {
        self.config.access_token = Some(token.into());
        self
    }

    /// Set the request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Set max retries
    pub fn max_retries(mut self, retries: u32) -> Self {
        self.config.max_retries = retries;
        self
    }

    /// Set backoff configuration
    pub fn backoff(mut self, backoff_type: BackoffType, initial: Duration, max: Duration) -> Self {
        self.config.backoff_type = backoff_type;
        self.config.initial_backoff = initial;
        self.config.max_backoff = max;
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
        self.config.user_agent = agent.into();
        self
    }

    /// Build the config
    pub fn build(self) -> HttpCallerConfig {
        self.config
    }
}

/// Remote caller speaking the CRM REST protocol over HTTP
pub struct HttpCaller {
    client: Client,
    config: HttpCallerConfig,
    budget: Option<RequestBudget>,
}

impl HttpCaller {
    /// Create a new caller
    pub fn new(config: HttpCallerConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()?;

        let budget = config.rate_limit.as_ref().map(RequestBudget::new);

        Ok(Self {
            client,
            config,
            budget,
        })
    }

    /// Caller configuration
    pub fn config(&self) -> &HttpCallerConfig {
        &self.config
    }

    /// Check if rate limiting is enabled
    pub fn has_request_budget(&self) -> bool {
        self.budget.is_some()
    }

    /// Endpoint URL of a method
    pub fn method_url(&self, method: &str) -> Result<Url> {
        let base = self.config.webhook_url.as_str().trim_end_matches('/');
        Ok(Url::parse(&format!("{base}/{method}.json"))?)
    }

    /// POST a method call and return the decoded response body.
    ///
    /// Transport failures are retried with backoff; any `{error}` body is
    /// returned as is without retrying.
    async fn post(&self, method: &str, mut body: Map<String, Value>) -> Result<ApiResponse> {
        let url = self.method_url(method)?;
        if let Some(ref token) = self.config.access_token {
            body.insert("auth".to_string(), Value::String(token.clone()));
        }
        let body = Value::Object(body);
        let max_retries = self.config.max_retries;

        let mut attempt = 0;

        loop {
            if let Some(ref budget) = self.budget {
                budget.acquire().await;
            }

            match self.client.post(url.clone()).json(&body).send().await {
                Ok(response) => {
                    let status = response.status();
                    let text = response.text().await?;

                    // Remote errors arrive with 4xx and 5xx statuses alike
                    if let Ok(decoded) = serde_json::from_str::<Value>(&text) {
                        if decoded.get("error").is_some() {
                            return ApiResponse::from_body(decoded);
                        }
                        if status.is_success() {
                            debug!("{method} succeeded");
                            return ApiResponse::from_body(decoded);
                        }
                    }

                    if is_retryable_status(status) && attempt < max_retries {
                        let delay = self.calculate_backoff(attempt);
                        warn!(
                            "{method} failed with {}, attempt {}/{}, retrying in {:?}",
                            status.as_u16(),
                            attempt + 1,
                            max_retries + 1,
                            delay
                        );
                        tokio::time::sleep(delay).await;
                        attempt += 1;
                        continue;
                    }

                    if status.is_success() {
                        return Err(Error::decode(format!("{method} returned a non-JSON body")));
                    }
                    return Err(Error::http_status(status.as_u16(), text));
                }
                Err(e) => {
                    if e.is_timeout() {
                        #[allow(clippy::cast_possible_truncation)]
                        let timeout_ms = self.config.timeout.as_millis() as u64;
                        if attempt < max_retries {
                            let delay = self.calculate_backoff(attempt);
                            warn!(
                                "{method} timed out, attempt {}/{}, retrying in {:?}",
                                attempt + 1,
                                max_retries + 1,
                                delay
                            );
                            tokio::time::sleep(delay).await;
                            attempt += 1;
                            continue;
                        }
                        return Err(Error::Timeout { timeout_ms });
                    }

                    if e.is_connect() && attempt < max_retries {
                        let delay = self.calculate_backoff(attempt);
                        warn!(
                            "Connection error on {method}, attempt {}/{}, retrying in {:?}",
                            attempt + 1,
                            max_retries + 1,
                            delay
                        );
                        tokio::time::sleep(delay).await;
                        attempt += 1;
                        continue;
                    }

                    return Err(Error::Http(e));
                }
            }
        }
    }

    /// Calculate backoff delay for a given attempt
    pub fn calculate_backoff(&self, attempt: u32) -> Duration {
        let delay = match self.config.backoff_type {
            BackoffType::Constant => self.config.initial_backoff,
            BackoffType::Linear => self.config.initial_backoff * (attempt + 1),
            BackoffType::Exponential => {
                let factor = 2u32.saturating_pow(attempt);
                self.config.initial_backoff.saturating_mul(factor)
            }
        };

        std::cmp::min(delay, self.config.max_backoff)
    }
}

#[async_trait]
impl RemoteCaller for HttpCaller {
    async fn call(&self, method: &str, params: &Params) -> Result<ApiResponse> {
        self.post(method, params.clone()).await
    }

    async fn call_batch(&self, commands: &[Command], parallel: bool) -> Result<BatchResponse> {
        let cmd: Map<String, Value> = commands
            .iter()
            .map(|command| (command.key().wire_key(), Value::String(encode_command(command))))
            .collect();

        let mut body = Map::new();
        body.insert("halt".to_string(), json!(0));
        body.insert("cmd".to_string(), Value::Object(cmd));
        if parallel {
            body.insert("parallel".to_string(), json!(1));
        }

        debug!("Sending batch of {} commands", commands.len());
        let response = self.post(BATCH_METHOD, body).await?;
        BatchResponse::from_result(&response.result, response.time)
    }
}

impl std::fmt::Debug for HttpCaller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpCaller")
            .field("webhook_url", &self.config.webhook_url.as_str())
            .field("has_access_token", &self.config.access_token.is_some())
            .field("has_request_budget", &self.budget.is_some())
            .finish_non_exhaustive()
    }
}

/// Check if an HTTP status is retryable
fn is_retryable_status(status: StatusCode) -> bool {
    matches!(status.as_u16(), 500 | 502 | 503 | 504)
}
