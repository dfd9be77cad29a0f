//! HTTP client for the chat-completions endpoint
//!
//! # Retry policy
//!
//! Transport failures (connect errors, timeouts) and retryable statuses
//! (429 and 5xx) are retried with exponential backoff up to
//! [`RetryPolicy::max_attempts`] total attempts. When the budget runs out on a
//! retryable status, the last response is returned as-is so the caller can
//! degrade it; when it runs out on a transport failure, an error is returned.

use async_trait::async_trait;
use reqwest::{header, Client, StatusCode};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, warn};

use super::types::{ChatRequest, CompletionResponse};

/// Default base URL of the inference service
pub const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";

/// Default per-request timeout (in seconds)
const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Default total attempts per call
const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default delay before the first retry (in milliseconds)
const DEFAULT_INITIAL_BACKOFF_MS: u64 = 500;

/// Upper bound for a single backoff delay (in milliseconds)
const DEFAULT_MAX_BACKOFF_MS: u64 = 8_000;

/// Errors that prevent a call from producing any response
#[derive(Error, Debug)]
pub enum InferenceError {
    #[error("Failed to build HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),

    #[error("Inference request timed out after {attempts} attempt(s)")]
    Timeout { attempts: u32 },

    #[error("Inference request failed after {attempts} attempt(s): {source}")]
    Transport {
        attempts: u32,
        #[source]
        source: reqwest::Error,
    },

    #[error("Failed to read inference response body: {0}")]
    Body(#[source] reqwest::Error),
}

/// Anything that can answer a chat-completions request.
///
/// Implemented by [`OpenAiClient`] for production and by in-memory fakes in
/// tests.
#[async_trait]
pub trait InferenceService: Send + Sync {
    async fn complete(&self, request: &ChatRequest) -> Result<CompletionResponse, InferenceError>;
}

/// Bounded exponential backoff
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one (treated as at least 1)
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            initial_backoff: Duration::from_millis(DEFAULT_INITIAL_BACKOFF_MS),
            max_backoff: Duration::from_millis(DEFAULT_MAX_BACKOFF_MS),
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (1-based: the delay after the first failure)
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(16);
        self.initial_backoff
            .saturating_mul(2u32.saturating_pow(exp))
            .min(self.max_backoff)
    }

    pub fn is_retryable_status(status: StatusCode) -> bool {
        status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
    }

    fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }
}

/// Connection settings for [`OpenAiClient`]
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// Base URL; `/chat/completions` is appended
    pub api_base: String,

    /// Bearer credential
    pub api_key: String,

    /// Per-attempt request timeout
    pub timeout: Duration,

    pub retry: RetryPolicy,
}

impl ClientConfig {
    /// Default settings with the given credential
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            api_key: api_key.into(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

/// `reqwest`-backed chat-completions client
#[derive(Clone)]
pub struct OpenAiClient {
    http: Client,
    endpoint: String,
    api_key: String,
    retry: RetryPolicy,
}

impl std::fmt::Debug for OpenAiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiClient")
            .field("endpoint", &self.endpoint)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

impl OpenAiClient {
    pub fn new(config: ClientConfig) -> Result<Self, InferenceError> {
        let http = Client::builder()
            .timeout(config.timeout)
            .pool_idle_timeout(Duration::from_secs(30))
            .build()
            .map_err(InferenceError::ClientBuild)?;

        Ok(Self {
            http,
            endpoint: format!("{}/chat/completions", config.api_base.trim_end_matches('/')),
            api_key: config.api_key,
            retry: config.retry,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl InferenceService for OpenAiClient {
    async fn complete(&self, request: &ChatRequest) -> Result<CompletionResponse, InferenceError> {
        let max_attempts = self.retry.attempts();
        let mut attempt = 1;

        loop {
            let started = Instant::now();
            let result = self
                .http
                .post(&self.endpoint)
                .bearer_auth(&self.api_key)
                .header(header::CONTENT_TYPE, "application/json")
                .json(request)
                .send()
                .await;

            match result {
                Ok(response) => {
                    let status = response.status();
                    debug!(
                        status = status.as_u16(),
                        attempt,
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "Inference service responded"
                    );

                    if RetryPolicy::is_retryable_status(status) && attempt < max_attempts {
                        let delay = self.retry.backoff_delay(attempt);
                        warn!(
                            status = status.as_u16(),
                            attempt,
                            delay_ms = delay.as_millis() as u64,
                            "Retryable status from inference service"
                        );
                        tokio::time::sleep(delay).await;
                        attempt += 1;
                        continue;
                    }

                    let body = response.bytes().await.map_err(InferenceError::Body)?;
                    return Ok(CompletionResponse::from_body(status.as_u16(), &body));
                }
                Err(err) => {
                    if attempt < max_attempts {
                        let delay = self.retry.backoff_delay(attempt);
                        warn!(
                            error = %err,
                            attempt,
                            delay_ms = delay.as_millis() as u64,
                            "Inference request failed, retrying"
                        );
                        tokio::time::sleep(delay).await;
                        attempt += 1;
                        continue;
                    }

                    return Err(if err.is_timeout() {
                        InferenceError::Timeout { attempts: attempt }
                    } else {
                        InferenceError::Transport {
                            attempts: attempt,
                            source: err,
                        }
                    });
                }
            }
        }
    }
}
