//! HTTP client for hymn archive scraping with rate limiting and error handling
//!
//! Provides a robust HTTP client specifically designed for polite scraping
//! of third-party hymn archives, with respect for server resources.

use std::num::NonZeroU32;
use std::time::Duration;

use governor::{
    clock::DefaultClock,
    state::{direct::NotKeyed, InMemoryState},
    Quota, RateLimiter,
};
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use reqwest::Client;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Typed fetch failure. The orchestrator records these per item; only the
/// index fetch promotes one to a fatal run error.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("request timed out after {seconds}s")]
    Timeout { seconds: u64 },

    #[error("HTTP status {status} for {url}")]
    Status { status: u16, url: String },

    #[error("request cancelled")]
    Cancelled,

    #[error("network error: {message}")]
    Network { message: String },

    #[error("invalid client configuration: {message}")]
    Configuration { message: String },
}

/// HTTP client configuration for scraping
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct HttpClientConfig {
    pub user_agent: String,
    pub timeout_seconds: u64,
    pub max_requests_per_second: u32,
    pub follow_redirects: bool,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            user_agent: "hymnscribe/0.2 (public-domain hymn archival)".to_string(),
            timeout_seconds: 15,
            max_requests_per_second: 2,
            follow_redirects: true,
        }
    }
}

/// HTTP client with rate limiting for respectful scraping
pub struct HttpClient {
    client: Client,
    rate_limiter: RateLimiter<NotKeyed, InMemoryState, DefaultClock>,
    config: HttpClientConfig,
}

impl HttpClient {
    /// Create a new HTTP client with the given configuration
    pub fn new(config: HttpClientConfig) -> Result<Self, FetchError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&config.user_agent).map_err(|e| FetchError::Configuration {
                message: format!("invalid user agent: {e}"),
            })?,
        );

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .default_headers(headers)
            .redirect(if config.follow_redirects {
                reqwest::redirect::Policy::limited(10)
            } else {
                reqwest::redirect::Policy::none()
            })
            .build()
            .map_err(|e| FetchError::Configuration {
                message: format!("failed to build HTTP client: {e}"),
            })?;

        let quota = Quota::per_second(NonZeroU32::new(config.max_requests_per_second).ok_or(
            FetchError::Configuration {
                message: "rate limit must be greater than 0".to_string(),
            },
        )?);
        let rate_limiter = RateLimiter::direct(quota);

        Ok(Self {
            client,
            rate_limiter,
            config,
        })
    }

    /// Fetch a URL and return the body text.
    pub async fn get_text(&self, url: &str) -> Result<String, FetchError> {
        // Wait for rate limiter
        self.rate_limiter.until_ready().await;

        tracing::debug!("Fetching URL: {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let text = response.text().await.map_err(|e| self.classify(e))?;
        tracing::debug!("Successfully fetched: {} ({} chars)", url, text.len());
        Ok(text)
    }

    /// Fetch a URL with cooperative cancellation. The token aborts only this
    /// request; cancellation tears down the in-flight connection so no
    /// dangling requests accumulate across iterations.
    pub async fn get_text_with_cancellation(
        &self,
        url: &str,
        cancellation_token: &CancellationToken,
    ) -> Result<String, FetchError> {
        if cancellation_token.is_cancelled() {
            return Err(FetchError::Cancelled);
        }

        tokio::select! {
            _ = self.rate_limiter.until_ready() => {},
            _ = cancellation_token.cancelled() => {
                return Err(FetchError::Cancelled);
            }
        }

        let response = tokio::select! {
            result = self.client.get(url).send() => {
                result.map_err(|e| self.classify(e))?
            },
            _ = cancellation_token.cancelled() => {
                tracing::warn!("HTTP request cancelled for URL: {}", url);
                return Err(FetchError::Cancelled);
            }
        };

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let text = tokio::select! {
            result = response.text() => {
                result.map_err(|e| self.classify(e))?
            },
            _ = cancellation_token.cancelled() => {
                tracing::warn!("Response reading cancelled for URL: {}", url);
                return Err(FetchError::Cancelled);
            }
        };

        Ok(text)
    }

    fn classify(&self, error: reqwest::Error) -> FetchError {
        if error.is_timeout() {
            FetchError::Timeout {
                seconds: self.config.timeout_seconds,
            }
        } else {
            FetchError::Network {
                message: error.to_string(),
            }
        }
    }

    /// Get the configuration
    pub fn config(&self) -> &HttpClientConfig {
        &self.config
    }
}
