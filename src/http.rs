//! Shared HTTP client with User-Agent rotation and bounded retry.
//!
//! Provides a configured [`reqwest::Client`] (cookies, timeout, optional
//! static proxy) and a [`Fetcher`] implementation that retries transient
//! failures with exponential backoff, drawing a fresh User-Agent from the
//! [`IdentityRotator`] for every attempt. A cancelled client stops retrying
//! and reports the last failure.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{HeaderMap, ACCEPT, ACCEPT_LANGUAGE, USER_AGENT};
use reqwest::StatusCode;
use tokio_util::sync::CancellationToken;

use crate::config::SearchConfig;
use crate::error::{ErrorKind, SearchError};
use crate::identity::IdentityRotator;

/// Upper bound on a single backoff sleep.
const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// A successfully fetched document.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// Final status code (always a success status).
    pub status: u16,
    /// URL after following redirects.
    pub final_url: String,
    /// Response headers.
    pub headers: HeaderMap,
    /// Decoded response body.
    pub body: String,
}

impl HttpResponse {
    /// Build a response for an in-memory document.
    pub fn ok(final_url: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            status: 200,
            final_url: final_url.into(),
            headers: HeaderMap::new(),
            body: body.into(),
        }
    }
}

/// Something that can GET a URL and classify failures.
///
/// The pipeline is generic over this seam so pagination and analysis can
/// be driven by in-memory fixtures as well as by [`HttpClient`].
pub trait Fetcher: Send + Sync {
    /// GET `url`, returning the body or the kind of failure.
    fn fetch(&self, url: &str) -> impl Future<Output = Result<HttpResponse, ErrorKind>> + Send;
}

/// Exponential backoff policy for transient failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Delay before the first retry.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    /// Policy derived from a [`SearchConfig`].
    pub fn from_config(config: &SearchConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            base_delay: Duration::from_millis(config.retry_base_delay_ms),
        }
    }

    /// Delay before retry number `retry` (zero-based): `base * 2^retry`,
    /// capped at 30 seconds.
    pub fn delay_for(&self, retry: u32) -> Duration {
        let multiplier = 1u32.checked_shl(retry.min(31)).unwrap_or(u32::MAX);
        self.base_delay
            .checked_mul(multiplier)
            .unwrap_or(MAX_BACKOFF)
            .min(MAX_BACKOFF)
    }
}

/// HTTP client shared by every provider request and analysis worker.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: reqwest::Client,
    identity: Arc<IdentityRotator>,
    retry: RetryPolicy,
    cancel: CancellationToken,
}

impl HttpClient {
    /// Build a client configured for scraping.
    ///
    /// The client has:
    /// - Cookie store enabled (for consent interstitials)
    /// - Timeout from config
    /// - The rotator's proxy, if any, for every scheme (no proxy otherwise)
    /// - Brotli and gzip decompression
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Http`] if the proxy is rejected by reqwest or
    /// the client cannot be constructed.
    pub fn new(
        config: &SearchConfig,
        identity: Arc<IdentityRotator>,
    ) -> Result<Self, SearchError> {
        let mut builder = reqwest::Client::builder()
            .cookie_store(true)
            .timeout(config.timeout())
            .redirect(reqwest::redirect::Policy::limited(10));

        // The run proxy is the only route; environment proxies are ignored.
        builder = match identity.proxy() {
            Some(proxy) => builder.proxy(
                reqwest::Proxy::all(proxy.as_str())
                    .map_err(|e| SearchError::Http(format!("invalid proxy: {e}")))?,
            ),
            None => builder.no_proxy(),
        };

        let client = builder
            .build()
            .map_err(|e| SearchError::Http(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            identity,
            retry: RetryPolicy::from_config(config),
            cancel: CancellationToken::new(),
        })
    }

    /// Abandon pending retries once `cancel` fires.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// The rotator supplying identities for this client.
    pub fn identity(&self) -> &IdentityRotator {
        &self.identity
    }

    /// The retry policy applied by [`Fetcher::fetch`].
    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    /// One request. Transient failures ([`ErrorKind::is_transient`]) are
    /// retried by [`Fetcher::fetch`].
    async fn attempt(&self, url: &str, user_agent: &str) -> Result<HttpResponse, ErrorKind> {
        let response = match self
            .client
            .get(url)
            .header(USER_AGENT, user_agent)
            .header(ACCEPT, "text/html,application/xhtml+xml")
            .header(ACCEPT_LANGUAGE, "en-US,en;q=0.9")
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) if e.is_builder() => {
                tracing::debug!(url, error = %e, "request could not be built");
                return Err(ErrorKind::ClientRejected);
            }
            Err(e) => return Err(classify_transport_error(&e)),
        };

        let status = response.status();
        if is_retryable_status(status) {
            tracing::debug!(url, status = status.as_u16(), "retryable status");
            return Err(ErrorKind::NetworkFailure);
        }
        if status.is_client_error() || status.is_server_error() {
            tracing::debug!(url, status = status.as_u16(), "permanent rejection");
            return Err(ErrorKind::ClientRejected);
        }

        let final_url = response.url().to_string();
        let headers = response.headers().clone();
        let body = response
            .text()
            .await
            .map_err(|e| classify_transport_error(&e))?;
        Ok(HttpResponse {
            status: status.as_u16(),
            final_url,
            headers,
            body,
        })
    }
}

impl Fetcher for HttpClient {
    async fn fetch(&self, url: &str) -> Result<HttpResponse, ErrorKind> {
        let mut last = ErrorKind::NetworkFailure;

        for attempt in 0..=self.retry.max_retries {
            if attempt > 0 {
                let delay = self.retry.delay_for(attempt - 1);
                tracing::warn!(
                    url,
                    attempt,
                    error = %last,
                    delay_ms = delay.as_millis() as u64,
                    "retrying request"
                );
                tokio::select! {
                    () = self.cancel.cancelled() => {
                        tracing::debug!(url, attempt, "cancelled, abandoning retries");
                        return Err(last);
                    }
                    () = tokio::time::sleep(delay) => {}
                }
            }

            let user_agent = self.identity.next_user_agent();
            match self.attempt(url, user_agent).await {
                Ok(response) => return Ok(response),
                Err(kind) if kind.is_transient() => last = kind,
                Err(kind) => return Err(kind),
            }
        }

        Err(last)
    }
}

/// 429 and every 5xx are worth another attempt.
fn is_retryable_status(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

fn classify_transport_error(err: &reqwest::Error) -> ErrorKind {
    if err.is_timeout() {
        ErrorKind::Timeout
    } else {
        ErrorKind::NetworkFailure
    }
}
