//! Product fetch contract and the retry policy wrapped around it.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::time::sleep;
use tracing::{debug, warn};

/// Name and price extracted from a product page.
///
/// Parse-layer misses are not failures: the extractor substitutes the
/// unavailable sentinels instead, since retrying a changed page layout
/// cannot succeed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductInfo {
    pub name: String,
    pub price: String,
}

/// Failure of one network-layer fetch attempt.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Transport-level failure: timeout, connection refused, DNS, TLS.
    #[error("request to {url} failed: {message}")]
    Network { url: String, message: String },

    /// The server answered with a non-success status.
    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },

    /// The URL could not be parsed; retrying cannot help.
    #[error("invalid product URL '{url}': {message}")]
    InvalidUrl { url: String, message: String },
}

impl FetchError {
    /// Whether another attempt could plausibly succeed.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        !matches!(self, Self::InvalidUrl { .. })
    }
}

/// Contract for the extraction collaborator: fetch one product page and
/// return its current display name and price. Implementations must be safe
/// to call concurrently from multiple pool workers.
#[async_trait]
pub trait ProductFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<ProductInfo, FetchError>;
}

/// Bounded retry with flat random backoff between attempts.
///
/// No exponential growth: every wait is drawn uniformly from the configured
/// range, which is enough to ride out transient upstream hiccups without
/// hammering the site in lockstep.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    backoff_min: Duration,
    backoff_max: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff_min: Duration, backoff_max: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff_min,
            backoff_max,
        }
    }

    /// Runs `operation` until it succeeds, fails terminally, or the attempt
    /// budget is spent. The final error is propagated as-is.
    pub async fn run<T, F, Fut>(&self, label: &str, mut operation: F) -> Result<T, FetchError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, FetchError>>,
    {
        let mut attempt = 1;
        loop {
            match operation().await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!("{label}: succeeded on attempt {attempt}");
                    }
                    return Ok(value);
                }
                Err(err) if err.is_transient() && attempt < self.max_attempts => {
                    let backoff = self.random_backoff();
                    warn!(
                        "{label}: attempt {attempt}/{} failed ({err}), retrying in {backoff:?}",
                        self.max_attempts
                    );
                    sleep(backoff).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    fn random_backoff(&self) -> Duration {
        let min = self.backoff_min.as_millis() as u64;
        let max = self.backoff_max.as_millis() as u64;
        if max <= min {
            return self.backoff_min;
        }
        Duration::from_millis(fastrand::u64(min..=max))
    }
}

/// `ProductFetcher` decorated with a `RetryPolicy`.
pub struct RetryingFetcher {
    inner: Arc<dyn ProductFetcher>,
    policy: RetryPolicy,
}

impl RetryingFetcher {
    pub fn new(inner: Arc<dyn ProductFetcher>, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }
}

#[async_trait]
impl ProductFetcher for RetryingFetcher {
    async fn fetch(&self, url: &str) -> Result<ProductInfo, FetchError> {
        self.policy.run(url, || self.inner.fetch(url)).await
    }
}
