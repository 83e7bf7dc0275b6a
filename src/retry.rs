//! Bounded retry with exponential backoff for E-utilities requests
//!
//! Requests to NCBI are idempotent (searches are re-runnable and history fetches
//! are fully addressed by `WebEnv`, `query_key`, `retstart` and `retmax`), so a
//! transient failure can simply be replayed after a delay.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tokio_retry::RetryIf;
use tokio_retry::strategy::{ExponentialBackoff, jitter};
use tracing::{debug, warn};

/// Errors that know whether replaying the request could succeed
pub trait RetryableError {
    fn is_retryable(&self) -> bool;

    /// Short human-readable classification used in logs
    fn retry_reason(&self) -> &str;
}

/// Retry policy for network calls
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Total attempts including the first one
    pub max_attempts: u32,
    /// Delay before the first retry; doubles on each further retry
    pub initial_delay: Duration,
    pub max_delay: Duration,
    /// Randomize delays to avoid synchronized retries
    pub use_jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(10),
            use_jitter: true,
        }
    }
}

impl RetryConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// A single attempt, no retries
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    pub fn without_jitter(mut self) -> Self {
        self.use_jitter = false;
        self
    }

    /// Delays slept between attempts, one fewer than `max_attempts`
    pub fn delays(&self) -> Vec<Duration> {
        let retries = self.max_attempts.saturating_sub(1) as usize;
        // from_millis(2) yields 2, 4, 8, ... which the factor scales to initial, 2*initial, ...
        let factor = (self.initial_delay.as_millis() as u64 / 2).max(1);

        ExponentialBackoff::from_millis(2)
            .factor(factor)
            .max_delay(self.max_delay)
            .map(|delay| if self.use_jitter { jitter(delay) } else { delay })
            .take(retries)
            .collect()
    }
}

/// Run `operation` until it succeeds, fails with a non-retryable error, or
/// the attempts configured in `config` are used up.
///
/// The last error is returned on exhaustion.
pub async fn with_retry<T, E, F, Fut>(operation: F, config: &RetryConfig, context: &str) -> Result<T, E>
where
    E: RetryableError + Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let max_attempts = config.max_attempts.max(1);
    let mut attempt = 0u32;

    let result = RetryIf::spawn(config.delays(), operation, |err: &E| {
        attempt += 1;
        let retryable = err.is_retryable();
        if retryable && attempt < max_attempts {
            warn!(
                attempt,
                max_attempts,
                reason = err.retry_reason(),
                error = %err,
                "{} failed, retrying",
                context
            );
        } else {
            debug!(attempt, retryable, "{} failed", context);
        }
        retryable
    })
    .await;

    if let Err(err) = &result {
        if err.is_retryable() {
            warn!(max_attempts, error = %err, "{} failed after all attempts", context);
        }
    }

    result
}
