//! Token bucket rate limiting for NCBI E-utilities
//!
//! NCBI allows 3 requests per second without an API key and 10 with one.
//! Exceeding that gets the client's IP temporarily blocked, so every request
//! (including each retry attempt) takes a token first.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::{Instant, sleep};
use tracing::{debug, instrument, warn};

use crate::error::PubMedError;

/// Shared token bucket; clones draw from the same bucket
#[derive(Clone, Debug)]
pub struct RateLimiter {
    bucket: Arc<Mutex<TokenBucket>>,
}

#[derive(Debug)]
struct TokenBucket {
    tokens: f64,
    capacity: f64,
    refill_rate: f64, // tokens per second
    last_refill: Instant,
}

impl TokenBucket {
    fn refill(&mut self) {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * self.refill_rate).min(self.capacity);
        self.last_refill = now;
    }

    fn try_take(&mut self) -> bool {
        self.refill();
        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

impl RateLimiter {
    /// Create a limiter allowing `rate` requests per second.
    ///
    /// The bucket starts full, with room for at least one request.
    pub fn new(rate: f64) -> Self {
        let rate = if rate > 0.0 { rate } else { 1.0 };
        let capacity = rate.max(1.0);
        Self {
            bucket: Arc::new(Mutex::new(TokenBucket {
                tokens: capacity,
                capacity,
                refill_rate: rate,
                last_refill: Instant::now(),
            })),
        }
    }

    /// 3 requests/second, NCBI's limit without an API key
    pub fn ncbi_default() -> Self {
        Self::new(3.0)
    }

    /// 10 requests/second, NCBI's limit with an API key
    pub fn ncbi_with_key() -> Self {
        Self::new(10.0)
    }

    /// Wait until a request may be sent.
    ///
    /// Sleeps for one refill interval when the bucket is empty. If another
    /// caller took the refilled token in the meantime this returns
    /// `PubMedError::RateLimitExceeded`, which the retry layer treats as
    /// transient.
    #[instrument(skip(self))]
    pub async fn acquire(&self) -> crate::Result<()> {
        let wait_time = {
            let mut bucket = self.bucket.lock().await;
            if bucket.try_take() {
                debug!(remaining_tokens = %bucket.tokens, "Token acquired immediately");
                None
            } else {
                Some(Duration::from_secs_f64(1.0 / bucket.refill_rate))
            }
        };

        if let Some(duration) = wait_time {
            debug!(wait_ms = duration.as_millis() as u64, "Waiting for rate limit token");
            sleep(duration).await;

            let mut bucket = self.bucket.lock().await;
            if !bucket.try_take() {
                warn!("No token available after waiting");
                return Err(PubMedError::RateLimitExceeded);
            }
            debug!(remaining_tokens = %bucket.tokens, "Token acquired after waiting");
        }

        Ok(())
    }

    /// Tokens currently available
    pub async fn token_count(&self) -> f64 {
        let mut bucket = self.bucket.lock().await;
        bucket.refill();
        bucket.tokens
    }

    /// Configured requests per second
    pub async fn rate(&self) -> f64 {
        self.bucket.lock().await.refill_rate
    }
}
