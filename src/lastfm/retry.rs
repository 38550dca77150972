use std::{future::Future, time::Duration};

use tokio::time::sleep;

use crate::error::ApiError;

/// How many times a request is attempted and how long to wait in between.
///
/// The wait doubles after every failed attempt, starting at `base_delay`
/// and capped at `max_delay`: with the defaults a request is tried three
/// times with 1s and 2s pauses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first; `0` behaves like `1`
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(1000),
            max_delay: Duration::from_millis(5000),
        }
    }
}

impl RetryPolicy {
    /// Delay before the retry that follows the zero-based `attempt`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

/// Runs `request` until it succeeds, fails with a non-retryable error, or
/// `policy.max_attempts` is exhausted. The last error is returned.
///
/// Only [`ApiError::is_retryable`] errors are retried. Rate limiting, client
/// errors and provider "not found" are returned immediately.
pub async fn with_retry<T, F, Fut>(policy: RetryPolicy, mut request: F) -> Result<T, ApiError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ApiError>>,
{
    let attempts = policy.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        match request().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_retryable() && attempt + 1 < attempts => {
                let delay = policy.delay_for(attempt);
                tracing::debug!(
                    target: "lastfm",
                    attempt = attempt + 1,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "retrying Last.fm request"
                );
                sleep(delay).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}
