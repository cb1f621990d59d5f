//! Retry-on-lock
//!
//! Reads that hit a writer mid-save are retried with exponential backoff:
//! `base_delay * 2^attempt`, capped. Only transient errors are retried.

use crate::config::{LOCK_RETRY_ATTEMPTS, LOCK_RETRY_BASE_DELAY_MS, LOCK_RETRY_MAX_DELAY_MS};
use crate::error::Result;
use std::future::Future;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: LOCK_RETRY_ATTEMPTS,
            base_delay: Duration::from_millis(LOCK_RETRY_BASE_DELAY_MS),
            max_delay: Duration::from_millis(LOCK_RETRY_MAX_DELAY_MS),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            ..Self::default()
        }
    }

    /// Delay after failed attempt number `attempt` (zero based)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let base_ms = self.base_delay.as_millis() as u64;
        let delay_ms = base_ms.saturating_mul(1u64.checked_shl(attempt).unwrap_or(u64::MAX));
        Duration::from_millis(delay_ms.min(self.max_delay.as_millis() as u64))
    }

    /// Run `op` until it succeeds, fails permanently, or attempts run out.
    ///
    /// On exhaustion the last transient error is returned so the caller can
    /// decide to defer.
    pub async fn retry_on_lock<T, F, Fut>(&self, what: &str, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 0;
        loop {
            match op().await {
                Ok(value) => {
                    if attempt > 0 {
                        tracing::debug!("{} succeeded after {} retries", what, attempt);
                    }
                    return Ok(value);
                }
                Err(e) if e.is_transient() && attempt + 1 < self.max_attempts => {
                    let delay = self.delay_for(attempt);
                    tracing::debug!(
                        "{} attempt {}/{} hit a lock ({}), retrying in {:?}",
                        what,
                        attempt + 1,
                        self.max_attempts,
                        e,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
