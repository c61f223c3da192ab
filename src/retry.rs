/*!
 * Generic retry policy with exponential backoff.
 *
 * Wraps a fallible async operation and retries it on transient failures.
 * Quota and authentication errors are deliberately fatal to this policy:
 * the credential-aware layer above it owns rotation and surfacing, and
 * burning backoff attempts on a quota rejection would only delay that.
 */

use std::future::Future;
use std::time::Duration;

use log::warn;

use crate::errors::ProviderError;

/// Retry policy configuration for provider calls
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total number of attempts, including the first one
    pub max_attempts: u32,

    /// Delay before the first retry
    pub base_delay: Duration,

    /// Multiplier applied to the delay after each failed attempt
    pub backoff_multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// Create a policy with the given bounds
    pub fn new(max_attempts: u32, base_delay: Duration, backoff_multiplier: f64) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            backoff_multiplier,
        }
    }

    /// Backoff delay before retry number `attempt` (zero-based)
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        self.base_delay
            .mul_f64(self.backoff_multiplier.powi(attempt as i32))
    }

    /// Run `operation` until it succeeds, fails fatally, or the attempt
    /// budget runs out.
    ///
    /// On exhaustion the last underlying error is re-raised as-is, never a
    /// synthetic "retries exhausted" wrapper - callers must be able to
    /// inspect the root cause.
    pub async fn execute<T, F, Fut>(&self, mut operation: F) -> Result<T, ProviderError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ProviderError>>,
    {
        let mut attempt: u32 = 0;
        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_quota() || err.is_auth() => {
                    // Handled by the rotation layer, not by backoff.
                    return Err(err);
                }
                Err(err) if err.is_retryable() && attempt + 1 < self.max_attempts => {
                    let delay = self.delay_for_attempt(attempt);
                    warn!(
                        "Retryable provider error (attempt {}/{}), backing off {:?}: {}",
                        attempt + 1,
                        self.max_attempts,
                        delay,
                        err
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}
