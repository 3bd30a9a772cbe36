//! # Predicate-Gated Retry
//!
//! Retries an async operation while its error matches a predicate, with a bounded
//! number of retries and exponentially growing delays. Errors outside the predicate
//! are returned on first sight.

use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Delay before the first retry
    pub initial_delay: Duration,
    /// Retries after the first attempt; total attempts are `max_retries + 1`
    pub max_retries: u32,
    /// Growth factor applied to the delay after every retry
    pub multiplier: f64,
    /// Upper bound for a single delay
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(500),
            max_retries: 5,
            multiplier: 2.0,
            max_delay: Duration::from_secs(60),
        }
    }
}

impl RetryPolicy {
    /// Doubling delay starting at `initial_delay`
    pub fn exponential(initial_delay: Duration, max_retries: u32) -> Self {
        Self {
            initial_delay,
            max_retries,
            ..Self::default()
        }
    }

    /// Delay slept before retry number `retry` (zero-based)
    pub fn delay_for(&self, retry: u32) -> Duration {
        let factor = self.multiplier.max(1.0).powi(retry.min(i32::MAX as u32) as i32);
        let millis = (self.initial_delay.as_millis() as f64 * factor)
            .min(self.max_delay.as_millis() as f64);
        Duration::from_millis(millis as u64)
    }
}

/// Run `operation`, retrying while `should_retry` accepts the error.
///
/// Returns the first success, the first error the predicate rejects, or the last
/// error once `max_retries` retries are spent.
pub async fn retry_while<T, E, Op, Fut, P>(
    policy: &RetryPolicy,
    name: &str,
    mut should_retry: P,
    mut operation: Op,
) -> Result<T, E>
where
    Op: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: FnMut(&E) -> bool,
    E: Display,
{
    let mut retry = 0u32;
    loop {
        match operation().await {
            Ok(value) => {
                if retry > 0 {
                    debug!(operation = %name, retries = retry, "🟢 Operation succeeded after retry");
                }
                return Ok(value);
            }
            Err(err) if retry < policy.max_retries && should_retry(&err) => {
                let delay = policy.delay_for(retry);
                warn!(
                    operation = %name,
                    retry = retry + 1,
                    max_retries = policy.max_retries,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "🔁 Retrying after retryable error"
                );
                tokio::time::sleep(delay).await;
                retry += 1;
            }
            Err(err) => return Err(err),
        }
    }
}
