//! Exponential backoff for handlers that make outbound calls.
//!
//! The pipeline never retries on its own. Handlers that call flaky
//! downstream services can wrap those calls in a [`RetryPolicy`].
//!
//! ```rust,ignore
//! let policy = RetryPolicy::default();
//! let body = policy
//!     .run("notify-slack", |_attempt| async { client.post(url).send().await })
//!     .await?;
//! ```

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tokio::time::sleep;
use tracing::{debug, warn};

/// Jitter percentage applied to every delay (±20%).
///
/// Randomized delays keep many clients from retrying in lockstep.
const BACKOFF_JITTER_PERCENT: f64 = 0.2;

/// Random value in `[0.0, 1.0)` from the thread-local RNG.
pub fn rand_jitter() -> f64 {
    rand::rng().random::<f64>()
}

/// Bounded retry with exponential backoff and jitter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one. At least one attempt always
    /// runs.
    pub max_attempts: u32,
    /// Delay before the second attempt; doubles after every failure.
    pub base_delay: Duration,
    /// Upper bound for the pre-jitter delay.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
            max_delay,
        }
    }

    /// Delay before the next try after `attempt` (1-based) failed, without
    /// jitter.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let base_ms = u64::try_from(self.base_delay.as_millis()).unwrap_or(u64::MAX);
        let max_ms = u64::try_from(self.max_delay.as_millis()).unwrap_or(u64::MAX);
        let factor = 2u64.saturating_pow(attempt.saturating_sub(1));
        Duration::from_millis(base_ms.saturating_mul(factor).min(max_ms))
    }

    /// [`Self::backoff`] with ±20% jitter applied.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let delay_ms = self.backoff(attempt).as_millis() as f64;
        let jitter = delay_ms * BACKOFF_JITTER_PERCENT * (rand_jitter() * 2.0 - 1.0);
        Duration::from_millis((delay_ms + jitter).max(0.0) as u64)
    }

    /// Run `operation` until it succeeds or attempts are exhausted.
    ///
    /// The closure receives the 1-based attempt number. The last error is
    /// returned when every attempt fails.
    pub async fn run<F, Fut, T, E>(&self, label: &str, mut operation: F) -> Result<T, E>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            match operation(attempt).await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!(label, attempt, "Operation succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(e) if attempt >= max_attempts => {
                    warn!(label, attempt, error = %e, "Giving up after final attempt");
                    return Err(e);
                }
                Err(e) => {
                    let delay = self.delay_for(attempt);
                    warn!(
                        label,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Operation failed, retrying"
                    );
                    sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}
