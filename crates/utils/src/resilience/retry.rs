//! Bounded retry with exponential backoff and per-attempt timeouts.

use contaflux_core::{Error, Result};
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

/// Default number of attempts (not additional retries)
const DEFAULT_ATTEMPTS: u32 = 3;

/// Default per-attempt timeout (10s)
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Base delay for exponential backoff (1s)
const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(1000);

/// Ceiling for the backoff delay (5s)
const DEFAULT_MAX_DELAY: Duration = Duration::from_millis(5000);

/// Configuration for retry behavior
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Total number of attempts; the operation fails after this many
    pub attempts: u32,
    /// Per-attempt timeout; an elapsed timer counts as a failed attempt
    pub timeout: Duration,
    /// Base delay for exponential backoff
    pub base_delay: Duration,
    /// Maximum delay between attempts
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            attempts: DEFAULT_ATTEMPTS,
            timeout: DEFAULT_TIMEOUT,
            base_delay: DEFAULT_BASE_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
        }
    }
}

impl RetryConfig {
    /// Delay before the attempt following `attempt` (1-based):
    /// `min(base * 2^(attempt-1), max)`.
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let exponential = self
            .base_delay
            .saturating_mul(2u32.saturating_pow(attempt.saturating_sub(1)));
        exponential.min(self.max_delay)
    }
}

/// Execute `operation` with bounded retries, exponential backoff and a
/// per-attempt timeout.
///
/// A timed-out attempt is indistinguishable downstream from a network
/// failure and retried the same way. Known limitation: the timeout is a
/// race against a timer, so the losing attempt future is dropped rather
/// than cooperatively cancelled; work it delegated elsewhere (a remote
/// query already on the wire) may still complete in the background.
pub async fn retry_with_timeout<F, Fut, T>(
    config: &RetryConfig,
    operation_name: &str,
    operation: F,
) -> Result<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let attempts = config.attempts.max(1);
    let mut last_error = Error::upstream(operation_name, "no attempts were made");

    for attempt in 1..=attempts {
        let outcome = match tokio::time::timeout(config.timeout, operation()).await {
            Ok(result) => result,
            Err(_elapsed) => Err(Error::timeout(operation_name, config.timeout)),
        };

        match outcome {
            Ok(value) => {
                if attempt > 1 {
                    tracing::debug!(
                        operation = operation_name,
                        attempt,
                        "operation succeeded after retry"
                    );
                }
                return Ok(value);
            }
            Err(error) => {
                if attempt < attempts && error.is_retryable() {
                    let delay = config.backoff_delay(attempt);
                    tracing::warn!(
                        operation = operation_name,
                        attempt,
                        attempts,
                        ?delay,
                        %error,
                        "attempt failed, backing off"
                    );
                    sleep(delay).await;
                    last_error = error;
                } else {
                    return Err(error);
                }
            }
        }
    }

    Err(last_error)
}
