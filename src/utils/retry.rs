//! Retry utilities for calls to external services
//!
//! Exponential backoff with a cap. Errors are classified by the caller: only
//! errors the predicate accepts are retried, everything else returns at once.

use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Retry behavior for one external call
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one (at least 1)
    pub max_attempts: u32,

    /// Delay before the second attempt
    pub base_delay: Duration,

    /// Upper bound for any single delay
    pub max_delay: Duration,

    /// Growth factor between consecutive delays
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(10),
            multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// Create a policy with custom attempts and delays
    pub fn new(max_attempts: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            max_delay,
            multiplier: 2.0,
        }
    }

    /// Policy without any delay between attempts (tests, dry runs)
    pub fn immediate(max_attempts: u32) -> Self {
        Self::new(max_attempts, Duration::ZERO, Duration::ZERO)
    }

    /// Delay to wait after the `attempt`-th failure (1-based)
    pub fn backoff(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }

        let exponential =
            self.base_delay.as_millis() as f64 * self.multiplier.powi((attempt - 1) as i32);
        let capped = exponential.min(self.max_delay.as_millis() as f64);

        Duration::from_millis(capped as u64)
    }
}

/// Execute an operation, retrying only errors accepted by `should_retry`
///
/// Returns the first success, the first non-retryable error, or the error of
/// the last attempt.
///
/// # Example
///
/// ```no_run
/// use dalbit::utils::retry::{with_retry_if, RetryPolicy};
/// use dalbit::utils::error::OracleError;
///
/// async fn call() -> Result<String, OracleError> {
///     Ok("text".to_string())
/// }
///
/// # async fn run() -> Result<(), OracleError> {
/// let policy = RetryPolicy::default();
/// let text = with_retry_if(&policy, call, OracleError::is_recoverable).await?;
/// # Ok(())
/// # }
/// ```
pub async fn with_retry_if<T, E, F, Fut, P>(
    policy: &RetryPolicy,
    mut operation: F,
    should_retry: P,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
    P: Fn(&E) -> bool,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        match operation().await {
            Ok(result) => {
                if attempt > 1 {
                    debug!(attempt, "Operation succeeded after retry");
                }
                return Ok(result);
            }
            Err(e) => {
                if !should_retry(&e) {
                    warn!(attempt, error = %e, "Non-retryable error encountered");
                    return Err(e);
                }

                if attempt >= max_attempts {
                    warn!(attempt, max_attempts, error = %e, "Retries exhausted");
                    return Err(e);
                }

                let delay = policy.backoff(attempt);
                warn!(
                    attempt,
                    max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Operation failed, will retry"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}
