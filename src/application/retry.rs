//! Retry with exponential backoff for transient failures.
//!
//! ```ignore
//! let policy = RetryPolicy::default();
//! let (value, attempts) =
//!     retry_with_backoff(&policy, |e: &PaymentError| e.is_retryable(), || async { op().await }).await?;
//! ```

use std::time::Duration;
use tokio::time::sleep;

/// Retry policy configuration for exponential backoff.
///
/// # Default Values
///
/// - `max_retries`: 5
/// - `initial_delay`: 200ms
/// - `max_delay`: 30 seconds
/// - `multiplier`: 2.0
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    pub initial_delay: Duration,

    /// Cap for the exponential delay.
    pub max_delay: Duration,
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 5,
            initial_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(30),
            multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// A policy that never waits between attempts. Test helper.
    pub fn immediate(max_retries: u32) -> Self {
        Self {
            max_retries,
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            multiplier: 1.0,
        }
    }

    /// Delay before retry number `attempt` (0-based).
    ///
    /// `initial_delay * multiplier ^ attempt`, capped at `max_delay`.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return self.initial_delay.min(self.max_delay);
        }

        let delay_ms = self.initial_delay.as_millis() as f64 * self.multiplier.powi(attempt as i32);
        let delay = Duration::from_millis(delay_ms as u64);

        delay.min(self.max_delay)
    }
}

/// The last error after retries ran out or a non-retryable error occurred.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryError<E> {
    pub error: E,

    /// Attempts made, including the first.
    pub attempts: u32,
}

/// Runs `operation` until it succeeds, fails with an error `should_retry`
/// rejects, or `policy.max_retries` retries are used up.
///
/// Returns the value with the number of attempts it took.
pub async fn retry_with_backoff<F, Fut, T, E, P>(
    policy: &RetryPolicy,
    should_retry: P,
    mut operation: F,
) -> Result<(T, u32), RetryError<E>>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
    E: std::fmt::Display,
    P: Fn(&E) -> bool,
{
    let mut retries = 0;

    loop {
        match operation().await {
            Ok(value) => {
                if retries > 0 {
                    tracing::info!(attempts = retries + 1, "Operation succeeded after retry");
                }
                return Ok((value, retries + 1));
            }
            Err(error) => {
                if !should_retry(&error) || retries >= policy.max_retries {
                    return Err(RetryError {
                        error,
                        attempts: retries + 1,
                    });
                }

                let delay = policy.delay_for_attempt(retries);
                tracing::info!(
                    attempt = retries + 1,
                    max_retries = policy.max_retries,
                    delay_ms = delay.as_millis() as u64,
                    error = %error,
                    "Operation failed, retrying after delay"
                );
                sleep(delay).await;
                retries += 1;
            }
        }
    }
}
