//! Retry logic with exponential backoff for transient provider errors.

use crate::error::ProviderError;
use std::thread;
use std::time::Duration;

/// Retry policy for provider calls
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Maximum number of attempts, including the first one
    pub max_attempts: u32,
    /// Delay before the first retry
    pub base_delay: Duration,
    /// Multiplier applied to the delay after each retry
    pub backoff_factor: f64,
    /// Upper bound for any single delay
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            backoff_factor: 2.0,
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryConfig {
    /// Single attempt, no retries
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Delay to wait after the given (0-indexed) failed attempt
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let factor = self.backoff_factor.powi(attempt as i32);
        let delay = self.base_delay.mul_f64(factor);
        delay.min(self.max_delay)
    }
}

/// Callback trait for retry progress notifications.
pub trait RetryCallback: Sync {
    /// Called when an operation is being retried.
    ///
    /// # Arguments
    /// * `attempt` - Attempt that just failed (1-indexed)
    /// * `max_attempts` - Maximum number of attempts
    /// * `error` - The error that triggered the retry
    /// * `delay` - Time until next attempt
    fn on_retry(&self, attempt: u32, max_attempts: u32, error: &ProviderError, delay: Duration);
}

/// No-op callback that does nothing.
pub struct NoCallback;

impl RetryCallback for NoCallback {
    fn on_retry(&self, _attempt: u32, _max_attempts: u32, _error: &ProviderError, _delay: Duration) {
    }
}

/// Callback that logs retries at warn level.
pub struct LogCallback<'a> {
    /// Resource address being retried
    pub address: &'a str,
}

impl RetryCallback for LogCallback<'_> {
    fn on_retry(&self, attempt: u32, max_attempts: u32, error: &ProviderError, delay: Duration) {
        log::warn!(
            "{}: attempt {}/{} failed: {}. Retrying in {}ms",
            self.address,
            attempt,
            max_attempts,
            error,
            delay.as_millis()
        );
    }
}

/// Execute a provider operation with retry logic.
///
/// Retries while the operation returns a retryable error, sleeping with
/// exponential backoff between attempts. Non-retryable errors return
/// immediately.
pub fn with_retry<T, F>(
    config: &RetryConfig,
    callback: &dyn RetryCallback,
    mut operation: F,
) -> Result<T, ProviderError>
where
    F: FnMut() -> Result<T, ProviderError>,
{
    let max_attempts = config.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        match operation() {
            Ok(result) => return Ok(result),
            Err(e) => {
                if !e.is_retryable() || attempt + 1 >= max_attempts {
                    return Err(e);
                }

                let delay = config.delay_for_attempt(attempt);
                callback.on_retry(attempt + 1, max_attempts, &e, delay);
                thread::sleep(delay);
                attempt += 1;
            }
        }
    }
}
