//! Retry logic with exponential backoff for transient backend errors.

use crate::context::CancelToken;
use crate::error::{Error, Result};
use crate::types::RetryConfig;
use std::thread;

/// Callback trait for retry progress notifications.
pub trait RetryCallback: Sync {
    /// Called when an operation is being retried.
    ///
    /// # Arguments
    /// * `attempt` - Attempt that just failed (1-indexed)
    /// * `max_attempts` - Maximum number of attempts
    /// * `error` - The error that triggered the retry
    /// * `delay_ms` - Milliseconds until the next attempt
    fn on_retry(&self, attempt: u32, max_attempts: u32, error: &Error, delay_ms: u128);
}

/// No-op callback that does nothing.
pub struct NoCallback;

impl RetryCallback for NoCallback {
    fn on_retry(&self, _attempt: u32, _max_attempts: u32, _error: &Error, _delay_ms: u128) {}
}

/// Callback that reports retries through the `log` facade.
pub struct LogCallback;

impl RetryCallback for LogCallback {
    fn on_retry(&self, attempt: u32, max_attempts: u32, error: &Error, delay_ms: u128) {
        log::warn!(
            "Attempt {attempt}/{max_attempts} failed: {error}. Retrying in {delay_ms}ms ({})",
            error.category().advice()
        );
    }
}

/// Execute an operation with retry logic.
///
/// Retries the operation while it returns a retryable error, sleeping with
/// exponential backoff between attempts. Retrying stops as soon as `cancel`
/// is cancelled or its deadline passes, and no sleep outlasts the deadline.
///
/// # Returns
/// The result of the operation, or the last error if all attempts failed.
pub fn with_retry<T, F>(
    config: &RetryConfig,
    callback: Option<&dyn RetryCallback>,
    cancel: &CancelToken,
    mut operation: F,
) -> Result<T>
where
    F: FnMut() -> Result<T>,
{
    let max_attempts = config.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        let err = match operation() {
            Ok(result) => return Ok(result),
            Err(e) => e,
        };

        attempt += 1;
        if !err.is_retryable()
            || attempt >= max_attempts
            || cancel.is_cancelled()
            || cancel.is_expired()
        {
            return Err(err);
        }

        let mut delay = config.delay_for_attempt(attempt - 1);
        if let Some(remaining) = cancel.remaining() {
            delay = delay.min(remaining);
        }

        if let Some(cb) = callback {
            cb.on_retry(attempt, max_attempts, &err, delay.as_millis());
        }

        thread::sleep(delay);
    }
}
