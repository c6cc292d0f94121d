//! Bounded retry with a fixed pause between attempts.

use crate::error::{Error, Result};
use log::warn;
use std::thread;
use std::time::Duration;

/// Attempt limit and inter-attempt pause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, at least one is always made.
    pub attempts: usize,
    /// Pause after a failed attempt that will be retried.
    pub delay: Duration,
}

impl RetryPolicy {
    /// Create a policy.
    pub fn new(attempts: usize, delay: Duration) -> Self {
        Self { attempts, delay }
    }
}

/// Sleep unless the duration is zero.
pub(crate) fn pause(delay: Duration) {
    if !delay.is_zero() {
        thread::sleep(delay);
    }
}

/// Run `op` until it succeeds, retrying errors for which [`Error::is_retryable`] holds.
///
/// Non-retryable errors are returned immediately and unchanged. When all
/// attempts fail, the last error is wrapped in [`Error::RetriesExhausted`].
/// `op` receives the 1-based attempt number.
pub fn retry<T, F>(operation: &'static str, policy: RetryPolicy, op: F) -> Result<T>
where
    F: FnMut(usize) -> Result<T>,
{
    retry_if(operation, policy, Error::is_retryable, op)
}

/// Like [`retry`], with a caller-supplied predicate deciding which errors are retried.
pub fn retry_if<T, F, P>(
    operation: &'static str,
    policy: RetryPolicy,
    should_retry: P,
    mut op: F,
) -> Result<T>
where
    F: FnMut(usize) -> Result<T>,
    P: Fn(&Error) -> bool,
{
    let attempts = policy.attempts.max(1);
    let mut attempt = 1;

    loop {
        match op(attempt) {
            Ok(value) => return Ok(value),
            Err(e) if !should_retry(&e) => return Err(e),
            Err(e) if attempt >= attempts => {
                return Err(Error::RetriesExhausted {
                    operation,
                    attempts,
                    source: Box::new(e),
                });
            },
            Err(e) => {
                warn!("{operation} failed (attempt {attempt}/{attempts}): {e}");
                pause(policy.delay);
                attempt += 1;
            },
        }
    }
}
