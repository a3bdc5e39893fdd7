//! Module: retry
//! Responsibility: bounded retry with exponential backoff for idempotent
//! store reads that failed transiently.
//! Does not own: write retries; conditional writes are retried by callers
//! that can re-evaluate their precondition.

use crate::error::TransientStoreError;
use std::{thread, time::Duration};

///
/// RetryPolicy
///
/// At most `max_attempts` tries, sleeping `base_delay * 2^n` between them,
/// capped at `max_delay`. Only transient failures are retried; the last
/// error surfaces unchanged when attempts run out.
///

#[derive(Clone, Copy, Debug)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(10),
            max_delay: Duration::from_millis(250),
        }
    }
}

impl RetryPolicy {
    /// A policy that never sleeps, for tests and embedded stores where a
    /// transient failure cannot heal by waiting.
    #[must_use]
    pub const fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }

    /// Run an idempotent read, retrying transient failures. `on_retry` is
    /// called once per retry so callers can bump counters.
    pub fn run<T, F, R>(&self, mut op: F, mut on_retry: R) -> Result<T, TransientStoreError>
    where
        F: FnMut() -> Result<T, TransientStoreError>,
        R: FnMut(),
    {
        let attempts = self.max_attempts.max(1);
        let mut last = None;

        for attempt in 0..attempts {
            match op() {
                Ok(value) => return Ok(value),
                Err(err) => {
                    last = Some(err);
                    if attempt + 1 < attempts {
                        on_retry();
                        let delay = self.delay_for(attempt);
                        if !delay.is_zero() {
                            thread::sleep(delay);
                        }
                    }
                }
            }
        }

        Err(last.unwrap_or_else(|| TransientStoreError::new("retry exhausted with no attempt")))
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::RetryPolicy;
    use crate::error::TransientStoreError;
    use std::time::Duration;

    #[test]
    fn succeeds_after_transient_failures() {
        let policy = RetryPolicy::immediate(3);
        let mut calls = 0;
        let mut retries = 0;

        let out = policy.run(
            || {
                calls += 1;
                if calls < 3 {
                    Err(TransientStoreError::new("flaky"))
                } else {
                    Ok(calls)
                }
            },
            || retries += 1,
        );

        assert_eq!(out.unwrap(), 3);
        assert_eq!(retries, 2);
    }

    #[test]
    fn surfaces_last_error_when_exhausted() {
        let policy = RetryPolicy::immediate(2);
        let out: Result<(), _> = policy.run(
            || Err(TransientStoreError::new("still down")),
            || {},
        );

        assert_eq!(out.unwrap_err().message, "still down");
    }

    #[test]
    fn backoff_doubles_and_caps() {
        let policy = RetryPolicy {
            max_attempts: 5,
            base_delay: Duration::from_millis(10),
            max_delay: Duration::from_millis(25),
        };

        assert_eq!(policy.delay_for(0), Duration::from_millis(10));
        assert_eq!(policy.delay_for(1), Duration::from_millis(20));
        assert_eq!(policy.delay_for(2), Duration::from_millis(25));
    }
}
