//! Bounded retries with exponential backoff and jitter
//!
//! Wraps an operation and absorbs transient contention errors
//! (`LockTimeout`, `DeadlockDetected`). Everything else (conflicts,
//! missing rows, invalid transitions) passes through on first
//! occurrence: retrying cannot change those outcomes, and blindly
//! resubmitting a conflicted payload would turn a detected conflict into
//! a silent lost update.
//!
//! The delay before attempt n is `base_delay * 2^(n-1) + jitter`, where
//! jitter is sampled uniformly from the configured range, and the total is
//! capped at `max_delay`. Tests inject a seeded RNG so interleavings are
//! repeatable.

use rand::Rng;
use registrar_core::{Error, Result};
use std::time::Duration;

/// Retry behavior for one logical operation
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total number of attempts, including the first (minimum 1)
    pub max_attempts: u32,
    /// Delay before the first retry; doubles each attempt after that
    pub base_delay: Duration,
    /// Hard cap on any single computed delay
    pub max_delay: Duration,
    /// Upper bound of the uniform jitter added to each delay
    pub jitter: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(10),
            max_delay: Duration::from_millis(100),
            jitter: Duration::from_millis(10),
        }
    }
}

impl RetryPolicy {
    /// Create a policy with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// A policy that makes exactly one attempt
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Default::default()
        }
    }

    /// Set the total number of attempts
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Set the base delay
    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    /// Set the delay cap
    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    /// Set the jitter range
    pub fn with_jitter(mut self, jitter: Duration) -> Self {
        self.jitter = jitter;
        self
    }

    /// Delay to sleep after a failed attempt (1-indexed)
    pub fn delay_for<R: Rng>(&self, attempt: u32, rng: &mut R) -> Duration {
        // Cap the shift so the multiplier cannot overflow.
        let shift = attempt.saturating_sub(1).min(32);
        let exponential = (self.base_delay.as_millis() as u64).saturating_mul(1u64 << shift);
        let jitter = if self.jitter.is_zero() {
            0
        } else {
            rng.gen_range(0..=self.jitter.as_millis() as u64)
        };
        Duration::from_millis(
            exponential
                .saturating_add(jitter)
                .min(self.max_delay.as_millis() as u64),
        )
    }
}

/// Run `op`, retrying transient failures per `policy`
///
/// Makes exactly `policy.max_attempts` attempts against an operation that
/// keeps failing transiently, then returns `RetryExhausted` wrapping the
/// last underlying error. Never retries non-transient errors.
pub fn with_retry<T, R, F>(policy: &RetryPolicy, rng: &mut R, mut op: F) -> Result<T>
where
    R: Rng,
    F: FnMut() -> Result<T>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0;
    loop {
        attempt += 1;
        match op() {
            Ok(value) => return Ok(value),
            Err(err) if !err.is_transient() => return Err(err),
            Err(err) if attempt >= max_attempts => {
                tracing::warn!(attempts = max_attempts, error = %err, "retries exhausted");
                return Err(Error::RetryExhausted {
                    attempts: max_attempts,
                    source: Box::new(err),
                });
            }
            Err(err) => {
                let delay = policy.delay_for(attempt, rng);
                tracing::debug!(
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "transient contention, backing off"
                );
                std::thread::sleep(delay);
            }
        }
    }
}
