//! Retry bounds and backoff configuration.

use std::time::Duration;

/// Default number of retries after the initial attempt.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Delay rule applied between attempts.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Backoff {
    /// Retry immediately with no delay
    #[default]
    None,
    /// Wait a fixed duration before every retry
    Fixed(Duration),
    /// Wait `initial + step * attempt` before the retry following `attempt`
    Incremental { initial: Duration, step: Duration },
}

impl Backoff {
    /// Returns the delay to wait before the retry that follows `attempt`.
    ///
    /// # Arguments
    /// * `attempt` - Zero-based index of the attempt that just failed
    ///
    /// # Returns
    /// `Some(duration)` to sleep, or `None` for an immediate retry
    pub fn delay(&self, attempt: u32) -> Option<Duration> {
        match self {
            Backoff::None => None,
            Backoff::Fixed(delay) => Some(*delay),
            Backoff::Incremental { initial, step } => Some(*initial + *step * attempt),
        }
    }
}

/// Bounded retry configuration shared across invocations.
///
/// A policy holds the attempt bound and the inter-attempt delay rule. It has
/// no mutable state beyond its configured fields and is safe to share; the
/// attempt counter itself lives with each invocation.
///
/// `max_retries` of zero means "try once, no retry". An operation is executed
/// at most `max_retries + 1` times.
///
/// # Examples
///
/// ```rust,ignore
/// use retryq::retry_policy::{Backoff, RetryPolicy};
/// use std::time::Duration;
///
/// let policy = RetryPolicy::new(5).with_backoff(Backoff::Fixed(Duration::from_millis(20)));
/// assert!(policy.should_retry(4));
/// assert!(!policy.should_retry(5));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    max_retries: u32,
    backoff: Backoff,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy::new(DEFAULT_MAX_RETRIES)
    }
}

impl RetryPolicy {
    /// Creates a policy allowing `max_retries` retries with no backoff.
    pub fn new(max_retries: u32) -> Self {
        RetryPolicy {
            max_retries,
            backoff: Backoff::None,
        }
    }

    /// Sets the delay rule applied between attempts.
    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    /// Returns the configured retry bound.
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Returns the configured delay rule.
    pub fn backoff(&self) -> &Backoff {
        &self.backoff
    }

    /// Checks whether another retry is allowed after the given attempt.
    ///
    /// # Arguments
    /// * `attempt` - Zero-based index of the attempt that just failed
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_retries
    }

    /// Returns the delay to wait before the retry that follows `attempt`.
    pub fn delay_before_retry(&self, attempt: u32) -> Option<Duration> {
        self.backoff.delay(attempt)
    }
}
