//! Configuration for the retry coordinator.

use crate::retry_policy::{Backoff, RetryPolicy, DEFAULT_MAX_RETRIES};

/// Recognized coordinator options: retry bound, commit-on-exit, backoff.
///
/// The configuration is an immutable value shared by the facade and by
/// transaction scopes. `max_retries` is non-negative by construction; zero
/// means "try once, no retry".
///
/// # Examples
///
/// ```rust,ignore
/// use retryq::retryq_config::RetryqConfig;
/// use retryq::retry_policy::Backoff;
/// use std::time::Duration;
///
/// let config = RetryqConfig::new()
///     .with_max_retries(5)
///     .with_commit(true)
///     .with_backoff(Backoff::Fixed(Duration::from_millis(50)));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryqConfig {
    max_retries: u32,
    commit: bool,
    backoff: Backoff,
}

impl Default for RetryqConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl RetryqConfig {
    /// Creates a configuration with default values: three retries, no
    /// commit on exit, no backoff.
    pub fn new() -> Self {
        RetryqConfig {
            max_retries: DEFAULT_MAX_RETRIES,
            commit: false,
            backoff: Backoff::None,
        }
    }

    /// Sets the retry bound passed through to invocations.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Sets whether a scope commits its session on clean exit.
    pub fn with_commit(mut self, commit: bool) -> Self {
        self.commit = commit;
        self
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

    /// Returns whether scopes commit on clean exit.
    pub fn commit(&self) -> bool {
        self.commit
    }

    /// Returns the configured delay rule.
    pub fn backoff(&self) -> &Backoff {
        &self.backoff
    }

    /// Builds the retry policy described by this configuration.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_retries).with_backoff(self.backoff.clone())
    }
}
