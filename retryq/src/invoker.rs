//! Single-operation retrying invoker.

use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use crate::classifier::{Classification, FailureClassifier};
use crate::errors::RetryqResult;
use crate::retry_policy::RetryPolicy;
use crate::session::Session;

/// Executes a single bound operation under a [`RetryPolicy`].
///
/// The invoker owns its session exclusively for its lifetime. Every failing
/// attempt is followed by a rollback before the failure is classified:
/// terminal errors propagate immediately, transient errors are retried until
/// the policy bound is reached, and the error that exhausts its retries is
/// returned to the caller unaltered.
///
/// # Guarantees
/// - Every exit path either commits or rolls back; the session is never left
///   with an uncommitted, unrolled-back partial operation
/// - An operation runs at most `max_retries + 1` times
/// - The original error is propagated without wrapping
///
/// A retried operation may repeat its side effects if it is not idempotent.
/// The invoker cannot distinguish "partially applied" from "never applied"
/// on a transient failure, so callers are responsible for routing only
/// idempotent operations (plain inserts, selects) through it.
///
/// # Usage
/// ```rust,ignore
/// let invoker = OperationInvoker::new(session, RetryPolicy::new(3));
/// let user = invoker.invoke(|session| session.insert(&new_user), true)?;
/// ```
pub struct OperationInvoker<S: Session> {
    session: S,
    policy: RetryPolicy,
    committed: AtomicBool,
}

impl<S: Session> OperationInvoker<S> {
    /// Creates an invoker bound to a session and a retry policy.
    pub fn new(session: S, policy: RetryPolicy) -> Self {
        OperationInvoker {
            session,
            policy,
            committed: AtomicBool::new(false),
        }
    }

    /// Returns the session this invoker is bound to.
    pub fn session(&self) -> &S {
        &self.session
    }

    /// Returns the retry policy governing this invoker.
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Checks whether the most recent invocation committed the session.
    ///
    /// A scope uses this to skip its exit commit when the last invocation
    /// already requested its own commit.
    pub fn committed(&self) -> bool {
        self.committed.load(Ordering::SeqCst)
    }

    /// Executes an operation under the retry policy.
    ///
    /// A requested commit is part of the attempt: if the commit itself fails,
    /// the session is rolled back and the failure goes through the same
    /// classification as an operation failure.
    ///
    /// # Arguments
    /// * `operation` - A closure executing one deferred unit of work against
    ///   the session; re-invoked on every attempt
    /// * `commit` - Whether to commit the session once the operation succeeds
    ///
    /// # Returns
    /// The operation's result on success.
    ///
    /// # Errors
    /// The original error from the failing operation (or commit), after a
    /// rollback, when it is terminal or when retries are exhausted.
    pub fn invoke<T, F>(&self, mut operation: F, commit: bool) -> RetryqResult<T>
    where
        F: FnMut(&S) -> RetryqResult<T>,
    {
        self.committed.store(false, Ordering::SeqCst);
        let mut attempt: u32 = 0;

        loop {
            match self.attempt_once(&mut operation, commit) {
                Ok(value) => return Ok(value),
                Err(error) => {
                    self.rollback_after_failure();

                    match FailureClassifier::classify(&error) {
                        Classification::Terminal => {
                            log::error!("Operation failed with terminal error: {}", error);
                            return Err(error);
                        }
                        Classification::Transient => {
                            if !self.policy.should_retry(attempt) {
                                log::error!(
                                    "Operation failed after {} attempts: {}",
                                    attempt + 1,
                                    error
                                );
                                return Err(error);
                            }
                            log::warn!(
                                "Transient failure on attempt {}, retrying: {}",
                                attempt + 1,
                                error
                            );
                            if let Some(delay) = self.policy.delay_before_retry(attempt) {
                                thread::sleep(delay);
                            }
                            attempt += 1;
                        }
                    }
                }
            }
        }
    }

    /// Runs one attempt: the operation followed by an optional commit.
    fn attempt_once<T, F>(&self, operation: &mut F, commit: bool) -> RetryqResult<T>
    where
        F: FnMut(&S) -> RetryqResult<T>,
    {
        let value = operation(&self.session)?;
        if commit {
            self.session.commit()?;
            self.committed.store(true, Ordering::SeqCst);
        }
        Ok(value)
    }

    /// Rolls the session back while handling a failure.
    ///
    /// A failing rollback is logged and suppressed so it cannot mask the
    /// original error.
    fn rollback_after_failure(&self) {
        if let Err(rollback_error) = self.session.rollback() {
            log::error!(
                "Rollback failed while handling an operation failure: {}",
                rollback_error
            );
        }
    }
}
