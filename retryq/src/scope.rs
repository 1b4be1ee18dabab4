//! Scoped multi-operation transaction wrapper.

use std::sync::atomic::{AtomicBool, Ordering};

use uuid::Uuid;

use crate::errors::RetryqResult;
use crate::invoker::OperationInvoker;
use crate::retryq_config::RetryqConfig;
use crate::session::{Session, SessionProvider};

/// A scoped resource grouping several invocations into one rollback unit.
///
/// For its lifetime the scope owns exactly one session and exposes an
/// [`OperationInvoker`] pre-bound to it, so calls inside the scope do not
/// re-specify the session. The scope is destroyed exactly once, on every
/// exit path:
///
/// - clean exit with `commit` configured: one commit, unless the last
///   invocation already committed
/// - any error escaping the scope body: one rollback, then the original
///   error propagates unchanged
/// - dropped without completion (early return or panic): best-effort
///   rollback in `Drop`
///
/// Partial work performed by earlier successful invocations inside the scope
/// is undone together with the triggering failure. The scope rolls back, but
/// never re-runs, code between invocations; only individual invocations are
/// retried.
///
/// Scopes must not be nested on the same session and must not be reentered.
///
/// # Usage
/// The closure form applies the exit semantics automatically:
/// ```rust,ignore
/// TransactionScope::run(&engine, &RetryqConfig::new().with_commit(true), |q| {
///     let user = q.invoke(|session| session.insert(&new_user), false)?;
///     q.invoke(|session| session.insert(&profile_for(&user)), false)?;
///     Ok(())
/// })?;
/// ```
pub struct TransactionScope<S: Session> {
    id: String,
    invoker: OperationInvoker<S>,
    commit_on_exit: bool,
    completed: AtomicBool,
}

impl<S: Session> TransactionScope<S> {
    /// Acquires a scope by opening a session on the resource owner.
    ///
    /// # Arguments
    /// * `provider` - The resource owner sessions are opened against
    /// * `config` - Retry bound, backoff, and commit-on-exit flag
    ///
    /// # Returns
    /// A live scope owning a fresh session, with an invoker bound to the
    /// configured retry policy.
    ///
    /// # Errors
    /// Returns an error if the provider cannot open a session.
    pub fn acquire<P>(provider: &P, config: &RetryqConfig) -> RetryqResult<Self>
    where
        P: SessionProvider<Session = S>,
    {
        let session = provider.open_session()?;
        let scope = TransactionScope {
            id: Uuid::new_v4().to_string(),
            invoker: OperationInvoker::new(session, config.retry_policy()),
            commit_on_exit: config.commit(),
            completed: AtomicBool::new(false),
        };
        log::debug!("Acquired transaction scope {}", scope.id);
        Ok(scope)
    }

    /// Gets the scope ID.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns the invoker bound to this scope's session.
    pub fn invoker(&self) -> &OperationInvoker<S> {
        &self.invoker
    }

    /// Checks if this scope has been committed or rolled back.
    pub fn is_completed(&self) -> bool {
        self.completed.load(Ordering::SeqCst)
    }

    /// Completes the scope on the clean-exit path.
    ///
    /// Commits the shared session if commit-on-exit was configured and the
    /// last invocation did not already commit. Idempotent: completing an
    /// already-completed scope is a no-op.
    ///
    /// # Errors
    /// The commit error, after a best-effort rollback, if the exit commit
    /// fails. The session is never left in an undecided state.
    pub fn complete(&self) -> RetryqResult<()> {
        if self
            .completed
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            // Already completed
            return Ok(());
        }

        if self.commit_on_exit && !self.invoker.committed() {
            if let Err(commit_error) = self.invoker.session().commit() {
                log::error!(
                    "Exit commit failed for transaction scope {}: {}",
                    self.id,
                    commit_error
                );
                self.rollback_quietly();
                return Err(commit_error);
            }
            log::debug!("Committed transaction scope {}", self.id);
        }
        Ok(())
    }

    /// Abandons the scope on the exceptional-exit path, rolling the shared
    /// session back.
    ///
    /// Idempotent: abandoning an already-completed scope is a no-op. A
    /// failing rollback is logged and suppressed so it cannot mask the error
    /// that triggered the abandonment.
    pub fn abandon(&self) {
        if self
            .completed
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return;
        }
        log::debug!("Rolling back transaction scope {}", self.id);
        self.rollback_quietly();
    }

    /// Runs a scope body with automatic exit handling.
    ///
    /// Acquires a scope, yields its invoker to the body, and applies the
    /// exit semantics: `Ok` completes the scope (committing if configured),
    /// `Err` rolls it back and re-raises the body's error unchanged.
    ///
    /// # Arguments
    /// * `provider` - The resource owner sessions are opened against
    /// * `config` - Retry bound, backoff, and commit-on-exit flag
    /// * `body` - The scope body; receives the pre-bound invoker
    pub fn run<P, T, F>(provider: &P, config: &RetryqConfig, body: F) -> RetryqResult<T>
    where
        P: SessionProvider<Session = S>,
        F: FnOnce(&OperationInvoker<S>) -> RetryqResult<T>,
    {
        let scope = Self::acquire(provider, config)?;
        match body(scope.invoker()) {
            Ok(value) => {
                scope.complete()?;
                Ok(value)
            }
            Err(error) => {
                scope.abandon();
                Err(error)
            }
        }
    }

    fn rollback_quietly(&self) {
        if let Err(rollback_error) = self.invoker.session().rollback() {
            log::error!(
                "Rollback failed for transaction scope {}: {}",
                self.id,
                rollback_error
            );
        }
    }
}

impl<S: Session> Drop for TransactionScope<S> {
    fn drop(&mut self) {
        // A scope dropped without completion rolls back
        self.abandon();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{ErrorKind, RetryqError};
    use std::sync::atomic::AtomicU32;
    use std::sync::Arc;

    /// Session provider handing out clones of a single counting session.
    #[derive(Clone)]
    struct FakeEngine {
        session: CountingSession,
        opened: Arc<AtomicU32>,
    }

    impl FakeEngine {
        fn new() -> Self {
            FakeEngine {
                session: CountingSession::new(),
                opened: Arc::new(AtomicU32::new(0)),
            }
        }

        fn session(&self) -> &CountingSession {
            &self.session
        }

        fn opened(&self) -> u32 {
            self.opened.load(Ordering::SeqCst)
        }
    }

    impl SessionProvider for FakeEngine {
        type Session = CountingSession;

        fn open_session(&self) -> RetryqResult<CountingSession> {
            self.opened.fetch_add(1, Ordering::SeqCst);
            Ok(self.session.clone())
        }
    }

    #[derive(Clone)]
    struct CountingSession {
        commits: Arc<AtomicU32>,
        rollbacks: Arc<AtomicU32>,
    }

    impl CountingSession {
        fn new() -> Self {
            CountingSession {
                commits: Arc::new(AtomicU32::new(0)),
                rollbacks: Arc::new(AtomicU32::new(0)),
            }
        }

        fn commits(&self) -> u32 {
            self.commits.load(Ordering::SeqCst)
        }

        fn rollbacks(&self) -> u32 {
            self.rollbacks.load(Ordering::SeqCst)
        }
    }

    impl Session for CountingSession {
        fn commit(&self) -> RetryqResult<()> {
            self.commits.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn rollback(&self) -> RetryqResult<()> {
            self.rollbacks.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn transient_error() -> RetryqError {
        RetryqError::new("lock wait timeout", ErrorKind::LockTimeout)
    }

    #[test]
    fn test_acquire_opens_one_session() {
        let engine = FakeEngine::new();
        let scope =
            TransactionScope::acquire(&engine, &RetryqConfig::new()).unwrap();

        assert_eq!(engine.opened(), 1);
        assert!(!scope.id().is_empty());
        assert!(!scope.is_completed());
    }

    #[test]
    fn test_scope_ids_are_unique() {
        let engine = FakeEngine::new();
        let scope1 = TransactionScope::acquire(&engine, &RetryqConfig::new()).unwrap();
        let scope2 = TransactionScope::acquire(&engine, &RetryqConfig::new()).unwrap();

        assert_ne!(scope1.id(), scope2.id());
    }

    /// Tests that a clean exit with commit configured commits exactly once
    #[test]
    fn test_run_commits_once_on_clean_exit() {
        let engine = FakeEngine::new();
        let config = RetryqConfig::new().with_commit(true);

        let result = TransactionScope::run(&engine, &config, |q| {
            q.invoke(|_| Ok(()), false)?;
            q.invoke(|_| Ok(()), false)?;
            Ok("done")
        });

        assert_eq!(result.unwrap(), "done");
        assert_eq!(engine.session().commits(), 1);
        assert_eq!(engine.session().rollbacks(), 0);
    }

    /// Tests that a clean exit without commit configured leaves the session open
    #[test]
    fn test_run_without_commit_leaves_session_open() {
        let engine = FakeEngine::new();

        TransactionScope::run(&engine, &RetryqConfig::new(), |q| {
            q.invoke(|_| Ok(()), false)
        })
        .unwrap();

        assert_eq!(engine.session().commits(), 0);
        assert_eq!(engine.session().rollbacks(), 0);
    }

    /// Tests that an inner explicit commit suppresses the exit commit
    #[test]
    fn test_inner_commit_skips_exit_commit() {
        let engine = FakeEngine::new();
        let config = RetryqConfig::new().with_commit(true);

        TransactionScope::run(&engine, &config, |q| q.invoke(|_| Ok(()), true)).unwrap();

        assert_eq!(engine.session().commits(), 1);
    }

    /// Tests that work after an inner commit still gets the exit commit
    #[test]
    fn test_work_after_inner_commit_is_committed_at_exit() {
        let engine = FakeEngine::new();
        let config = RetryqConfig::new().with_commit(true);

        TransactionScope::run(&engine, &config, |q| {
            q.invoke(|_| Ok(()), true)?;
            q.invoke(|_| Ok(()), false)?;
            Ok(())
        })
        .unwrap();

        assert_eq!(engine.session().commits(), 2);
    }

    /// Tests that an error in the scope body rolls back once and re-raises
    /// the error unchanged, with no commit
    #[test]
    fn test_body_error_rolls_back_and_propagates() {
        let engine = FakeEngine::new();
        let config = RetryqConfig::new().with_commit(true);

        let result: RetryqResult<()> = TransactionScope::run(&engine, &config, |q| {
            q.invoke(|_| Ok(()), false)?;
            q.invoke(|_| Ok(()), false)?;
            Err(RetryqError::new(
                "boom",
                ErrorKind::Application("Test".to_string()),
            ))
        });

        let err = result.unwrap_err();
        assert_eq!(err.message(), "boom");
        assert_eq!(err.kind(), &ErrorKind::Application("Test".to_string()));
        assert_eq!(engine.session().rollbacks(), 1);
        assert_eq!(engine.session().commits(), 0);
    }

    /// Tests that an invocation exhausting its retries abandons the scope:
    /// one final scope rollback on top of the per-attempt rollbacks, never
    /// a commit
    #[test]
    fn test_exhausted_invocation_abandons_scope() {
        let engine = FakeEngine::new();
        let config = RetryqConfig::new().with_max_retries(2).with_commit(true);

        let result: RetryqResult<()> = TransactionScope::run(&engine, &config, |q| {
            q.invoke(|_| Ok(()), false)?;
            q.invoke(|_| Err::<(), _>(transient_error()), false)?;
            Ok(())
        });

        let err = result.unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::LockTimeout);
        // 3 attempt rollbacks from the failing invocation + 1 scope rollback
        assert_eq!(engine.session().rollbacks(), 4);
        assert_eq!(engine.session().commits(), 0);
    }

    /// Tests that dropping an uncompleted scope rolls back
    #[test]
    fn test_drop_rolls_back_uncompleted_scope() {
        let engine = FakeEngine::new();

        {
            let scope =
                TransactionScope::acquire(&engine, &RetryqConfig::new().with_commit(true))
                    .unwrap();
            scope.invoker().invoke(|_| Ok(()), false).unwrap();
        }

        assert_eq!(engine.session().rollbacks(), 1);
        assert_eq!(engine.session().commits(), 0);
    }

    /// Tests that dropping a completed scope does not roll back
    #[test]
    fn test_drop_after_complete_does_nothing() {
        let engine = FakeEngine::new();

        {
            let scope =
                TransactionScope::acquire(&engine, &RetryqConfig::new().with_commit(true))
                    .unwrap();
            scope.complete().unwrap();
        }

        assert_eq!(engine.session().commits(), 1);
        assert_eq!(engine.session().rollbacks(), 0);
    }

    /// Tests that complete is idempotent
    #[test]
    fn test_complete_idempotent() {
        let engine = FakeEngine::new();
        let scope =
            TransactionScope::acquire(&engine, &RetryqConfig::new().with_commit(true)).unwrap();

        scope.complete().unwrap();
        scope.complete().unwrap();

        assert_eq!(engine.session().commits(), 1);
        assert!(scope.is_completed());
    }

    /// Tests that abandon is idempotent
    #[test]
    fn test_abandon_idempotent() {
        let engine = FakeEngine::new();
        let scope = TransactionScope::acquire(&engine, &RetryqConfig::new()).unwrap();

        scope.abandon();
        scope.abandon();

        assert_eq!(engine.session().rollbacks(), 1);
        assert!(scope.is_completed());
    }

    /// Tests that abandon after complete does not roll back
    #[test]
    fn test_abandon_after_complete_is_noop() {
        let engine = FakeEngine::new();
        let scope =
            TransactionScope::acquire(&engine, &RetryqConfig::new().with_commit(true)).unwrap();

        scope.complete().unwrap();
        scope.abandon();

        assert_eq!(engine.session().commits(), 1);
        assert_eq!(engine.session().rollbacks(), 0);
    }

    /// Tests that the scope's max_retries is passed through to invocations
    #[test]
    fn test_scope_passes_retry_bound_to_invoker() {
        let engine = FakeEngine::new();
        let config = RetryqConfig::new().with_max_retries(5);
        let scope = TransactionScope::acquire(&engine, &config).unwrap();

        assert_eq!(scope.invoker().policy().max_retries(), 5);
    }

    /// Tests that invocations inside one scope share one session
    #[test]
    fn test_scope_shares_one_session() {
        let engine = FakeEngine::new();

        TransactionScope::run(&engine, &RetryqConfig::new(), |q| {
            q.invoke(|_| Ok(()), false)?;
            q.invoke(|_| Ok(()), false)?;
            q.invoke(|_| Ok(()), false)?;
            Ok(())
        })
        .unwrap();

        assert_eq!(engine.opened(), 1);
    }
}
