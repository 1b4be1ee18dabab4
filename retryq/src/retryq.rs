//! Coordinator facade over a session provider.

use crate::errors::RetryqResult;
use crate::invoker::OperationInvoker;
use crate::retryq_config::RetryqConfig;
use crate::scope::TransactionScope;
use crate::session::SessionProvider;

/// Entry point binding a session provider to a coordinator configuration.
///
/// `Retryq` offers the two public forms of the coordinator:
///
/// - [`Retryq::invoke`] - the function form: a one-off operation on a fresh
///   session, retried under the configured policy
/// - [`Retryq::with_transaction`] - the scoped form: several invocations
///   (and arbitrary code between them) against one shared session, committed
///   or rolled back together at scope exit
///
/// The provider is injected rather than assumed global, so tests can
/// substitute a fake resource exposing scripted `commit`/`rollback`
/// behavior.
///
/// # Examples
///
/// ```rust,ignore
/// use retryq::retryq::Retryq;
/// use retryq::retryq_config::RetryqConfig;
///
/// let db = Retryq::with_config(engine, RetryqConfig::new().with_commit(true));
///
/// db.with_transaction(|q| {
///     q.invoke(|session| session.insert(&user), false)?;
///     q.invoke(|session| session.insert(&profile), false)?;
///     Ok(())
/// })?;
/// ```
pub struct Retryq<P: SessionProvider> {
    provider: P,
    config: RetryqConfig,
}

impl<P: SessionProvider> Retryq<P> {
    /// Creates a coordinator with the default configuration.
    pub fn new(provider: P) -> Self {
        Self::with_config(provider, RetryqConfig::default())
    }

    /// Creates a coordinator with an explicit configuration.
    pub fn with_config(provider: P, config: RetryqConfig) -> Self {
        Retryq { provider, config }
    }

    /// Returns the coordinator configuration.
    pub fn config(&self) -> &RetryqConfig {
        &self.config
    }

    /// Returns the session provider.
    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Executes a one-off operation on a fresh session under the configured
    /// retry policy.
    ///
    /// # Arguments
    /// * `operation` - A closure executing one deferred unit of work against
    ///   the session; re-invoked on every attempt
    /// * `commit` - Whether to commit the session once the operation succeeds
    ///
    /// # Errors
    /// The original error from the failing operation, after a rollback, when
    /// it is terminal or when retries are exhausted; or the provider's error
    /// if no session could be opened.
    pub fn invoke<T, F>(&self, operation: F, commit: bool) -> RetryqResult<T>
    where
        F: FnMut(&P::Session) -> RetryqResult<T>,
    {
        let session = self.provider.open_session()?;
        let invoker = OperationInvoker::new(session, self.config.retry_policy());
        invoker.invoke(operation, commit)
    }

    /// Executes several invocations as one all-or-nothing unit.
    ///
    /// Opens a session, yields an invoker pre-bound to it, and applies the
    /// scope exit semantics: a clean exit commits once if the configuration
    /// requests it, any error escaping the body rolls the shared session
    /// back and propagates unchanged.
    ///
    /// # Arguments
    /// * `body` - The scope body; receives the pre-bound invoker
    pub fn with_transaction<T, F>(&self, body: F) -> RetryqResult<T>
    where
        F: FnOnce(&OperationInvoker<P::Session>) -> RetryqResult<T>,
    {
        TransactionScope::run(&self.provider, &self.config, body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{ErrorKind, RetryqError};
    use crate::session::Session;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[derive(Clone)]
    struct RecordingSession {
        commits: Arc<AtomicU32>,
        rollbacks: Arc<AtomicU32>,
    }

    impl Session for RecordingSession {
        fn commit(&self) -> RetryqResult<()> {
            self.commits.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn rollback(&self) -> RetryqResult<()> {
            self.rollbacks.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[derive(Clone)]
    struct RecordingEngine {
        session: RecordingSession,
        broken: bool,
    }

    impl RecordingEngine {
        fn new() -> Self {
            RecordingEngine {
                session: RecordingSession {
                    commits: Arc::new(AtomicU32::new(0)),
                    rollbacks: Arc::new(AtomicU32::new(0)),
                },
                broken: false,
            }
        }

        fn commits(&self) -> u32 {
            self.session.commits.load(Ordering::SeqCst)
        }

        fn rollbacks(&self) -> u32 {
            self.session.rollbacks.load(Ordering::SeqCst)
        }
    }

    impl SessionProvider for RecordingEngine {
        type Session = RecordingSession;

        fn open_session(&self) -> RetryqResult<RecordingSession> {
            if self.broken {
                return Err(RetryqError::new(
                    "engine disposed",
                    ErrorKind::SessionClosed,
                ));
            }
            Ok(self.session.clone())
        }
    }

    #[test]
    fn test_invoke_success() {
        let engine = RecordingEngine::new();
        let db = Retryq::new(engine.clone());

        let result = db.invoke(|_| Ok(1u32), true);

        assert_eq!(result.unwrap(), 1);
        assert_eq!(engine.commits(), 1);
    }

    #[test]
    fn test_invoke_retries_transient() {
        let engine = RecordingEngine::new();
        let db = Retryq::with_config(engine.clone(), RetryqConfig::new().with_max_retries(2));
        let calls = AtomicU32::new(0);

        let result = db.invoke(
            |_| {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                if n == 0 {
                    Err(RetryqError::new("gone away", ErrorKind::ConnectionLost))
                } else {
                    Ok(n)
                }
            },
            false,
        );

        assert_eq!(result.unwrap(), 1);
        assert_eq!(engine.rollbacks(), 1);
    }

    #[test]
    fn test_invoke_provider_failure_propagates() {
        let mut engine = RecordingEngine::new();
        engine.broken = true;
        let db = Retryq::new(engine);

        let result = db.invoke(|_| Ok(()), false);

        let err = result.unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::SessionClosed);
    }

    #[test]
    fn test_with_transaction_commits_per_config() {
        let engine = RecordingEngine::new();
        let db = Retryq::with_config(engine.clone(), RetryqConfig::new().with_commit(true));

        db.with_transaction(|q| {
            q.invoke(|_| Ok(()), false)?;
            q.invoke(|_| Ok(()), false)?;
            Ok(())
        })
        .unwrap();

        assert_eq!(engine.commits(), 1);
        assert_eq!(engine.rollbacks(), 0);
    }

    #[test]
    fn test_with_transaction_rolls_back_on_error() {
        let engine = RecordingEngine::new();
        let db = Retryq::with_config(engine.clone(), RetryqConfig::new().with_commit(true));

        let result: RetryqResult<()> = db.with_transaction(|q| {
            q.invoke(|_| Ok(()), false)?;
            Err(RetryqError::new("validation failed", ErrorKind::ValidationError))
        });

        assert!(result.is_err());
        assert_eq!(engine.commits(), 0);
        assert_eq!(engine.rollbacks(), 1);
    }

    #[test]
    fn test_config_accessor() {
        let db = Retryq::with_config(
            RecordingEngine::new(),
            RetryqConfig::new().with_max_retries(9),
        );

        assert_eq!(db.config().max_retries(), 9);
    }
}
