//! Session and session provider traits.
//!
//! The ORM/session layer is an external collaborator. The coordinator treats
//! a session purely as an opaque transactional handle exposing `commit` and
//! `rollback`; operations against it are closures that capture the target
//! capability (insert, query, update) together with their arguments.

use crate::errors::RetryqResult;

/// A stateful handle to a database transaction.
///
/// A session is exclusively owned by one invoker or scope at a time. The
/// coordinator performs no locking of its own; it relies on the underlying
/// database's transaction isolation for correctness across concurrent
/// sessions. Using the same session from multiple threads concurrently is
/// unsupported.
pub trait Session {
    /// Commits the current transaction.
    fn commit(&self) -> RetryqResult<()>;

    /// Rolls the current transaction back, restoring the session to a clean
    /// transactional baseline.
    fn rollback(&self) -> RetryqResult<()>;
}

/// A resource owner that can open sessions.
///
/// This is the injection seam for the surrounding engine or connection
/// layer: the coordinator never assumes process-wide engine state, so tests
/// can substitute a fake provider handing out scripted sessions.
pub trait SessionProvider {
    type Session: Session;

    /// Opens a new session bound to this resource owner.
    ///
    /// # Errors
    ///
    /// Returns an error if no session can be created, for example because
    /// the underlying engine has been disposed.
    fn open_session(&self) -> RetryqResult<Self::Session>;
}
