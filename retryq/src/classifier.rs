//! Failure classification for retry decisions.
//!
//! Decides whether a raised error is transient (retryable after a rollback)
//! or terminal (must propagate immediately). Classification is a pure
//! decision over the error kind; it never swallows, wraps, or re-raises.

use crate::errors::{ErrorKind, RetryqError};

/// The outcome of classifying a raised error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// A recoverable infrastructure fault. Retry is safe because a rollback
    /// has restored the session to a clean transactional baseline.
    Transient,
    /// An application-level or integrity fault that a retry cannot resolve.
    Terminal,
}

impl Classification {
    /// Checks if this classification allows a retry.
    pub fn is_transient(&self) -> bool {
        matches!(self, Classification::Transient)
    }
}

/// Pure classifier mapping error kinds onto [`Classification`].
///
/// Transient kinds signal recoverable infrastructure conditions: stale or
/// dropped connections, lock and serialization conflicts, timeouts. All
/// other kinds are terminal, including constraint violations and any
/// application error raised by code running inside a scope.
pub struct FailureClassifier;

impl FailureClassifier {
    /// Classifies a raised error.
    ///
    /// # Arguments
    /// * `error` - The error raised by an operation or by the session layer
    ///
    /// # Returns
    /// `Classification::Transient` for recoverable infrastructure faults,
    /// `Classification::Terminal` for everything else
    pub fn classify(error: &RetryqError) -> Classification {
        Self::classify_kind(error.kind())
    }

    /// Classifies an error kind directly.
    pub fn classify_kind(kind: &ErrorKind) -> Classification {
        match kind {
            ErrorKind::ConnectionLost
            | ErrorKind::LockTimeout
            | ErrorKind::Deadlock
            | ErrorKind::SerializationConflict
            | ErrorKind::Timeout => Classification::Transient,
            _ => Classification::Terminal,
        }
    }
}
