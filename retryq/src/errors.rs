use backtrace::Backtrace;
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};
use std::result::Result;

use crate::common::{atomic, Atomic};

/// Error kinds for coordinator operations.
///
/// Each kind describes a category of failure raised by the session layer or
/// by the coordinator itself. The kind determines how a failure is handled:
/// infrastructure kinds are considered recoverable and eligible for retry,
/// everything else propagates after a single rollback (see
/// [`crate::classifier::FailureClassifier`]).
///
/// # Examples
///
/// ```rust,ignore
/// use retryq::errors::{RetryqError, ErrorKind, RetryqResult};
///
/// fn example() -> RetryqResult<()> {
///     Err(RetryqError::new("deadlock detected", ErrorKind::Deadlock))
/// }
/// ```
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum ErrorKind {
    // Infrastructure faults - retried after rollback
    /// The connection to the database was dropped or went stale
    ConnectionLost,
    /// A lock could not be acquired within the allowed time
    LockTimeout,
    /// The database detected a deadlock and aborted this transaction
    Deadlock,
    /// A serialization conflict with a concurrent transaction
    SerializationConflict,
    /// The operation timed out
    Timeout,

    // Integrity faults - never retried
    /// A constraint (unique, foreign key, check) was violated
    ConstraintViolation,
    /// Generic validation error
    ValidationError,
    /// Invalid data type for operation
    InvalidDataType,
    /// The requested resource was not found
    NotFound,

    // Operation errors - never retried
    /// The operation is not valid in the current context
    InvalidOperation,
    /// The session has already been closed
    SessionClosed,

    // Application errors - allows callers to surface their own faults
    // through a scope; the String names the application category
    /// Error raised by application code running inside a scope
    Application(String),

    // Generic/Internal errors - used as fallback
    /// Internal error (usually indicates a bug)
    InternalError,
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::ConnectionLost => write!(f, "Connection lost"),
            ErrorKind::LockTimeout => write!(f, "Lock timeout"),
            ErrorKind::Deadlock => write!(f, "Deadlock"),
            ErrorKind::SerializationConflict => write!(f, "Serialization conflict"),
            ErrorKind::Timeout => write!(f, "Timeout"),
            ErrorKind::ConstraintViolation => write!(f, "Constraint violation"),
            ErrorKind::ValidationError => write!(f, "Validation error"),
            ErrorKind::InvalidDataType => write!(f, "Invalid data type"),
            ErrorKind::NotFound => write!(f, "Not found"),
            ErrorKind::InvalidOperation => write!(f, "Invalid operation"),
            ErrorKind::SessionClosed => write!(f, "Session closed"),
            ErrorKind::Application(name) => write!(f, "{} error", name),
            ErrorKind::InternalError => write!(f, "Internal error"),
        }
    }
}

/// Custom coordinator error type.
///
/// `RetryqError` encapsulates error information including the error message,
/// kind, and optional cause. It supports error chaining and backtraces for
/// debugging.
///
/// The coordinator never wraps an operation's error on the retry path: the
/// error that exhausted its retries (or was classified terminal) is returned
/// to the caller unaltered, so the root cause stays visible.
///
/// # Examples
///
/// ```rust,ignore
/// use retryq::errors::{RetryqError, ErrorKind};
///
/// // Create a simple error
/// let err = RetryqError::new("connection reset by peer", ErrorKind::ConnectionLost);
///
/// // Create an error with a cause
/// let cause = RetryqError::new("socket closed", ErrorKind::ConnectionLost);
/// let err = RetryqError::new_with_cause("flush failed", ErrorKind::ConnectionLost, cause);
/// ```
///
/// # Type alias
///
/// The `RetryqResult<T>` type alias is equivalent to `Result<T, RetryqError>`
/// and is used throughout the codebase for operations that can fail.
#[derive(Clone)]
pub struct RetryqError {
    message: String,
    error_kind: ErrorKind,
    cause: Option<Box<RetryqError>>,
    backtrace: Atomic<Backtrace>,
}

impl RetryqError {
    /// Creates a new `RetryqError` with the specified message and error kind.
    ///
    /// # Arguments
    ///
    /// * `message` - A description of the error
    /// * `error_kind` - The category of error
    ///
    /// # Returns
    ///
    /// A new `RetryqError` instance.
    pub fn new(message: &str, error_kind: ErrorKind) -> Self {
        RetryqError {
            message: message.to_string(),
            error_kind,
            cause: None,
            backtrace: atomic(Backtrace::new()),
        }
    }

    /// Creates a new `RetryqError` with a cause error.
    ///
    /// This creates an error chain where the cause error is preserved for
    /// debugging.
    ///
    /// # Arguments
    ///
    /// * `message` - A description of the error
    /// * `error_kind` - The category of error
    /// * `cause` - The underlying error that caused this error
    ///
    /// # Returns
    ///
    /// A new `RetryqError` instance with the cause error attached.
    pub fn new_with_cause(message: &str, error_kind: ErrorKind, cause: RetryqError) -> Self {
        RetryqError {
            message: message.to_string(),
            error_kind,
            cause: Some(Box::new(cause)),
            backtrace: atomic(Backtrace::new()),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.error_kind
    }

    pub fn cause(&self) -> Option<&Box<RetryqError>> {
        self.cause.as_ref()
    }
}

impl Display for RetryqError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl Debug for RetryqError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        // print error message with stack trace followed by cause
        match &self.cause {
            Some(cause) => write!(f, "{}\nCaused by: {:?}", self.message, cause),
            None => write!(f, "{}\n{:?}", self.message, self.backtrace.read()),
        }
    }
}

impl Error for RetryqError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match &self.cause {
            Some(cause) => Some(cause.as_ref()),
            None => None,
        }
    }
}

/// A result type alias for coordinator operations.
///
/// `RetryqResult<T>` is shorthand for `Result<T, RetryqError>`.
/// All fallible coordinator operations return this type.
pub type RetryqResult<T> = Result<T, RetryqError>;

// From trait implementations for automatic error conversion
impl From<std::io::Error> for RetryqError {
    fn from(err: std::io::Error) -> Self {
        let error_kind = match err.kind() {
            std::io::ErrorKind::TimedOut => ErrorKind::Timeout,
            std::io::ErrorKind::ConnectionReset
            | std::io::ErrorKind::ConnectionAborted
            | std::io::ErrorKind::BrokenPipe
            | std::io::ErrorKind::NotConnected => ErrorKind::ConnectionLost,
            std::io::ErrorKind::NotFound => ErrorKind::NotFound,
            _ => ErrorKind::InternalError,
        };
        RetryqError::new(&format!("IO error: {}", err), error_kind)
    }
}

impl From<std::num::ParseIntError> for RetryqError {
    fn from(err: std::num::ParseIntError) -> Self {
        RetryqError::new(
            &format!("Integer parsing error: {}", err),
            ErrorKind::InvalidDataType,
        )
    }
}

impl From<String> for RetryqError {
    fn from(msg: String) -> Self {
        RetryqError::new(&msg, ErrorKind::InternalError)
    }
}

impl From<&str> for RetryqError {
    fn from(msg: &str) -> Self {
        RetryqError::new(msg, ErrorKind::InternalError)
    }
}
