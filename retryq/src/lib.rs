//! # Retryq - Retry-and-Rollback Coordinator
//!
//! Retryq is a small coordination layer for database operations executed
//! against a transactional session. Application code issues one or more
//! session operations without hand-writing retry loops or transaction
//! boundaries: transient failures (lock contention, dropped connections,
//! deadlocks) are retried a bounded number of times, and any failure rolls
//! the enclosing unit of work back before the error is surfaced.
//!
//! ## Key Features
//!
//! - **Failure classification**: transient infrastructure faults are retried,
//!   terminal application faults propagate immediately
//! - **Bounded retries**: at most `max_retries + 1` executions per operation,
//!   with optional fixed or incremental backoff between attempts
//! - **Rollback guarantee**: every failing attempt is preceded by a rollback,
//!   and no exit path leaves an uncommitted, unrolled-back session behind
//! - **Transaction scoping**: several invocations (and arbitrary code between
//!   them) grouped into one all-or-nothing unit
//! - **Injected sessions**: the session layer is an external collaborator
//!   behind the [`session::Session`] trait; no engine or pool is owned here
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use retryq::retryq::Retryq;
//! use retryq::retryq_config::RetryqConfig;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // `engine` implements SessionProvider for your database layer
//! let db = Retryq::with_config(engine, RetryqConfig::new().with_commit(true));
//!
//! // One-off invocation, retried and committed on success
//! let user = db.invoke(|session| session.insert(&new_user), true)?;
//!
//! // Several invocations as one rollback unit
//! db.with_transaction(|q| {
//!     let user = q.invoke(|session| session.insert(&new_user), false)?;
//!     q.invoke(|session| session.insert(&profile_for(&user)), false)?;
//!     Ok(())
//! })?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Organization
//!
//! - [`classifier`] - Transient/terminal classification of raised errors
//! - [`common`] - Common types and utilities
//! - [`errors`] - Error types and result definitions
//! - [`invoker`] - Single-operation retrying invoker
//! - [`retry_policy`] - Retry bounds and backoff configuration
//! - [`retryq`] - Coordinator facade over a session provider
//! - [`retryq_config`] - Coordinator configuration
//! - [`scope`] - Scoped multi-operation transaction wrapper
//! - [`session`] - Session and session provider traits

pub mod classifier;
pub mod common;
pub mod errors;
pub mod invoker;
pub mod retry_policy;
pub mod retryq;
pub mod retryq_config;
pub mod scope;
pub mod session;

pub use classifier::{Classification, FailureClassifier};
pub use common::{atomic, Atomic, ReadExecutor, WriteExecutor};
pub use errors::{ErrorKind, RetryqError, RetryqResult};
pub use invoker::OperationInvoker;
pub use retry_policy::{Backoff, RetryPolicy, DEFAULT_MAX_RETRIES};
pub use retryq::Retryq;
pub use retryq_config::RetryqConfig;
pub use scope::TransactionScope;
pub use session::{Session, SessionProvider};
