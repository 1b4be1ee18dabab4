use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use retryq::errors::{ErrorKind, RetryqError, RetryqResult};
use retryq::session::{Session, SessionProvider};

/// A scripted in-memory session for end-to-end coordinator tests.
///
/// Records every commit and rollback, and can be primed with a queue of
/// errors to raise from upcoming commits. Clones share state, so a test can
/// keep one handle for inspection while the coordinator drives another.
#[derive(Clone)]
pub struct FakeSession {
    inner: Arc<FakeSessionInner>,
}

struct FakeSessionInner {
    commits: AtomicU32,
    rollbacks: AtomicU32,
    commit_failures: Mutex<VecDeque<RetryqError>>,
}

impl FakeSession {
    pub fn new() -> Self {
        FakeSession {
            inner: Arc::new(FakeSessionInner {
                commits: AtomicU32::new(0),
                rollbacks: AtomicU32::new(0),
                commit_failures: Mutex::new(VecDeque::new()),
            }),
        }
    }

    /// Number of commits performed so far.
    pub fn commits(&self) -> u32 {
        self.inner.commits.load(Ordering::SeqCst)
    }

    /// Number of rollbacks performed so far.
    pub fn rollbacks(&self) -> u32 {
        self.inner.rollbacks.load(Ordering::SeqCst)
    }

    /// Queues an error to be raised by the next commit.
    pub fn fail_next_commit(&self, error: RetryqError) {
        self.inner.commit_failures.lock().push_back(error);
    }
}

impl Default for FakeSession {
    fn default() -> Self {
        Self::new()
    }
}

impl Session for FakeSession {
    fn commit(&self) -> RetryqResult<()> {
        if let Some(error) = self.inner.commit_failures.lock().pop_front() {
            return Err(error);
        }
        self.inner.commits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn rollback(&self) -> RetryqResult<()> {
        self.inner.rollbacks.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// A session provider handing out clones of one shared [`FakeSession`].
///
/// Sharing one session keeps its counters visible to the test after the
/// coordinator has consumed its own handle.
#[derive(Clone)]
pub struct FakeEngine {
    session: FakeSession,
    opened: Arc<AtomicU32>,
}

impl FakeEngine {
    pub fn new() -> Self {
        FakeEngine {
            session: FakeSession::new(),
            opened: Arc::new(AtomicU32::new(0)),
        }
    }

    /// The shared session handed out by this engine.
    pub fn session(&self) -> &FakeSession {
        &self.session
    }

    /// Number of sessions opened so far.
    pub fn opened(&self) -> u32 {
        self.opened.load(Ordering::SeqCst)
    }
}

impl Default for FakeEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionProvider for FakeEngine {
    type Session = FakeSession;

    fn open_session(&self) -> RetryqResult<FakeSession> {
        self.opened.fetch_add(1, Ordering::SeqCst);
        Ok(self.session.clone())
    }
}

/// An operation that fails transiently a fixed number of times, then
/// succeeds, counting its executions.
pub struct FlakyOperation {
    failures_remaining: AtomicU32,
    calls: AtomicU32,
    kind: ErrorKind,
}

impl FlakyOperation {
    pub fn new(failures: u32) -> Self {
        Self::with_kind(failures, ErrorKind::Deadlock)
    }

    pub fn with_kind(failures: u32, kind: ErrorKind) -> Self {
        FlakyOperation {
            failures_remaining: AtomicU32::new(failures),
            calls: AtomicU32::new(0),
            kind,
        }
    }

    /// Number of times the operation has been executed.
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    /// Executes one attempt, failing while the failure budget lasts.
    pub fn run(&self, _session: &FakeSession) -> RetryqResult<u32> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        let remaining = self.failures_remaining.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failures_remaining
                .store(remaining - 1, Ordering::SeqCst);
            return Err(RetryqError::new(
                "scripted failure",
                self.kind.clone(),
            ));
        }
        Ok(call)
    }
}

pub fn transient_error() -> RetryqError {
    RetryqError::new("deadlock detected", ErrorKind::Deadlock)
}

pub fn terminal_error() -> RetryqError {
    RetryqError::new("unique constraint violated", ErrorKind::ConstraintViolation)
}
