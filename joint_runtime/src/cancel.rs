//! Cooperative cancellation for bootstrap phases.
//!
//! A `CancelToken` is a shared flag plus an optional deadline. The
//! orchestrator checks it before every phase call and hands it to the
//! starter, which should poll it around anything that may block (remote
//! connects, schema migrations). Nothing is preempted: a starter that never
//! polls can still hang bootstrap.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use thiserror::Error;

/// Why a token reports cancellation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Cancelled {
    /// `cancel()` was called on the token or one of its clones.
    #[error("bootstrap cancelled")]
    Requested,
    /// The token's deadline has passed.
    #[error("deadline exceeded")]
    DeadlineExceeded,
}

/// Shared cancellation flag with an optional deadline.
///
/// Clones share the flag. Children created with
/// [`child_with_timeout`](Self::child_with_timeout) share the flag too but
/// may carry an earlier deadline.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl CancelToken {
    /// Token that never expires on its own.
    pub fn new() -> Self {
        Self::default()
    }

    /// Token that expires at `deadline`.
    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            flag: Arc::new(AtomicBool::new(false)),
            deadline: Some(deadline),
        }
    }

    /// Token that expires `timeout` from now.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::with_deadline(Instant::now() + timeout)
    }

    /// Child sharing this token's flag whose deadline is the earlier of the
    /// parent's and `now + timeout`.
    pub fn child_with_timeout(&self, timeout: Duration) -> Self {
        let candidate = Instant::now() + timeout;
        let deadline = match self.deadline {
            Some(parent) if parent < candidate => parent,
            _ => candidate,
        };
        Self {
            flag: Arc::clone(&self.flag),
            deadline: Some(deadline),
        }
    }

    /// Request cancellation for this token and every clone/child.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Shared flag, e.g. for a signal handler. Storing `true` cancels.
    pub fn flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.flag)
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_cancelled(&self) -> bool {
        self.check().is_err()
    }

    /// `Ok(())` while the token is live.
    pub fn check(&self) -> Result<(), Cancelled> {
        if self.flag.load(Ordering::SeqCst) {
            return Err(Cancelled::Requested);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Err(Cancelled::DeadlineExceeded),
            _ => Ok(()),
        }
    }
}
