//! Cancellation and callback traits
//!
//! These let the reconcile crate report progress and ask for confirmation
//! without depending on a particular terminal UI.

use crate::backend::BackendError;
use crate::types::{Delta, ScopeOutcome};
use oid::Oid;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// Cancellation signal shared between the caller and backend calls.
///
/// Clones share the same flag. An optional deadline cancels implicitly once
/// it passes.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl CancelToken {
    /// Token that only cancels when asked to
    pub fn new() -> Self {
        Self::default()
    }

    /// Token that also cancels once `timeout` has elapsed.
    ///
    /// A timeout too large to represent means no deadline.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            cancelled: Arc::default(),
            deadline: Instant::now().checked_add(timeout),
        }
    }

    /// Requests cancellation.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// Returns true when cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// Returns true when the deadline has passed.
    pub fn is_expired(&self) -> bool {
        self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// Time left before the deadline, if there is one
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|d| d.saturating_duration_since(Instant::now()))
    }

    /// Fails if the operation should stop now.
    ///
    /// Backends call this between records.
    pub fn check(&self) -> Result<(), BackendError> {
        if self.is_cancelled() {
            Err(BackendError::Cancelled)
        } else if self.is_expired() {
            Err(BackendError::DeadlineExceeded)
        } else {
            Ok(())
        }
    }
}

/// Progress callback for convergence runs
pub trait ProgressCallback: Send {
    /// Called once the delta for a scope is known
    fn on_scope_planned(&mut self, scope: &Oid, delta: &Delta);

    /// Called when a scope finishes
    fn on_scope_complete(&mut self, scope: &Oid, outcome: &ScopeOutcome);
}

/// Confirmation callback for user interaction
pub trait ConfirmCallback: Send {
    /// Ask the user to confirm an action
    ///
    /// # Returns
    /// `true` if the user confirmed, `false` otherwise
    fn confirm(&mut self, prompt: &str) -> anyhow::Result<bool>;
}

/// No-op progress callback
pub struct NoProgress;

impl ProgressCallback for NoProgress {
    fn on_scope_planned(&mut self, _scope: &Oid, _delta: &Delta) {}
    fn on_scope_complete(&mut self, _scope: &Oid, _outcome: &ScopeOutcome) {}
}

/// Auto-confirm callback (always returns true)
pub struct AutoConfirm;

impl ConfirmCallback for AutoConfirm {
    fn confirm(&mut self, _prompt: &str) -> anyhow::Result<bool> {
        Ok(true)
    }
}

/// Auto-decline callback (always returns false)
pub struct AutoDecline;

impl ConfirmCallback for AutoDecline {
    fn confirm(&mut self, _prompt: &str) -> anyhow::Result<bool> {
        Ok(false)
    }
}
