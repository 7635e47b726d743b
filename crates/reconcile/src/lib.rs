//! # Reconcile
//!
//! Set-based convergence for many-to-many relationship records such as
//! permission grants.
//!
//! Desired records carry no server id, so both desired and observed
//! collections are treated as sets keyed by content. Reconciling them gives
//! the minimal creates and deletes; a changed role is a delete of the old
//! record plus a create of the new one, and creates are always issued first.
//!
//! ## Core Concepts
//!
//! - **Grant**: `(subject, role, qualifier)` tuple, the unit being reconciled
//! - **Delta**: records to create and records to delete
//! - **RelationshipBackend**: the client that lists and mutates records
//! - **Converge**: list, reconcile, apply, and retry with a fresh read
//!
//! ## Example
//!
//! ```
//! use oid::Oid;
//! use reconcile::{CancelToken, ConvergeOptions, Grant, MemoryBackend, Role, converge};
//! use std::collections::BTreeSet;
//!
//! let scope = Oid::workspace("41")?;
//! let user = Oid::user("7")?;
//! let backend = MemoryBackend::with_records(
//!     scope.clone(),
//!     [Grant::new(user.clone(), Role::Editor, None)],
//! );
//!
//! let desired = BTreeSet::from([Grant::new(user, Role::Viewer, None)]);
//! let opts = ConvergeOptions::default();
//! let result = converge(&backend, &scope, &desired, &opts, &CancelToken::new())?;
//!
//! assert_eq!(result.applied.created.len(), 1);
//! assert_eq!(result.applied.deleted.len(), 1);
//! assert_eq!(backend.records(&scope), desired);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Failure handling
//!
//! A batch that fails part-way is never rolled back. The error reports what
//! was applied and what remains, and is retryable: the next attempt re-reads
//! observed state and only issues what is still missing.
//!
//! The crate takes [`ProgressCallback`] and [`ConfirmCallback`] implementations
//! so it can be driven without depending on a particular terminal UI.

pub mod backend;
pub mod context;
pub mod diff;
pub mod error;
pub mod executor;
pub mod planner;
pub mod retry;
pub mod types;

// Re-export main types at crate root
pub use backend::{BackendError, MemoryBackend, MutationOutcome, RelationshipBackend};
pub use context::{
    AutoConfirm, AutoDecline, CancelToken, ConfirmCallback, NoProgress, ProgressCallback,
};
pub use diff::{DeltaSummary, group_by_subject, reconcile};
pub use error::{Error, ErrorCategory, Result};
pub use executor::{Convergence, apply, converge, converge_all, plan};
pub use planner::{ConvergencePlan, ScopePlan};
pub use retry::{LogCallback, NoCallback, RetryCallback, with_retry};
pub use types::{
    Applied, ConvergeOptions, ConvergeSummary, Delta, Grant, GrantSpec, RetryConfig, Role,
    SUBJECT_TYPES, ScopeOutcome, ScopeResult,
};
