//! Backend client contract for relationship records
//!
//! The reconciler never talks to the platform itself. It reads observed
//! records and submits mutations through [`RelationshipBackend`], which a
//! transport-specific client implements.

use crate::context::CancelToken;
use crate::error::ErrorCategory;
use crate::types::{Applied, Grant};
use oid::Oid;
use std::collections::{BTreeSet, HashMap};
use std::sync::Mutex;
use thiserror::Error;

/// Failures reported by a backend client
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    /// Network or service failure
    #[error("{0}")]
    Unavailable(String),

    /// The caller's cancellation token fired
    #[error("operation cancelled")]
    Cancelled,

    /// The caller's deadline passed
    #[error("deadline exceeded")]
    DeadlineExceeded,

    /// The backend refused the request (permissions, validation)
    #[error("request rejected: {0}")]
    Rejected(String),
}

impl BackendError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            BackendError::Unavailable(_) => ErrorCategory::Transient,
            BackendError::Cancelled | BackendError::DeadlineExceeded => ErrorCategory::Cancelled,
            BackendError::Rejected(_) => ErrorCategory::Rejected,
        }
    }
}

/// Result of a mutation batch
///
/// `applied` lists what went through even when `error` is set, so the caller
/// can report partial application.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MutationOutcome {
    pub applied: Applied,
    pub error: Option<BackendError>,
}

impl MutationOutcome {
    pub fn success(applied: Applied) -> Self {
        Self {
            applied,
            error: None,
        }
    }

    pub fn failure(applied: Applied, error: BackendError) -> Self {
        Self {
            applied,
            error: Some(error),
        }
    }
}

/// Client for reading and mutating relationship records under a scope
///
/// Implementations must process `creates` before `deletes` within a batch so
/// that a replaced record never leaves the subject without access. A batch
/// need not be atomic; whatever was applied before a failure must be
/// reported in [`MutationOutcome::applied`].
pub trait RelationshipBackend: Send + Sync {
    /// Read every record currently held under `scope`
    fn list(&self, scope: &Oid, cancel: &CancelToken) -> Result<Vec<Grant>, BackendError>;

    /// Apply a batch of creates followed by deletes
    fn mutate_batch(
        &self,
        scope: &Oid,
        creates: &[Grant],
        deletes: &[Grant],
        cancel: &CancelToken,
    ) -> MutationOutcome;
}

/// In-process backend holding records in memory
///
/// Useful for tests and for callers that want to stage changes before
/// sending them elsewhere.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    scopes: Mutex<HashMap<Oid, BTreeSet<Grant>>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Backend pre-populated with `records` under `scope`
    pub fn with_records(scope: Oid, records: impl IntoIterator<Item = Grant>) -> Self {
        let backend = Self::new();
        if let Ok(mut scopes) = backend.scopes.lock() {
            scopes.insert(scope, records.into_iter().collect());
        }
        backend
    }

    /// Snapshot of the records under `scope`
    pub fn records(&self, scope: &Oid) -> BTreeSet<Grant> {
        self.scopes
            .lock()
            .map(|s| s.get(scope).cloned().unwrap_or_default())
            .unwrap_or_default()
    }
}

impl RelationshipBackend for MemoryBackend {
    fn list(&self, scope: &Oid, cancel: &CancelToken) -> Result<Vec<Grant>, BackendError> {
        cancel.check()?;
        let scopes = self
            .scopes
            .lock()
            .map_err(|_| BackendError::Unavailable("record store lock poisoned".to_string()))?;
        Ok(scopes
            .get(scope)
            .map(|records| records.iter().cloned().collect())
            .unwrap_or_default())
    }

    fn mutate_batch(
        &self,
        scope: &Oid,
        creates: &[Grant],
        deletes: &[Grant],
        cancel: &CancelToken,
    ) -> MutationOutcome {
        let mut applied = Applied::default();
        let Ok(mut scopes) = self.scopes.lock() else {
            return MutationOutcome::failure(
                applied,
                BackendError::Unavailable("record store lock poisoned".to_string()),
            );
        };
        let records = scopes.entry(scope.clone()).or_default();

        for grant in creates {
            if let Err(e) = cancel.check() {
                return MutationOutcome::failure(applied, e);
            }
            records.insert(grant.clone());
            applied.created.push(grant.clone());
        }
        for grant in deletes {
            if let Err(e) = cancel.check() {
                return MutationOutcome::failure(applied, e);
            }
            records.remove(grant);
            applied.deleted.push(grant.clone());
        }
        MutationOutcome::success(applied)
    }
}
