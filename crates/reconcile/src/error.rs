//! Error types for reconciliation.
//!
//! Errors fall into categories that decide what the caller should do next:
//! configuration defects are reported and never retried, transient backend
//! failures are retried, and cancellations stop the current run but leave it
//! resumable.

use crate::backend::BackendError;
use crate::types::{Applied, Delta};
use thiserror::Error;

/// Categories of reconciliation errors for retry logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Invalid declared configuration
    Configuration,
    /// Backend failure that may succeed on another attempt
    Transient,
    /// Caller cancelled or the deadline passed
    Cancelled,
    /// Backend refused the request outright
    Rejected,
}

impl ErrorCategory {
    /// Whether running the operation again can make progress.
    ///
    /// A retry re-reads observed state, so partially applied batches resume
    /// where they stopped.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient | Self::Cancelled)
    }

    /// Get actionable advice for resolving this error category.
    pub fn advice(&self) -> &'static str {
        match self {
            Self::Configuration => "Fix the field named in the error and run again",
            Self::Transient => "Run again; only the remaining changes will be applied",
            Self::Cancelled => "Run again to finish; applied changes are kept",
            Self::Rejected => "Check permissions and the records named in the error",
        }
    }
}

/// Errors that can occur during reconciliation.
#[derive(Debug, Error)]
pub enum Error {
    /// A reference field failed to parse or has the wrong type
    #[error(transparent)]
    Reference(#[from] oid::Error),

    /// A role field names no known role
    #[error("{field}: unknown role {role:?}")]
    UnknownRole { field: String, role: String },

    /// The backend failed before anything was applied
    #[error("backend unavailable: {source}")]
    BackendUnavailable {
        #[source]
        source: BackendError,
    },

    /// The backend failed after applying part of a batch
    #[error("partial application ({applied}; {} pending): {source}", .pending.len())]
    PartialApplication {
        /// Operations that went through
        applied: Applied,
        /// Operations that did not
        pending: Delta,
        #[source]
        source: BackendError,
    },
}

impl Error {
    /// Get the error category for retry logic.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Reference(_) | Error::UnknownRole { .. } => ErrorCategory::Configuration,
            Error::BackendUnavailable { source } | Error::PartialApplication { source, .. } => {
                source.category()
            }
        }
    }

    /// Whether this error is worth retrying.
    pub fn is_retryable(&self) -> bool {
        self.category().is_retryable()
    }

    /// Operations applied before the failure.
    pub fn applied(&self) -> Option<&Applied> {
        match self {
            Error::PartialApplication { applied, .. } => Some(applied),
            _ => None,
        }
    }
}

/// Result type for reconciliation operations.
pub type Result<T> = std::result::Result<T, Error>;
