//! Error types for the scalar crate

use crate::value::ValueKind;
use thiserror::Error;

/// Errors that can occur while decoding or encoding a value
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// No slot of the bag is set
    #[error("no value set: exactly one typed slot is required")]
    NoValue,

    /// More than one slot of the bag is set
    #[error("ambiguous value: only one slot may be set, found {}", join_slots(.slots))]
    AmbiguousValue { slots: Vec<ValueKind> },

    /// The value cannot be represented in a bag
    #[error("invalid value state: {reason}")]
    InvalidState { reason: String },

    /// Text does not parse as the requested kind
    #[error("invalid {kind} value {input:?}: {reason}")]
    InvalidText {
        kind: ValueKind,
        input: String,
        reason: String,
    },

    /// Duration text could not be parsed
    #[error("invalid duration {input:?}: {reason}")]
    InvalidDuration { input: String, reason: String },

    /// Timestamp text could not be parsed
    #[error("invalid timestamp {input:?}: {reason}")]
    InvalidTimestamp { input: String, reason: String },
}

fn join_slots(slots: &[ValueKind]) -> String {
    slots
        .iter()
        .map(ValueKind::slot)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Result type for scalar operations
pub type Result<T> = std::result::Result<T, Error>;
