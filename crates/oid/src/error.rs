//! Error types for reference parsing and validation.
//!
//! Every variant is a configuration defect: the input is wrong and retrying
//! will not help. Errors carry the offending text so the caller can point the
//! user at it.

use crate::registry::ResourceType;
use thiserror::Error;

/// Errors that can occur while parsing or validating an object reference.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// Wrong prefix, wrong segment count, or an empty/invalid segment
    #[error("malformed reference {input:?}: {reason}")]
    MalformedReference {
        /// The text that failed to parse
        input: String,
        /// What is wrong with it
        reason: String,
    },

    /// The type segment is not a registered resource type
    #[error("unknown resource type {tag:?} in reference {input:?}")]
    UnknownType {
        /// The unregistered type tag
        tag: String,
        /// The full reference text
        input: String,
    },

    /// The reference is valid but of a type the field does not accept
    #[error("reference {reference} has type {found}, expected one of: {}", join_types(.allowed))]
    WrongType {
        /// Formatted reference
        reference: String,
        /// The type that was found
        found: ResourceType,
        /// The types the field accepts
        allowed: Vec<ResourceType>,
    },

    /// An error tied to a named configuration field
    #[error("{field}: {source}")]
    Field {
        /// Name or path of the configuration field
        field: String,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    pub(crate) fn malformed(input: &str, reason: impl Into<String>) -> Self {
        Self::MalformedReference {
            input: input.to_string(),
            reason: reason.into(),
        }
    }

    /// Attach the configuration field this error was raised for.
    pub fn in_field(self, field: impl Into<String>) -> Self {
        Self::Field {
            field: field.into(),
            source: Box::new(self),
        }
    }

    /// The underlying error, with any field annotations stripped.
    pub fn root(&self) -> &Self {
        match self {
            Self::Field { source, .. } => source.root(),
            other => other,
        }
    }
}

fn join_types(types: &[ResourceType]) -> String {
    types
        .iter()
        .map(ResourceType::tag)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Result type for reference operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrong_type_lists_allowed() {
        let err = Error::WrongType {
            reference: "o:monitor:1".to_string(),
            found: ResourceType::Monitor,
            allowed: vec![ResourceType::Dataset, ResourceType::Worksheet],
        };
        assert_eq!(
            err.to_string(),
            "reference o:monitor:1 has type monitor, expected one of: dataset, worksheet"
        );
    }

    #[test]
    fn test_field_annotation() {
        let err = Error::malformed("x", "missing prefix").in_field("inputs.main");
        assert!(err.to_string().starts_with("inputs.main: malformed reference"));
        assert!(matches!(err.root(), Error::MalformedReference { .. }));
    }
}
