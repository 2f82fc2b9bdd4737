//! Error types for model construction and view population.

use thiserror::Error;

use crate::id::Id;

/// A single problem found while validating a workspace.
///
/// Validation problems are collected and surfaced together rather than
/// aborting on the first one; nothing is auto-corrected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Human-readable location, e.g. `software system "Payments"`.
    pub context: String,
    /// What is wrong.
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.context, self.message)
    }
}

fn list_errors(errs: &[ValidationError]) -> String {
    errs.iter()
        .map(ValidationError::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

/// The main error type for armature operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error("unknown element {0}")]
    UnknownElement(Id),

    #[error("element {id} is a {actual}, expected a {expected}")]
    KindMismatch {
        id: Id,
        expected: &'static str,
        actual: &'static str,
    },

    #[error("view with key {0:?} already exists")]
    DuplicateViewKey(String),

    // Field names avoid `source`, which thiserror reserves for error
    // chaining.
    #[error("no relationship from {source_id} to {destination_id} matches")]
    RelationshipNotFound { source_id: Id, destination_id: Id },

    #[error(
        "multiple relationships from {source_id} to {destination_id} match; \
         a description is required to disambiguate"
    )]
    AmbiguousRelationship { source_id: Id, destination_id: Id },

    #[error("validation failed:\n{}", list_errors(.0))]
    Validation(Vec<ValidationError>),
}
