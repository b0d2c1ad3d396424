//! Error types for fetchkit.
//!
//! All errors are strongly typed using thiserror. This enables pattern
//! matching on specific failure conditions and keeps the save contract
//! honest: validation and commit failures surface verbatim, never silently
//! swallowed.

use thiserror::Error;

use crate::record::RecordId;
use crate::value::Value;

/// Validation errors raised by schema checks.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Field '{field}' on entity type '{entity}' expects {expected}, got {actual}")]
    TypeMismatch {
        entity: String,
        field: String,
        expected: String,
        actual: String,
    },

    #[error("Required field '{field}' is missing on new '{entity}' record")]
    MissingRequiredField {
        entity: String,
        field: String,
    },

    #[error("Field name cannot be empty")]
    EmptyFieldName,

    #[error("Value of kind '{kind}' cannot be used as a resolution key")]
    NotComparable {
        kind: String,
    },
}

/// Top-level error type for store and resolver operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Store unavailable: {reason}")]
    Unavailable {
        reason: String,
    },

    #[error("Unknown entity type: {name}")]
    UnknownEntityType {
        name: String,
    },

    #[error("Unknown property '{name}' on entity type '{entity}'")]
    UnknownProperty {
        entity: String,
        name: String,
    },

    #[error("Unknown relation '{name}' on entity type '{entity}'")]
    UnknownRelation {
        entity: String,
        name: String,
    },

    #[error("Record not found: {id}")]
    RecordNotFound {
        id: RecordId,
    },

    #[error("{matches} records of '{entity}' match {field} = {value}")]
    AmbiguousMatch {
        entity: String,
        field: String,
        value: Value,
        matches: usize,
    },

    #[error("Invalid argument: {reason}")]
    InvalidArgument {
        reason: String,
    },

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Commit failed: {message}")]
    Commit {
        message: String,
    },
}

impl StoreError {
    /// Creates an unavailable-store error.
    #[must_use]
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable {
            reason: reason.into(),
        }
    }

    /// Creates an invalid-argument error.
    #[must_use]
    pub fn invalid_argument(reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            reason: reason.into(),
        }
    }

    /// Creates a commit error.
    #[must_use]
    pub fn commit(message: impl Into<String>) -> Self {
        Self::Commit {
            message: message.into(),
        }
    }

    /// Returns true if this is a validation error.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Returns true if this is a commit error.
    #[must_use]
    pub const fn is_commit(&self) -> bool {
        matches!(self, Self::Commit { .. })
    }

    /// Returns true if this error is retryable.
    ///
    /// Only availability and commit failures can succeed on retry; schema
    /// and argument errors won't change without caller intervention.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable { .. } | Self::Commit { .. })
    }
}

/// Result type alias for store and resolver operations.
pub type StoreResult<T> = Result<T, StoreError>;
