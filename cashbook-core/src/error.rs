//! Error taxonomy for book operations
//!
//! Every validation error is raised at the point of the offending call;
//! whole-book checks (unknown element kinds, count recomputation) are
//! raised only at save time. Nothing is swallowed silently except the
//! documented missing-posted-date repair, which is logged instead.

use std::path::PathBuf;

use cashbook_math::FractionError;
use thiserror::Error;

/// Errors surfaced by the book model and codec
#[derive(Error, Debug)]
pub enum BookError {
    /// Unrecognized or malformed structure in the element list
    #[error("Schema error: {0}")]
    Schema(String),

    /// An operation would break a cross-entity reference invariant
    #[error("Referential integrity violation: {0}")]
    ReferentialIntegrity(String),

    /// An operation is not allowed in the entity's current state
    #[error("State violation: {0}")]
    StateViolation(String),

    /// A role-specific operation was invoked on the wrong variant
    #[error("Type mismatch: {0}")]
    TypeMismatch(String),

    /// A lookup found nothing where something was required
    #[error("Missing reference: {0}")]
    MissingReference(String),

    /// A required field was null or blank
    #[error("Invalid value for {field}: {reason}")]
    InvalidValue {
        /// Name of the offending field
        field: &'static str,
        /// Why the value was rejected
        reason: String,
    },

    /// Malformed numeric or date text
    #[error("Parse error: {0}")]
    Parse(String),

    /// Refusal to overwrite an existing file
    #[error("Refusing to overwrite existing file: {0}")]
    FileExists(PathBuf),

    /// Underlying file or stream failure
    #[error("I/O error")]
    Io(#[from] std::io::Error),
}

impl From<FractionError> for BookError {
    fn from(err: FractionError) -> Self {
        BookError::Parse(err.to_string())
    }
}

impl From<quick_xml::Error> for BookError {
    fn from(err: quick_xml::Error) -> Self {
        BookError::Parse(format!("XML error: {err}"))
    }
}

impl From<chrono::ParseError> for BookError {
    fn from(err: chrono::ParseError) -> Self {
        BookError::Parse(format!("timestamp: {err}"))
    }
}

/// Result type for book operations
pub type BookResult<T> = Result<T, BookError>;
