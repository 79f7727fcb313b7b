//! Error types for document operations.

use thiserror::Error;

/// Result type for document operations.
pub type LayoutResult<T> = Result<T, LayoutError>;

/// Errors that can occur while editing, validating or loading a document.
///
/// Every variant is recoverable: a failed operation leaves the document
/// exactly as it was before the call.
#[derive(Debug, Error)]
pub enum LayoutError {
    /// Malformed input to an action: bad bounds, unknown id, duplicate id,
    /// property schema violation.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// The request would break the group forest or mixes node kinds.
    #[error("Structural violation: {0}")]
    Structure(String),

    /// The request would not change anything observable.
    #[error("No change: {0}")]
    NoOp(String),

    /// The document text is well-formed JSON but not a valid document.
    #[error("Invalid document format: {0}")]
    Format(String),

    /// The document schema version is incompatible with this runtime.
    #[error("Incompatible schema version: {0}")]
    Version(String),

    /// A coalesced edit window was misused.
    #[error("Coalesced edit error: {0}")]
    Coalesce(String),

    /// JSON serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Reading or writing a document file failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl LayoutError {
    /// Build a validation error from any message.
    #[must_use]
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a structural error from any message.
    #[must_use]
    pub fn structure(msg: impl Into<String>) -> Self {
        Self::Structure(msg.into())
    }

    /// Build a no-op rejection from any message.
    #[must_use]
    pub fn no_op(msg: impl Into<String>) -> Self {
        Self::NoOp(msg.into())
    }

    /// Whether this is a benign rejection that callers may silently ignore.
    #[must_use]
    pub fn is_no_op(&self) -> bool {
        matches!(self, Self::NoOp(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_op_classification() {
        assert!(LayoutError::no_op("same bounds").is_no_op());
        assert!(!LayoutError::validation("bad id").is_no_op());
    }

    #[test]
    fn test_messages_carry_reason() {
        let err = LayoutError::structure("cycle through group 4");
        assert_eq!(err.to_string(), "Structural violation: cycle through group 4");
    }
}
