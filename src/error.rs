//! Error taxonomy shared by every component.
//!
//! NotFound, Conflict and Validation are the business errors callers branch
//! on. Everything else is infrastructure and never surfaces from the pure
//! in-memory paths.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, CoreError>;

/// Coarse error category, stable across variants with different payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Conflict,
    Validation,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NotFound => "not_found",
            ErrorKind::Conflict => "conflict",
            ErrorKind::Validation => "validation",
            ErrorKind::Internal => "internal",
        }
    }
}

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Snapshot written by engine {found}, this engine only reads up to {required}")]
    IncompatibleSnapshot { found: String, required: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CoreError {
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        CoreError::NotFound { entity, id: id.into() }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::NotFound { .. } => ErrorKind::NotFound,
            CoreError::Conflict(_) => ErrorKind::Conflict,
            CoreError::Validation(_) => ErrorKind::Validation,
            CoreError::IncompatibleSnapshot { .. }
            | CoreError::Serialization(_)
            | CoreError::Io(_) => ErrorKind::Internal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_display() {
        let err = CoreError::not_found("Sheet", "abc");
        assert_eq!(err.to_string(), "Sheet not found: abc");
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_kinds_are_distinct() {
        let conflict = CoreError::Conflict("dup".into());
        let invalid = CoreError::Validation("bad".into());
        assert_eq!(conflict.kind(), ErrorKind::Conflict);
        assert_eq!(invalid.kind(), ErrorKind::Validation);
        assert_ne!(conflict.kind(), invalid.kind());
        assert_eq!(conflict.kind().as_str(), "conflict");
    }
}
