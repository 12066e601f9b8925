//! # Document Errors
//!
//! Error types for tree nodes, documents and their serialization.

use std::io;

use thiserror::Error;

use crate::hash::{HashAlgorithm, UnknownAlgorithm};
use crate::schema::SchemaError;

/// Result type for document operations
pub type DocumentResult<T> = Result<T, DocumentError>;

/// Tree node and document errors
#[derive(Debug, Error)]
pub enum DocumentError {
    // ==================
    // Tree Errors
    // ==================

    /// Key does not exist in the node
    #[error("'{node}' has no attribute '{name}'")]
    NotFound { node: String, name: String },

    /// Branch/leaf kind conflict or non-mapping where a mapping is required
    #[error("{0}")]
    StructuralConflict(String),

    // ==================
    // Integrity Errors
    // ==================

    /// Schema violation, or schema could not be resolved
    #[error(transparent)]
    Validation(#[from] SchemaError),

    /// Recorded digest does not match content
    #[error("{algorithm} hash for {section} is {actual}, not {recorded}")]
    HashMismatch {
        algorithm: HashAlgorithm,
        section: String,
        recorded: String,
        actual: String,
    },

    /// Hash record names an unsupported algorithm
    #[error(transparent)]
    UnknownAlgorithm(#[from] UnknownAlgorithm),

    // ==================
    // Serialization Errors
    // ==================

    /// Malformed document text
    #[error("Failed to parse {path}: {reason}")]
    Parse { path: String, reason: String },

    /// Filesystem failure
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },
}

impl DocumentError {
    pub(crate) fn not_found(node: impl Into<String>, name: impl Into<String>) -> Self {
        DocumentError::NotFound {
            node: node.into(),
            name: name.into(),
        }
    }

    pub(crate) fn conflict(message: impl Into<String>) -> Self {
        DocumentError::StructuralConflict(message.into())
    }

    pub(crate) fn io(path: &std::path::Path, source: io::Error) -> Self {
        DocumentError::Io {
            path: path.display().to_string(),
            source,
        }
    }

    /// Returns the error code string
    pub fn code(&self) -> &'static str {
        match self {
            DocumentError::NotFound { .. } => "HODS_NOT_FOUND",
            DocumentError::StructuralConflict(_) => "HODS_STRUCTURAL_CONFLICT",
            DocumentError::Validation(e) if e.is_violation() => "HODS_VALIDATION_ERROR",
            DocumentError::Validation(e) => e.code().code(),
            DocumentError::HashMismatch { .. } => "HODS_HASH_MISMATCH",
            DocumentError::UnknownAlgorithm(_) => "HODS_UNKNOWN_ALGORITHM",
            DocumentError::Parse { .. } => "HODS_PARSE_FAILURE",
            DocumentError::Io { .. } => "HODS_IO_ERROR",
        }
    }

    /// Returns whether the error is a schema violation
    pub fn is_validation(&self) -> bool {
        matches!(self, DocumentError::Validation(e) if e.is_violation())
    }
}
