//! Index error types
//!
//! Error codes:
//! - HODS_INDEX_STORE_FAILED
//! - HODS_INDEX_CACHE_VERSION_MISMATCH (internal, triggers rebuild)
//! - HODS_INDEX_INVALID_QUERY
//! - HODS_INDEX_DISCOVERY_FAILED

use std::fmt;
use std::io;

/// Index-specific error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexErrorCode {
    /// SQLite operation failed
    StoreFailed,
    /// Cache file was written by another layout version, or is not a cache
    CacheVersionMismatch,
    /// Query could not be built
    InvalidQuery,
    /// File enumeration failed
    DiscoveryFailed,
}

impl IndexErrorCode {
    /// Returns the string code
    pub fn code(&self) -> &'static str {
        match self {
            IndexErrorCode::StoreFailed => "HODS_INDEX_STORE_FAILED",
            IndexErrorCode::CacheVersionMismatch => "HODS_INDEX_CACHE_VERSION_MISMATCH",
            IndexErrorCode::InvalidQuery => "HODS_INDEX_INVALID_QUERY",
            IndexErrorCode::DiscoveryFailed => "HODS_INDEX_DISCOVERY_FAILED",
        }
    }
}

impl fmt::Display for IndexErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Index error type with context
#[derive(Debug)]
pub struct IndexError {
    code: IndexErrorCode,
    message: String,
    source: Option<Box<dyn std::error::Error + 'static>>,
}

impl IndexError {
    /// Create a store failure error
    pub fn store_failed(reason: impl Into<String>) -> Self {
        Self {
            code: IndexErrorCode::StoreFailed,
            message: reason.into(),
            source: None,
        }
    }

    /// Create a cache version mismatch error
    pub fn version_mismatch(found: Option<&str>, expected: &str) -> Self {
        Self {
            code: IndexErrorCode::CacheVersionMismatch,
            message: format!(
                "cache version is {}, expected {}",
                found.unwrap_or("missing"),
                expected
            ),
            source: None,
        }
    }

    /// Create an invalid query error
    pub fn invalid_query(reason: impl Into<String>) -> Self {
        Self {
            code: IndexErrorCode::InvalidQuery,
            message: reason.into(),
            source: None,
        }
    }

    /// Create a discovery error with its io cause
    pub fn discovery_failed(path: &std::path::Path, source: io::Error) -> Self {
        Self {
            code: IndexErrorCode::DiscoveryFailed,
            message: format!("Failed to enumerate {}", path.display()),
            source: Some(Box::new(source)),
        }
    }

    /// Returns the error code
    pub fn code(&self) -> IndexErrorCode {
        self.code
    }

    /// Returns the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns whether reopening on a fresh cache file fixes the error
    pub fn requires_rebuild(&self) -> bool {
        self.code == IndexErrorCode::CacheVersionMismatch
    }
}

impl fmt::Display for IndexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)?;
        if let Some(ref source) = self.source {
            write!(f, " (caused by: {})", source)?;
        }
        Ok(())
    }
}

impl std::error::Error for IndexError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

impl From<rusqlite::Error> for IndexError {
    fn from(err: rusqlite::Error) -> Self {
        Self {
            code: IndexErrorCode::StoreFailed,
            message: "SQLite operation failed".to_string(),
            source: Some(Box::new(err)),
        }
    }
}

/// Result type for index operations
pub type IndexResult<T> = Result<T, IndexError>;
