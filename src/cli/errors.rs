//! CLI-specific error types

use std::fmt;
use std::io;

use crate::browse::BrowseError;
use crate::document::DocumentError;
use crate::index::IndexError;

/// CLI error codes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliErrorCode {
    /// Configuration file error
    ConfigError,
    /// I/O error (stdin/stdout)
    IoError,
    /// Document could not be loaded, validated or written
    DocumentFailed,
    /// Index could not be opened or queried
    IndexFailed,
    /// Browse session failed
    BrowseFailed,
    /// One or more files failed a check
    CheckFailed,
}

impl CliErrorCode {
    /// Get the error code string
    pub fn code(&self) -> &'static str {
        match self {
            Self::ConfigError => "HODS_CLI_CONFIG_ERROR",
            Self::IoError => "HODS_CLI_IO_ERROR",
            Self::DocumentFailed => "HODS_CLI_DOCUMENT_FAILED",
            Self::IndexFailed => "HODS_CLI_INDEX_FAILED",
            Self::BrowseFailed => "HODS_CLI_BROWSE_FAILED",
            Self::CheckFailed => "HODS_CLI_CHECK_FAILED",
        }
    }
}

/// CLI error
#[derive(Debug)]
pub struct CliError {
    code: CliErrorCode,
    message: String,
}

impl CliError {
    /// Create a new CLI error
    pub fn new(code: CliErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Config error
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::ConfigError, msg)
    }

    /// I/O error
    pub fn io_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::IoError, msg)
    }

    /// Some files failed
    pub fn check_failed(failed: usize, total: usize) -> Self {
        Self::new(
            CliErrorCode::CheckFailed,
            format!("{} of {} file(s) failed", failed, total),
        )
    }

    /// Get the error code
    pub fn code(&self) -> &CliErrorCode {
        &self.code
    }

    /// Get the error code string
    pub fn code_str(&self) -> &'static str {
        self.code.code()
    }

    /// Get the error message
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code.code(), self.message)
    }
}

impl std::error::Error for CliError {}

impl From<io::Error> for CliError {
    fn from(e: io::Error) -> Self {
        Self::io_error(e.to_string())
    }
}

impl From<DocumentError> for CliError {
    fn from(e: DocumentError) -> Self {
        Self::new(CliErrorCode::DocumentFailed, format!("{} ({})", e, e.code()))
    }
}

impl From<IndexError> for CliError {
    fn from(e: IndexError) -> Self {
        Self::new(CliErrorCode::IndexFailed, e.to_string())
    }
}

impl From<BrowseError> for CliError {
    fn from(e: BrowseError) -> Self {
        match e {
            BrowseError::Index(inner) => inner.into(),
            other => Self::new(CliErrorCode::BrowseFailed, other.to_string()),
        }
    }
}

/// CLI result type
pub type CliResult<T> = Result<T, CliError>;
