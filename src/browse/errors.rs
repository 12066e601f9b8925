//! # Browse Errors
//!
//! Refusals shown to the user while navigating, and failures of the
//! underlying index.

use std::io;

use thiserror::Error;

use crate::index::IndexError;

/// Result type for browse operations
pub type BrowseResult<T> = Result<T, BrowseError>;

/// Browse session errors
#[derive(Debug, Error)]
pub enum BrowseError {
    // ==================
    // Navigation Refusals
    // ==================

    /// Positioned on a value below a leaf, nothing further to descend
    #[error("cd: can not go any deeper")]
    TooDeep,

    /// Step is not among the current listing
    #[error("cd: can not browse '{0}'")]
    UnknownStep(String),

    // ==================
    // Environment Errors
    // ==================

    /// No per-user cache directory on this platform
    #[error("Could not determine the user cache directory")]
    NoCacheDir,

    /// Index failure
    #[error(transparent)]
    Index(#[from] IndexError),

    /// Terminal read/write failure
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl BrowseError {
    /// Returns whether the error is a navigation refusal that leaves state unchanged
    pub fn is_refusal(&self) -> bool {
        matches!(self, BrowseError::TooDeep | BrowseError::UnknownStep(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_refusal_messages() {
        assert_eq!(BrowseError::TooDeep.to_string(), "cd: can not go any deeper");
        assert_eq!(
            BrowseError::UnknownStep("x".into()).to_string(),
            "cd: can not browse 'x'"
        );
        assert!(BrowseError::TooDeep.is_refusal());
        assert!(!BrowseError::NoCacheDir.is_refusal());
    }
}
