//! Schema error types
//!
//! Error codes:
//! - HODS_UNKNOWN_SCHEMA
//! - HODS_MALFORMED_SCHEMA
//! - HODS_UNKNOWN_SCHEMA_ENGINE
//! - HODS_SCHEMA_VALIDATION_FAILED

use std::fmt;

/// Schema-specific error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaErrorCode {
    /// Identifier could not be resolved to a schema
    UnknownSchema,
    /// Schema text is not valid JSON or not a valid schema
    MalformedSchema,
    /// Engine tag not supported
    UnknownEngine,
    /// Data violates schema
    ValidationFailed,
}

impl SchemaErrorCode {
    /// Returns the string code
    pub fn code(&self) -> &'static str {
        match self {
            SchemaErrorCode::UnknownSchema => "HODS_UNKNOWN_SCHEMA",
            SchemaErrorCode::MalformedSchema => "HODS_MALFORMED_SCHEMA",
            SchemaErrorCode::UnknownEngine => "HODS_UNKNOWN_SCHEMA_ENGINE",
            SchemaErrorCode::ValidationFailed => "HODS_SCHEMA_VALIDATION_FAILED",
        }
    }
}

impl fmt::Display for SchemaErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// One schema violation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationDetails {
    /// JSON pointer into the validated instance (e.g. "/tracks/0/title")
    pub instance_path: String,
    /// Violation description from the engine
    pub message: String,
}

impl ValidationDetails {
    pub fn new(instance_path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            instance_path: instance_path.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let path = if self.instance_path.is_empty() {
            "$root"
        } else {
            &self.instance_path
        };
        write!(f, "at '{}': {}", path, self.message)
    }
}

/// Schema error type with full context
#[derive(Debug, Clone)]
pub struct SchemaError {
    /// Error code
    code: SchemaErrorCode,
    /// Human-readable message
    message: String,
    /// Schema identifier if applicable
    schema_id: Option<String>,
    /// Violations, empty unless validation failed
    details: Vec<ValidationDetails>,
}

impl SchemaError {
    /// Create an unknown schema error
    pub fn unknown_schema(schema_id: impl Into<String>) -> Self {
        let id = schema_id.into();
        Self {
            code: SchemaErrorCode::UnknownSchema,
            message: format!("Schema '{}' not found", id),
            schema_id: Some(id),
            details: Vec::new(),
        }
    }

    /// Create an error for a malformed schema document
    pub fn malformed_schema(schema_id: impl Into<String>, reason: impl Into<String>) -> Self {
        let id = schema_id.into();
        Self {
            code: SchemaErrorCode::MalformedSchema,
            message: format!("Malformed schema '{}': {}", id, reason.into()),
            schema_id: Some(id),
            details: Vec::new(),
        }
    }

    /// Create an unknown engine error
    pub fn unknown_engine(engine: impl Into<String>) -> Self {
        Self {
            code: SchemaErrorCode::UnknownEngine,
            message: format!("Unknown schema engine: {}", engine.into()),
            schema_id: None,
            details: Vec::new(),
        }
    }

    /// Create a validation failed error
    pub fn validation_failed(schema_id: impl Into<String>, details: Vec<ValidationDetails>) -> Self {
        let id = schema_id.into();
        let summary = details
            .first()
            .map(|d| d.to_string())
            .unwrap_or_else(|| "data rejected".to_string());
        let message = if details.len() > 1 {
            format!(
                "Validation against '{}' failed {} (and {} more)",
                id,
                summary,
                details.len() - 1
            )
        } else {
            format!("Validation against '{}' failed {}", id, summary)
        };
        Self {
            code: SchemaErrorCode::ValidationFailed,
            message,
            schema_id: Some(id),
            details,
        }
    }

    /// Returns the error code
    pub fn code(&self) -> SchemaErrorCode {
        self.code
    }

    /// Returns the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the schema identifier if applicable
    pub fn schema_id(&self) -> Option<&str> {
        self.schema_id.as_deref()
    }

    /// Returns the violations if validation failed
    pub fn details(&self) -> &[ValidationDetails] {
        &self.details
    }

    /// Returns whether the data (not the schema) was at fault
    pub fn is_violation(&self) -> bool {
        self.code == SchemaErrorCode::ValidationFailed
    }
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code.code(), self.message)
    }
}

impl std::error::Error for SchemaError {}

/// Result type for schema operations
pub type SchemaResult<T> = Result<T, SchemaError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(SchemaErrorCode::UnknownSchema.code(), "HODS_UNKNOWN_SCHEMA");
        assert_eq!(SchemaErrorCode::MalformedSchema.code(), "HODS_MALFORMED_SCHEMA");
        assert_eq!(SchemaErrorCode::ValidationFailed.code(), "HODS_SCHEMA_VALIDATION_FAILED");
    }

    #[test]
    fn test_validation_message_counts_extra_violations() {
        let err = SchemaError::validation_failed(
            "album.json",
            vec![
                ValidationDetails::new("/title", "1 is not of type \"string\""),
                ValidationDetails::new("/year", "\"x\" is not of type \"integer\""),
            ],
        );
        let display = err.to_string();
        assert!(display.contains("HODS_SCHEMA_VALIDATION_FAILED"));
        assert!(display.contains("/title"));
        assert!(display.contains("1 more"));
        assert!(err.is_violation());
        assert_eq!(err.details().len(), 2);
    }

    #[test]
    fn test_root_path_display() {
        let details = ValidationDetails::new("", "not an object");
        assert_eq!(details.to_string(), "at '$root': not an object");
    }
}
