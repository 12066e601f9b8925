//! Schema handle and engine tag
//!
//! Supported engines:
//! - jsonschema: JSON Schema documents compiled with the `jsonschema` crate

use std::fmt;
use std::str::FromStr;

use jsonschema::JSONSchema;
use serde_json::Value;

use super::errors::{SchemaError, SchemaResult, ValidationDetails};

/// Schema engine tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SchemaEngine {
    /// JSON Schema (draft detected from `$schema`, draft 7 otherwise)
    #[default]
    JsonSchema,
}

impl SchemaEngine {
    /// Returns the engine name
    pub fn name(&self) -> &'static str {
        match self {
            SchemaEngine::JsonSchema => "jsonschema",
        }
    }
}

impl FromStr for SchemaEngine {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "jsonschema" => Ok(SchemaEngine::JsonSchema),
            other => Err(SchemaError::unknown_engine(other)),
        }
    }
}

/// A parsed, compiled schema bound to its identifier.
///
/// Schemas are immutable once compiled and shared between nodes by `Arc`.
pub struct Schema {
    /// Full identifier the schema was resolved from
    id: String,
    /// Engine that compiled the schema
    engine: SchemaEngine,
    /// Raw schema document
    raw: Value,
    /// Compiled form
    compiled: JSONSchema,
}

impl Schema {
    /// Compile a schema document.
    ///
    /// # Errors
    ///
    /// Returns `HODS_MALFORMED_SCHEMA` if the document is not a valid schema.
    pub fn compile(id: impl Into<String>, raw: Value, engine: SchemaEngine) -> SchemaResult<Self> {
        let id = id.into();
        let compiled = match engine {
            SchemaEngine::JsonSchema => JSONSchema::compile(&raw)
                .map_err(|e| SchemaError::malformed_schema(&id, e.to_string()))?,
        };
        Ok(Self {
            id,
            engine,
            raw,
            compiled,
        })
    }

    /// Parse and compile schema text.
    pub fn from_text(id: impl Into<String>, text: &str, engine: SchemaEngine) -> SchemaResult<Self> {
        let id = id.into();
        let raw: Value = serde_json::from_str(text)
            .map_err(|e| SchemaError::malformed_schema(&id, format!("Invalid JSON: {}", e)))?;
        Self::compile(id, raw, engine)
    }

    /// Returns the schema identifier
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns the engine tag
    pub fn engine(&self) -> SchemaEngine {
        self.engine
    }

    /// Returns the raw schema document
    pub fn raw(&self) -> &Value {
        &self.raw
    }

    /// Validate data against this schema.
    ///
    /// Collects every violation the engine reports.
    pub fn validate(&self, data: &Value) -> SchemaResult<()> {
        match self.compiled.validate(data) {
            Ok(()) => Ok(()),
            Err(errors) => {
                let details: Vec<ValidationDetails> = errors
                    .map(|e| ValidationDetails::new(e.instance_path.to_string(), e.to_string()))
                    .collect();
                Err(SchemaError::validation_failed(&self.id, details))
            }
        }
    }
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field("id", &self.id)
            .field("engine", &self.engine)
            .finish()
    }
}
