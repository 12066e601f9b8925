//! Per-node validators
//!
//! A validator is a small tagged value attached to a tree node. An empty
//! schema identifier resolves to `Validator::AlwaysValid`.

use std::sync::Arc;

use serde_json::Value;

use super::errors::SchemaResult;
use super::types::{Schema, SchemaEngine};

/// Validator attached to a data node.
#[derive(Debug, Clone, Default)]
pub enum Validator {
    /// Accepts every value
    #[default]
    AlwaysValid,
    /// Delegates to a compiled schema
    Schema(Arc<Schema>),
}

impl Validator {
    /// Wrap a compiled schema
    pub fn from_schema(schema: Schema) -> Self {
        Validator::Schema(Arc::new(schema))
    }

    /// Validate node data.
    ///
    /// Does not mutate the data. Deterministic for identical input.
    pub fn validate(&self, data: &Value) -> SchemaResult<()> {
        match self {
            Validator::AlwaysValid => Ok(()),
            Validator::Schema(schema) => schema.validate(data),
        }
    }

    /// Returns the schema identifier, if any
    pub fn schema_id(&self) -> Option<&str> {
        match self {
            Validator::AlwaysValid => None,
            Validator::Schema(schema) => Some(schema.id()),
        }
    }

    /// Returns the engine tag, if any
    pub fn engine(&self) -> Option<SchemaEngine> {
        match self {
            Validator::AlwaysValid => None,
            Validator::Schema(schema) => Some(schema.engine()),
        }
    }
}
