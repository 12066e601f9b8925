//! Schema resolution by identifier
//!
//! Identifiers are usually URLs. Only the final path segment selects the
//! schema, so `https://example.org/schemas/album-v1.json` and
//! `album-v1.json` resolve to the same schema. Network fetching is not done
//! here; schemas come from memory or a local directory.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::errors::{SchemaError, SchemaResult};
use super::types::{Schema, SchemaEngine};
use super::validator::Validator;

/// Resolves schema identifiers to compiled schemas.
pub trait SchemaResolver {
    /// Resolve an identifier.
    ///
    /// Returns `Ok(None)` for an empty identifier, which means always-valid.
    ///
    /// # Errors
    ///
    /// Returns `HODS_UNKNOWN_SCHEMA` for identifiers that are not available,
    /// `HODS_MALFORMED_SCHEMA` if the schema document cannot be compiled.
    fn resolve(&self, identifier: &str) -> SchemaResult<Option<Arc<Schema>>>;

    /// Resolve an identifier into a node validator.
    fn validator(&self, identifier: &str) -> SchemaResult<Validator> {
        Ok(match self.resolve(identifier)? {
            Some(schema) => Validator::Schema(schema),
            None => Validator::AlwaysValid,
        })
    }
}

/// Returns the lookup key for a schema identifier (its final path segment).
pub fn normalize_identifier(identifier: &str) -> &str {
    let trimmed = identifier.trim();
    match trimmed.rsplit_once('/') {
        Some((_, name)) => name,
        None => trimmed,
    }
}

/// In-memory schema registry.
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    /// Schemas indexed by normalized identifier
    schemas: HashMap<String, Arc<Schema>>,
}

impl SchemaRegistry {
    /// Creates an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a schema under its own identifier.
    ///
    /// A registered identifier is immutable: registering it twice fails.
    pub fn register(&mut self, schema: Schema) -> SchemaResult<()> {
        let key = normalize_identifier(schema.id()).to_string();
        if self.schemas.contains_key(&key) {
            return Err(SchemaError::malformed_schema(
                schema.id(),
                "identifier already registered",
            ));
        }
        self.schemas.insert(key, Arc::new(schema));
        Ok(())
    }

    /// Compiles and registers a raw JSON Schema document.
    pub fn register_json(&mut self, id: &str, raw: serde_json::Value) -> SchemaResult<()> {
        self.register(Schema::compile(id, raw, SchemaEngine::JsonSchema)?)
    }

    /// Returns the number of registered schemas
    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    /// Returns whether the registry is empty
    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}

impl SchemaResolver for SchemaRegistry {
    fn resolve(&self, identifier: &str) -> SchemaResult<Option<Arc<Schema>>> {
        let key = normalize_identifier(identifier);
        if key.is_empty() {
            return Ok(None);
        }
        self.schemas
            .get(key)
            .cloned()
            .map(Some)
            .ok_or_else(|| SchemaError::unknown_schema(identifier))
    }
}

/// Resolver reading schema files from a local directory.
///
/// Compiled schemas are memoized per resolver instance.
#[derive(Debug)]
pub struct DirectoryResolver {
    /// Directory containing `<name>.json` schema files
    schema_dir: PathBuf,
    /// Schemas compiled so far, by normalized identifier
    compiled: RefCell<HashMap<String, Arc<Schema>>>,
}

impl DirectoryResolver {
    /// Creates a resolver over the given directory
    pub fn new(schema_dir: impl Into<PathBuf>) -> Self {
        Self {
            schema_dir: schema_dir.into(),
            compiled: RefCell::new(HashMap::new()),
        }
    }

    /// Returns the schema directory path
    pub fn schema_dir(&self) -> &Path {
        &self.schema_dir
    }

    fn load(&self, identifier: &str, key: &str) -> SchemaResult<Schema> {
        let path = self.schema_dir.join(key);
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(SchemaError::unknown_schema(identifier))
            }
            Err(e) => {
                return Err(SchemaError::malformed_schema(
                    identifier,
                    format!("Failed to read {}: {}", path.display(), e),
                ))
            }
        };
        Schema::from_text(identifier, &text, SchemaEngine::JsonSchema)
    }
}

impl SchemaResolver for DirectoryResolver {
    fn resolve(&self, identifier: &str) -> SchemaResult<Option<Arc<Schema>>> {
        let key = normalize_identifier(identifier);
        if key.is_empty() {
            return Ok(None);
        }
        if let Some(schema) = self.compiled.borrow().get(key) {
            return Ok(Some(Arc::clone(schema)));
        }

        let schema = Arc::new(self.load(identifier, key)?);
        self.compiled
            .borrow_mut()
            .insert(key.to_string(), Arc::clone(&schema));
        Ok(Some(schema))
    }
}
