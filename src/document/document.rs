//! Schema-bound documents with per-section hash records
//!
//! A document is a `DataTree` whose root mapping has a reserved `info`
//! section:
//!
//! ```json
//! {
//!   "info": {
//!     "version": "<document schema identifier>",
//!     "schema": {"<section>": "<section schema identifier>"},
//!     "hashes": {"<section>": {"sha256": "<hex>", "timestamp": "<iso-8601>"}}
//!   },
//!   "<section>": {}
//! }
//! ```
//!
//! The root is validated against `info.version`, each declared section
//! against its own schema. A mapping without `info` is a schemaless
//! document: it has no validators and no hash records.

use std::path::{Path, PathBuf};

use serde_json::{json, Map, Value};

use super::errors::{DocumentError, DocumentResult};
use super::node::{value_kind, Child, DataTree, NodeId};
use super::record::{timestamp, HashCheck, HashUpdate, TIMESTAMP_KEY};
use super::serializer::{commit_with_backup, Serializer};
use crate::hash::struct_hash;
use crate::observability::Logger;
use crate::schema::SchemaResolver;

/// Reserved top-level section
pub const INFO_SECTION: &str = "info";

/// Section used by `Document::from_payload`
pub const DATA_SECTION: &str = "data";

/// Document root: info envelope plus data sections.
#[derive(Debug, Clone)]
pub struct Document {
    tree: DataTree,
    /// File the document was loaded from
    file: Option<PathBuf>,
    /// Sections declared in `info.schema`, in declaration order
    sections: Vec<(String, NodeId)>,
}

impl Document {
    /// Creates a fresh empty envelope: no schema, no sections, no hashes.
    pub fn empty() -> Self {
        let envelope = json!({
            "info": {
                "version": "",
                "schema": {},
                "hashes": {}
            }
        });
        Self {
            tree: DataTree::from_mapping(envelope, None),
            file: None,
            sections: Vec::new(),
        }
    }

    /// Wraps a bare payload as the schemaless `data` section of a new envelope.
    pub fn from_payload(payload: Value) -> DocumentResult<Self> {
        if !payload.is_object() {
            return Err(DocumentError::conflict(format!(
                "payload must be a mapping, not '{}'",
                value_kind(&payload)
            )));
        }
        let envelope = json!({
            "info": {
                "version": "",
                "schema": {DATA_SECTION: ""},
                "hashes": {}
            },
            DATA_SECTION: payload
        });
        let mut doc = Self {
            tree: DataTree::from_mapping(envelope, None),
            file: None,
            sections: Vec::new(),
        };
        let data = doc.branch(NodeId::ROOT, DATA_SECTION)?;
        doc.sections.push((DATA_SECTION.to_string(), data));
        Ok(doc)
    }

    /// Builds a document from a parsed mapping.
    ///
    /// # Errors
    ///
    /// - `StructuralConflict` for a non-mapping root, a malformed `info`
    ///   section or a declared section that is not a mapping
    /// - `Validation` if a schema cannot be resolved or rejects the data
    pub fn from_value(value: Value, resolver: &dyn SchemaResolver) -> DocumentResult<Self> {
        let has_info = value.get(INFO_SECTION).is_some();
        if !has_info {
            return Ok(Self {
                tree: DataTree::new(value, None)?,
                file: None,
                sections: Vec::new(),
            });
        }

        let version = string_at(&value, &[INFO_SECTION, "version"])?.unwrap_or_default();
        let declared = declared_sections(&value)?;

        let root_validator = resolver.validator(&version)?;
        let mut tree = DataTree::new(value, Some(root_validator))?;

        let mut sections = Vec::with_capacity(declared.len());
        for (name, identifier) in declared {
            let node = match tree.get(NodeId::ROOT, &name)? {
                Child::Branch(node) => node,
                Child::Leaf(v) => {
                    return Err(DocumentError::conflict(format!(
                        "section '{}' must be a mapping, not '{}'",
                        name,
                        value_kind(v)
                    )))
                }
            };
            tree.set_validator(node, Some(resolver.validator(&identifier)?))?;
            tree.validate(node)?;
            sections.push((name, node));
        }

        Ok(Self {
            tree,
            file: None,
            sections,
        })
    }

    /// Loads and validates a document file.
    pub fn load(
        path: &Path,
        serializer: &dyn Serializer,
        resolver: &dyn SchemaResolver,
    ) -> DocumentResult<Self> {
        let value = serializer.load(path)?;
        let mut doc = Self::from_value(value, resolver)?;
        doc.file = Some(path.to_path_buf());

        let path_str = path.display().to_string();
        Logger::trace("DOCUMENT_LOADED", &[("path", path_str.as_str())]);
        Ok(doc)
    }

    /// Verifies hashes, then writes the document with a backup-then-commit.
    ///
    /// Without an explicit target the file the document was loaded from is
    /// used. The previous file content survives any failure.
    pub fn write(
        &mut self,
        target: Option<&Path>,
        serializer: &dyn Serializer,
        backup_suffix: &str,
    ) -> DocumentResult<()> {
        self.validate_hashes(&HashCheck::verify())?;

        let target = match (target, &self.file) {
            (Some(path), _) => path.to_path_buf(),
            (None, Some(path)) => path.clone(),
            (None, None) => {
                return Err(DocumentError::conflict(
                    "document has no associated file and no target was given",
                ))
            }
        };

        let data = self.tree.data();
        commit_with_backup(&target, backup_suffix, |path| serializer.save(data, path))?;

        let path_str = target.display().to_string();
        Logger::info("DOCUMENT_WRITTEN", &[("path", path_str.as_str())]);

        if self.file.is_none() {
            self.file = Some(target);
        }
        Ok(())
    }

    /// Validates the root schema and every section schema.
    pub fn validate(&self) -> DocumentResult<()> {
        self.tree.validate(NodeId::ROOT)?;
        for (_, node) in &self.sections {
            self.tree.validate(*node)?;
        }
        Ok(())
    }

    /// Checks section digests against their hash records.
    ///
    /// For every algorithm in (recorded ∪ required):
    ///
    /// - matching digest: nothing happens
    /// - no recorded digest and not updating: nothing happens
    /// - mismatch and not updating: `HashMismatch`
    /// - updating: stale or missing digests are overwritten and the
    ///   record's timestamp refreshed; a missing record is created
    ///
    /// Returns the digests that were written.
    pub fn validate_hashes(&mut self, check: &HashCheck) -> DocumentResult<Vec<HashUpdate>> {
        self.validate()?;

        let sections = if check.sections.is_empty() {
            self.recorded_sections()?
        } else {
            check.sections.clone()
        };

        let mut updates = Vec::new();
        for section in &sections {
            updates.extend(self.check_section(section, check)?);
        }

        for update in &updates {
            Logger::info(
                "HASH_UPDATED",
                &[
                    ("algorithm", update.algorithm.name()),
                    ("digest", update.digest.as_str()),
                    ("section", update.section.as_str()),
                ],
            );
        }
        Ok(updates)
    }

    fn check_section(&mut self, section: &str, check: &HashCheck) -> DocumentResult<Vec<HashUpdate>> {
        if section == INFO_SECTION {
            return Err(DocumentError::conflict("the info section can not carry a hash record"));
        }

        let record = self.hash_record(section)?;
        if record.is_none() && !check.write_updates {
            return Ok(Vec::new());
        }

        let data = self.tree.lookup(NodeId::ROOT, section)?;
        let mut pending = Vec::new();
        for algorithm in check.algorithms(record.as_ref())? {
            let current = record
                .as_ref()
                .and_then(|r| r.get(algorithm.name()))
                .and_then(Value::as_str)
                .map(str::to_string);
            let actual = struct_hash(data, algorithm);

            if current.as_deref() == Some(actual.as_str()) || (!check.write_updates && current.is_none()) {
                continue;
            }
            if !check.write_updates {
                return Err(DocumentError::HashMismatch {
                    algorithm,
                    section: section.to_string(),
                    recorded: current.unwrap_or_default(),
                    actual,
                });
            }
            pending.push(HashUpdate {
                section: section.to_string(),
                algorithm,
                previous: current,
                digest: actual,
            });
        }

        if record.is_none() {
            let hashes = self.hashes_node()?;
            self.tree.set(hashes, section, json!({TIMESTAMP_KEY: timestamp()}))?;
        }
        if pending.is_empty() {
            return Ok(pending);
        }

        let hashes = self.hashes_node()?;
        let record_node = self.branch(hashes, section)?;
        for update in &pending {
            self.tree
                .set(record_node, update.algorithm.name(), Value::from(update.digest.clone()))?;
        }
        self.tree.set(record_node, TIMESTAMP_KEY, Value::from(timestamp()))?;

        Ok(pending)
    }

    /// Sections that currently carry a hash record, in record order
    pub fn recorded_sections(&self) -> DocumentResult<Vec<String>> {
        match self.info_value("hashes") {
            Some(Value::Object(hashes)) => Ok(hashes.keys().cloned().collect()),
            Some(other) => Err(DocumentError::conflict(format!(
                "info.hashes must be a mapping, not '{}'",
                value_kind(other)
            ))),
            None => Ok(Vec::new()),
        }
    }

    /// The hash record of a section, if present
    pub fn hash_record(&self, section: &str) -> DocumentResult<Option<Map<String, Value>>> {
        match self.info_value("hashes").and_then(|h| h.get(section)) {
            Some(Value::Object(record)) => Ok(Some(record.clone())),
            Some(other) => Err(DocumentError::conflict(format!(
                "hash record for {} must be a mapping, not '{}'",
                section,
                value_kind(other)
            ))),
            None => Ok(None),
        }
    }

    /// Document schema identifier (`info.version`), `None` when schemaless
    pub fn schema_id(&self) -> Option<&str> {
        self.info_value("version").and_then(Value::as_str)
    }

    /// Declared sections in declaration order
    pub fn sections(&self) -> Vec<&str> {
        self.sections.iter().map(|(name, _)| name.as_str()).collect()
    }

    /// Node of a declared section
    pub fn section(&self, name: &str) -> Option<NodeId> {
        self.sections
            .iter()
            .find(|(section, _)| section == name)
            .map(|(_, node)| *node)
    }

    /// File the document was loaded from or last written to
    pub fn file(&self) -> Option<&Path> {
        self.file.as_deref()
    }

    /// Root mapping
    pub fn data(&self) -> &Value {
        self.tree.data()
    }

    /// Underlying tree, for node-level access
    pub fn tree(&self) -> &DataTree {
        &self.tree
    }

    /// Mutable underlying tree
    pub fn tree_mut(&mut self) -> &mut DataTree {
        &mut self.tree
    }

    /// Looks up a key of a node
    pub fn get(&mut self, node: NodeId, name: &str) -> DocumentResult<Child<'_>> {
        self.tree.get(node, name)
    }

    /// Follows a key path from the root
    pub fn get_path(&mut self, path: &[&str]) -> DocumentResult<Child<'_>> {
        self.tree.get_path(path)
    }

    /// Writes a key of a node and validates upward
    pub fn set(&mut self, node: NodeId, name: &str, value: Value) -> DocumentResult<()> {
        self.tree.set(node, name, value)
    }

    fn info_value(&self, key: &str) -> Option<&Value> {
        self.tree.data().get(INFO_SECTION).and_then(|info| info.get(key))
    }

    fn hashes_node(&mut self) -> DocumentResult<NodeId> {
        if !self.tree.contains(NodeId::ROOT, INFO_SECTION)? {
            return Err(DocumentError::conflict(
                "schemaless document has no info section for hash records",
            ));
        }
        let info = self.branch(NodeId::ROOT, INFO_SECTION)?;
        if !self.tree.contains(info, "hashes")? {
            self.tree.set(info, "hashes", json!({}))?;
        }
        self.branch(info, "hashes")
    }

    fn branch(&mut self, node: NodeId, name: &str) -> DocumentResult<NodeId> {
        match self.tree.get(node, name)? {
            Child::Branch(id) => Ok(id),
            Child::Leaf(v) => Err(DocumentError::conflict(format!(
                "'{}' must be a mapping, not '{}'",
                name,
                value_kind(v)
            ))),
        }
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::empty()
    }
}

impl PartialEq for Document {
    fn eq(&self, other: &Self) -> bool {
        self.tree == other.tree
    }
}

fn string_at(value: &Value, path: &[&str]) -> DocumentResult<Option<String>> {
    let found = path.iter().try_fold(value, |current, step| current.get(*step));
    match found {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(other) => Err(DocumentError::conflict(format!(
            "{} must be a string, not '{}'",
            path.join("."),
            value_kind(other)
        ))),
    }
}

fn declared_sections(value: &Value) -> DocumentResult<Vec<(String, String)>> {
    let schema = match value.get(INFO_SECTION).and_then(|info| info.get("schema")) {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Object(schema)) => schema,
        Some(other) => {
            return Err(DocumentError::conflict(format!(
                "info.schema must be a mapping, not '{}'",
                value_kind(other)
            )))
        }
    };

    let mut declared = Vec::with_capacity(schema.len());
    for name in schema.keys() {
        let identifier = string_at(value, &[INFO_SECTION, "schema", name.as_str()])?.unwrap_or_default();
        declared.push((name.clone(), identifier));
    }
    Ok(declared)
}
