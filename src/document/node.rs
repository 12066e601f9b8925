//! Tree-structured data nodes
//!
//! A `DataTree` owns one mapping and an arena of node slots. Each slot
//! addresses a subtree by its key path from the root, holds an optional
//! validator and a back-reference to its parent slot. Child slots are
//! materialized on first access and memoized, so every access to the same
//! branch yields the same `NodeId` and sees the same backing data.
//!
//! # Invariants
//!
//! - The root is always a mapping
//! - A branch key is never replaced, so a slot's path stays valid for the
//!   life of the tree
//! - The key set of a node always equals its backing mapping's key set
//! - Writes land before validation; a failed validation leaves the write
//!   in place

use std::collections::HashMap;

use serde_json::{Map, Value};

use super::errors::{DocumentError, DocumentResult};
use crate::hash::{struct_hash, HashAlgorithm};
use crate::schema::Validator;

/// Handle to a node slot in a `DataTree`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

impl NodeId {
    /// The root node of every tree
    pub const ROOT: NodeId = NodeId(0);
}

/// Result of looking up a key in a node.
#[derive(Debug, Clone, PartialEq)]
pub enum Child<'a> {
    /// Nested mapping, addressable as its own node
    Branch(NodeId),
    /// Scalar or sequence value
    Leaf(&'a Value),
}

impl<'a> Child<'a> {
    /// Returns the node id if this is a branch
    pub fn branch(&self) -> Option<NodeId> {
        match self {
            Child::Branch(id) => Some(*id),
            Child::Leaf(_) => None,
        }
    }

    /// Returns the value if this is a leaf
    pub fn leaf(&self) -> Option<&'a Value> {
        match self {
            Child::Branch(_) => None,
            Child::Leaf(v) => Some(v),
        }
    }
}

#[derive(Debug, Clone)]
struct NodeSlot {
    /// Key path from the root
    path: Vec<String>,
    /// Parent slot, `None` at the root
    parent: Option<NodeId>,
    /// Optional validator for this subtree
    validator: Option<Validator>,
    /// Memoized branch children
    children: HashMap<String, NodeId>,
}

/// A mapping with attribute-style node access and validation on mutation.
#[derive(Debug, Clone)]
pub struct DataTree {
    /// Backing data, always `Value::Object`
    data: Value,
    /// Node arena, index 0 is the root
    nodes: Vec<NodeSlot>,
}

impl DataTree {
    /// Creates a tree over a mapping and validates it.
    ///
    /// # Errors
    ///
    /// - `StructuralConflict` if `data` is not a mapping
    /// - `Validation` if the root validator rejects the data
    pub fn new(data: Value, validator: Option<Validator>) -> DocumentResult<Self> {
        if !data.is_object() {
            return Err(DocumentError::conflict(format!(
                "DataTree expected a mapping object but received '{}'",
                value_kind(&data)
            )));
        }
        let tree = Self::from_mapping(data, validator);
        tree.validate(NodeId::ROOT)?;
        Ok(tree)
    }

    /// Creates a tree over a mapping without validating.
    pub(crate) fn from_mapping(data: Value, validator: Option<Validator>) -> Self {
        debug_assert!(data.is_object());
        Self {
            data,
            nodes: vec![NodeSlot {
                path: Vec::new(),
                parent: None,
                validator,
                children: HashMap::new(),
            }],
        }
    }

    /// Returns the root node
    pub fn root(&self) -> NodeId {
        NodeId::ROOT
    }

    /// Returns the whole backing mapping
    pub fn data(&self) -> &Value {
        &self.data
    }

    /// Consumes the tree and returns its backing mapping
    pub fn into_data(self) -> Value {
        self.data
    }

    /// Returns the backing mapping of a node
    pub fn value(&self, node: NodeId) -> DocumentResult<&Value> {
        let slot = self.slot(node)?;
        navigate(&self.data, &slot.path).ok_or_else(|| self.dangling(node))
    }

    /// Returns the backing mapping of a node as a map
    pub fn mapping(&self, node: NodeId) -> DocumentResult<&Map<String, Value>> {
        self.value(node)?
            .as_object()
            .ok_or_else(|| self.dangling(node))
    }

    /// Returns the key path of a node
    pub fn path(&self, node: NodeId) -> DocumentResult<&[String]> {
        Ok(&self.slot(node)?.path)
    }

    /// Returns the parent of a node, `None` at the root
    pub fn parent(&self, node: NodeId) -> DocumentResult<Option<NodeId>> {
        Ok(self.slot(node)?.parent)
    }

    /// Returns the validator attached to a node
    pub fn validator(&self, node: NodeId) -> DocumentResult<Option<&Validator>> {
        Ok(self.slot(node)?.validator.as_ref())
    }

    /// Attaches a validator to a node. Does not validate.
    pub fn set_validator(&mut self, node: NodeId, validator: Option<Validator>) -> DocumentResult<()> {
        self.slot_mut(node)?.validator = validator;
        Ok(())
    }

    /// Looks up a key.
    ///
    /// Branch keys yield the memoized child node; leaf keys yield the raw
    /// value.
    ///
    /// # Errors
    ///
    /// `NotFound` if the key does not exist.
    pub fn get(&mut self, node: NodeId, name: &str) -> DocumentResult<Child<'_>> {
        if let Some(&child) = self.slot(node)?.children.get(name) {
            return Ok(Child::Branch(child));
        }

        let is_branch = match self.mapping(node)?.get(name) {
            Some(value) => value.is_object(),
            None => return Err(DocumentError::not_found(self.label(node), name)),
        };

        if is_branch {
            Ok(Child::Branch(self.materialize(node, name)))
        } else {
            self.mapping(node)?
                .get(name)
                .map(Child::Leaf)
                .ok_or_else(|| DocumentError::not_found(self.label(node), name))
        }
    }

    /// Follows a key path from the root.
    pub fn get_path(&mut self, path: &[&str]) -> DocumentResult<Child<'_>> {
        let mut node = NodeId::ROOT;
        for (depth, step) in path.iter().enumerate() {
            if depth + 1 == path.len() {
                return self.get(node, step);
            }
            node = match self.get(node, step)? {
                Child::Branch(id) => id,
                Child::Leaf(_) => {
                    return Err(DocumentError::not_found(path[..=depth].join("."), path[depth + 1]))
                }
            };
        }
        Ok(Child::Branch(node))
    }

    /// Looks up a raw value without materializing nodes.
    pub fn lookup(&self, node: NodeId, name: &str) -> DocumentResult<&Value> {
        self.mapping(node)?
            .get(name)
            .ok_or_else(|| DocumentError::not_found(self.label(node), name))
    }

    /// Returns whether a node has a key
    pub fn contains(&self, node: NodeId, name: &str) -> DocumentResult<bool> {
        Ok(self.mapping(node)?.contains_key(name))
    }

    /// Writes a key, then validates the node and its ancestors.
    ///
    /// - absent key: value is written as is (mappings become branches on
    ///   next `get`)
    /// - existing leaf, non-mapping value: overwritten
    /// - any other combination: `StructuralConflict`, nothing written
    ///
    /// When validation fails the written value stays in place.
    pub fn set(&mut self, node: NodeId, name: &str, value: Value) -> DocumentResult<()> {
        let existing_is_branch = self.mapping(node)?.get(name).map(Value::is_object);

        match (existing_is_branch, value.is_object()) {
            (Some(true), true) => {
                return Err(DocumentError::conflict(format!(
                    "can not replace existing branch with another: {}",
                    name
                )))
            }
            (Some(true), false) => {
                return Err(DocumentError::conflict(format!(
                    "can not replace branch node with leaf node: {}",
                    name
                )))
            }
            (Some(false), true) => {
                return Err(DocumentError::conflict(format!(
                    "can not replace leaf node with branch node: {}",
                    name
                )))
            }
            _ => {}
        }

        let path = &self.nodes[node.0].path;
        let target = navigate_mut(&mut self.data, path)
            .and_then(Value::as_object_mut)
            .ok_or_else(|| DocumentError::conflict(format!("node {:?} is detached", node)))?;
        target.insert(name.to_string(), value);

        self.validate(node)
    }

    /// Runs this node's validator, then each ancestor's.
    pub fn validate(&self, node: NodeId) -> DocumentResult<()> {
        let mut current = Some(node);
        while let Some(id) = current {
            let slot = self.slot(id)?;
            if let Some(validator) = &slot.validator {
                validator.validate(self.value(id)?)?;
            }
            current = slot.parent;
        }
        Ok(())
    }

    /// Immediate keys of a node in insertion order
    pub fn keys(&self, node: NodeId) -> DocumentResult<Vec<&str>> {
        Ok(self.mapping(node)?.keys().map(String::as_str).collect())
    }

    /// Canonical content hash of a node
    pub fn content_hash(&self, node: NodeId, algorithm: HashAlgorithm) -> DocumentResult<String> {
        Ok(struct_hash(self.value(node)?, algorithm))
    }

    /// Structural equality of two nodes, possibly in different trees.
    pub fn node_eq(&self, node: NodeId, other: &DataTree, other_node: NodeId) -> bool {
        match (
            self.content_hash(node, HashAlgorithm::Sha256),
            other.content_hash(other_node, HashAlgorithm::Sha256),
        ) {
            (Ok(a), Ok(b)) => a == b,
            _ => false,
        }
    }

    /// Number of materialized node slots
    pub fn materialized(&self) -> usize {
        self.nodes.len()
    }

    fn materialize(&mut self, parent: NodeId, name: &str) -> NodeId {
        let id = NodeId(self.nodes.len());
        let mut path = self.nodes[parent.0].path.clone();
        path.push(name.to_string());
        self.nodes.push(NodeSlot {
            path,
            parent: Some(parent),
            validator: None,
            children: HashMap::new(),
        });
        self.nodes[parent.0].children.insert(name.to_string(), id);
        id
    }

    fn slot(&self, node: NodeId) -> DocumentResult<&NodeSlot> {
        self.nodes
            .get(node.0)
            .ok_or_else(|| DocumentError::conflict(format!("unknown node {:?}", node)))
    }

    fn slot_mut(&mut self, node: NodeId) -> DocumentResult<&mut NodeSlot> {
        self.nodes
            .get_mut(node.0)
            .ok_or_else(|| DocumentError::conflict(format!("unknown node {:?}", node)))
    }

    fn label(&self, node: NodeId) -> String {
        match self.nodes.get(node.0) {
            Some(slot) if !slot.path.is_empty() => slot.path.join("."),
            _ => "<root>".to_string(),
        }
    }

    fn dangling(&self, node: NodeId) -> DocumentError {
        DocumentError::conflict(format!("node '{}' is no longer a mapping", self.label(node)))
    }
}

impl PartialEq for DataTree {
    fn eq(&self, other: &Self) -> bool {
        self.node_eq(NodeId::ROOT, other, NodeId::ROOT)
    }
}

pub(crate) fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "mapping",
    }
}

fn navigate<'a>(root: &'a Value, path: &[String]) -> Option<&'a Value> {
    path.iter().try_fold(root, |current, step| current.get(step.as_str()))
}

fn navigate_mut<'a>(root: &'a mut Value, path: &[String]) -> Option<&'a mut Value> {
    path.iter()
        .try_fold(root, |current, step| current.get_mut(step.as_str()))
}
