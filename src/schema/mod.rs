//! Schema subsystem for hods
//!
//! Schemas are resolved by identifier and attached to tree nodes as
//! validators. Every mutation of a node is checked against its own validator
//! and then against the validators of all its ancestors.
//!
//! # Design Principles
//!
//! - Empty identifier means always-valid
//! - No network access; schemas come from memory or a local directory
//! - Validation never mutates data
//! - Deterministic validation

mod errors;
mod resolver;
mod types;
mod validator;

pub use errors::{SchemaError, SchemaErrorCode, SchemaResult, ValidationDetails};
pub use resolver::{normalize_identifier, DirectoryResolver, SchemaRegistry, SchemaResolver};
pub use types::{Schema, SchemaEngine};
pub use validator::Validator;
