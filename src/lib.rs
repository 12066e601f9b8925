//! hods - hierarchical schema-validated documents
//!
//! Schema-validated JSON documents with per-section content hashes, and a
//! cached index for browsing a directory of them.

pub mod browse;
pub mod cli;
pub mod document;
pub mod hash;
pub mod index;
pub mod observability;
pub mod schema;
