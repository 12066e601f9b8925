//! Document model for hods
//!
//! - `DataTree`: arena of nodes over one mapping, validated on mutation
//! - `Document`: schema-bound root with per-section hash records
//! - `Serializer`: text format seam, `JsonSerializer` by default
//!
//! # Invariants
//!
//! - Existing branches are never replaced by assignment
//! - A write never destroys the last good on-disk copy
//! - Hash records are excluded from the digests they hold

mod document;
mod errors;
mod node;
mod record;
mod serializer;

pub use document::{Document, DATA_SECTION, INFO_SECTION};
pub use errors::{DocumentError, DocumentResult};
pub use node::{Child, DataTree, NodeId};
pub use record::{timestamp, HashCheck, HashUpdate, TIMESTAMP_KEY};
pub use serializer::{backup_path, commit_with_backup, JsonSerializer, Serializer, DEFAULT_BACKUP_SUFFIX};
