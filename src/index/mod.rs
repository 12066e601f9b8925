//! Document index for hods
//!
//! A SQLite cache that flattens many documents into one row per tree node,
//! tracks file staleness by (size, mtime, ctime) fingerprints, and answers
//! conjunctive path queries.
//!
//! # Invariants
//!
//! - Unchanged files are never re-parsed
//! - Deleting a file row deletes all its entries
//! - A per-file parse failure never aborts a refresh
//! - A cache of another layout version is rebuilt, never migrated

mod discovery;
mod errors;
mod manager;
mod query;
mod store;

pub use discovery::{discover, DocumentLoader, SerializedLoader};
pub use errors::{IndexError, IndexErrorCode, IndexResult};
pub use manager::{leaf_text, DocumentIndex, RefreshStats};
pub use query::{CellValue, Field, Filter, Row, ValueFilter, PATH_SEPARATOR};
pub use store::CACHE_VERSION;
