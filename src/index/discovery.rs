//! Candidate file enumeration and document loading for refresh

use std::fs;
use std::path::{Path, PathBuf};

use ignore::WalkBuilder;
use serde_json::Value;

use super::errors::{IndexError, IndexResult};
use crate::document::{Document, DocumentResult, Serializer};
use crate::observability::Logger;
use crate::schema::SchemaResolver;

/// Enumerates files under `root` accepted by `supports`, sorted.
///
/// A file path as `root` yields just that file (if supported). Hidden files
/// and ignore files get no special treatment; symlinked directories are not
/// followed. Entries that can not be read are logged and skipped.
pub fn discover<F>(root: &Path, recursive: bool, supports: F) -> IndexResult<Vec<PathBuf>>
where
    F: Fn(&Path) -> bool,
{
    fs::metadata(root).map_err(|e| IndexError::discovery_failed(root, e))?;

    let walker = WalkBuilder::new(root)
        .standard_filters(false)
        .follow_links(false)
        .max_depth(if recursive { None } else { Some(1) })
        .build();

    let mut found = Vec::new();
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                let error = e.to_string();
                let root_str = root.display().to_string();
                Logger::warn(
                    "DISCOVERY_ENTRY_SKIPPED",
                    &[("error", error.as_str()), ("root", root_str.as_str())],
                );
                continue;
            }
        };
        let is_dir = entry.file_type().map_or(false, |t| t.is_dir());
        if !is_dir && supports(entry.path()) {
            found.push(entry.into_path());
        }
    }
    found.sort();
    Ok(found)
}

/// Parses a candidate file into the mapping that gets indexed.
pub trait DocumentLoader {
    /// Load and validate a document, returning its root mapping.
    fn load(&self, path: &Path) -> DocumentResult<Value>;

    /// Returns whether the file is a candidate at all
    fn supports(&self, path: &Path) -> bool;
}

/// Loader that parses with a serializer and validates as a `Document`.
pub struct SerializedLoader<'a> {
    serializer: &'a dyn Serializer,
    resolver: &'a dyn SchemaResolver,
}

impl<'a> SerializedLoader<'a> {
    /// Creates a loader over the given collaborators
    pub fn new(serializer: &'a dyn Serializer, resolver: &'a dyn SchemaResolver) -> Self {
        Self { serializer, resolver }
    }

    /// Serializer used for parsing and discovery
    pub fn serializer(&self) -> &'a dyn Serializer {
        self.serializer
    }
}

impl DocumentLoader for SerializedLoader<'_> {
    fn load(&self, path: &Path) -> DocumentResult<Value> {
        let doc = Document::load(path, self.serializer, self.resolver)?;
        Ok(doc.data().clone())
    }

    fn supports(&self, path: &Path) -> bool {
        self.serializer.supports(path)
    }
}
