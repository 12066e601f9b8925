//! Document serialization
//!
//! The `Serializer` trait is the seam to text formats. `JsonSerializer` is
//! the built-in implementation for `.json` files; it preserves key
//! insertion order and writes with two-space indentation.
//!
//! `commit_with_backup` implements the write protocol used by
//! `Document::write`:
//!
//! 1. Move the existing file aside to `<name><suffix>`
//! 2. Write the new content to the target path and fsync
//! 3. On success remove the backup
//! 4. On failure remove the partial target and move the backup back

use std::ffi::OsString;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use serde_json::Value;

use super::errors::{DocumentError, DocumentResult};
use crate::observability::Logger;

/// Default suffix for the backup kept while a write is in progress
pub const DEFAULT_BACKUP_SUFFIX: &str = ".hods~";

/// Reads and writes document mappings.
pub trait Serializer {
    /// Load the root mapping from a file.
    fn load(&self, path: &Path) -> DocumentResult<Value>;

    /// Save a mapping to a file.
    fn save(&self, data: &Value, path: &Path) -> DocumentResult<()>;

    /// Returns whether this serializer handles the file (by extension).
    fn supports(&self, path: &Path) -> bool;
}

/// JSON serializer for `.json` files.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSerializer;

impl Serializer for JsonSerializer {
    fn load(&self, path: &Path) -> DocumentResult<Value> {
        let text = fs::read_to_string(path).map_err(|e| DocumentError::io(path, e))?;
        serde_json::from_str(&text).map_err(|e| DocumentError::Parse {
            path: path.display().to_string(),
            reason: e.to_string(),
        })
    }

    fn save(&self, data: &Value, path: &Path) -> DocumentResult<()> {
        let mut text = serde_json::to_string_pretty(data).map_err(|e| DocumentError::Parse {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        text.push('\n');

        let mut file = File::create(path).map_err(|e| DocumentError::io(path, e))?;
        file.write_all(text.as_bytes())
            .map_err(|e| DocumentError::io(path, e))?;

        // fsync before the backup is discarded
        file.sync_all().map_err(|e| DocumentError::io(path, e))
    }

    fn supports(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map_or(false, |ext| ext.eq_ignore_ascii_case("json"))
    }
}

/// Returns the backup path for a target: the file name with `suffix` appended.
pub fn backup_path(target: &Path, suffix: &str) -> PathBuf {
    let mut name: OsString = target
        .file_name()
        .map(OsString::from)
        .unwrap_or_default();
    name.push(suffix);
    target.with_file_name(name)
}

/// Runs `write` against `target`, keeping the previous file until it succeeds.
pub fn commit_with_backup<F>(target: &Path, suffix: &str, write: F) -> DocumentResult<()>
where
    F: FnOnce(&Path) -> DocumentResult<()>,
{
    let backup = backup_path(target, suffix);
    let had_previous = target.exists();

    if had_previous {
        fs::rename(target, &backup).map_err(|e| DocumentError::io(target, e))?;
    }

    match write(target) {
        Ok(()) => {
            if had_previous {
                if let Err(e) = fs::remove_file(&backup) {
                    let backup = backup.display().to_string();
                    let error = e.to_string();
                    Logger::warn(
                        "BACKUP_CLEANUP_FAILED",
                        &[("backup", backup.as_str()), ("error", error.as_str())],
                    );
                }
            }
            Ok(())
        }
        Err(err) => {
            if target.exists() {
                let _ = fs::remove_file(target);
            }
            if had_previous {
                if let Err(e) = fs::rename(&backup, target) {
                    let backup = backup.display().to_string();
                    let error = e.to_string();
                    Logger::error(
                        "BACKUP_RESTORE_FAILED",
                        &[("backup", backup.as_str()), ("error", error.as_str())],
                    );
                }
            }
            Err(err)
        }
    }
}
