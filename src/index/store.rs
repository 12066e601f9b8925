//! SQLite cache layout
//!
//! ```text
//! info(option PK, value)          version marker and refresh generation
//! files(id, path UNIQUE, size, mtime, ctime, seen)
//! entries(id, file_id -> files ON DELETE CASCADE,
//!         full_path, parent_path, last_segment, value, is_leaf)
//! ```
//!
//! A cache written with another layout version, or a file that is not a
//! SQLite database at all, is deleted and rebuilt from scratch. There is no
//! in-place migration.

use std::fs;
use std::path::Path;

use rusqlite::{params, Connection, ErrorCode, OptionalExtension};

use super::errors::{IndexError, IndexResult};
use crate::observability::Logger;

/// Layout version stored in `info`
pub const CACHE_VERSION: &str = "1";

const VERSION_OPTION: &str = "version";
const GENERATION_OPTION: &str = "generation";

const SCHEMA_SQL: &str = "
    CREATE TABLE IF NOT EXISTS files (
        id INTEGER PRIMARY KEY,
        path TEXT NOT NULL UNIQUE,
        size INTEGER NOT NULL,
        mtime INTEGER NOT NULL,
        ctime INTEGER NOT NULL,
        seen INTEGER NOT NULL
    );
    CREATE TABLE IF NOT EXISTS entries (
        id INTEGER PRIMARY KEY,
        file_id INTEGER NOT NULL REFERENCES files(id) ON DELETE CASCADE,
        full_path TEXT NOT NULL,
        parent_path TEXT,
        last_segment TEXT NOT NULL,
        value TEXT,
        is_leaf INTEGER NOT NULL
    );
    CREATE INDEX IF NOT EXISTS entries_file ON entries(file_id);
    CREATE INDEX IF NOT EXISTS entries_full_path ON entries(full_path, value);
    CREATE INDEX IF NOT EXISTS entries_parent_path ON entries(parent_path);
";

/// Opens the cache at `path`, rebuilding it when the layout does not match.
pub fn open(path: &Path) -> IndexResult<Connection> {
    match open_existing(path) {
        Err(err) if err.requires_rebuild() => {
            let path_str = path.display().to_string();
            Logger::warn(
                "INDEX_REBUILD",
                &[("path", path_str.as_str()), ("reason", err.message())],
            );
            fs::remove_file(path).map_err(|e| {
                IndexError::store_failed(format!("Failed to remove {}: {}", path_str, e))
            })?;
            open_existing(path)
        }
        other => other,
    }
}

/// Opens a throwaway in-memory cache
pub fn open_in_memory() -> IndexResult<Connection> {
    let conn = Connection::open_in_memory()?;
    initialize(&conn)?;
    Ok(conn)
}

fn open_existing(path: &Path) -> IndexResult<Connection> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| {
            IndexError::store_failed(format!("Failed to create {}: {}", parent.display(), e))
        })?;
    }
    let conn = Connection::open(path)?;
    initialize(&conn)?;
    Ok(conn)
}

fn initialize(conn: &Connection) -> IndexResult<()> {
    conn.execute_batch(
        "PRAGMA foreign_keys = ON;
         CREATE TABLE IF NOT EXISTS info (option TEXT PRIMARY KEY, value TEXT);",
    )
    .map_err(not_a_cache)?;

    let version: Option<String> = conn
        .query_row(
            "SELECT value FROM info WHERE option = ?1",
            params![VERSION_OPTION],
            |row| row.get(0),
        )
        .optional()?;

    match version.as_deref() {
        Some(CACHE_VERSION) => {}
        None if !has_tables(conn)? => {
            conn.execute(
                "INSERT INTO info (option, value) VALUES (?1, ?2), (?3, '0')",
                params![VERSION_OPTION, CACHE_VERSION, GENERATION_OPTION],
            )?;
        }
        found => return Err(IndexError::version_mismatch(found, CACHE_VERSION)),
    }

    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}

fn has_tables(conn: &Connection) -> IndexResult<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name != 'info'",
        [],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

fn not_a_cache(err: rusqlite::Error) -> IndexError {
    match err {
        rusqlite::Error::SqliteFailure(ref e, _) if e.code == ErrorCode::NotADatabase => {
            IndexError::version_mismatch(Some("<not a database>"), CACHE_VERSION)
        }
        other => other.into(),
    }
}

/// Current refresh generation
pub fn generation(conn: &Connection) -> IndexResult<i64> {
    let value: Option<String> = conn
        .query_row(
            "SELECT value FROM info WHERE option = ?1",
            params![GENERATION_OPTION],
            |row| row.get(0),
        )
        .optional()?;
    match value {
        Some(v) => v
            .parse()
            .map_err(|_| IndexError::store_failed(format!("invalid generation marker: {}", v))),
        None => Ok(0),
    }
}

/// Stores a new refresh generation
pub fn set_generation(conn: &Connection, generation: i64) -> IndexResult<()> {
    conn.execute(
        "INSERT INTO info (option, value) VALUES (?1, ?2)
         ON CONFLICT(option) DO UPDATE SET value = excluded.value",
        params![GENERATION_OPTION, generation.to_string()],
    )?;
    Ok(())
}
