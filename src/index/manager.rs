//! Document index manager
//!
//! Flattens documents into `entries` rows keyed by file, and answers
//! conjunctive path queries from the cache without re-parsing.
//!
//! # API
//!
//! - `refresh(root, recursive, loader)` - Re-index changed files
//! - `drop_stale()` - Delete files not seen by the last refresh
//! - `query(fields, filters)` - Conjunctive path query
//!
//! Each file is processed in its own transaction, so an interrupted refresh
//! never leaves entries without their file row.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Statement};
use serde_json::{Map, Value};

use super::discovery::{discover, DocumentLoader};
use super::errors::{IndexError, IndexResult};
use super::query::{build_sql, CellValue, Field, Filter, Row, PATH_SEPARATOR};
use super::store;
use crate::observability::Logger;

/// Counters reported by one refresh
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RefreshStats {
    /// Candidate files enumerated
    pub seen: usize,
    /// Files parsed and (re)inserted
    pub reparsed: usize,
    /// Files with an unchanged fingerprint
    pub skipped: usize,
    /// Files that could not be stat'ed, parsed or validated
    pub failed: usize,
}

/// Size and timestamps identifying one version of a file on disk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Fingerprint {
    size: i64,
    mtime: i64,
    ctime: i64,
}

impl Fingerprint {
    fn of(path: &Path) -> std::io::Result<Self> {
        let meta = fs::metadata(path)?;
        let mtime = meta
            .modified()?
            .duration_since(UNIX_EPOCH)
            .map(|d| saturating_i64(d.as_nanos()))
            .unwrap_or(0);
        Ok(Self {
            size: saturating_i64(meta.len()),
            mtime,
            ctime: change_time(&meta),
        })
    }
}

#[cfg(unix)]
fn change_time(meta: &fs::Metadata) -> i64 {
    use std::os::unix::fs::MetadataExt;
    meta.ctime()
        .saturating_mul(1_000_000_000)
        .saturating_add(meta.ctime_nsec())
}

#[cfg(not(unix))]
fn change_time(meta: &fs::Metadata) -> i64 {
    meta.created()
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| saturating_i64(d.as_nanos()))
        .unwrap_or(0)
}

/// Converts to a SQLite integer, clamping at `i64::MAX`
fn saturating_i64<T: TryInto<i64>>(value: T) -> i64 {
    value.try_into().unwrap_or(i64::MAX)
}

/// Relational cache over a collection of documents.
pub struct DocumentIndex {
    conn: Connection,
    /// Cache file, `None` for an in-memory index
    path: Option<PathBuf>,
}

impl DocumentIndex {
    /// Opens (or rebuilds) the cache file at `path`
    pub fn open(path: &Path) -> IndexResult<Self> {
        let conn = store::open(path)?;
        let path_str = path.display().to_string();
        Logger::trace("INDEX_OPENED", &[("path", path_str.as_str())]);
        Ok(Self {
            conn,
            path: Some(path.to_path_buf()),
        })
    }

    /// Opens a throwaway in-memory index
    pub fn open_in_memory() -> IndexResult<Self> {
        Ok(Self {
            conn: store::open_in_memory()?,
            path: None,
        })
    }

    /// Cache file path, `None` when in memory
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Current refresh generation
    pub fn generation(&self) -> IndexResult<i64> {
        store::generation(&self.conn)
    }

    /// Re-indexes every candidate file under `root`.
    ///
    /// Files whose (size, mtime, ctime) fingerprint is unchanged are only
    /// marked as seen. Files that fail to load are dropped from the index
    /// and counted as failed; the refresh itself carries on.
    pub fn refresh(
        &mut self,
        root: &Path,
        recursive: bool,
        loader: &dyn DocumentLoader,
    ) -> IndexResult<RefreshStats> {
        let generation = self.generation()? + 1;
        store::set_generation(&self.conn, generation)?;

        let files = discover(root, recursive, |p| loader.supports(p))?;
        let mut stats = RefreshStats {
            seen: files.len(),
            ..RefreshStats::default()
        };

        for path in &files {
            let path_str = path.to_string_lossy().into_owned();
            let fingerprint = match Fingerprint::of(path) {
                Ok(fingerprint) => fingerprint,
                Err(e) => {
                    let error = e.to_string();
                    Logger::warn(
                        "INDEX_FILE_SKIPPED",
                        &[("error", error.as_str()), ("path", path_str.as_str())],
                    );
                    stats.failed += 1;
                    continue;
                }
            };

            let tx = self.conn.transaction()?;
            let existing: Option<(i64, Fingerprint)> = tx
                .query_row(
                    "SELECT id, size, mtime, ctime FROM files WHERE path = ?1",
                    params![path_str],
                    |row| {
                        Ok((
                            row.get(0)?,
                            Fingerprint {
                                size: row.get(1)?,
                                mtime: row.get(2)?,
                                ctime: row.get(3)?,
                            },
                        ))
                    },
                )
                .optional()?;

            match existing {
                Some((id, known)) if known == fingerprint => {
                    tx.execute("UPDATE files SET seen = ?1 WHERE id = ?2", params![generation, id])?;
                    tx.commit()?;
                    stats.skipped += 1;
                    continue;
                }
                Some((id, _)) => {
                    tx.execute("DELETE FROM files WHERE id = ?1", params![id])?;
                }
                None => {}
            }

            match loader.load(path) {
                Ok(value) => {
                    tx.execute(
                        "INSERT INTO files (path, size, mtime, ctime, seen) VALUES (?1, ?2, ?3, ?4, ?5)",
                        params![
                            path_str,
                            fingerprint.size,
                            fingerprint.mtime,
                            fingerprint.ctime,
                            generation
                        ],
                    )?;
                    let file_id = tx.last_insert_rowid();
                    if let Value::Object(map) = &value {
                        let mut insert = tx.prepare_cached(
                            "INSERT INTO entries (file_id, full_path, parent_path, last_segment, value, is_leaf)
                             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                        )?;
                        insert_entries(&mut insert, file_id, None, map)?;
                    }
                    stats.reparsed += 1;
                }
                Err(e) => {
                    let error = e.to_string();
                    Logger::warn(
                        "INDEX_FILE_SKIPPED",
                        &[
                            ("code", e.code()),
                            ("error", error.as_str()),
                            ("path", path_str.as_str()),
                        ],
                    );
                    stats.failed += 1;
                }
            }
            tx.commit()?;
        }

        let generation_str = generation.to_string();
        let seen = stats.seen.to_string();
        let reparsed = stats.reparsed.to_string();
        let skipped = stats.skipped.to_string();
        let failed = stats.failed.to_string();
        Logger::info(
            "INDEX_REFRESHED",
            &[
                ("failed", failed.as_str()),
                ("generation", generation_str.as_str()),
                ("reparsed", reparsed.as_str()),
                ("seen", seen.as_str()),
                ("skipped", skipped.as_str()),
            ],
        );
        Ok(stats)
    }

    /// Deletes files not seen by the current generation. Returns the count.
    pub fn drop_stale(&mut self) -> IndexResult<usize> {
        let tx = self.conn.transaction()?;
        let generation = store::generation(&tx)?;
        let removed = tx.execute("DELETE FROM files WHERE seen != ?1", params![generation])?;
        tx.commit()?;

        let removed_str = removed.to_string();
        Logger::info("INDEX_STALE_DROPPED", &[("removed", removed_str.as_str())]);
        Ok(removed)
    }

    /// Runs a conjunctive query, see `query` module docs.
    pub fn query(&self, fields: &[Field], filters: &[Filter]) -> IndexResult<Vec<Row>> {
        let (sql, params) = build_sql(fields, filters)?;
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(params.iter()), |row| {
            let mut cells = Vec::with_capacity(fields.len());
            for (i, field) in fields.iter().enumerate() {
                let cell = match field {
                    Field::IsLeaf => CellValue::Bool(row.get::<_, i64>(i)? != 0),
                    _ => match row.get::<_, Option<String>>(i)? {
                        Some(text) => CellValue::Text(text),
                        None => CellValue::Null,
                    },
                };
                cells.push(cell);
            }
            Ok(cells)
        })?;

        let mut result = Vec::new();
        for row in rows {
            result.push(row?);
        }
        Ok(result)
    }

    /// Number of indexed files
    pub fn file_count(&self) -> IndexResult<usize> {
        self.count("SELECT COUNT(*) FROM files")
    }

    /// Number of indexed entries
    pub fn entry_count(&self) -> IndexResult<usize> {
        self.count("SELECT COUNT(*) FROM entries")
    }

    fn count(&self, sql: &str) -> IndexResult<usize> {
        let count: i64 = self.conn.query_row(sql, [], |row| row.get(0))?;
        usize::try_from(count).map_err(|_| IndexError::store_failed("negative row count"))
    }
}

/// Inserts one row per node in depth-first pre-order.
fn insert_entries(
    insert: &mut Statement<'_>,
    file_id: i64,
    parent: Option<&str>,
    map: &Map<String, Value>,
) -> IndexResult<()> {
    for (key, child) in map {
        let full_path = match parent {
            Some(parent) => format!("{}{}{}", parent, PATH_SEPARATOR, key),
            None => key.clone(),
        };
        match child {
            Value::Object(inner) => {
                insert.execute(params![file_id, full_path, parent, key, Option::<String>::None, false])?;
                insert_entries(insert, file_id, Some(&full_path), inner)?;
            }
            leaf => {
                insert.execute(params![file_id, full_path, parent, key, leaf_text(leaf), true])?;
            }
        }
    }
    Ok(())
}

/// String form of a leaf: strings verbatim, everything else as JSON text
pub fn leaf_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{DocumentError, DocumentResult};
    use serde_json::json;
    use std::cell::RefCell;
    use std::collections::HashMap;
    use tempfile::TempDir;

    /// Loader over in-memory values keyed by file name, counting loads
    struct FakeLoader {
        values: HashMap<String, Value>,
        loads: RefCell<Vec<String>>,
    }

    impl FakeLoader {
        fn new(values: &[(&str, Value)]) -> Self {
            Self {
                values: values
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.clone()))
                    .collect(),
                loads: RefCell::new(Vec::new()),
            }
        }
    }

    impl DocumentLoader for FakeLoader {
        fn load(&self, path: &Path) -> DocumentResult<Value> {
            let name = path.file_name().unwrap().to_string_lossy().into_owned();
            self.loads.borrow_mut().push(name.clone());
            self.values.get(&name).cloned().ok_or(DocumentError::Parse {
                path: name,
                reason: "unparseable".into(),
            })
        }

        fn supports(&self, path: &Path) -> bool {
            path.extension().map_or(false, |e| e == "json")
        }
    }

    fn fixture(names: &[&str]) -> TempDir {
        let tmp = TempDir::new().unwrap();
        for name in names {
            std::fs::write(tmp.path().join(name), "{}").unwrap();
        }
        tmp
    }

    fn texts(rows: &[Row]) -> Vec<String> {
        rows.iter()
            .map(|row| row.iter().map(|c| c.to_string()).collect::<Vec<_>>().join("|"))
            .collect()
    }

    #[test]
    fn test_fingerprint_values_clamp() {
        assert_eq!(saturating_i64(42u64), 42);
        assert_eq!(saturating_i64(u64::MAX), i64::MAX);
        assert_eq!(saturating_i64(u128::MAX), i64::MAX);
    }

    #[test]
    fn test_entries_flattened_depth_first() {
        let tmp = fixture(&["a.json"]);
        let loader = FakeLoader::new(&[("a.json", json!({"x": {"y": 1, "z": "s"}, "w": [1, 2]}))]);
        let mut index = DocumentIndex::open_in_memory().unwrap();
        index.refresh(tmp.path(), false, &loader).unwrap();

        assert_eq!(index.entry_count().unwrap(), 4);
        let rows = index
            .query(
                &[Field::FullPath, Field::Value, Field::IsLeaf],
                &[Filter::children(["x"])],
            )
            .unwrap();
        assert_eq!(texts(&rows), vec!["x.y|1|true", "x.z|s|true"]);

        let rows = index
            .query(&[Field::Key, Field::IsLeaf], &[Filter::children(Vec::<String>::new())])
            .unwrap();
        assert_eq!(texts(&rows), vec!["w|true", "x|false"]);

        let rows = index.query(&[Field::Value], &[Filter::present(["w"])]).unwrap();
        assert_eq!(texts(&rows), vec!["[1,2]"]);
    }

    #[test]
    fn test_unchanged_files_not_reparsed() {
        let tmp = fixture(&["a.json", "b.json"]);
        let loader = FakeLoader::new(&[("a.json", json!({"k": 1})), ("b.json", json!({"k": 2}))]);
        let mut index = DocumentIndex::open_in_memory().unwrap();

        let first = index.refresh(tmp.path(), false, &loader).unwrap();
        assert_eq!(first.reparsed, 2);
        let second = index.refresh(tmp.path(), false, &loader).unwrap();
        assert_eq!(second.skipped, 2);
        assert_eq!(second.reparsed, 0);

        assert_eq!(*loader.loads.borrow(), vec!["a.json", "b.json"]);
    }

    #[test]
    fn test_parse_failure_is_skipped() {
        let tmp = fixture(&["good.json", "bad.json"]);
        let loader = FakeLoader::new(&[("good.json", json!({"k": 1}))]);
        let mut index = DocumentIndex::open_in_memory().unwrap();

        let stats = index.refresh(tmp.path(), false, &loader).unwrap();
        assert_eq!(stats, RefreshStats { seen: 2, reparsed: 1, skipped: 0, failed: 1 });
        assert_eq!(index.file_count().unwrap(), 1);
    }

    #[test]
    fn test_changed_file_replaces_entries() {
        let tmp = fixture(&["a.json"]);
        let mut index = DocumentIndex::open_in_memory().unwrap();
        index
            .refresh(tmp.path(), false, &FakeLoader::new(&[("a.json", json!({"old": 1}))]))
            .unwrap();

        std::fs::write(tmp.path().join("a.json"), "{\"changed\": true}").unwrap();
        let stats = index
            .refresh(tmp.path(), false, &FakeLoader::new(&[("a.json", json!({"new": 1}))]))
            .unwrap();
        assert_eq!(stats.reparsed, 1);

        let rows = index.query(&[Field::Key], &[Filter::children(Vec::<String>::new())]).unwrap();
        assert_eq!(texts(&rows), vec!["new"]);
    }

    #[test]
    fn test_drop_stale_removes_missing_files() {
        let tmp = fixture(&["a.json", "b.json"]);
        let loader = FakeLoader::new(&[("a.json", json!({"k": 1})), ("b.json", json!({"k": 2}))]);
        let mut index = DocumentIndex::open_in_memory().unwrap();
        index.refresh(tmp.path(), false, &loader).unwrap();

        std::fs::remove_file(tmp.path().join("b.json")).unwrap();
        index.refresh(tmp.path(), false, &loader).unwrap();
        assert_eq!(index.drop_stale().unwrap(), 1);
        assert_eq!(index.file_count().unwrap(), 1);
        assert_eq!(index.entry_count().unwrap(), 1);
    }

    #[test]
    fn test_conjunctive_query() {
        let tmp = fixture(&["a.json", "b.json"]);
        let loader = FakeLoader::new(&[
            ("a.json", json!({"x": {"y": 1}, "tag": "red"})),
            ("b.json", json!({"x": {"y": 2}, "tag": "red"})),
        ]);
        let mut index = DocumentIndex::open_in_memory().unwrap();
        index.refresh(tmp.path(), false, &loader).unwrap();

        let rows = index
            .query(&[Field::Path], &[Filter::equals(["x", "y"], "1")])
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert!(rows[0][0].as_text().unwrap().ends_with("a.json"));

        let rows = index
            .query(
                &[Field::Path],
                &[Filter::equals(["x", "y"], "1"), Filter::equals(["x", "y"], "2")],
            )
            .unwrap();
        assert!(rows.is_empty());

        let rows = index
            .query(
                &[Field::Value],
                &[Filter::equals(["tag"], "red"), Filter::present(["x", "y"])],
            )
            .unwrap();
        assert_eq!(texts(&rows), vec!["1", "2"]);
    }

    #[test]
    fn test_persisted_index_survives_reopen() {
        let docs = fixture(&["a.json"]);
        let cache = TempDir::new().unwrap();
        let cache_path = cache.path().join("browse-cache");
        let loader = FakeLoader::new(&[("a.json", json!({"k": 1}))]);

        {
            let mut index = DocumentIndex::open(&cache_path).unwrap();
            index.refresh(docs.path(), false, &loader).unwrap();
        }
        let mut index = DocumentIndex::open(&cache_path).unwrap();
        assert_eq!(index.file_count().unwrap(), 1);
        let stats = index.refresh(docs.path(), false, &loader).unwrap();
        assert_eq!(stats.skipped, 1);
        assert_eq!(loader.loads.borrow().len(), 1);
    }

    #[test]
    fn test_leaf_text() {
        assert_eq!(leaf_text(&json!("plain")), "plain");
        assert_eq!(leaf_text(&json!(1.5)), "1.5");
        assert_eq!(leaf_text(&json!(null)), "null");
        assert_eq!(leaf_text(&json!(false)), "false");
    }
}
