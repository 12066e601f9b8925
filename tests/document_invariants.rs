//! Document Invariant Tests
//!
//! - Branch access is memoized and shares backing data
//! - Writes validate the touched node and every ancestor
//! - Structural replacements are refused
//! - Hash records detect tampering and survive a write/reload cycle
//! - Schemas are resolved from a schema directory

use std::fs;

use hods::document::{
    backup_path, Child, DataTree, Document, DocumentError, HashCheck, JsonSerializer, NodeId,
    DATA_SECTION,
};
use hods::hash::{struct_hash, HashAlgorithm};
use hods::schema::{DirectoryResolver, SchemaRegistry};
use serde_json::{json, Value};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn schema_dir(tmp: &TempDir) -> DirectoryResolver {
    let dir = tmp.path().join("schemas");
    fs::create_dir_all(&dir).unwrap();
    fs::write(
        dir.join("track-v1.json"),
        json!({
            "type": "object",
            "properties": {"title": {"type": "string"}, "length": {"type": "integer"}},
            "required": ["title"]
        })
        .to_string(),
    )
    .unwrap();
    DirectoryResolver::new(dir)
}

fn track_document() -> Value {
    json!({
        "info": {
            "version": "",
            "schema": {"track": "https://hods.ml/schemas/track-v1.json"},
            "hashes": {}
        },
        "track": {"title": "So What", "length": 562}
    })
}

fn read_json(path: &std::path::Path) -> Value {
    serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
}

// =============================================================================
// Tree Navigation Tests
// =============================================================================

/// Repeated access to a branch yields the same node.
#[test]
fn test_branch_access_is_memoized() {
    let mut tree = DataTree::new(json!({"a": {"b": {"c": 1}}}), None).unwrap();

    let first = tree.get_path(&["a", "b"]).unwrap().branch().unwrap();
    let second = tree.get_path(&["a", "b"]).unwrap().branch().unwrap();
    assert_eq!(first, second);

    tree.set(first, "d", json!(2)).unwrap();
    assert_eq!(tree.data()["a"]["b"]["d"], json!(2));
    assert_eq!(tree.get(first, "c").unwrap(), Child::Leaf(&json!(1)));
}

/// Missing keys and non-mapping roots are rejected.
#[test]
fn test_missing_key_and_scalar_root() {
    let mut tree = DataTree::new(json!({"a": 1}), None).unwrap();
    let err = tree.get(NodeId::ROOT, "b").unwrap_err();
    assert!(matches!(err, DocumentError::NotFound { .. }));

    assert!(DataTree::new(json!([1, 2]), None).is_err());
}

/// Branches are never replaced, leaves never become branches.
#[test]
fn test_structural_replacement_refused() {
    let mut tree = DataTree::new(json!({"a": {"b": 1}, "c": 2}), None).unwrap();

    for (key, value) in [("a", json!({})), ("a", json!(3)), ("c", json!({"x": 1}))] {
        let err = tree.set(NodeId::ROOT, key, value).unwrap_err();
        assert!(matches!(err, DocumentError::StructuralConflict(_)));
    }
    assert_eq!(tree.data(), &json!({"a": {"b": 1}, "c": 2}));

    tree.set(NodeId::ROOT, "c", json!([1, 2])).unwrap();
    assert_eq!(tree.data()["c"], json!([1, 2]));
}

// =============================================================================
// Validation Tests
// =============================================================================

/// A write below a section is checked against the section schema.
#[test]
fn test_nested_write_validated_against_section() {
    let tmp = TempDir::new().unwrap();
    let resolver = schema_dir(&tmp);
    let mut doc = Document::from_value(track_document(), &resolver).unwrap();

    let track = doc.section("track").unwrap();
    doc.set(track, "length", json!(600)).unwrap();

    let err = doc.set(track, "length", json!("ten minutes")).unwrap_err();
    assert!(err.is_validation());
    // the rejected write stays in place
    assert_eq!(doc.data()["track"]["length"], json!("ten minutes"));
    assert!(doc.validate().is_err());
}

/// A document whose section violates its schema is not constructed.
#[test]
fn test_invalid_section_refused_on_load() {
    let tmp = TempDir::new().unwrap();
    let resolver = schema_dir(&tmp);
    let path = tmp.path().join("bad.json");
    let mut value = track_document();
    value["track"] = json!({"length": 1});
    fs::write(&path, value.to_string()).unwrap();

    let err = Document::load(&path, &JsonSerializer, &resolver).unwrap_err();
    assert!(err.is_validation());
}

/// An unresolvable schema fails construction without being a violation.
#[test]
fn test_unknown_schema_file() {
    let tmp = TempDir::new().unwrap();
    let resolver = schema_dir(&tmp);
    let mut value = track_document();
    value["info"]["schema"]["track"] = json!("missing-v9.json");

    let err = Document::from_value(value, &resolver).unwrap_err();
    assert!(matches!(err, DocumentError::Validation(_)));
    assert_eq!(err.code(), "HODS_UNKNOWN_SCHEMA");
    assert!(!err.is_validation());
}

// =============================================================================
// Hash Record Tests
// =============================================================================

/// Recorded digests are canonical hashes of the section.
#[test]
fn test_recorded_digest_is_canonical_hash() {
    let registry = SchemaRegistry::new();
    let mut doc = Document::from_payload(json!({"b": 2, "a": [1, "x"]})).unwrap();
    doc.validate_hashes(&HashCheck::update().with_sections(vec![DATA_SECTION.to_string()]))
        .unwrap();

    let record = doc.hash_record(DATA_SECTION).unwrap().unwrap();
    let same_content = json!({"a": [1, "x"], "b": 2});
    assert_eq!(
        record["sha256"],
        json!(struct_hash(&same_content, HashAlgorithm::Sha256))
    );
    assert!(record.contains_key("timestamp"));

    let reparsed = Document::from_value(doc.data().clone(), &registry).unwrap();
    assert_eq!(reparsed.recorded_sections().unwrap(), vec![DATA_SECTION]);
}

/// Written documents verify after reload; edits on disk are detected.
#[test]
fn test_write_reload_and_tamper() {
    let tmp = TempDir::new().unwrap();
    let resolver = schema_dir(&tmp);
    let path = tmp.path().join("track.json");

    let mut doc = Document::from_value(track_document(), &resolver).unwrap();
    doc.validate_hashes(&HashCheck::update().with_sections(vec!["track".to_string()]))
        .unwrap();
    doc.write(Some(&path), &JsonSerializer, ".hods~").unwrap();
    assert!(!backup_path(&path, ".hods~").exists());

    let mut reloaded = Document::load(&path, &JsonSerializer, &resolver).unwrap();
    assert!(reloaded.validate_hashes(&HashCheck::verify()).unwrap().is_empty());

    let mut value = read_json(&path);
    value["track"]["title"] = json!("Freddie Freeloader");
    fs::write(&path, value.to_string()).unwrap();

    let mut tampered = Document::load(&path, &JsonSerializer, &resolver).unwrap();
    let err = tampered.validate_hashes(&HashCheck::verify()).unwrap_err();
    assert_eq!(err.code(), "HODS_HASH_MISMATCH");
}

/// Overwriting an existing file leaves no backup behind.
#[test]
fn test_overwrite_keeps_no_backup() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("data.json");
    fs::write(&path, "{}").unwrap();

    let mut doc = Document::from_payload(json!({"k": "v"})).unwrap();
    doc.validate_hashes(&HashCheck::update().with_sections(vec![DATA_SECTION.to_string()]))
        .unwrap();
    doc.write(Some(&path), &JsonSerializer, ".hods~").unwrap();

    assert_eq!(read_json(&path)["data"], json!({"k": "v"}));
    assert!(!backup_path(&path, ".hods~").exists());
}
