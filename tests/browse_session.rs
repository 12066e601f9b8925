//! Browse Session Tests
//!
//! Navigation over two documents:
//!
//! ```text
//! a.json: {"x": {"y": 1}, "name": "first"}
//! b.json: {"x": {"y": 2}}
//! ```

use std::fs;
use std::io::Cursor;
use std::path::Path;

use hods::browse::{BrowseError, BrowseSession, ListingMode, Shell};
use hods::document::JsonSerializer;
use hods::index::{DocumentIndex, SerializedLoader};
use hods::schema::SchemaRegistry;
use serde_json::json;
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn fixture() -> TempDir {
    let tmp = TempDir::new().unwrap();
    fs::write(
        tmp.path().join("a.json"),
        json!({"x": {"y": 1}, "name": "first"}).to_string(),
    )
    .unwrap();
    fs::write(tmp.path().join("b.json"), json!({"x": {"y": 2}}).to_string()).unwrap();
    tmp
}

fn steps(session: &mut BrowseSession<'_>) -> Vec<String> {
    let listing = session.list_children().unwrap();
    listing.steps().into_iter().map(str::to_string).collect()
}

fn file(root: &Path, name: &str) -> String {
    root.join(name).display().to_string()
}

// =============================================================================
// Navigation Tests
// =============================================================================

/// Keys, then values, then the files holding a value.
#[test]
fn test_descend_to_files() {
    let tmp = fixture();
    let registry = SchemaRegistry::new();
    let loader = SerializedLoader::new(&JsonSerializer, &registry);
    let index = DocumentIndex::open_in_memory().unwrap();
    let mut session = BrowseSession::open(index, &loader, tmp.path(), true).unwrap();

    assert_eq!(steps(&mut session), vec!["name", "x"]);

    session.descend("x").unwrap();
    assert_eq!(steps(&mut session), vec!["y"]);

    session.descend("y").unwrap();
    let listing = session.list_children().unwrap();
    assert_eq!(listing.mode, ListingMode::Values);
    assert_eq!(listing.steps(), vec!["1", "2"]);

    session.descend("1").unwrap();
    assert_eq!(steps(&mut session), vec![file(tmp.path(), "a.json")]);
    assert_eq!(session.current_path(), "/x/y/1");
}

/// A frozen group narrows listings; a conflicting group lists nothing.
#[test]
fn test_new_group_intersects() {
    let tmp = fixture();
    let registry = SchemaRegistry::new();
    let loader = SerializedLoader::new(&JsonSerializer, &registry);
    let index = DocumentIndex::open_in_memory().unwrap();
    let mut session = BrowseSession::open(index, &loader, tmp.path(), true).unwrap();

    for step in ["x", "y", "1"] {
        session.descend(step).unwrap();
    }
    session.new_group();
    assert_eq!(session.group_count(), 2);

    session.ascend();
    assert_eq!(steps(&mut session), vec!["1"]);

    // the active group may pick a value the frozen group excludes
    session.descend("2").unwrap();
    assert_eq!(session.current_path(), "/x/y/2");
    let listing = session.list_children().unwrap();
    assert_eq!(listing.mode, ListingMode::Paths);
    assert!(listing.items.is_empty());

    session.ascend();
    session.ascend();
    session.ascend();
    // only a.json matches the frozen group
    assert_eq!(steps(&mut session), vec!["name", "x"]);
}

/// Steps unknown to the active group's own position are refused.
#[test]
fn test_unknown_step_refused() {
    let tmp = fixture();
    let registry = SchemaRegistry::new();
    let loader = SerializedLoader::new(&JsonSerializer, &registry);
    let index = DocumentIndex::open_in_memory().unwrap();
    let mut session = BrowseSession::open(index, &loader, tmp.path(), true).unwrap();

    session.descend("x").unwrap();
    session.descend("y").unwrap();
    let err = session.descend("3").unwrap_err();
    assert!(matches!(err, BrowseError::UnknownStep(ref s) if s == "3"));
    assert_eq!(session.current_path(), "/x/y");
}

/// No step below a value; `..` steps out; ascending at the top is a no-op.
#[test]
fn test_navigation_limits() {
    let tmp = fixture();
    let registry = SchemaRegistry::new();
    let loader = SerializedLoader::new(&JsonSerializer, &registry);
    let index = DocumentIndex::open_in_memory().unwrap();
    let mut session = BrowseSession::open(index, &loader, tmp.path(), true).unwrap();

    for step in ["x", "y", "2"] {
        session.descend(step).unwrap();
    }
    let err = session.descend("anything").unwrap_err();
    assert!(matches!(err, BrowseError::TooDeep));
    assert_eq!(err.to_string(), "cd: can not go any deeper");

    session.descend("..").unwrap();
    assert_eq!(session.current_path(), "/x/y");

    session.ascend();
    session.ascend();
    session.ascend();
    assert_eq!(session.current_path(), "/");
}

/// Listings are memoized until the next refresh, which sees new files.
#[test]
fn test_refresh_clears_listings() {
    let tmp = fixture();
    let registry = SchemaRegistry::new();
    let loader = SerializedLoader::new(&JsonSerializer, &registry);
    let index = DocumentIndex::open_in_memory().unwrap();
    let mut session = BrowseSession::open(index, &loader, tmp.path(), true).unwrap();

    steps(&mut session);
    steps(&mut session);
    assert_eq!(session.cached_listings(), 1);

    fs::write(tmp.path().join("c.json"), json!({"extra": true}).to_string()).unwrap();
    fs::remove_file(tmp.path().join("b.json")).unwrap();
    session.refresh().unwrap();
    assert_eq!(session.cached_listings(), 0);
    assert_eq!(steps(&mut session), vec!["extra", "name", "x"]);
    assert_eq!(session.index().file_count().unwrap(), 2);
}

// =============================================================================
// Shell Tests
// =============================================================================

/// A scripted shell session prints listings, paths and refusals.
#[test]
fn test_shell_script() {
    let tmp = fixture();
    let registry = SchemaRegistry::new();
    let loader = SerializedLoader::new(&JsonSerializer, &registry);
    let index = DocumentIndex::open_in_memory().unwrap();
    let mut session = BrowseSession::open(index, &loader, tmp.path(), true).unwrap();

    let input = Cursor::new("ls\ncd x\ncd nope\ncd y\nls\npwd\njump\nexit\nls\n");
    let mut output = Vec::new();
    Shell::new(&mut session, input, &mut output).run().unwrap();

    let text = String::from_utf8(output).unwrap();
    assert!(text.contains("name\nx\n"));
    assert!(text.contains("cd: can not browse 'nope'\n"));
    assert!(text.contains("1\n2\n"));
    assert!(text.contains("/x/y\n"));
    assert!(text.contains("*** Unknown syntax: jump\n"));
    // nothing after exit runs
    assert_eq!(text.matches("(hods) > ").count(), 8);
}
