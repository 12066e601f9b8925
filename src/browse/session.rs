//! Browse session state machine
//!
//! The session keeps a stack of AND-groups. Each group is a navigation path
//! of `(step, is_leaf)` items; the last group is the active one. Listing
//! turns every group into one index filter, so the files listed are those
//! matching all groups, and the active group decides what is projected:
//!
//! | last two steps     | filter                  | listing        |
//! |--------------------|-------------------------|----------------|
//! | (leaf, leaf)       | `Equals(path[..-1], v)` | file paths     |
//! | (_, leaf)          | `Present(path)`         | values         |
//! | otherwise          | `Children(path)`        | keys           |

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use super::errors::{BrowseError, BrowseResult};
use crate::index::{CellValue, DocumentIndex, DocumentLoader, Field, Filter, RefreshStats};
use crate::observability::Logger;

/// Alias of `ascend` accepted by `descend`
pub const PARENT_STEP: &str = "..";

/// One navigation step
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PathItem {
    /// Key, value or file path, as listed
    pub step: String,
    /// Whether the step names a leaf (values and paths always do)
    pub is_leaf: bool,
}

/// What a listing shows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListingMode {
    /// Keys below the current branch
    Keys,
    /// Values of the current leaf
    Values,
    /// Files holding the current leaf value
    Paths,
}

/// Result of `list_children`, items in index order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Listing {
    /// What the items are
    pub mode: ListingMode,
    /// Listed steps, deduplicated
    pub items: Vec<PathItem>,
}

impl Listing {
    /// Looks up an item by step
    pub fn find(&self, step: &str) -> Option<&PathItem> {
        self.items.iter().find(|item| item.step == step)
    }

    /// Item steps in order
    pub fn steps(&self) -> Vec<&str> {
        self.items.iter().map(|item| item.step.as_str()).collect()
    }
}

/// Interactive navigation over a `DocumentIndex`.
pub struct BrowseSession<'a> {
    index: DocumentIndex,
    loader: &'a dyn DocumentLoader,
    root: PathBuf,
    recursive: bool,
    /// AND-groups, the last one is active; never empty
    groups: Vec<Vec<PathItem>>,
    /// Listings by full groups state, cleared on refresh
    listings: HashMap<Vec<Vec<PathItem>>, Rc<Listing>>,
}

impl<'a> BrowseSession<'a> {
    /// Creates a session and brings the index up to date with `root`.
    pub fn open(
        index: DocumentIndex,
        loader: &'a dyn DocumentLoader,
        root: &Path,
        recursive: bool,
    ) -> BrowseResult<Self> {
        let mut session = Self {
            index,
            loader,
            root: root.to_path_buf(),
            recursive,
            groups: vec![Vec::new()],
            listings: HashMap::new(),
        };
        session.refresh()?;
        Ok(session)
    }

    /// Re-indexes the browse root, drops stale files and clears cached listings.
    pub fn refresh(&mut self) -> BrowseResult<RefreshStats> {
        let stats = self.index.refresh(&self.root, self.recursive, self.loader)?;
        let removed = self.index.drop_stale()?;
        self.listings.clear();

        let removed_str = removed.to_string();
        let root_str = self.root.display().to_string();
        Logger::info(
            "SESSION_REFRESHED",
            &[("removed", removed_str.as_str()), ("root", root_str.as_str())],
        );
        Ok(stats)
    }

    /// Steps into a child of the current position.
    ///
    /// `..` ascends. The step must be a child of the active group's own
    /// position; other groups only narrow what `list_children` shows, so a
    /// combination matching no file is a valid, empty position. Refuses
    /// without changing state when the step is unknown or the position is
    /// already a value below a leaf.
    pub fn descend(&mut self, step: &str) -> BrowseResult<()> {
        if step == PARENT_STEP {
            self.ascend();
            return Ok(());
        }
        if leaf_flags(self.active()) == [true, true] {
            return Err(BrowseError::TooDeep);
        }

        let items = self.query_items(&[group_filter(self.active())], listing_mode(self.active()))?;
        let item = items
            .into_iter()
            .find(|item| item.step == step)
            .ok_or_else(|| BrowseError::UnknownStep(step.to_string()))?;
        self.active_mut().push(item);
        Ok(())
    }

    /// Steps out of the current position; no-op at the top.
    pub fn ascend(&mut self) {
        self.active_mut().pop();
    }

    /// Freezes the active group and continues from a copy of it.
    pub fn new_group(&mut self) {
        let copy = self.active().to_vec();
        self.groups.push(copy);
    }

    /// Lists what lies below the current position under all groups' filters.
    pub fn list_children(&mut self) -> BrowseResult<Rc<Listing>> {
        if let Some(listing) = self.listings.get(&self.groups) {
            return Ok(Rc::clone(listing));
        }

        let filters: Vec<Filter> = self.groups.iter().map(|group| group_filter(group)).collect();
        let mode = listing_mode(self.active());
        let items = self.query_items(&filters, mode)?;

        let listing = Rc::new(Listing { mode, items });
        self.listings.insert(self.groups.clone(), Rc::clone(&listing));
        Ok(listing)
    }

    /// `/` followed by the active group's steps joined by `/`
    pub fn current_path(&self) -> String {
        let steps: Vec<&str> = self.active().iter().map(|item| item.step.as_str()).collect();
        format!("/{}", steps.join("/"))
    }

    /// Number of AND-groups, including the active one
    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    /// Number of cached listings
    pub fn cached_listings(&self) -> usize {
        self.listings.len()
    }

    /// Underlying index
    pub fn index(&self) -> &DocumentIndex {
        &self.index
    }

    /// Runs `filters` and projects the steps `mode` lists, deduplicated.
    fn query_items(&self, filters: &[Filter], mode: ListingMode) -> BrowseResult<Vec<PathItem>> {
        let field = match mode {
            ListingMode::Keys => Field::Key,
            ListingMode::Values => Field::Value,
            ListingMode::Paths => Field::Path,
        };

        let rows = self.index.query(&[field, Field::IsLeaf], filters)?;
        let mut items: Vec<PathItem> = Vec::with_capacity(rows.len());
        for row in rows {
            let step = match row.first() {
                Some(CellValue::Text(text)) => text.clone(),
                _ => continue,
            };
            let is_leaf = mode != ListingMode::Keys || matches!(row.get(1), Some(CellValue::Bool(true)));
            // a key that is a branch in one file and a leaf in another is listed once
            if items.iter().any(|item| item.step == step) {
                continue;
            }
            items.push(PathItem { step, is_leaf });
        }
        Ok(items)
    }

    fn active(&self) -> &[PathItem] {
        self.groups.last().map(Vec::as_slice).unwrap_or(&[])
    }

    fn active_mut(&mut self) -> &mut Vec<PathItem> {
        if self.groups.is_empty() {
            self.groups.push(Vec::new());
        }
        let last = self.groups.len() - 1;
        &mut self.groups[last]
    }
}

/// Leaf flags of the last two items
fn leaf_flags(path: &[PathItem]) -> Vec<bool> {
    let start = path.len().saturating_sub(2);
    path[start..].iter().map(|item| item.is_leaf).collect()
}

fn listing_mode(path: &[PathItem]) -> ListingMode {
    match leaf_flags(path).as_slice() {
        [true, true] => ListingMode::Paths,
        [.., true] => ListingMode::Values,
        _ => ListingMode::Keys,
    }
}

fn group_filter(path: &[PathItem]) -> Filter {
    let steps = path.iter().map(|item| item.step.clone());
    match listing_mode(path) {
        ListingMode::Paths => {
            let (value, keys) = match path.split_last() {
                Some((value, keys)) => (value.step.clone(), keys),
                None => (String::new(), path),
            };
            Filter::equals(keys.iter().map(|item| item.step.clone()), value)
        }
        ListingMode::Values => Filter::present(steps),
        ListingMode::Keys => Filter::children(steps),
    }
}
