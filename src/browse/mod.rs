//! Interactive browsing of an indexed document collection
//!
//! A `BrowseSession` turns navigation commands into conjunctive index
//! queries; `Shell` is its line-oriented front end.

mod errors;
mod session;
mod shell;
mod storage;

pub use errors::{BrowseError, BrowseResult};
pub use session::{BrowseSession, Listing, ListingMode, PathItem, PARENT_STEP};
pub use shell::{Command, Flow, Shell, INTRO, PROMPT};
pub use storage::{cache_file, cache_name, CACHE_APP_DIR};
