//! Cache file location per browse target

use std::fs;
use std::path::{Path, PathBuf};

use super::errors::{BrowseError, BrowseResult};
use crate::hash::HashAlgorithm;

/// Application directory under the user cache dir
pub const CACHE_APP_DIR: &str = "hods";

/// Cache file name for a target: `browse-<md5 hex of the absolute path>`.
pub fn cache_name(target: &Path) -> String {
    let absolute = fs::canonicalize(target).unwrap_or_else(|_| target.to_path_buf());
    let digest = HashAlgorithm::Md5.hex_digest(absolute.to_string_lossy().as_bytes());
    format!("browse-{}", digest)
}

/// Cache file for a target inside `cache_dir`, or the user cache dir when `None`.
pub fn cache_file(cache_dir: Option<&Path>, target: &Path) -> BrowseResult<PathBuf> {
    let base = match cache_dir {
        Some(dir) => dir.to_path_buf(),
        None => dirs::cache_dir()
            .ok_or(BrowseError::NoCacheDir)?
            .join(CACHE_APP_DIR),
    };
    Ok(base.join(cache_name(target)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_cache_name_shape() {
        let tmp = TempDir::new().unwrap();
        let name = cache_name(tmp.path());
        assert!(name.starts_with("browse-"));
        assert_eq!(name.len(), "browse-".len() + 32);
        assert!(name["browse-".len()..].chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_distinct_targets_distinct_files() {
        let a = TempDir::new().unwrap();
        let b = TempDir::new().unwrap();
        assert_ne!(cache_name(a.path()), cache_name(b.path()));
        assert_eq!(cache_name(a.path()), cache_name(a.path()));
    }

    #[test]
    fn test_explicit_cache_dir() {
        let tmp = TempDir::new().unwrap();
        let file = cache_file(Some(tmp.path()), Path::new(".")).unwrap();
        assert_eq!(file.parent(), Some(tmp.path()));
    }
}
