//! Configuration file structure
//!
//! ```json
//! {
//!   "cache_dir": "/var/cache/hods",
//!   "schema_dir": "./schemas",
//!   "recursive": true,
//!   "backup_suffix": ".hods~",
//!   "required_algorithms": ["sha256"]
//! }
//! ```
//!
//! Every field is optional.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::errors::{CliError, CliResult};
use crate::document::DEFAULT_BACKUP_SUFFIX;
use crate::hash::HashAlgorithm;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Directory for browse caches (default: user cache dir)
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,

    /// Directory holding schema files
    #[serde(default = "default_schema_dir")]
    pub schema_dir: PathBuf,

    /// Whether browse descends into subdirectories
    #[serde(default = "default_recursive")]
    pub recursive: bool,

    /// Suffix of the backup kept while writing
    #[serde(default = "default_backup_suffix")]
    pub backup_suffix: String,

    /// Algorithms every hash check includes
    #[serde(default = "default_required_algorithms")]
    pub required_algorithms: Vec<String>,
}

fn default_schema_dir() -> PathBuf {
    PathBuf::from("schemas")
}
fn default_recursive() -> bool {
    true
}
fn default_backup_suffix() -> String {
    DEFAULT_BACKUP_SUFFIX.to_string()
}
fn default_required_algorithms() -> Vec<String> {
    vec![HashAlgorithm::Sha256.name().to_string()]
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache_dir: None,
            schema_dir: default_schema_dir(),
            recursive: default_recursive(),
            backup_suffix: default_backup_suffix(),
            required_algorithms: default_required_algorithms(),
        }
    }
}

impl Config {
    /// Load configuration from file
    pub fn load(path: &Path) -> CliResult<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| CliError::config_error(format!("Failed to read config: {}", e)))?;

        let config: Config = serde_json::from_str(&content)
            .map_err(|e| CliError::config_error(format!("Invalid config JSON: {}", e)))?;

        config.validate()?;

        Ok(config)
    }

    /// Load from `path` if given, defaults otherwise
    pub fn load_or_default(path: Option<&Path>) -> CliResult<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    fn validate(&self) -> CliResult<()> {
        if self.backup_suffix.is_empty() {
            return Err(CliError::config_error("backup_suffix must not be empty"));
        }
        if self.backup_suffix.contains(std::path::MAIN_SEPARATOR) {
            return Err(CliError::config_error(format!(
                "Invalid backup_suffix: '{}'. It must not contain a path separator.",
                self.backup_suffix
            )));
        }
        self.algorithms()?;
        Ok(())
    }

    /// Required algorithms, parsed.
    ///
    /// SHA-256 must be among them; MD5 alone is not an integrity guarantee.
    pub fn algorithms(&self) -> CliResult<Vec<HashAlgorithm>> {
        let mut algorithms = Vec::with_capacity(self.required_algorithms.len());
        for name in &self.required_algorithms {
            let algorithm = name
                .parse::<HashAlgorithm>()
                .map_err(|e| CliError::config_error(e.to_string()))?;
            algorithms.push(algorithm);
        }
        if !algorithms.contains(&HashAlgorithm::Sha256) {
            return Err(CliError::config_error(
                "required_algorithms must include sha256",
            ));
        }
        Ok(algorithms)
    }
}
