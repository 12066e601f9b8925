//! Per-section hash records
//!
//! A record lives at `info.hashes.<section>` and maps algorithm names to
//! lowercase hex digests, plus a `timestamp` key holding the time of the
//! last digest change. The record itself sits outside the section it
//! protects, so it never feeds into its own digest.

use std::collections::BTreeSet;

use chrono::Local;
use serde_json::{Map, Value};

use super::errors::DocumentResult;
use crate::hash::HashAlgorithm;

/// Key holding the last-update time inside a hash record
pub const TIMESTAMP_KEY: &str = "timestamp";

/// Parameters of one `Document::validate_hashes` run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashCheck {
    /// Overwrite stale or missing digests instead of failing
    pub write_updates: bool,
    /// Sections to check; empty means every section with a record
    pub sections: Vec<String>,
    /// Algorithms checked in addition to those already recorded
    pub required: Vec<HashAlgorithm>,
}

impl HashCheck {
    /// Read-only verification of every recorded section
    pub fn verify() -> Self {
        Self {
            write_updates: false,
            sections: Vec::new(),
            required: vec![HashAlgorithm::Sha256],
        }
    }

    /// Verification that rewrites stale digests
    pub fn update() -> Self {
        Self {
            write_updates: true,
            ..Self::verify()
        }
    }

    /// Restricts the check to the given sections
    pub fn with_sections<I, S>(mut self, sections: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.sections = sections.into_iter().map(Into::into).collect();
        self
    }

    /// Replaces the required algorithm set
    pub fn with_required(mut self, required: Vec<HashAlgorithm>) -> Self {
        self.required = required;
        self
    }

    /// Algorithms to evaluate for one record.
    ///
    /// SHA-256 is always part of an updating run so MD5 is never the only
    /// digest written.
    pub(crate) fn algorithms(&self, record: Option<&Map<String, Value>>) -> DocumentResult<BTreeSet<HashAlgorithm>> {
        let mut algorithms: BTreeSet<HashAlgorithm> = self.required.iter().copied().collect();
        if self.write_updates {
            algorithms.insert(HashAlgorithm::Sha256);
        }
        if let Some(record) = record {
            for key in record.keys().filter(|k| k.as_str() != TIMESTAMP_KEY) {
                algorithms.insert(key.parse()?);
            }
        }
        Ok(algorithms)
    }
}

impl Default for HashCheck {
    fn default() -> Self {
        Self::verify()
    }
}

/// One digest written by an updating hash check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashUpdate {
    /// Section whose record changed
    pub section: String,
    /// Algorithm of the new digest
    pub algorithm: HashAlgorithm,
    /// Previously recorded digest, if any
    pub previous: Option<String>,
    /// New digest
    pub digest: String,
}

/// Local time with UTC offset, second precision (`2024-05-01T12:30:00+02:00`).
pub fn timestamp() -> String {
    Local::now().format("%Y-%m-%dT%H:%M:%S%:z").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_timestamp_format() {
        let ts = timestamp();
        assert_eq!(ts.len(), "2024-05-01T12:30:00+02:00".len());
        assert_eq!(&ts[10..11], "T");
        assert!(chrono::DateTime::parse_from_rfc3339(&ts).is_ok());
    }

    #[test]
    fn test_algorithms_union() {
        let record = json!({"md5": "x", "timestamp": "t"});
        let algos = HashCheck::verify()
            .algorithms(record.as_object())
            .unwrap();
        assert_eq!(
            algos.into_iter().collect::<Vec<_>>(),
            vec![HashAlgorithm::Md5, HashAlgorithm::Sha256]
        );
    }

    #[test]
    fn test_update_always_includes_sha256() {
        let algos = HashCheck::update()
            .with_required(vec![HashAlgorithm::Md5])
            .algorithms(None)
            .unwrap();
        assert!(algos.contains(&HashAlgorithm::Sha256));
        assert!(algos.contains(&HashAlgorithm::Md5));
    }

    #[test]
    fn test_unknown_recorded_algorithm() {
        let record = json!({"crc32": "x"});
        let err = HashCheck::verify().algorithms(record.as_object()).unwrap_err();
        assert_eq!(err.code(), "HODS_UNKNOWN_ALGORITHM");
    }
}
