//! Supported digest algorithms

use std::fmt;
use std::str::FromStr;

use md5::Md5;
use sha2::{Digest, Sha256};

/// Digest algorithm used in hash records.
///
/// Names match the keys stored in `info.hashes.<section>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum HashAlgorithm {
    /// Legacy only, never the sole integrity guarantee
    Md5,
    /// Required integrity algorithm
    Sha256,
}

impl HashAlgorithm {
    /// Returns the record key for this algorithm
    pub fn name(&self) -> &'static str {
        match self {
            HashAlgorithm::Md5 => "md5",
            HashAlgorithm::Sha256 => "sha256",
        }
    }

    /// Digest raw bytes and return lowercase hex
    pub fn hex_digest(&self, bytes: &[u8]) -> String {
        match self {
            HashAlgorithm::Md5 => format!("{:x}", Md5::digest(bytes)),
            HashAlgorithm::Sha256 => format!("{:x}", Sha256::digest(bytes)),
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Algorithm name not recognized
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownAlgorithm(pub String);

impl fmt::Display for UnknownAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown hash algorithm: {}", self.0)
    }
}

impl std::error::Error for UnknownAlgorithm {}

impl FromStr for HashAlgorithm {
    type Err = UnknownAlgorithm;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "md5" => Ok(HashAlgorithm::Md5),
            "sha256" => Ok(HashAlgorithm::Sha256),
            other => Err(UnknownAlgorithm(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_roundtrip() {
        for algo in [HashAlgorithm::Md5, HashAlgorithm::Sha256] {
            assert_eq!(algo.name().parse::<HashAlgorithm>(), Ok(algo));
        }
    }

    #[test]
    fn test_unknown_name_rejected() {
        let err = "sha1".parse::<HashAlgorithm>().unwrap_err();
        assert_eq!(err.0, "sha1");
        assert!(err.to_string().contains("sha1"));
    }
}
