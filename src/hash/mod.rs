//! Canonical content hashing for structured data
//!
//! A payload is rendered to compact JSON text with object keys sorted
//! byte-wise, encoded as UTF-8 and digested. The digest is emitted as
//! lowercase hex.
//!
//! # Properties
//!
//! - Insensitive to key insertion order
//! - Sensitive to any change of value, type or key set
//! - SHA-256 is the integrity algorithm; MD5 exists for legacy records only

mod algorithm;
mod canonical;

pub use algorithm::{HashAlgorithm, UnknownAlgorithm};
pub use canonical::{canonical_json, canonical_json_bytes};

use serde_json::Value;

/// Hash a structured payload with the given algorithm.
pub fn struct_hash(data: &Value, algorithm: HashAlgorithm) -> String {
    algorithm.hex_digest(&canonical_json_bytes(data))
}

/// Hash a structured payload with SHA-256.
pub fn sha256_hash(data: &Value) -> String {
    struct_hash(data, HashAlgorithm::Sha256)
}
