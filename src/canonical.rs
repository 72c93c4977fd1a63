//! Canonical serialization for deterministic hashing.
//!
//! Used to fingerprint parsed tables of contents so a reload can be compared
//! against what was cached.
//!
//! ## Determinism Guarantees
//!
//! - Stable field order: Struct fields serialize in declaration order
//! - Stable Vec order: Vectors serialize in index order
//! - No HashMap allowed: Use BTreeMap (or `OrderedMap`) for maps in hashed data

use serde::Serialize;
use xxhash_rust::xxh64::xxh64;

/// Serialize a value to canonical JSON bytes for hashing.
///
/// Values that fail to serialize hash as the empty byte string.
pub fn to_canonical_bytes<T: Serialize>(value: &T) -> Vec<u8> {
    serde_json::to_vec(value).unwrap_or_default()
}

/// Compute canonical hash of a serializable value.
pub fn canonical_hash<T: Serialize>(value: &T) -> u64 {
    let bytes = to_canonical_bytes(value);
    xxh64(&bytes, 0)
}

/// Compute canonical hash and return as hex string.
pub fn canonical_hash_hex<T: Serialize>(value: &T) -> String {
    format!("{:016x}", canonical_hash(value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize)]
    struct Entry {
        text: String,
        level: u8,
    }

    #[test]
    fn test_determinism() {
        let e = Entry {
            text: "Install".to_string(),
            level: 1,
        };

        assert_eq!(canonical_hash(&e), canonical_hash(&e));
        assert_eq!(canonical_hash_hex(&e).len(), 16);
    }

    #[test]
    fn test_order_sensitive() {
        let a = vec!["Intro", "Install"];
        let b = vec!["Install", "Intro"];
        assert_ne!(canonical_hash(&a), canonical_hash(&b));
    }
}
