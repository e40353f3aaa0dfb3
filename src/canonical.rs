//! Canonical serialization for deterministic hashing.
//!
//! Topology snapshots, extraction reports and configuration hashes are all
//! computed through this module so the same input always gives the same hex
//! digest.
//!
//! ## Determinism Guarantees
//!
//! - Stable field order: Struct fields serialize in declaration order
//! - Stable Vec order: Vectors serialize in index order
//! - No HashMap allowed: Use IndexMap or BTreeMap for maps in hashed data
//! - No raw floats: quantize with [`quantize`] before hashing

use serde::Serialize;
use xxhash_rust::xxh64::xxh64;

/// Quantization factor applied to floats before hashing.
pub const FLOAT_QUANTIZATION_FACTOR: f64 = 1_000_000.0;

/// Quantize a float to an integer (1e-6 precision).
pub fn quantize(value: f64) -> i64 {
    (value * FLOAT_QUANTIZATION_FACTOR).round() as i64
}

/// Serialize a value to canonical JSON bytes for hashing.
pub fn to_canonical_bytes<T: Serialize>(value: &T) -> Result<Vec<u8>, serde_json::Error> {
    serde_json::to_vec(value)
}

/// Compute canonical hash of a serializable value.
pub fn canonical_hash<T: Serialize>(value: &T) -> Result<u64, serde_json::Error> {
    let bytes = to_canonical_bytes(value)?;
    Ok(xxh64(&bytes, 0))
}

/// Compute canonical hash and return as hex string.
pub fn canonical_hash_hex<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    Ok(format!("{:016x}", canonical_hash(value)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize)]
    struct TestStruct {
        name: String,
        value: i64,
    }

    #[test]
    fn test_determinism() {
        let s = TestStruct {
            name: "PortalVein".to_string(),
            value: quantize(0.5),
        };

        let h1 = canonical_hash(&s).unwrap();
        let h2 = canonical_hash(&s).unwrap();
        assert_eq!(h1, h2);
        assert_eq!(canonical_hash_hex(&s).unwrap().len(), 16);
    }

    #[test]
    fn test_quantize() {
        assert_eq!(quantize(1.2), 1_200_000);
        assert_eq!(quantize(0.1 + 0.2), quantize(0.3));
    }
}
