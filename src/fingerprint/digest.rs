//! Fingerprint computation
//!
//! `FilterSet` keys are already sorted and free of absent entries, so the
//! canonical form is a JSON-like object with keys in lexicographic order and
//! values rendered by [`FilterValue::canonical`].

use super::types::{FilterSet, FilterValue};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Length of every fingerprint, in hex characters
pub const FINGERPRINT_LEN: usize = 16;

/// Digest used to fingerprint a filter set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum FingerprintAlgorithm {
    /// SHA-256, truncated to the first 16 hex characters
    #[default]
    Sha256,
    /// 64-bit FNV-1a rolling hash.
    ///
    /// Deterministic but NOT collision-resistant: two different filter sets
    /// can be crafted to share a fingerprint. Only use it where SHA-256 is
    /// not available.
    Rolling,
}

/// Computes fingerprints for filter sets
#[derive(Debug, Clone, Copy, Default)]
pub struct FilterFingerprint {
    algorithm: FingerprintAlgorithm,
}

impl FilterFingerprint {
    /// Create a fingerprinter with the given algorithm
    pub fn new(algorithm: FingerprintAlgorithm) -> Self {
        Self { algorithm }
    }

    /// Create a fingerprinter using the non-cryptographic fallback
    pub fn rolling() -> Self {
        Self::new(FingerprintAlgorithm::Rolling)
    }

    /// Algorithm in use
    pub fn algorithm(&self) -> FingerprintAlgorithm {
        self.algorithm
    }

    /// Fingerprint a filter set. Always `FINGERPRINT_LEN` lowercase hex chars.
    pub fn compute(&self, filters: &FilterSet) -> String {
        let canonical = canonical_form(filters);
        match self.algorithm {
            FingerprintAlgorithm::Sha256 => sha256_prefix(canonical.as_bytes()),
            FingerprintAlgorithm::Rolling => rolling_hash(canonical.as_bytes()),
        }
    }
}

/// Canonical serialization of a filter set.
///
/// `{"a":1,"b":"x"}` for `b=x, a=1.0`; `{}` for an empty set.
pub fn canonical_form(filters: &FilterSet) -> String {
    let members: Vec<String> = filters
        .iter()
        .map(|(name, value)| format!("{}:{}", quote(name), FilterValue::canonical(value)))
        .collect();
    format!("{{{}}}", members.join(","))
}

fn quote(name: &str) -> String {
    serde_json::Value::String(name.to_string()).to_string()
}

fn sha256_prefix(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    let mut hex = hex::encode(digest);
    hex.truncate(FINGERPRINT_LEN);
    hex
}

fn rolling_hash(bytes: &[u8]) -> String {
    const OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;

    let hash = bytes.iter().fold(OFFSET_BASIS, |hash, byte| {
        (hash ^ u64::from(*byte)).wrapping_mul(PRIME)
    });
    format!("{hash:016x}")
}
