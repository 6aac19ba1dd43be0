//! Filter fingerprint module
//!
//! Reduces a filter set to a short, deterministic digest so a cursor can
//! detect that the filters changed between two pages.
//!
//! # Overview
//!
//! - `FilterValue` / `FilterSet` - Typed, order-independent filter maps
//! - `FilterKind` - Declared kind of a filter, used to parse raw query values
//! - `FilterFingerprint` - Canonicalizes a `FilterSet` and hashes it

mod digest;
mod types;

pub use digest::{canonical_form, FilterFingerprint, FingerprintAlgorithm, FINGERPRINT_LEN};
pub use types::{FilterKind, FilterSet, FilterValue};
