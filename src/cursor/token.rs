//! Cursor token type

use crate::types::{MAX_PAGE_LIMIT, MIN_PAGE_LIMIT};
use serde::{Deserialize, Serialize};

/// State carried from one page to the next.
///
/// Serialized with one-letter keys (`k`, `t`, `f`, `l`) to keep the encoded
/// token short.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CursorToken {
    /// Position key of the last row on the previous page (opaque)
    #[serde(rename = "k")]
    pub last_key: String,
    /// Tenant the token was minted for
    #[serde(rename = "t")]
    pub tenant_id: String,
    /// Fingerprint of the filters active when the token was minted
    #[serde(rename = "f")]
    pub filter_fingerprint: String,
    /// Page size bound to the token
    #[serde(rename = "l")]
    pub limit: u32,
}

impl CursorToken {
    /// Create a new token
    pub fn new(
        last_key: impl Into<String>,
        tenant_id: impl Into<String>,
        filter_fingerprint: impl Into<String>,
        limit: u32,
    ) -> Self {
        Self {
            last_key: last_key.into(),
            tenant_id: tenant_id.into(),
            filter_fingerprint: filter_fingerprint.into(),
            limit,
        }
    }

    /// Whether `limit` lies within `[1, 10000]`
    pub fn has_valid_limit(&self) -> bool {
        (MIN_PAGE_LIMIT..=MAX_PAGE_LIMIT).contains(&self.limit)
    }
}
