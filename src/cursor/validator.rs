//! Cursor validation
//!
//! Decides whether an incoming cursor may be honored for the current request.
//! Tenant checks run before filter checks: a token from another tenant is
//! rejected even when its filters happen to match.

use super::codec::CursorCodec;
use super::token::CursorToken;
use tracing::{debug, warn};

/// Why pagination restarts from the first page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetReason {
    /// The client sent no cursor
    NoCursor,
    /// The cursor could not be decoded
    DecodeFailed,
    /// The filters changed since the cursor was minted
    FilterMismatch,
}

/// Outcome of validating an incoming cursor
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Validation {
    /// Start at the beginning of the result set
    StartFresh(ResetReason),
    /// The cursor belongs to another tenant; the request must fail
    Reject {
        /// Tenant recorded in the token
        token_tenant: String,
        /// Tenant of the current request
        request_tenant: String,
    },
    /// Resume after `last_key`
    ContinueFrom {
        /// Position key of the last row already returned
        last_key: String,
        /// Page size bound to the token
        limit: u32,
    },
}

impl Validation {
    /// Whether pagination resumes from a previous page
    pub fn is_continuation(&self) -> bool {
        matches!(self, Self::ContinueFrom { .. })
    }

    /// Whether the request must be refused
    pub fn is_reject(&self) -> bool {
        matches!(self, Self::Reject { .. })
    }
}

/// Validates incoming cursors against the request tenant and filters
#[derive(Debug, Clone, Default)]
pub struct CursorValidator {
    codec: CursorCodec,
}

impl CursorValidator {
    /// Create a validator decoding with the given codec
    pub fn new(codec: CursorCodec) -> Self {
        Self { codec }
    }

    /// Codec used to decode incoming cursors
    pub fn codec(&self) -> &CursorCodec {
        &self.codec
    }

    /// Validate a raw cursor string.
    ///
    /// `fingerprint` is the fingerprint of the filters on the current request.
    pub fn validate(&self, cursor: Option<&str>, tenant_id: &str, fingerprint: &str) -> Validation {
        let Some(raw) = cursor.map(str::trim).filter(|c| !c.is_empty()) else {
            return Validation::StartFresh(ResetReason::NoCursor);
        };

        match self.codec.decode(raw) {
            Ok(token) => self.validate_token(&token, tenant_id, fingerprint),
            Err(e) => {
                debug!(error = %e, "Discarding undecodable cursor, restarting at first page");
                Validation::StartFresh(ResetReason::DecodeFailed)
            }
        }
    }

    /// Validate an already decoded token
    pub fn validate_token(
        &self,
        token: &CursorToken,
        tenant_id: &str,
        fingerprint: &str,
    ) -> Validation {
        if token.tenant_id != tenant_id {
            warn!(
                token_tenant = %token.tenant_id,
                request_tenant = %tenant_id,
                "Rejecting cursor minted for another tenant"
            );
            return Validation::Reject {
                token_tenant: token.tenant_id.clone(),
                request_tenant: tenant_id.to_string(),
            };
        }

        if token.filter_fingerprint != fingerprint {
            debug!(
                token_fingerprint = %token.filter_fingerprint,
                request_fingerprint = %fingerprint,
                "Filters changed, restarting at first page"
            );
            return Validation::StartFresh(ResetReason::FilterMismatch);
        }

        if !token.has_valid_limit() {
            debug!(limit = token.limit, "Cursor limit out of range, restarting at first page");
            return Validation::StartFresh(ResetReason::DecodeFailed);
        }

        Validation::ContinueFrom {
            last_key: token.last_key.clone(),
            limit: token.limit,
        }
    }
}
