//! Cursor encoding
//!
//! Unsigned format: `base64url(json)`.
//! Signed format: `base64url(json).base64url(hmac_sha256(payload_part))`.
//!
//! `.` is outside the base64url alphabet, so the two formats never overlap.

use super::token::CursorToken;
use crate::error::{Error, Result};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Tokens longer than this are rejected before any decoding work
pub const DEFAULT_MAX_TOKEN_LEN: usize = 2048;

/// Encodes and decodes cursor tokens
#[derive(Clone)]
pub struct CursorCodec {
    signing_key: Option<Vec<u8>>,
    max_token_len: usize,
}

impl CursorCodec {
    /// Create a codec producing unsigned tokens
    pub fn new() -> Self {
        Self {
            signing_key: None,
            max_token_len: DEFAULT_MAX_TOKEN_LEN,
        }
    }

    /// Create a codec that signs tokens with HMAC-SHA256 and requires a valid
    /// signature on decode
    pub fn signed(key: impl Into<Vec<u8>>) -> Self {
        Self {
            signing_key: Some(key.into()),
            max_token_len: DEFAULT_MAX_TOKEN_LEN,
        }
    }

    /// Override the maximum accepted token length
    #[must_use]
    pub fn with_max_token_len(mut self, max_token_len: usize) -> Self {
        self.max_token_len = max_token_len;
        self
    }

    /// Whether tokens are signed
    pub fn is_signed(&self) -> bool {
        self.signing_key.is_some()
    }

    /// Encode a token into a URL-safe string
    pub fn encode(&self, token: &CursorToken) -> Result<String> {
        let payload = serde_json::to_vec(token)?;
        let payload_part = URL_SAFE_NO_PAD.encode(payload);

        match &self.signing_key {
            Some(key) => {
                let signature = sign(key, payload_part.as_bytes())?;
                Ok(format!("{payload_part}.{}", URL_SAFE_NO_PAD.encode(signature)))
            }
            None => Ok(payload_part),
        }
    }

    /// Decode a string produced by [`CursorCodec::encode`].
    ///
    /// Fails with [`Error::InvalidCursor`] on bad base64, a payload that is not
    /// the expected JSON shape, a missing field, a bad signature, or a limit
    /// outside `[1, 10000]`.
    pub fn decode(&self, encoded: &str) -> Result<CursorToken> {
        if encoded.is_empty() {
            return Err(Error::invalid_cursor("empty cursor"));
        }
        if encoded.len() > self.max_token_len {
            return Err(Error::invalid_cursor(format!(
                "cursor exceeds {} bytes",
                self.max_token_len
            )));
        }

        let payload_part = match &self.signing_key {
            Some(key) => {
                let (payload_part, signature_part) = encoded
                    .split_once('.')
                    .ok_or_else(|| Error::invalid_cursor("missing signature"))?;
                verify(key, payload_part, signature_part)?;
                payload_part
            }
            None => encoded,
        };

        let bytes = URL_SAFE_NO_PAD
            .decode(payload_part.trim_end_matches('='))
            .map_err(|e| Error::invalid_cursor(format!("not url-safe base64: {e}")))?;
        let token: CursorToken = serde_json::from_slice(&bytes)
            .map_err(|e| Error::invalid_cursor(format!("unexpected payload: {e}")))?;

        if !token.has_valid_limit() {
            return Err(Error::invalid_cursor(format!(
                "limit {} out of range",
                token.limit
            )));
        }

        Ok(token)
    }
}

impl Default for CursorCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CursorCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CursorCodec")
            .field("signed", &self.is_signed())
            .field("max_token_len", &self.max_token_len)
            .finish()
    }
}

fn sign(key: &[u8], payload_part: &[u8]) -> Result<Vec<u8>> {
    let mut mac = HmacSha256::new_from_slice(key)
        .map_err(|e| Error::config(format!("invalid cursor signing key: {e}")))?;
    mac.update(payload_part);
    Ok(mac.finalize().into_bytes().to_vec())
}

fn verify(key: &[u8], payload_part: &str, signature_part: &str) -> Result<()> {
    let expected = URL_SAFE_NO_PAD
        .decode(signature_part.trim_end_matches('='))
        .map_err(|e| Error::invalid_cursor(format!("signature not base64: {e}")))?;
    let mut mac = HmacSha256::new_from_slice(key)
        .map_err(|e| Error::config(format!("invalid cursor signing key: {e}")))?;
    mac.update(payload_part.as_bytes());
    mac.verify_slice(&expected)
        .map_err(|_| Error::invalid_cursor("signature mismatch"))
}
