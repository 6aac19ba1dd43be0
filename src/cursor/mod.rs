//! Cursor module
//!
//! Opaque continuation tokens for forward-only pagination.
//!
//! # Overview
//!
//! A `CursorToken` binds the position of the last returned row to the tenant
//! and the filter fingerprint it was minted for. `CursorCodec` turns tokens
//! into URL-safe strings and back, and `CursorValidator` decides whether an
//! incoming token may be honored for the current request.
//!
//! Tokens are never stored server-side. Every page mints a fresh one.

mod codec;
mod token;
mod validator;

pub use codec::{CursorCodec, DEFAULT_MAX_TOKEN_LEN};
pub use token::CursorToken;
pub use validator::{CursorValidator, ResetReason, Validation};
