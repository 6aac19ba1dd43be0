//! # crm-cursor
//!
//! Opaque, tenant-bound, filter-bound cursor pagination for multi-tenant CRM
//! list endpoints (leads, customers, contracts, opportunities, marketplace
//! leads).
//!
//! ## Features
//!
//! - **Opaque Cursors**: URL-safe tokens carrying the last position key, the
//!   tenant, a filter fingerprint and the page size, optionally HMAC-signed
//! - **Tenant Isolation**: a cursor minted for one tenant is refused for any other
//! - **Filter Binding**: changing filters mid-walk restarts from the first page
//! - **Lookahead**: `hasMore` comes from fetching one row past the page
//! - **Pluggable Data Layer**: in-memory and DuckDB row sources
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use crm_cursor::pagination::{PageRequest, PaginationController};
//! use crm_cursor::source::MemorySource;
//!
//! let source = MemorySource::new();
//! let controller = PaginationController::default();
//!
//! let page = controller
//!     .paginate(&source, &PageRequest::new("t1", "leads").limit(10))
//!     .await?;
//!
//! let next = controller
//!     .paginate(&source, &PageRequest::new("t1", "leads").cursor(page.next_cursor))
//!     .await?;
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │          HTTP list service  /  API client  /  CLI        │
//! └──────────────────────────────────────────────────────────┘
//!                              │
//!                 ┌────────────┴────────────┐
//!                 │  PaginationController   │
//!                 └────────────┬────────────┘
//!        ┌─────────────┬───────┴───────┬──────────────┐
//!        │   Cursor    │  Fingerprint  │  RowSource   │
//!        ├─────────────┼───────────────┼──────────────┤
//!        │ Codec       │ SHA-256       │ Memory       │
//!        │ Validator   │ Rolling       │ DuckDB       │
//!        └─────────────┴───────────────┴──────────────┘
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types
pub mod error;

/// Common types and type aliases
pub mod types;

/// Filter sets and fingerprints
pub mod fingerprint;

/// Cursor tokens, codec and validation
pub mod cursor;

/// Pagination controller and the data layer seam
pub mod pagination;

/// Row sources (in-memory, DuckDB)
pub mod source;

/// Service configuration
pub mod config;

/// API client with retry and rate limiting
pub mod http;

/// Command-line interface and HTTP server
pub mod cli;

// ============================================================================
// Re-exports
// ============================================================================

pub use error::{Error, Result};
pub use types::*;

// Re-export commonly used types
pub use config::ServiceConfig;
pub use cursor::{CursorCodec, CursorToken, CursorValidator, Validation};
pub use fingerprint::{FilterFingerprint, FilterSet, FilterValue};
pub use pagination::{PageRequest, PaginatedResult, PaginationController, RowSource};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
