//! Pagination module
//!
//! Cursor pagination over a pluggable data layer.
//!
//! # Overview
//!
//! A list request carries the caller's tenant, a filter set, an optional page
//! size and an optional opaque cursor. The [`PaginationController`] checks the
//! cursor against the tenant and the current filters, asks the [`RowSource`]
//! for one row more than the page size, and mints a cursor for the next page
//! only when that extra row exists.
//!
//! ```text
//! cursor ──► validate ──► fetch(limit + 1) ──► page + next cursor
//!               │
//!               └── tenant mismatch ──► Error::TenantMismatch
//! ```

mod controller;
mod types;

pub use controller::PaginationController;
pub use types::{PageLimits, PageRequest, PaginatedResult, RowSource, SourceQuery, SourceRow};

#[cfg(test)]
mod tests;
