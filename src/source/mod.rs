//! Data layer adapters
//!
//! Implementations of [`RowSource`](crate::pagination::RowSource), the seam
//! between the pagination controller and the store that executes queries.
//!
//! - `MemorySource` - In-memory rows, sorted by key per tenant and resource
//! - `DuckDbSource` - Keyset queries against DuckDB tables

mod database;
mod memory;

pub use database::DuckDbSource;
pub use memory::MemorySource;
