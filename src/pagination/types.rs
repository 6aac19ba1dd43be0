//! Pagination types and traits
//!
//! Defines the request/result types of a paged list call and the
//! `RowSource` seam behind which the data layer lives.

use crate::error::Result;
use crate::fingerprint::FilterSet;
use crate::types::{MAX_PAGE_LIMIT, MIN_PAGE_LIMIT};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

// ============================================================================
// Limits
// ============================================================================

/// Page size bounds applied to every request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageLimits {
    default_limit: u32,
    max_limit: u32,
}

impl PageLimits {
    /// Create limits. `max_limit` is clamped to `[1, 10000]` and
    /// `default_limit` to `[1, max_limit]`.
    pub fn new(default_limit: u32, max_limit: u32) -> Self {
        let max_limit = max_limit.clamp(MIN_PAGE_LIMIT, MAX_PAGE_LIMIT);
        Self {
            default_limit: default_limit.clamp(MIN_PAGE_LIMIT, max_limit),
            max_limit,
        }
    }

    /// Page size used when neither the request nor the cursor carries one
    pub fn default_limit(&self) -> u32 {
        self.default_limit
    }

    /// Largest page size served
    pub fn max_limit(&self) -> u32 {
        self.max_limit
    }

    /// Clamp a requested page size to `[1, max_limit]`
    pub fn clamp(&self, requested: i64) -> u32 {
        requested.clamp(i64::from(MIN_PAGE_LIMIT), i64::from(self.max_limit)) as u32
    }

    /// Effective page size: an explicit request wins, then the limit bound to
    /// a continuing cursor, then the default.
    pub fn resolve(&self, requested: Option<i64>, cursor_limit: Option<u32>) -> u32 {
        match (requested, cursor_limit) {
            (Some(requested), _) => self.clamp(requested),
            (None, Some(limit)) => self.clamp(i64::from(limit)),
            (None, None) => self.default_limit,
        }
    }
}

impl Default for PageLimits {
    fn default() -> Self {
        Self::new(25, 100)
    }
}

// ============================================================================
// Request
// ============================================================================

/// One page request as seen by the controller
#[derive(Debug, Clone, Default)]
pub struct PageRequest {
    /// Authenticated tenant of the caller
    pub tenant_id: String,
    /// List resource (e.g., "leads")
    pub resource: String,
    /// Validated filters
    pub filters: FilterSet,
    /// Client-requested page size, unclamped
    pub limit: Option<i64>,
    /// Opaque cursor from the previous page
    pub cursor: Option<String>,
}

impl PageRequest {
    /// Create a first-page request without filters
    pub fn new(tenant_id: impl Into<String>, resource: impl Into<String>) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            resource: resource.into(),
            ..Default::default()
        }
    }

    /// Set filters
    #[must_use]
    pub fn filters(mut self, filters: FilterSet) -> Self {
        self.filters = filters;
        self
    }

    /// Set the requested page size
    #[must_use]
    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Set the cursor
    #[must_use]
    pub fn cursor(mut self, cursor: Option<String>) -> Self {
        self.cursor = cursor;
        self
    }
}

// ============================================================================
// Data Layer Seam
// ============================================================================

/// Query handed to the data layer
#[derive(Debug, Clone, PartialEq)]
pub struct SourceQuery {
    /// Tenant whose rows may be returned
    pub tenant_id: String,
    /// List resource
    pub resource: String,
    /// Filters to apply
    pub filters: FilterSet,
    /// Return only rows strictly after this key, `None` for the first page
    pub start_after: Option<String>,
    /// Maximum rows to return (page size plus one lookahead row)
    pub fetch_limit: usize,
}

/// A row plus the position key that can resume after it
#[derive(Debug, Clone, PartialEq)]
pub struct SourceRow<T> {
    /// Position key in the source's sort order
    pub key: String,
    /// Row payload
    pub item: T,
}

impl<T> SourceRow<T> {
    /// Create a row
    pub fn new(key: impl Into<String>, item: T) -> Self {
        Self {
            key: key.into(),
            item,
        }
    }
}

/// The data layer behind a list endpoint.
///
/// Implementations return rows in one stable sort order by key, scoped to
/// `query.tenant_id`. Under concurrent writes the order only needs to be
/// stable for rows that exist across both calls.
#[async_trait]
pub trait RowSource: Send + Sync {
    /// Row payload type
    type Item: Send;

    /// Fetch up to `query.fetch_limit` rows after `query.start_after`
    async fn fetch(&self, query: &SourceQuery) -> Result<Vec<SourceRow<Self::Item>>>;

    /// Total matching rows, if the source can count them
    async fn count(&self, _tenant_id: &str, _resource: &str, _filters: &FilterSet) -> Result<Option<u64>> {
        Ok(None)
    }
}

// ============================================================================
// Result
// ============================================================================

/// One page of results
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginatedResult<T> {
    /// Rows in the source's sort order
    pub items: Vec<T>,
    /// Whether another page exists
    pub has_more: bool,
    /// Cursor for the next page, present iff `has_more`
    pub next_cursor: Option<String>,
    /// Number of rows in `items`
    pub total_returned_this_page: usize,
}

impl<T> PaginatedResult<T> {
    /// A final page
    pub fn last(items: Vec<T>) -> Self {
        Self {
            total_returned_this_page: items.len(),
            items,
            has_more: false,
            next_cursor: None,
        }
    }

    /// A page followed by more rows
    pub fn with_next(items: Vec<T>, next_cursor: String) -> Self {
        Self {
            total_returned_this_page: items.len(),
            items,
            has_more: true,
            next_cursor: Some(next_cursor),
        }
    }

    /// Map the row payloads
    pub fn map<U, F: FnMut(T) -> U>(self, f: F) -> PaginatedResult<U> {
        PaginatedResult {
            items: self.items.into_iter().map(f).collect(),
            has_more: self.has_more,
            next_cursor: self.next_cursor,
            total_returned_this_page: self.total_returned_this_page,
        }
    }
}
