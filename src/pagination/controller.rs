//! Pagination controller
//!
//! The only place that touches both the cursor machinery and the data layer.
//!
//! Consistency is forward-only and best-effort: rows inserted behind the
//! cursor position between two calls are never seen, rows inserted ahead of
//! it may or may not be, and rows deleted between calls are simply absent.
//! There is no snapshot isolation.

use super::types::{PageLimits, PageRequest, PaginatedResult, RowSource, SourceQuery};
use crate::cursor::{CursorCodec, CursorToken, CursorValidator, Validation};
use crate::error::{Error, Result};
use crate::fingerprint::{FilterFingerprint, FingerprintAlgorithm};
use tracing::{debug, error};

/// Resolves cursors, queries the data layer and mints the next cursor
#[derive(Debug, Clone, Default)]
pub struct PaginationController {
    validator: CursorValidator,
    fingerprint: FilterFingerprint,
    limits: PageLimits,
}

impl PaginationController {
    /// Create a controller
    pub fn new(codec: CursorCodec, algorithm: FingerprintAlgorithm, limits: PageLimits) -> Self {
        Self {
            validator: CursorValidator::new(codec),
            fingerprint: FilterFingerprint::new(algorithm),
            limits,
        }
    }

    /// Page size bounds in effect
    pub fn limits(&self) -> PageLimits {
        self.limits
    }

    /// Codec used for incoming and outgoing cursors
    pub fn codec(&self) -> &CursorCodec {
        self.validator.codec()
    }

    /// Fingerprinter applied to request filters
    pub fn fingerprint(&self) -> &FilterFingerprint {
        &self.fingerprint
    }

    /// Serve one page.
    ///
    /// Fails with [`Error::TenantMismatch`] when the cursor belongs to another
    /// tenant. Data layer errors are returned unchanged.
    pub async fn paginate<S>(
        &self,
        source: &S,
        request: &PageRequest,
    ) -> Result<PaginatedResult<S::Item>>
    where
        S: RowSource + ?Sized,
    {
        let fingerprint = self.fingerprint.compute(&request.filters);

        let (start_after, cursor_limit) = match self.validator.validate(
            request.cursor.as_deref(),
            &request.tenant_id,
            &fingerprint,
        ) {
            Validation::Reject {
                token_tenant,
                request_tenant,
            } => return Err(Error::tenant_mismatch(token_tenant, request_tenant)),
            Validation::StartFresh(reason) => {
                debug!(?reason, resource = %request.resource, "Starting at first page");
                (None, None)
            }
            Validation::ContinueFrom { last_key, limit } => (Some(last_key), Some(limit)),
        };

        let limit = self.limits.resolve(request.limit, cursor_limit);
        let page_size = limit as usize;

        let query = SourceQuery {
            tenant_id: request.tenant_id.clone(),
            resource: request.resource.clone(),
            filters: request.filters.clone(),
            start_after,
            fetch_limit: page_size + 1,
        };

        let mut rows = source.fetch(&query).await.inspect_err(|e| {
            error!(error = %e, resource = %request.resource, "Data layer query failed");
        })?;

        if rows.len() <= page_size {
            let items = rows.into_iter().map(|row| row.item).collect();
            return Ok(PaginatedResult::last(items));
        }

        // Anything past the page is the lookahead row
        rows.truncate(page_size);
        let last_key = rows
            .last()
            .map(|row| row.key.clone())
            .ok_or_else(|| Error::data_layer("empty page reported more rows"))?;

        let next = CursorToken::new(last_key, request.tenant_id.clone(), fingerprint, limit);
        let next_cursor = self.codec().encode(&next)?;
        let items = rows.into_iter().map(|row| row.item).collect();

        Ok(PaginatedResult::with_next(items, next_cursor))
    }
}
