//! Tests for pagination module

use super::*;
use crate::cursor::{CursorCodec, CursorToken};
use crate::error::{Error, Result};
use crate::fingerprint::{FilterFingerprint, FilterSet, FingerprintAlgorithm};
use crate::source::MemorySource;
use crate::types::JsonValue;
use async_trait::async_trait;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use test_case::test_case;

async fn seeded(tenant: &str, rows: usize) -> MemorySource {
    let source = MemorySource::new();
    for i in 1..=rows {
        let status = if i % 3 == 0 { "won" } else { "open" };
        source
            .insert(
                tenant,
                "leads",
                format!("lead_{i:04}"),
                json!({"id": i, "status": status}),
            )
            .await;
    }
    source
}

fn ids(items: &[JsonValue]) -> Vec<u64> {
    items.iter().filter_map(|item| item["id"].as_u64()).collect()
}

/// Source that always fails
struct FailingSource;

#[async_trait]
impl RowSource for FailingSource {
    type Item = JsonValue;

    async fn fetch(&self, _query: &SourceQuery) -> Result<Vec<SourceRow<JsonValue>>> {
        Err(Error::data_layer("connection reset"))
    }
}

/// Source that records every query it receives
#[derive(Default)]
struct RecordingSource {
    calls: AtomicUsize,
    last: std::sync::Mutex<Option<SourceQuery>>,
}

#[async_trait]
impl RowSource for RecordingSource {
    type Item = JsonValue;

    async fn fetch(&self, query: &SourceQuery) -> Result<Vec<SourceRow<JsonValue>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last.lock().unwrap() = Some(query.clone());
        Ok(Vec::new())
    }
}

// ============================================================================
// PageLimits Tests
// ============================================================================

#[test]
fn test_page_limits_default() {
    let limits = PageLimits::default();
    assert_eq!(limits.default_limit(), 25);
    assert_eq!(limits.max_limit(), 100);
}

#[test]
fn test_page_limits_new_clamps_bounds() {
    let limits = PageLimits::new(500, 200);
    assert_eq!(limits.max_limit(), 200);
    assert_eq!(limits.default_limit(), 200);

    let limits = PageLimits::new(0, 0);
    assert_eq!(limits.max_limit(), 1);
    assert_eq!(limits.default_limit(), 1);

    let limits = PageLimits::new(10, 50_000);
    assert_eq!(limits.max_limit(), 10_000);
}

#[test_case(-5 => 1 ; "negative")]
#[test_case(0 => 1 ; "zero")]
#[test_case(1 => 1 ; "lower bound")]
#[test_case(42 => 42 ; "within range")]
#[test_case(100 => 100 ; "upper bound")]
#[test_case(1_000_000 => 100 ; "above max")]
fn test_page_limits_clamp(requested: i64) -> u32 {
    PageLimits::default().clamp(requested)
}

#[test]
fn test_page_limits_resolve_precedence() {
    let limits = PageLimits::default();
    assert_eq!(limits.resolve(None, None), 25);
    assert_eq!(limits.resolve(None, Some(10)), 10);
    assert_eq!(limits.resolve(Some(40), Some(10)), 40);
    assert_eq!(limits.resolve(Some(500), None), 100);
    assert_eq!(limits.resolve(None, Some(5000)), 100);
}

// ============================================================================
// PaginatedResult Tests
// ============================================================================

#[test]
fn test_paginated_result_constructors() {
    let last = PaginatedResult::last(vec![1, 2, 3]);
    assert!(!last.has_more);
    assert!(last.next_cursor.is_none());
    assert_eq!(last.total_returned_this_page, 3);

    let more = PaginatedResult::with_next(vec![1, 2], "abc".to_string());
    assert!(more.has_more);
    assert_eq!(more.next_cursor.as_deref(), Some("abc"));
    assert_eq!(more.total_returned_this_page, 2);
}

#[test]
fn test_paginated_result_serializes_camel_case() {
    let page = PaginatedResult::with_next(vec![json!({"id": 1})], "abc".to_string());
    let value = serde_json::to_value(&page).unwrap();
    assert_eq!(
        value,
        json!({
            "items": [{"id": 1}],
            "hasMore": true,
            "nextCursor": "abc",
            "totalReturnedThisPage": 1
        })
    );
}

#[test]
fn test_paginated_result_map() {
    let page = PaginatedResult::with_next(vec![1, 2], "abc".to_string()).map(|n| n * 10);
    assert_eq!(page.items, vec![10, 20]);
    assert!(page.has_more);
}

// ============================================================================
// Controller Tests
// ============================================================================

#[tokio::test]
async fn test_three_page_walk() {
    let source = seeded("t1", 25).await;
    let controller = PaginationController::default();

    let page1 = controller
        .paginate(&source, &PageRequest::new("t1", "leads").limit(10))
        .await
        .unwrap();
    assert_eq!(ids(&page1.items), (1..=10).collect::<Vec<_>>());
    assert!(page1.has_more);
    assert!(page1.next_cursor.is_some());

    let page2 = controller
        .paginate(
            &source,
            &PageRequest::new("t1", "leads").cursor(page1.next_cursor.clone()),
        )
        .await
        .unwrap();
    assert_eq!(ids(&page2.items), (11..=20).collect::<Vec<_>>());
    assert!(page2.has_more);

    let page3 = controller
        .paginate(
            &source,
            &PageRequest::new("t1", "leads").cursor(page2.next_cursor.clone()),
        )
        .await
        .unwrap();
    assert_eq!(ids(&page3.items), (21..=25).collect::<Vec<_>>());
    assert!(!page3.has_more);
    assert!(page3.next_cursor.is_none());
    assert_eq!(page3.total_returned_this_page, 5);
}

#[test_case(1 ; "one")]
#[test_case(7 ; "seven")]
#[test_case(10 ; "divides evenly")]
#[test_case(24 ; "one short")]
#[test_case(25 ; "exact")]
#[test_case(100 ; "larger than set")]
#[tokio::test]
async fn test_walk_is_complete_and_disjoint(limit: i64) {
    let source = seeded("t1", 25).await;
    let controller = PaginationController::default();

    let mut seen = Vec::new();
    let mut cursor = None;
    let mut pages = 0;
    loop {
        let request = PageRequest::new("t1", "leads").limit(limit).cursor(cursor);
        let page = controller.paginate(&source, &request).await.unwrap();
        pages += 1;
        assert!(page.items.len() <= limit as usize);
        assert_eq!(page.has_more, page.next_cursor.is_some());
        seen.extend(ids(&page.items));
        if !page.has_more {
            break;
        }
        cursor = page.next_cursor;
        assert!(pages < 100, "pagination did not terminate");
    }

    assert_eq!(seen, (1..=25).collect::<Vec<_>>());
}

#[tokio::test]
async fn test_exact_multiple_has_no_empty_trailing_page() {
    let source = seeded("t1", 20).await;
    let controller = PaginationController::default();

    let page1 = controller
        .paginate(&source, &PageRequest::new("t1", "leads").limit(10))
        .await
        .unwrap();
    let page2 = controller
        .paginate(
            &source,
            &PageRequest::new("t1", "leads").limit(10).cursor(page1.next_cursor),
        )
        .await
        .unwrap();

    assert_eq!(page2.items.len(), 10);
    assert!(!page2.has_more);
    assert!(page2.next_cursor.is_none());
}

#[tokio::test]
async fn test_empty_result_set() {
    let source = MemorySource::new();
    let page = PaginationController::default()
        .paginate(&source, &PageRequest::new("t1", "leads"))
        .await
        .unwrap();

    assert!(page.items.is_empty());
    assert!(!page.has_more);
    assert!(page.next_cursor.is_none());
}

#[tokio::test]
async fn test_cursor_from_other_tenant_is_rejected() {
    let source = seeded("t1", 25).await;
    let controller = PaginationController::default();

    let page1 = controller
        .paginate(&source, &PageRequest::new("t1", "leads").limit(10))
        .await
        .unwrap();

    let err = controller
        .paginate(
            &source,
            &PageRequest::new("t2", "leads").cursor(page1.next_cursor),
        )
        .await
        .unwrap_err();

    assert!(err.is_authorization());
    match err {
        Error::TenantMismatch {
            token_tenant,
            request_tenant,
        } => {
            assert_eq!(token_tenant, "t1");
            assert_eq!(request_tenant, "t2");
        }
        other => panic!("Expected TenantMismatch, got {other:?}"),
    }
}

#[tokio::test]
async fn test_rejected_cursor_never_reaches_data_layer() {
    let source = RecordingSource::default();
    let controller = PaginationController::default();
    let token = CursorToken::new("lead_0010", "t1", "0000000000000000", 10);
    let cursor = controller.codec().encode(&token).unwrap();

    let result = controller
        .paginate(&source, &PageRequest::new("t2", "leads").cursor(Some(cursor)))
        .await;

    assert!(result.is_err());
    assert_eq!(source.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_filter_change_restarts_from_first_page() {
    let source = seeded("t1", 25).await;
    let controller = PaginationController::default();

    let page1 = controller
        .paginate(&source, &PageRequest::new("t1", "leads").limit(5))
        .await
        .unwrap();

    let filtered = controller
        .paginate(
            &source,
            &PageRequest::new("t1", "leads")
                .filters(FilterSet::new().with("status", "won"))
                .limit(5)
                .cursor(page1.next_cursor),
        )
        .await
        .unwrap();

    // Every third lead is won; a reset starts from the first of them
    assert_eq!(ids(&filtered.items), vec![3, 6, 9, 12, 15]);
    assert!(filtered.has_more);
}

#[test_case("" ; "empty")]
#[test_case("   " ; "whitespace")]
#[test_case("not-a-cursor!!" ; "garbage")]
#[test_case("eyJmb28iOiJiYXIifQ" ; "wrong json shape")]
#[tokio::test]
async fn test_unusable_cursor_starts_fresh(cursor: &str) {
    let source = seeded("t1", 25).await;
    let page = PaginationController::default()
        .paginate(
            &source,
            &PageRequest::new("t1", "leads")
                .limit(10)
                .cursor(Some(cursor.to_string())),
        )
        .await
        .unwrap();

    assert_eq!(ids(&page.items), (1..=10).collect::<Vec<_>>());
}

#[tokio::test]
async fn test_cursor_limit_carries_forward() {
    let source = seeded("t1", 25).await;
    let controller = PaginationController::default();

    let page1 = controller
        .paginate(&source, &PageRequest::new("t1", "leads").limit(4))
        .await
        .unwrap();
    let page2 = controller
        .paginate(
            &source,
            &PageRequest::new("t1", "leads").cursor(page1.next_cursor),
        )
        .await
        .unwrap();
    assert_eq!(ids(&page2.items), vec![5, 6, 7, 8]);

    // An explicit limit overrides the one bound to the cursor
    let page3 = controller
        .paginate(
            &source,
            &PageRequest::new("t1", "leads")
                .limit(2)
                .cursor(page2.next_cursor),
        )
        .await
        .unwrap();
    assert_eq!(ids(&page3.items), vec![9, 10]);
}

#[tokio::test]
async fn test_requested_limit_is_clamped() {
    let source = RecordingSource::default();
    let controller = PaginationController::default();

    controller
        .paginate(&source, &PageRequest::new("t1", "leads").limit(5000))
        .await
        .unwrap();
    let query = source.last.lock().unwrap().clone().unwrap();
    assert_eq!(query.fetch_limit, 101);
    assert!(query.start_after.is_none());

    controller
        .paginate(&source, &PageRequest::new("t1", "leads").limit(0))
        .await
        .unwrap();
    let query = source.last.lock().unwrap().clone().unwrap();
    assert_eq!(query.fetch_limit, 2);
}

#[tokio::test]
async fn test_query_is_scoped_to_request() {
    let source = RecordingSource::default();
    let filters = FilterSet::new().with("status", "open");
    PaginationController::default()
        .paginate(
            &source,
            &PageRequest::new("t9", "customers").filters(filters.clone()),
        )
        .await
        .unwrap();

    let query = source.last.lock().unwrap().clone().unwrap();
    assert_eq!(
        query,
        SourceQuery {
            tenant_id: "t9".to_string(),
            resource: "customers".to_string(),
            filters,
            start_after: None,
            fetch_limit: 26,
        }
    );
}

#[tokio::test]
async fn test_next_cursor_binds_tenant_filters_and_limit() {
    let source = seeded("t1", 25).await;
    let controller = PaginationController::default();
    let filters = FilterSet::new().with("status", "open");

    let page = controller
        .paginate(
            &source,
            &PageRequest::new("t1", "leads")
                .filters(filters.clone())
                .limit(3),
        )
        .await
        .unwrap();

    let token = controller
        .codec()
        .decode(page.next_cursor.as_deref().unwrap())
        .unwrap();
    assert_eq!(token.tenant_id, "t1");
    assert_eq!(token.limit, 3);
    assert_eq!(token.filter_fingerprint, FilterFingerprint::default().compute(&filters));
    // Leads 1, 2, 4 are open; the cursor points at the third returned row
    assert_eq!(token.last_key, "lead_0004");
}

#[tokio::test]
async fn test_data_layer_failure_propagates() {
    let err = PaginationController::default()
        .paginate(&FailingSource, &PageRequest::new("t1", "leads"))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::DataLayer { .. }));
    assert!(!err.is_authorization());
}

#[tokio::test]
async fn test_rows_deleted_between_pages() {
    let source = seeded("t1", 25).await;
    let controller = PaginationController::default();

    let page1 = controller
        .paginate(&source, &PageRequest::new("t1", "leads").limit(10))
        .await
        .unwrap();

    // Remove the row the cursor points at and the next one
    source.remove("t1", "leads", "lead_0010").await;
    source.remove("t1", "leads", "lead_0011").await;

    let page2 = controller
        .paginate(
            &source,
            &PageRequest::new("t1", "leads").cursor(page1.next_cursor),
        )
        .await
        .unwrap();
    assert_eq!(ids(&page2.items), (12..=21).collect::<Vec<_>>());
}

#[tokio::test]
async fn test_rows_inserted_behind_cursor_are_skipped() {
    let source = seeded("t1", 25).await;
    let controller = PaginationController::default();

    let page1 = controller
        .paginate(&source, &PageRequest::new("t1", "leads").limit(10))
        .await
        .unwrap();

    source
        .insert("t1", "leads", "lead_0005a", json!({"id": 1000}))
        .await;

    let page2 = controller
        .paginate(
            &source,
            &PageRequest::new("t1", "leads").cursor(page1.next_cursor),
        )
        .await
        .unwrap();
    assert!(!ids(&page2.items).contains(&1000));
}

#[tokio::test]
async fn test_signed_controller() {
    let source = seeded("t1", 25).await;
    let signed = PaginationController::new(
        CursorCodec::signed(b"secret".to_vec()),
        FingerprintAlgorithm::Sha256,
        PageLimits::default(),
    );

    let page1 = signed
        .paginate(&source, &PageRequest::new("t1", "leads").limit(10))
        .await
        .unwrap();
    let cursor = page1.next_cursor.clone().unwrap();
    assert!(cursor.contains('.'));

    let page2 = signed
        .paginate(
            &source,
            &PageRequest::new("t1", "leads").cursor(Some(cursor.clone())),
        )
        .await
        .unwrap();
    assert_eq!(ids(&page2.items), (11..=20).collect::<Vec<_>>());

    // An unsigned controller cannot read the signed cursor and starts over
    let page = PaginationController::default()
        .paginate(&source, &PageRequest::new("t1", "leads").cursor(Some(cursor)))
        .await
        .unwrap();
    assert_eq!(ids(&page.items)[0], 1);
}

#[tokio::test]
async fn test_rolling_fingerprint_controller() {
    let source = seeded("t1", 12).await;
    let controller = PaginationController::new(
        CursorCodec::new(),
        FingerprintAlgorithm::Rolling,
        PageLimits::new(5, 10),
    );
    assert_eq!(controller.limits().default_limit(), 5);
    assert_eq!(controller.fingerprint().algorithm(), FingerprintAlgorithm::Rolling);

    let page1 = controller
        .paginate(&source, &PageRequest::new("t1", "leads"))
        .await
        .unwrap();
    let page2 = controller
        .paginate(
            &source,
            &PageRequest::new("t1", "leads").cursor(page1.next_cursor),
        )
        .await
        .unwrap();
    assert_eq!(ids(&page2.items), vec![6, 7, 8, 9, 10]);
}
