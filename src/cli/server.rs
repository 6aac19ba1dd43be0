//! HTTP server mode: cursor-paginated list endpoints
//!
//! ```text
//! GET /health
//! GET /resources
//! GET /:resource?cursor=...&limit=...&<filter>=<value>...
//! ```
//!
//! The tenant comes from a header set by the upstream auth layer. `cursor`
//! and `limit` are reserved; every other query parameter is a filter declared
//! for the resource.

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::{ResourceConfig, ServiceConfig};
use crate::error::{Error, Result};
use crate::fingerprint::FilterSet;
use crate::http::ListPage;
use crate::pagination::{PageRequest, PaginationController, RowSource};
use crate::types::JsonValue;

/// Row source shared by all handlers
pub type SharedSource = Arc<dyn RowSource<Item = JsonValue>>;

/// App state shared across handlers
#[derive(Clone)]
pub struct AppState {
    config: Arc<ServiceConfig>,
    controller: PaginationController,
    source: SharedSource,
}

impl AppState {
    /// Create state from a configuration and the row source behind it
    pub fn new(config: ServiceConfig, source: SharedSource) -> Self {
        Self {
            controller: config.controller(),
            config: Arc::new(config),
            source,
        }
    }

    /// Serve one page of `resource`
    async fn list(
        &self,
        resource: &str,
        headers: &HeaderMap,
        params: Vec<(String, String)>,
    ) -> Result<ListPage<JsonValue>> {
        let resource_config = self.config.resource(resource)?;
        let tenant_id = tenant_from_headers(headers, &self.config.server.tenant_header)?;
        let request = page_request(resource, tenant_id, resource_config, params)?;

        let page = self.controller.paginate(self.source.as_ref(), &request).await?;

        let total = if self.config.pagination.include_total {
            self.source
                .count(&request.tenant_id, resource, &request.filters)
                .await?
        } else {
            None
        };

        Ok(ListPage {
            data: page.items,
            next_cursor: page.next_cursor,
            has_more: page.has_more,
            total,
        })
    }
}

/// Build the router
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/resources", get(list_resources))
        .route("/:resource", get(list_resource))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(state))
}

/// Start the HTTP server
pub async fn serve(config: ServiceConfig, source: SharedSource) -> Result<()> {
    let host = config.server.host.clone();
    let port = config.server.port;
    let app = build_router(AppState::new(config, source));

    let listener = tokio::net::TcpListener::bind((host.as_str(), port))
        .await
        .map_err(|e| Error::config(format!("Failed to bind to {host}:{port}: {e}")))?;

    tracing::info!("Starting HTTP server on http://{}:{}", host, port);

    axum::serve(listener, app)
        .await
        .map_err(|e| Error::config(format!("Server error: {e}")))?;

    Ok(())
}

/// Health check endpoint
async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

/// Configured resources and the filters each accepts
async fn list_resources(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let resources: Vec<JsonValue> = state
        .config
        .resources
        .iter()
        .map(|(name, resource)| {
            json!({
                "name": name,
                "filters": resource.filters,
            })
        })
        .collect();

    Json(json!({ "resources": resources }))
}

/// Paginated list endpoint
async fn list_resource(
    State(state): State<Arc<AppState>>,
    Path(resource): Path<String>,
    headers: HeaderMap,
    Query(params): Query<Vec<(String, String)>>,
) -> Response {
    match state.list(&resource, &headers, params).await {
        Ok(page) => (StatusCode::OK, Json(page)).into_response(),
        Err(e) => error_response(&resource, &e),
    }
}

/// Map an error to its status and a `{"error": ...}` body
fn error_response(resource: &str, error: &Error) -> Response {
    let status =
        StatusCode::from_u16(error.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    let message = match error {
        // Do not echo the other tenant's id back to the caller
        Error::TenantMismatch { .. } => {
            tracing::warn!(resource, error = %error, "Refused cross-tenant cursor");
            "Cursor was issued for a different tenant".to_string()
        }
        _ if status.is_server_error() => {
            tracing::error!(resource, error = %error, "List request failed");
            error.to_string()
        }
        _ => error.to_string(),
    };

    (status, Json(json!({ "error": message }))).into_response()
}

/// Read the authenticated tenant from `header`
fn tenant_from_headers(headers: &HeaderMap, header: &str) -> Result<String> {
    headers
        .get(header)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(String::from)
        .ok_or_else(|| Error::MissingTenant {
            header: header.to_string(),
        })
}

/// Split query parameters into cursor, limit and typed filters.
///
/// Empty filter values count as absent. A numeric `limit` of any size is passed
/// on for clamping; one that is not a number at all is ignored. Undeclared
/// filters are rejected.
pub fn page_request(
    resource: &str,
    tenant_id: String,
    config: &ResourceConfig,
    params: Vec<(String, String)>,
) -> Result<PageRequest> {
    let mut request = PageRequest::new(tenant_id, resource);
    let mut filters = FilterSet::new();

    for (name, value) in params {
        match name.as_str() {
            "cursor" => request.cursor = Some(value),
            "limit" => request.limit = parse_limit(&value),
            _ => {
                let kind = config
                    .filters
                    .get(&name)
                    .ok_or_else(|| Error::invalid_filter(&name, "unknown filter"))?;
                let parsed = kind.parse(&name, &value)?;
                filters.insert_optional(name, parsed);
            }
        }
    }

    Ok(request.filters(filters))
}

/// Parse a `limit` parameter. Fractions truncate and values beyond `i64`
/// saturate so the controller can clamp them to the nearest bound.
fn parse_limit(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    raw.parse::<i64>().ok().or_else(|| {
        raw.parse::<f64>()
            .ok()
            .filter(|n| n.is_finite())
            .map(|n| n as i64)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fingerprint::{FilterKind, FilterValue};
    use axum::http::HeaderValue;
    use pretty_assertions::assert_eq;

    fn leads() -> ResourceConfig {
        ResourceConfig::new("leads")
            .filter("status", FilterKind::String)
            .filter("score", FilterKind::Number)
            .filter("archived", FilterKind::Boolean)
    }

    fn params(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn test_page_request_splits_reserved_params() {
        let request = page_request(
            "leads",
            "t1".to_string(),
            &leads(),
            params(&[
                ("cursor", "abc"),
                ("limit", "10"),
                ("status", "open"),
                ("score", "10.0"),
                ("archived", "TRUE"),
            ]),
        )
        .unwrap();

        assert_eq!(request.tenant_id, "t1");
        assert_eq!(request.resource, "leads");
        assert_eq!(request.cursor.as_deref(), Some("abc"));
        assert_eq!(request.limit, Some(10));
        assert_eq!(request.filters.get("status"), Some(&FilterValue::from("open")));
        assert_eq!(request.filters.get("score"), Some(&FilterValue::Integer(10)));
        assert_eq!(request.filters.get("archived"), Some(&FilterValue::Bool(true)));
    }

    #[test]
    fn test_page_request_empty_filter_is_absent() {
        let request = page_request(
            "leads",
            "t1".to_string(),
            &leads(),
            params(&[("status", ""), ("limit", "ten")]),
        )
        .unwrap();

        assert!(request.filters.is_empty());
        assert_eq!(request.limit, None);
    }

    #[test]
    fn test_parse_limit() {
        assert_eq!(parse_limit("25"), Some(25));
        assert_eq!(parse_limit(" 7 "), Some(7));
        assert_eq!(parse_limit("10.0"), Some(10));
        assert_eq!(parse_limit("99999999999999999999"), Some(i64::MAX));
        assert_eq!(parse_limit("-99999999999999999999"), Some(i64::MIN));
        assert_eq!(parse_limit("ten"), None);
        assert_eq!(parse_limit("inf"), None);
        assert_eq!(parse_limit(""), None);
    }

    #[test]
    fn test_oversized_limit_clamps_to_max() {
        let request = page_request(
            "leads",
            "t1".to_string(),
            &leads(),
            params(&[("limit", "99999999999999999999")]),
        )
        .unwrap();
        assert_eq!(request.limit, Some(i64::MAX));
        assert_eq!(crate::pagination::PageLimits::default().resolve(request.limit, None), 100);
    }

    #[test]
    fn test_page_request_rejects_bad_filters() {
        let unknown = page_request("leads", "t1".to_string(), &leads(), params(&[("owner", "x")]));
        assert!(matches!(unknown, Err(Error::InvalidFilter { .. })));

        let mistyped = page_request("leads", "t1".to_string(), &leads(), params(&[("score", "high")]));
        assert!(matches!(mistyped, Err(Error::InvalidFilter { .. })));
    }

    #[test]
    fn test_tenant_from_headers() {
        let mut headers = HeaderMap::new();
        assert!(matches!(
            tenant_from_headers(&headers, "x-tenant-id"),
            Err(Error::MissingTenant { .. })
        ));

        headers.insert("x-tenant-id", HeaderValue::from_static("  "));
        assert!(tenant_from_headers(&headers, "x-tenant-id").is_err());

        headers.insert("x-tenant-id", HeaderValue::from_static("t1"));
        assert_eq!(tenant_from_headers(&headers, "x-tenant-id").unwrap(), "t1");
    }
}
