//! API client for cursor-paginated list endpoints
//!
//! Handles:
//! - Tenant and bearer headers on every request
//! - Retries with configurable backoff on 429/5xx, timeouts and connect errors
//! - Client-side rate limiting
//! - Following `nextCursor` until the server reports `hasMore: false`
//!
//! Clients are constructed explicitly; there is no shared global instance.

use super::rate_limit::{RateLimiter, RateLimiterConfig};
use crate::error::{is_retryable_status, Error, Result};
use crate::fingerprint::FilterSet;
use crate::types::BackoffType;
use futures::stream::{self, Stream, TryStreamExt};
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::pin::pin;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

// ============================================================================
// Wire Types
// ============================================================================

/// Body of a list endpoint response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListPage<T> {
    /// Rows on this page
    pub data: Vec<T>,
    /// Cursor for the next page
    #[serde(default)]
    pub next_cursor: Option<String>,
    /// Whether another page exists
    pub has_more: bool,
    /// Total matching rows, when the server counts them
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
}

// ============================================================================
// Configuration
// ============================================================================

/// Configuration for the API client
#[derive(Debug, Clone)]
pub struct ApiClientConfig {
    /// Base URL of the list service
    pub base_url: Option<String>,
    /// Header carrying the tenant id
    pub tenant_header: String,
    /// Tenant id sent on every request
    pub tenant_id: Option<String>,
    /// Bearer token sent as `Authorization`
    pub bearer_token: Option<String>,
    /// Request timeout
    pub timeout: Duration,
    /// Maximum number of retries
    pub max_retries: u32,
    /// Initial delay for backoff
    pub initial_backoff: Duration,
    /// Maximum delay for backoff
    pub max_backoff: Duration,
    /// Type of backoff strategy
    pub backoff_type: BackoffType,
    /// Rate limiter configuration
    pub rate_limit: Option<RateLimiterConfig>,
    /// User agent string
    pub user_agent: String,
}

impl Default for ApiClientConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            tenant_header: "x-tenant-id".to_string(),
            tenant_id: None,
            bearer_token: None,
            timeout: Duration::from_secs(30),
            max_retries: 3,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(60),
            backoff_type: BackoffType::Exponential,
            rate_limit: Some(RateLimiterConfig::default()),
            user_agent: format!("crm-cursor/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl ApiClientConfig {
    /// Create a new config builder
    pub fn builder() -> ApiClientConfigBuilder {
        ApiClientConfigBuilder::default()
    }
}

/// Builder for [`ApiClientConfig`]
#[derive(Debug, Default)]
pub struct ApiClientConfigBuilder {
    config: ApiClientConfig,
}

impl ApiClientConfigBuilder {
    /// Set the base URL
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = Some(url.into());
        self
    }

    /// Set the tenant sent with every request
    pub fn tenant(mut self, tenant_id: impl Into<String>) -> Self {
        self.config.tenant_id = Some(tenant_id.into());
        self
    }

    /// Override the tenant header name
    pub fn tenant_header(mut self, header: impl Into<String>) -> Self {
        self.config.tenant_header = header.into();
        self
    }

    /// Set a bearer token
    pub fn bearer_token(mut self, token: impl Into<String>) -> Self {
        self.config.bearer_token = Some(token.into());
        self
    }

    /// Set the request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Set max retries
    pub fn max_retries(mut self, retries: u32) -> Self {
        self.config.max_retries = retries;
        self
    }

    /// Set backoff configuration
    pub fn backoff(mut self, backoff_type: BackoffType, initial: Duration, max: Duration) -> Self {
        self.config.backoff_type = backoff_type;
        self.config.initial_backoff = initial;
        self.config.max_backoff = max;
        self
    }

    /// Set rate limiter
    pub fn rate_limit(mut self, config: RateLimiterConfig) -> Self {
        self.config.rate_limit = Some(config);
        self
    }

    /// Disable rate limiting
    pub fn no_rate_limit(mut self) -> Self {
        self.config.rate_limit = None;
        self
    }

    /// Set user agent
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.config.user_agent = agent.into();
        self
    }

    /// Build the config
    pub fn build(self) -> ApiClientConfig {
        self.config
    }
}

// ============================================================================
// Client
// ============================================================================

/// Client for a cursor-paginated list service
pub struct ApiClient {
    client: Client,
    base_url: Url,
    config: ApiClientConfig,
    rate_limiter: Option<RateLimiter>,
}

impl ApiClient {
    /// Create a client
    pub fn new(config: ApiClientConfig) -> Result<Self> {
        let base = config
            .base_url
            .as_deref()
            .ok_or_else(|| Error::missing_field("base_url"))?;
        // A trailing slash makes `join` append instead of replacing the last segment
        let base_url = if base.ends_with('/') {
            Url::parse(base)?
        } else {
            Url::parse(&format!("{base}/"))?
        };

        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()?;

        let rate_limiter = config.rate_limit.as_ref().map(RateLimiter::new);

        Ok(Self {
            client,
            base_url,
            config,
            rate_limiter,
        })
    }

    /// Base URL requests are resolved against
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Check if rate limiting is enabled
    pub fn has_rate_limiter(&self) -> bool {
        self.rate_limiter.is_some()
    }

    /// Fetch one page of `resource`
    pub async fn list_page<T: DeserializeOwned>(
        &self,
        resource: &str,
        filters: &FilterSet,
        cursor: Option<&str>,
        limit: Option<u32>,
    ) -> Result<ListPage<T>> {
        let url = self.page_url(resource, filters, cursor, limit)?;
        let response = self.send(&url).await?;
        let page: ListPage<T> = response.json().await?;
        debug!(
            resource,
            rows = page.data.len(),
            has_more = page.has_more,
            "Fetched page"
        );
        Ok(page)
    }

    /// Stream pages of `resource`, starting at `cursor` (or the first page)
    /// and following `nextCursor` until the server reports `hasMore: false`
    pub fn pages<'a, T>(
        &'a self,
        resource: &'a str,
        filters: &'a FilterSet,
        cursor: Option<&str>,
        page_size: Option<u32>,
    ) -> impl Stream<Item = Result<ListPage<T>>> + 'a
    where
        T: DeserializeOwned + 'a,
    {
        // `None` once the last page has been yielded
        let start: Option<Option<String>> = Some(cursor.map(String::from));
        stream::try_unfold(start, move |state| async move {
            let Some(cursor) = state else {
                return Ok(None);
            };
            let page: ListPage<T> = self
                .list_page(resource, filters, cursor.as_deref(), page_size)
                .await?;
            let next = match &page.next_cursor {
                Some(next) if page.has_more => Some(Some(next.clone())),
                _ => None,
            };
            Ok::<_, Error>(Some((page, next)))
        })
    }

    /// Collect every row of `resource` from `cursor` onwards, stopping early
    /// after `max_pages`
    pub async fn list_all<T: DeserializeOwned>(
        &self,
        resource: &str,
        filters: &FilterSet,
        cursor: Option<&str>,
        page_size: Option<u32>,
        max_pages: Option<usize>,
    ) -> Result<Vec<T>> {
        let mut pages = pin!(self.pages(resource, filters, cursor, page_size));
        let mut rows = Vec::new();
        let mut fetched = 0usize;

        while let Some(page) = pages.try_next().await? {
            fetched += 1;
            rows.extend(page.data);
            if max_pages.is_some_and(|max| fetched >= max) {
                debug!(resource, pages = fetched, "Stopping at page limit");
                break;
            }
        }

        Ok(rows)
    }

    /// Build the URL for one page request
    pub fn page_url(
        &self,
        resource: &str,
        filters: &FilterSet,
        cursor: Option<&str>,
        limit: Option<u32>,
    ) -> Result<Url> {
        let mut url = self.base_url.join(resource.trim_start_matches('/'))?;
        {
            let mut query = url.query_pairs_mut();
            for (name, value) in filters.iter() {
                query.append_pair(name, &value.to_string());
            }
            if let Some(limit) = limit {
                query.append_pair("limit", &limit.to_string());
            }
            if let Some(cursor) = cursor {
                query.append_pair("cursor", cursor);
            }
        }
        if url.query() == Some("") {
            url.set_query(None);
        }
        Ok(url)
    }

    /// Send a GET with retries
    async fn send(&self, url: &Url) -> Result<Response> {
        let max_retries = self.config.max_retries;
        let mut last_error = None;
        let mut attempt = 0;

        while attempt <= max_retries {
            if let Some(ref limiter) = self.rate_limiter {
                limiter.wait().await;
            }

            let mut req = self.client.get(url.clone());
            if let Some(ref tenant) = self.config.tenant_id {
                req = req.header(self.config.tenant_header.as_str(), tenant.as_str());
            }
            if let Some(ref token) = self.config.bearer_token {
                req = req.bearer_auth(token);
            }

            match req.send().await {
                Ok(response) => {
                    let status = response.status();

                    if status == StatusCode::TOO_MANY_REQUESTS {
                        let retry_after = extract_retry_after(&response);
                        if attempt < max_retries {
                            warn!(
                                "Rate limited (429), attempt {}/{}, waiting {}s",
                                attempt + 1,
                                max_retries + 1,
                                retry_after
                            );
                            tokio::time::sleep(Duration::from_secs(retry_after)).await;
                            attempt += 1;
                            continue;
                        }
                        return Err(Error::RateLimited {
                            retry_after_seconds: retry_after,
                        });
                    }

                    if is_retryable_status(status.as_u16()) && attempt < max_retries {
                        let delay = self.calculate_backoff(attempt);
                        warn!(
                            "Request failed with {}, attempt {}/{}, retrying in {:?}",
                            status.as_u16(),
                            attempt + 1,
                            max_retries + 1,
                            delay
                        );
                        tokio::time::sleep(delay).await;
                        attempt += 1;
                        last_error = Some(Error::http_status(status.as_u16(), ""));
                        continue;
                    }

                    if status.is_client_error() || status.is_server_error() {
                        let body = response.text().await.unwrap_or_default();
                        return Err(Error::http_status(status.as_u16(), error_message(body)));
                    }

                    debug!("Request succeeded: GET {}", url);
                    return Ok(response);
                }
                Err(e) => {
                    let timed_out = e.is_timeout();
                    if (timed_out || e.is_connect()) && attempt < max_retries {
                        let delay = self.calculate_backoff(attempt);
                        warn!(
                            "{}, attempt {}/{}, retrying in {:?}",
                            if timed_out { "Request timeout" } else { "Connection error" },
                            attempt + 1,
                            max_retries + 1,
                            delay
                        );
                        tokio::time::sleep(delay).await;
                        attempt += 1;
                        last_error = Some(if timed_out {
                            Error::Timeout {
                                timeout_ms: self.config.timeout.as_millis() as u64,
                            }
                        } else {
                            Error::Http(e)
                        });
                        continue;
                    }
                    if timed_out {
                        return Err(Error::Timeout {
                            timeout_ms: self.config.timeout.as_millis() as u64,
                        });
                    }
                    return Err(Error::Http(e));
                }
            }
        }

        Err(last_error.unwrap_or(Error::MaxRetriesExceeded { max_retries }))
    }

    /// Calculate backoff delay for a given attempt
    pub fn calculate_backoff(&self, attempt: u32) -> Duration {
        let delay = match self.config.backoff_type {
            BackoffType::Constant => self.config.initial_backoff,
            BackoffType::Linear => self.config.initial_backoff * (attempt + 1),
            BackoffType::Exponential => {
                let factor = 2u32.saturating_pow(attempt);
                self.config.initial_backoff.saturating_mul(factor)
            }
        };

        std::cmp::min(delay, self.config.max_backoff)
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url.as_str())
            .field("tenant_id", &self.config.tenant_id)
            .field("has_bearer_token", &self.config.bearer_token.is_some())
            .field("has_rate_limiter", &self.rate_limiter.is_some())
            .finish_non_exhaustive()
    }
}

/// Pull `error` out of a `{"error": "..."}` body, or return the body as is
fn error_message(body: String) -> String {
    serde_json::from_str::<serde_json::Value>(&body)
        .ok()
        .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(String::from))
        .unwrap_or(body)
}

/// Extract retry-after header value
fn extract_retry_after(response: &Response) -> u64 {
    response
        .headers()
        .get("retry-after")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.parse().ok())
        .unwrap_or(60)
}
