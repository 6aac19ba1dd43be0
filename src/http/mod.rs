//! HTTP client module
//!
//! Client for the list service's cursor-paginated endpoints.
//!
//! # Features
//!
//! - **Cursor Walking**: Fetch one page or follow `nextCursor` to the end
//! - **Automatic Retries**: Configurable retry logic with backoff
//! - **Rate Limiting**: Token bucket rate limiter using governor

mod client;
mod rate_limit;

pub use client::{ApiClient, ApiClientConfig, ApiClientConfigBuilder, ListPage};
pub use rate_limit::{RateLimiter, RateLimiterConfig};
