//! Error types for the cursor pagination service
//!
//! This module defines the error hierarchy for the entire crate.
//! All public APIs return `Result<T, Error>` where Error is defined here.
//!
//! Only [`Error::TenantMismatch`] and data layer failures are meant to reach a
//! caller of a list endpoint. Cursor format problems are recovered by the
//! validator and never leave it.

use thiserror::Error;

/// The main error type for the crate
#[derive(Error, Debug)]
pub enum Error {
    // ============================================================================
    // Configuration Errors
    // ============================================================================
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Missing required config field: {field}")]
    MissingConfigField { field: String },

    #[error("Invalid config value for '{field}': {message}")]
    InvalidConfigValue { field: String, message: String },

    #[error("Failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    // ============================================================================
    // Cursor Errors
    // ============================================================================
    #[error("Invalid cursor: {reason}")]
    InvalidCursor { reason: String },

    #[error("Cursor was minted for tenant '{token_tenant}', request is for tenant '{request_tenant}'")]
    TenantMismatch {
        token_tenant: String,
        request_tenant: String,
    },

    // ============================================================================
    // Request Errors
    // ============================================================================
    #[error("Invalid filter '{name}': {message}")]
    InvalidFilter { name: String, message: String },

    #[error("Unknown resource: {resource}")]
    UnknownResource { resource: String },

    #[error("Missing tenant: header '{header}' not present")]
    MissingTenant { header: String },

    // ============================================================================
    // Data Layer Errors
    // ============================================================================
    #[error("Data layer failure: {message}")]
    DataLayer { message: String },

    #[error("Database error: {0}")]
    Database(#[from] duckdb::Error),

    // ============================================================================
    // HTTP Client Errors
    // ============================================================================
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    #[error("Rate limited, retry after {retry_after_seconds}s")]
    RateLimited { retry_after_seconds: u64 },

    #[error("Request timeout after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("Max retries ({max_retries}) exceeded")]
    MaxRetriesExceeded { max_retries: u32 },

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    // ============================================================================
    // I/O Errors
    // ============================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("File not found: {path}")]
    FileNotFound { path: String },
}

impl Error {
    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a missing field error
    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingConfigField {
            field: field.into(),
        }
    }

    /// Create an invalid config value error
    pub fn invalid_config(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConfigValue {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create an invalid cursor error
    pub fn invalid_cursor(reason: impl Into<String>) -> Self {
        Self::InvalidCursor {
            reason: reason.into(),
        }
    }

    /// Create a tenant mismatch error
    pub fn tenant_mismatch(token_tenant: impl Into<String>, request_tenant: impl Into<String>) -> Self {
        Self::TenantMismatch {
            token_tenant: token_tenant.into(),
            request_tenant: request_tenant.into(),
        }
    }

    /// Create an invalid filter error
    pub fn invalid_filter(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidFilter {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Create a data layer error
    pub fn data_layer(message: impl Into<String>) -> Self {
        Self::DataLayer {
            message: message.into(),
        }
    }

    /// Create an HTTP status error
    pub fn http_status(status: u16, body: impl Into<String>) -> Self {
        Self::HttpStatus {
            status,
            body: body.into(),
        }
    }

    /// True only for the cross-tenant cursor rejection
    pub fn is_authorization(&self) -> bool {
        matches!(self, Error::TenantMismatch { .. })
    }

    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Http(_) | Error::RateLimited { .. } | Error::Timeout { .. } => true,
            Error::HttpStatus { status, .. } => is_retryable_status(*status),
            _ => false,
        }
    }

    /// HTTP status code a list endpoint answers with for this error
    pub fn status_code(&self) -> u16 {
        match self {
            Error::TenantMismatch { .. } => 403,
            Error::MissingTenant { .. } => 401,
            Error::InvalidFilter { .. } | Error::InvalidCursor { .. } => 400,
            Error::UnknownResource { .. } => 404,
            Error::DataLayer { .. } | Error::Database(_) => 502,
            _ => 500,
        }
    }
}

/// Check if an HTTP status code is retryable
pub(crate) fn is_retryable_status(status: u16) -> bool {
    matches!(status, 429 | 500 | 502 | 503 | 504)
}

/// Result type alias for the crate
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::config("test message");
        assert_eq!(err.to_string(), "Configuration error: test message");

        let err = Error::invalid_cursor("not base64");
        assert_eq!(err.to_string(), "Invalid cursor: not base64");

        let err = Error::tenant_mismatch("t1", "t2");
        assert_eq!(
            err.to_string(),
            "Cursor was minted for tenant 't1', request is for tenant 't2'"
        );
    }

    #[test]
    fn test_only_tenant_mismatch_is_authorization() {
        assert!(Error::tenant_mismatch("a", "b").is_authorization());
        assert!(!Error::invalid_cursor("bad").is_authorization());
        assert!(!Error::data_layer("down").is_authorization());
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(Error::tenant_mismatch("a", "b").status_code(), 403);
        assert_eq!(Error::invalid_filter("score", "nan").status_code(), 400);
        assert_eq!(
            Error::UnknownResource {
                resource: "x".into()
            }
            .status_code(),
            404
        );
        assert_eq!(Error::data_layer("down").status_code(), 502);
        assert_eq!(Error::config("x").status_code(), 500);
    }

    #[test]
    fn test_is_retryable() {
        assert!(Error::RateLimited {
            retry_after_seconds: 60
        }
        .is_retryable());
        assert!(Error::Timeout { timeout_ms: 1000 }.is_retryable());
        assert!(Error::http_status(503, "").is_retryable());

        assert!(!Error::http_status(403, "").is_retryable());
        assert!(!Error::tenant_mismatch("a", "b").is_retryable());
    }
}
