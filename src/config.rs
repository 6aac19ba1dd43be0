//! Service configuration
//!
//! YAML configuration for the list service: server binding, page limits,
//! cursor settings, the DuckDB database and the list resources it exposes.
//! Every section has defaults so a partial file is valid.

use crate::cursor::{CursorCodec, DEFAULT_MAX_TOKEN_LEN};
use crate::error::{Error, Result};
use crate::fingerprint::{FilterKind, FingerprintAlgorithm};
use crate::pagination::{PageLimits, PaginationController};
use crate::types::MAX_PAGE_LIMIT;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Configuration used when no file is given: the five CRM list resources
pub const BUILTIN_CONFIG: &str = include_str!("builtin_config.yaml");

// ============================================================================
// Top-Level Config
// ============================================================================

/// Complete service configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// HTTP server settings
    #[serde(default)]
    pub server: ServerSettings,

    /// Page size settings
    #[serde(default)]
    pub pagination: PaginationSettings,

    /// Cursor token settings
    #[serde(default)]
    pub cursor: CursorSettings,

    /// Database settings
    #[serde(default)]
    pub database: DatabaseSettings,

    /// List resources by name
    #[serde(default)]
    pub resources: BTreeMap<String, ResourceConfig>,
}

impl ServiceConfig {
    /// Parse and validate a YAML document
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a YAML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::FileNotFound {
                    path: path.display().to_string(),
                }
            } else {
                Error::Io(e)
            }
        })?;
        Self::from_yaml_str(&content)
    }

    /// The built-in configuration
    pub fn builtin() -> Result<Self> {
        Self::from_yaml_str(BUILTIN_CONFIG)
    }

    /// Load from `path` if given, otherwise the built-in configuration
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => Self::builtin(),
        }
    }

    /// Check limits and identifiers
    pub fn validate(&self) -> Result<()> {
        if self.pagination.max_limit == 0 || self.pagination.max_limit > MAX_PAGE_LIMIT {
            return Err(Error::invalid_config(
                "pagination.max_limit",
                format!("must be within 1..={MAX_PAGE_LIMIT}"),
            ));
        }
        if self.pagination.default_limit == 0
            || self.pagination.default_limit > self.pagination.max_limit
        {
            return Err(Error::invalid_config(
                "pagination.default_limit",
                "must be within 1..=max_limit",
            ));
        }
        if self.cursor.max_token_len == 0 {
            return Err(Error::invalid_config(
                "cursor.max_token_len",
                "must be positive",
            ));
        }
        if matches!(&self.cursor.signing_secret, Some(secret) if secret.is_empty()) {
            return Err(Error::invalid_config(
                "cursor.signing_secret",
                "must not be empty when set",
            ));
        }
        if self.server.tenant_header.trim().is_empty() {
            return Err(Error::missing_field("server.tenant_header"));
        }

        for (name, resource) in &self.resources {
            resource.validate(name)?;
        }
        Ok(())
    }

    /// Look up a resource
    pub fn resource(&self, name: &str) -> Result<&ResourceConfig> {
        self.resources
            .get(name)
            .ok_or_else(|| Error::UnknownResource {
                resource: name.to_string(),
            })
    }

    /// Build the cursor codec described by `cursor`
    pub fn codec(&self) -> CursorCodec {
        let codec = match &self.cursor.signing_secret {
            Some(secret) => CursorCodec::signed(secret.as_bytes().to_vec()),
            None => CursorCodec::new(),
        };
        codec.with_max_token_len(self.cursor.max_token_len)
    }

    /// Build the pagination controller described by this configuration
    pub fn controller(&self) -> PaginationController {
        PaginationController::new(
            self.codec(),
            self.cursor.fingerprint,
            PageLimits::new(self.pagination.default_limit, self.pagination.max_limit),
        )
    }
}

// ============================================================================
// Sections
// ============================================================================

/// HTTP server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    /// Bind address
    #[serde(default = "default_host")]
    pub host: String,

    /// Bind port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Header carrying the authenticated tenant, set by the auth layer
    #[serde(default = "default_tenant_header")]
    pub tenant_header: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            tenant_header: default_tenant_header(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_tenant_header() -> String {
    "x-tenant-id".to_string()
}

/// Page size settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginationSettings {
    /// Page size when the request carries none
    #[serde(default = "default_limit")]
    pub default_limit: u32,

    /// Largest page size served; requests above it are clamped
    #[serde(default = "default_max_limit")]
    pub max_limit: u32,

    /// Ask the data layer for a `total` count on every page
    #[serde(default)]
    pub include_total: bool,
}

impl Default for PaginationSettings {
    fn default() -> Self {
        Self {
            default_limit: default_limit(),
            max_limit: default_max_limit(),
            include_total: false,
        }
    }
}

fn default_limit() -> u32 {
    25
}

fn default_max_limit() -> u32 {
    100
}

/// Cursor token settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CursorSettings {
    /// Filter fingerprint digest
    #[serde(default)]
    pub fingerprint: FingerprintAlgorithm,

    /// HMAC key; when set, tokens are signed and unsigned tokens are refused
    #[serde(default)]
    pub signing_secret: Option<String>,

    /// Longest accepted token
    #[serde(default = "default_max_token_len")]
    pub max_token_len: usize,
}

impl Default for CursorSettings {
    fn default() -> Self {
        Self {
            fingerprint: FingerprintAlgorithm::default(),
            signing_secret: None,
            max_token_len: default_max_token_len(),
        }
    }
}

fn default_max_token_len() -> usize {
    DEFAULT_MAX_TOKEN_LEN
}

/// Database settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// DuckDB database file, or `:memory:`
    #[serde(default = "default_database_path")]
    pub path: String,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            path: default_database_path(),
        }
    }
}

fn default_database_path() -> String {
    ":memory:".to_string()
}

// ============================================================================
// Resources
// ============================================================================

/// One list endpoint and the table behind it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceConfig {
    /// Table name
    pub table: String,

    /// Column holding the stable sort/position key
    #[serde(default = "default_key_column")]
    pub key_column: String,

    /// Column holding the tenant id
    #[serde(default = "default_tenant_column")]
    pub tenant_column: String,

    /// Columns returned for each row (the key column is always returned)
    #[serde(default)]
    pub columns: Vec<String>,

    /// Accepted filters and their kinds; filter names are column names
    #[serde(default)]
    pub filters: BTreeMap<String, FilterKind>,
}

impl ResourceConfig {
    /// Create a resource over `table` with default key and tenant columns
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            key_column: default_key_column(),
            tenant_column: default_tenant_column(),
            columns: Vec::new(),
            filters: BTreeMap::new(),
        }
    }

    /// Add a returned column
    #[must_use]
    pub fn column(mut self, name: impl Into<String>) -> Self {
        self.columns.push(name.into());
        self
    }

    /// Declare a filter
    #[must_use]
    pub fn filter(mut self, name: impl Into<String>, kind: FilterKind) -> Self {
        self.filters.insert(name.into(), kind);
        self
    }

    /// Columns to select, key column first and without duplicates
    pub fn selected_columns(&self) -> Vec<&str> {
        let mut selected = vec![self.key_column.as_str()];
        for column in &self.columns {
            if !selected.contains(&column.as_str()) {
                selected.push(column.as_str());
            }
        }
        selected
    }

    fn validate(&self, name: &str) -> Result<()> {
        let field = |suffix: &str| format!("resources.{name}.{suffix}");

        if !is_identifier(name) {
            return Err(Error::invalid_config(
                format!("resources.{name}"),
                "resource names may only contain letters, digits and '_'",
            ));
        }
        for (suffix, ident) in [
            ("table", &self.table),
            ("key_column", &self.key_column),
            ("tenant_column", &self.tenant_column),
        ] {
            if !is_identifier(ident) {
                return Err(Error::invalid_config(
                    field(suffix),
                    format!("'{ident}' is not a plain identifier"),
                ));
            }
        }
        for column in self.columns.iter().chain(self.filters.keys()) {
            if !is_identifier(column) {
                return Err(Error::invalid_config(
                    field("columns"),
                    format!("'{column}' is not a plain identifier"),
                ));
            }
        }
        for reserved in ["cursor", "limit"] {
            if self.filters.contains_key(reserved) {
                return Err(Error::invalid_config(
                    field("filters"),
                    format!("'{reserved}' is a reserved query parameter"),
                ));
            }
        }
        Ok(())
    }
}

fn default_key_column() -> String {
    "id".to_string()
}

fn default_tenant_column() -> String {
    "tenant_id".to_string()
}

/// `[A-Za-z_][A-Za-z0-9_]*`
pub fn is_identifier(value: &str) -> bool {
    let mut chars = value.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn test_builtin_config_has_crm_resources() {
        let config = ServiceConfig::builtin().unwrap();
        let names: Vec<&str> = config.resources.keys().map(String::as_str).collect();
        assert_eq!(
            names,
            vec![
                "contracts",
                "customers",
                "leads",
                "marketplace_leads",
                "opportunities"
            ]
        );
        assert_eq!(
            config.resource("leads").unwrap().filters.get("score"),
            Some(&FilterKind::Number)
        );
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config = ServiceConfig::from_yaml_str("pagination:\n  max_limit: 50\n").unwrap();
        assert_eq!(config.pagination.max_limit, 50);
        assert_eq!(config.pagination.default_limit, 25);
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.tenant_header, "x-tenant-id");
        assert_eq!(config.cursor.fingerprint, FingerprintAlgorithm::Sha256);
        assert_eq!(config.database.path, ":memory:");
        assert!(config.resources.is_empty());
    }

    #[test]
    fn test_parse_resource() {
        let yaml = r"
cursor:
  fingerprint: rolling
  signing_secret: s3cret
resources:
  leads:
    table: crm_leads
    columns: [name, status]
    filters:
      status: string
      archived: boolean
";
        let config = ServiceConfig::from_yaml_str(yaml).unwrap();
        let leads = config.resource("leads").unwrap();
        assert_eq!(leads.table, "crm_leads");
        assert_eq!(leads.key_column, "id");
        assert_eq!(leads.selected_columns(), vec!["id", "name", "status"]);
        assert_eq!(leads.filters.get("archived"), Some(&FilterKind::Boolean));
        assert_eq!(config.cursor.fingerprint, FingerprintAlgorithm::Rolling);
        assert!(config.codec().is_signed());
    }

    #[test]
    fn test_validate_rejects_bad_limits() {
        assert!(ServiceConfig::from_yaml_str("pagination:\n  max_limit: 20000\n").is_err());
        assert!(ServiceConfig::from_yaml_str("pagination:\n  max_limit: 0\n").is_err());
        assert!(ServiceConfig::from_yaml_str(
            "pagination:\n  default_limit: 200\n  max_limit: 100\n"
        )
        .is_err());
    }

    #[test]
    fn test_validate_rejects_unsafe_identifiers() {
        let yaml = "resources:\n  leads:\n    table: \"leads; DROP TABLE x\"\n";
        let err = ServiceConfig::from_yaml_str(yaml).unwrap_err();
        assert!(matches!(err, Error::InvalidConfigValue { .. }));

        let yaml = "resources:\n  leads:\n    table: leads\n    filters:\n      \"a b\": string\n";
        assert!(ServiceConfig::from_yaml_str(yaml).is_err());
    }

    #[test]
    fn test_validate_rejects_reserved_filter_names() {
        let yaml = "resources:\n  leads:\n    table: leads\n    filters:\n      cursor: string\n";
        assert!(ServiceConfig::from_yaml_str(yaml).is_err());
    }

    #[test]
    fn test_unknown_resource() {
        let config = ServiceConfig::default();
        assert!(matches!(
            config.resource("invoices"),
            Err(Error::UnknownResource { .. })
        ));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "server:\n  port: 9090").unwrap();
        let config = ServiceConfig::from_file(file.path()).unwrap();
        assert_eq!(config.server.port, 9090);

        let missing = ServiceConfig::from_file("/definitely/not/here.yaml").unwrap_err();
        assert!(matches!(missing, Error::FileNotFound { .. }));
    }

    #[test]
    fn test_is_identifier() {
        assert!(is_identifier("tenant_id"));
        assert!(is_identifier("_x1"));
        assert!(!is_identifier("1abc"));
        assert!(!is_identifier(""));
        assert!(!is_identifier("a-b"));
        assert!(!is_identifier("a\"b"));
    }
}
