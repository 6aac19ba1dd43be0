//! CLI runner - executes commands

use crate::cli::commands::{Cli, Commands, OutputFormat};
use crate::config::ServiceConfig;
use crate::cursor::CursorToken;
use crate::error::{Error, Result};
use crate::fingerprint::{
    canonical_form, FilterFingerprint, FilterKind, FilterSet, FingerprintAlgorithm,
};
use crate::http::{ApiClient, ApiClientConfig, ListPage};
use crate::source::DuckDbSource;
use crate::types::JsonValue;
use serde_json::json;
use std::fs;
use std::path::Path;
use std::sync::Arc;

/// CLI runner
pub struct Runner {
    cli: Cli,
}

impl Runner {
    /// Create a new runner
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Run the CLI command
    pub async fn run(&self) -> Result<()> {
        match &self.cli.command {
            Commands::Serve { port, seed } => self.serve(*port, seed.as_deref()).await,
            Commands::Encode {
                key,
                tenant,
                filters,
                limit,
            } => self.encode(key, tenant, filters, *limit),
            Commands::Decode { token } => self.decode(token),
            Commands::Fingerprint { filters, algorithm } => {
                self.fingerprint(filters, *algorithm)
            }
            Commands::Fetch {
                base_url,
                tenant,
                resource,
                filters,
                limit,
                cursor,
                all,
                max_pages,
                token,
            } => {
                let client = self.build_client(base_url, tenant, token.as_deref())?;
                let filters = self.parse_filters(resource, filters)?;
                if *all {
                    let start = cursor.as_deref();
                    self.fetch_all(&client, resource, &filters, start, *limit, *max_pages)
                        .await
                } else {
                    self.fetch_page(&client, resource, &filters, cursor.as_deref(), *limit)
                        .await
                }
            }
            Commands::Resources => self.resources(),
            Commands::Validate => self.validate(),
        }
    }

    /// Load the service configuration
    fn load_config(&self) -> Result<ServiceConfig> {
        ServiceConfig::load(self.cli.config.as_deref())
    }

    /// Run the list service over the configured DuckDB database
    async fn serve(&self, port: Option<u16>, seed: Option<&Path>) -> Result<()> {
        let mut config = self.load_config()?;
        if let Some(port) = port {
            config.server.port = port;
        }

        let source = DuckDbSource::open(&config.database.path, config.resources.clone())?;
        if let Some(seed) = seed {
            let sql = fs::read_to_string(seed).map_err(|e| {
                Error::config(format!("Failed to read seed file {}: {e}", seed.display()))
            })?;
            source.execute_batch(&sql)?;
            tracing::info!(seed = %seed.display(), "Seeded database");
        }

        crate::cli::serve(config, Arc::new(source)).await
    }

    /// Mint a cursor token
    fn encode(&self, key: &str, tenant: &str, filters: &str, limit: u32) -> Result<()> {
        let config = self.load_config()?;
        let filters = FilterSet::from_json_str(filters)?;
        let fingerprint = FilterFingerprint::new(config.cursor.fingerprint).compute(&filters);

        let token = CursorToken::new(key, tenant, fingerprint.clone(), limit);
        if !token.has_valid_limit() {
            return Err(Error::invalid_config("limit", "must be within 1..=10000"));
        }
        let cursor = config.codec().encode(&token)?;

        self.output_message(&json!({
            "type": "CURSOR",
            "cursor": cursor,
            "fingerprint": fingerprint,
        }));
        Ok(())
    }

    /// Decode a cursor token
    fn decode(&self, encoded: &str) -> Result<()> {
        let config = self.load_config()?;
        let token = config.codec().decode(encoded)?;

        self.output_message(&json!({
            "type": "TOKEN",
            "token": {
                "last_key": token.last_key,
                "tenant_id": token.tenant_id,
                "filter_fingerprint": token.filter_fingerprint,
                "limit": token.limit,
            }
        }));
        Ok(())
    }

    /// Compute a filter fingerprint
    fn fingerprint(
        &self,
        filters: &str,
        algorithm: Option<FingerprintAlgorithm>,
    ) -> Result<()> {
        let filters = FilterSet::from_json_str(filters)?;
        let algorithm = match algorithm {
            Some(algorithm) => algorithm,
            None => self.load_config()?.cursor.fingerprint,
        };

        self.output_message(&json!({
            "type": "FINGERPRINT",
            "algorithm": algorithm,
            "canonical": canonical_form(&filters),
            "fingerprint": FilterFingerprint::new(algorithm).compute(&filters),
        }));
        Ok(())
    }

    /// Build an API client for `fetch`
    fn build_client(&self, base_url: &str, tenant: &str, token: Option<&str>) -> Result<ApiClient> {
        let config = self.load_config()?;
        let mut builder = ApiClientConfig::builder()
            .base_url(base_url)
            .tenant_header(config.server.tenant_header)
            .tenant(tenant);
        if let Some(token) = token {
            builder = builder.bearer_token(token);
        }
        ApiClient::new(builder.build())
    }

    /// Parse `name=value` filters, typed by the resource's declared kinds when
    /// the configuration knows the resource
    fn parse_filters(&self, resource: &str, raw: &[String]) -> Result<FilterSet> {
        let config = self.load_config()?;
        let declared = config.resources.get(resource);

        let mut filters = FilterSet::new();
        for pair in raw {
            let (name, value) = pair
                .split_once('=')
                .ok_or_else(|| Error::invalid_filter(pair, "expected NAME=VALUE"))?;
            let kind = declared
                .and_then(|r| r.filters.get(name).copied())
                .unwrap_or(FilterKind::String);
            filters.insert_optional(name, kind.parse(name, value)?);
        }
        Ok(filters)
    }

    /// Fetch one page and print it
    async fn fetch_page(
        &self,
        client: &ApiClient,
        resource: &str,
        filters: &FilterSet,
        cursor: Option<&str>,
        limit: Option<u32>,
    ) -> Result<()> {
        let page: ListPage<JsonValue> = client.list_page(resource, filters, cursor, limit).await?;
        self.output_message(&serde_json::to_value(&page)?);
        Ok(())
    }

    /// Follow cursors from `cursor` (or the first page) and print one row per line
    async fn fetch_all(
        &self,
        client: &ApiClient,
        resource: &str,
        filters: &FilterSet,
        cursor: Option<&str>,
        limit: Option<u32>,
        max_pages: Option<usize>,
    ) -> Result<()> {
        let rows: Vec<JsonValue> = client
            .list_all(resource, filters, cursor, limit, max_pages)
            .await?;
        tracing::info!(resource, rows = rows.len(), "Fetched all pages");
        for row in &rows {
            self.output_message(row);
        }
        Ok(())
    }

    /// List configured resources
    fn resources(&self) -> Result<()> {
        let config = self.load_config()?;
        for (name, resource) in &config.resources {
            self.output_message(&json!({
                "type": "RESOURCE",
                "name": name,
                "table": resource.table,
                "key_column": resource.key_column,
                "filters": resource.filters,
            }));
        }
        Ok(())
    }

    /// Validate the configuration
    fn validate(&self) -> Result<()> {
        let config = self.load_config()?;

        self.output_message(&json!({
            "type": "LOG",
            "log": {
                "level": "INFO",
                "message": format!(
                    "Configuration is valid with {} resources",
                    config.resources.len()
                )
            }
        }));
        Ok(())
    }

    fn output_message(&self, msg: &JsonValue) {
        match self.cli.format {
            OutputFormat::Json => {
                println!("{}", serde_json::to_string(msg).unwrap_or_default());
            }
            OutputFormat::Pretty => {
                println!("{}", serde_json::to_string_pretty(msg).unwrap_or_default());
            }
        }
    }
}
