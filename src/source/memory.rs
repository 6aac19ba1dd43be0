//! In-memory row source

use crate::error::Result;
use crate::fingerprint::FilterSet;
use crate::pagination::{RowSource, SourceQuery, SourceRow};
use crate::types::JsonValue;
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::ops::Bound;
use tokio::sync::RwLock;

type Table = BTreeMap<String, JsonValue>;

/// Rows held in memory, keyed by `(tenant, resource)` and sorted by key
#[derive(Debug, Default)]
pub struct MemorySource {
    tables: RwLock<HashMap<(String, String), Table>>,
}

impl MemorySource {
    /// Create an empty source
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a row
    pub async fn insert(
        &self,
        tenant_id: &str,
        resource: &str,
        key: impl Into<String>,
        item: JsonValue,
    ) {
        let mut tables = self.tables.write().await;
        tables
            .entry((tenant_id.to_string(), resource.to_string()))
            .or_default()
            .insert(key.into(), item);
    }

    /// Remove a row, returning it if present
    pub async fn remove(&self, tenant_id: &str, resource: &str, key: &str) -> Option<JsonValue> {
        let mut tables = self.tables.write().await;
        tables
            .get_mut(&(tenant_id.to_string(), resource.to_string()))
            .and_then(|table| table.remove(key))
    }

    /// Number of rows stored for a tenant and resource
    pub async fn len(&self, tenant_id: &str, resource: &str) -> usize {
        let tables = self.tables.read().await;
        tables
            .get(&(tenant_id.to_string(), resource.to_string()))
            .map_or(0, BTreeMap::len)
    }
}

#[async_trait]
impl RowSource for MemorySource {
    type Item = JsonValue;

    async fn fetch(&self, query: &SourceQuery) -> Result<Vec<SourceRow<JsonValue>>> {
        let tables = self.tables.read().await;
        let Some(table) = tables.get(&(query.tenant_id.clone(), query.resource.clone())) else {
            return Ok(Vec::new());
        };

        let lower = match &query.start_after {
            Some(key) => Bound::Excluded(key.clone()),
            None => Bound::Unbounded,
        };

        Ok(table
            .range((lower, Bound::Unbounded))
            .filter(|(_, item)| query.filters.matches(item))
            .take(query.fetch_limit)
            .map(|(key, item)| SourceRow::new(key.clone(), item.clone()))
            .collect())
    }

    async fn count(
        &self,
        tenant_id: &str,
        resource: &str,
        filters: &FilterSet,
    ) -> Result<Option<u64>> {
        let tables = self.tables.read().await;
        let count = tables
            .get(&(tenant_id.to_string(), resource.to_string()))
            .map_or(0, |table| {
                table.values().filter(|item| filters.matches(item)).count()
            });
        Ok(Some(count as u64))
    }
}
