//! DuckDB-backed row source
//!
//! Each resource maps to one table. Pages are read with a keyset query:
//!
//! ```sql
//! SELECT "id", "name", ... FROM "leads"
//! WHERE "tenant_id" = ? AND "status" = ? AND "id" > ?
//! ORDER BY "id" LIMIT 26
//! ```
//!
//! Identifiers come from validated configuration and are quoted; every value
//! is bound as a parameter.

use crate::config::{is_identifier, ResourceConfig};
use crate::error::{Error, Result};
use crate::fingerprint::{FilterSet, FilterValue};
use crate::pagination::{RowSource, SourceQuery, SourceRow};
use crate::types::{JsonObject, JsonValue};
use async_trait::async_trait;
use duckdb::types::Value;
use duckdb::{params_from_iter, Connection};
use std::collections::BTreeMap;
use std::sync::Mutex;

/// Row source reading DuckDB tables
pub struct DuckDbSource {
    conn: Mutex<Connection>,
    resources: BTreeMap<String, ResourceConfig>,
}

impl DuckDbSource {
    /// Open a database file, or an in-memory database for `:memory:`
    pub fn open(path: &str, resources: BTreeMap<String, ResourceConfig>) -> Result<Self> {
        let conn = if path.is_empty() || path == ":memory:" {
            Connection::open_in_memory()
        } else {
            Connection::open(path)
        }
        .map_err(|e| Error::config(format!("Failed to open DuckDB database '{path}': {e}")))?;

        tracing::debug!(path, resources = resources.len(), "Opened DuckDB source");
        Ok(Self {
            conn: Mutex::new(conn),
            resources,
        })
    }

    /// Open an in-memory database
    pub fn in_memory(resources: BTreeMap<String, ResourceConfig>) -> Result<Self> {
        Self::open(":memory:", resources)
    }

    /// Run one or more SQL statements (schema setup, seeding)
    pub fn execute_batch(&self, sql: &str) -> Result<()> {
        let conn = self.lock()?;
        conn.execute_batch(sql)?;
        Ok(())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| Error::data_layer("DuckDB connection lock poisoned"))
    }

    fn resource(&self, name: &str) -> Result<&ResourceConfig> {
        self.resources
            .get(name)
            .ok_or_else(|| Error::UnknownResource {
                resource: name.to_string(),
            })
    }

    /// Build the WHERE clause shared by page and count queries
    fn where_clause(
        resource: &ResourceConfig,
        tenant_id: &str,
        filters: &FilterSet,
    ) -> Result<(String, Vec<Value>)> {
        let mut predicates = vec![format!("{} = ?", quote(&resource.tenant_column))];
        let mut params = vec![Value::Text(tenant_id.to_string())];

        for (name, value) in filters.iter() {
            if !is_identifier(name) {
                return Err(Error::invalid_filter(name, "not a column name"));
            }
            predicates.push(format!("{} = ?", quote(name)));
            params.push(to_sql_value(value));
        }

        Ok((predicates.join(" AND "), params))
    }
}

#[async_trait]
impl RowSource for DuckDbSource {
    type Item = JsonValue;

    async fn fetch(&self, query: &SourceQuery) -> Result<Vec<SourceRow<JsonValue>>> {
        let resource = self.resource(&query.resource)?;
        let columns = resource.selected_columns();
        let (mut where_sql, mut params) =
            Self::where_clause(resource, &query.tenant_id, &query.filters)?;

        if let Some(after) = &query.start_after {
            where_sql.push_str(&format!(" AND {} > ?", quote(&resource.key_column)));
            params.push(Value::Text(after.clone()));
        }

        let select_list: Vec<String> = columns.iter().map(|c| quote(c)).collect();
        let sql = format!(
            "SELECT {} FROM {} WHERE {} ORDER BY {} LIMIT {}",
            select_list.join(", "),
            quote(&resource.table),
            where_sql,
            quote(&resource.key_column),
            query.fetch_limit,
        );
        tracing::debug!(sql = %sql, "Executing page query");

        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(&sql)
            .map_err(|e| Error::data_layer(format!("Failed to prepare page query: {e}")))?;

        let rows = stmt
            .query_map(params_from_iter(params), |row| {
                let mut object = JsonObject::new();
                let mut key = String::new();
                for (index, column) in columns.iter().enumerate() {
                    let value: Value = row.get(index)?;
                    if index == 0 {
                        key = key_string(&value);
                    }
                    object.insert((*column).to_string(), to_json(value));
                }
                Ok(SourceRow::new(key, JsonValue::Object(object)))
            })
            .map_err(|e| Error::data_layer(format!("Page query failed: {e}")))?
            .collect::<std::result::Result<Vec<_>, duckdb::Error>>()?;

        Ok(rows)
    }

    async fn count(
        &self,
        tenant_id: &str,
        resource: &str,
        filters: &FilterSet,
    ) -> Result<Option<u64>> {
        let resource = self.resource(resource)?;
        let (where_sql, params) = Self::where_clause(resource, tenant_id, filters)?;
        let sql = format!(
            "SELECT COUNT(*) FROM {} WHERE {}",
            quote(&resource.table),
            where_sql
        );

        let conn = self.lock()?;
        let count: i64 = conn
            .query_row(&sql, params_from_iter(params), |row| row.get(0))
            .map_err(|e| Error::data_layer(format!("Count query failed: {e}")))?;
        Ok(Some(count.max(0) as u64))
    }
}

impl std::fmt::Debug for DuckDbSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DuckDbSource")
            .field("resources", &self.resources.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

fn quote(ident: &str) -> String {
    format!("\"{ident}\"")
}

fn to_sql_value(value: &FilterValue) -> Value {
    match value {
        FilterValue::Bool(b) => Value::Boolean(*b),
        FilterValue::Integer(i) => Value::BigInt(*i),
        FilterValue::Number(n) if n.fract() == 0.0 && n.abs() < 9.0e15 => Value::BigInt(*n as i64),
        FilterValue::Number(n) => Value::Double(*n),
        FilterValue::Text(s) => Value::Text(s.clone()),
    }
}

/// Render the key column as the string carried in a cursor
fn key_string(value: &Value) -> String {
    match to_json(value.clone()) {
        JsonValue::String(s) => s,
        other => other.to_string(),
    }
}

fn to_json(value: Value) -> JsonValue {
    match value {
        Value::Null => JsonValue::Null,
        Value::Boolean(b) => JsonValue::Bool(b),
        Value::TinyInt(i) => i.into(),
        Value::SmallInt(i) => i.into(),
        Value::Int(i) => i.into(),
        Value::BigInt(i) => i.into(),
        Value::UTinyInt(i) => i.into(),
        Value::USmallInt(i) => i.into(),
        Value::UInt(i) => i.into(),
        Value::UBigInt(i) => i.into(),
        Value::Float(f) => serde_json::Number::from_f64(f64::from(f))
            .map_or(JsonValue::Null, JsonValue::Number),
        Value::Double(f) => {
            serde_json::Number::from_f64(f).map_or(JsonValue::Null, JsonValue::Number)
        }
        Value::Text(s) => JsonValue::String(s),
        other => JsonValue::String(format!("{other:?}")),
    }
}
