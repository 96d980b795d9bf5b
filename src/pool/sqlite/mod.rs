//! SQLite Fallback Pool Backend
//!
//! [`SqlitePool`] satisfies [`Queryable`] on top of an `r2d2` pool of
//! `rusqlite` connections. Useful for embedded deployments and for exercising
//! the full resolution path in tests without a database server.
//!
//! # Implementation Notes
//! - `rusqlite` is a synchronous driver; statements run on the tokio blocking
//!   thread pool so `execute` keeps the trait's non-blocking contract.
//! - SQLite has no boolean type; boolean parameters bind as 0/1 integers.
//! - Array and object parameters bind as JSON text (the JSON1 convention).
//! - BLOB data is Base64-encoded for JSON safety.

use std::path::Path;

use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::params_from_iter;
use rusqlite::types::{Value as SqlValue, ValueRef};

use async_trait::async_trait;

use crate::error::{DbTapError, Result};
use crate::queryable::{QueryResult, Queryable};

/// SQLite-backed fallback pool
pub struct SqlitePool {
    pool: r2d2::Pool<SqliteConnectionManager>,
}

impl SqlitePool {
    /// Open a pool over the database file at `path`
    pub fn open(path: &Path, max_connections: u32) -> Result<Self> {
        let manager = SqliteConnectionManager::file(path);
        let pool = r2d2::Pool::builder()
            .max_size(max_connections)
            .build(manager)
            .map_err(|e| DbTapError::pool_init(format!("Failed to build sqlite pool: {e}")))?;

        tracing::debug!(path = %path.display(), max_connections, "sqlite fallback pool constructed");

        Ok(Self { pool })
    }
}

#[async_trait]
impl Queryable for SqlitePool {
    async fn execute(&self, statement: &str, params: &[serde_json::Value]) -> Result<QueryResult> {
        let pool = self.pool.clone();
        let statement = statement.to_owned();
        let params = bind_params(params);

        tokio::task::spawn_blocking(move || run_statement(&pool, &statement, &params))
            .await
            .map_err(|e| DbTapError::query_failed(format!("Blocking task failed: {e}")))?
    }
}

/// Execute one statement on a pooled connection
fn run_statement(
    pool: &r2d2::Pool<SqliteConnectionManager>,
    statement: &str,
    params: &[SqlValue],
) -> Result<QueryResult> {
    let conn = pool.get().map_err(|e| {
        DbTapError::connection_failed(format!("Failed to check out connection: {e}"))
    })?;

    let mut stmt = conn
        .prepare(statement)
        .map_err(|e| DbTapError::query_failed(format!("Failed to prepare statement: {e}")))?;

    // Row-returning statements have a non-zero column count
    if stmt.column_count() == 0 {
        let affected = stmt
            .execute(params_from_iter(params.iter().cloned()))
            .map_err(|e| DbTapError::query_failed(format!("Failed to execute statement: {e}")))?;

        return Ok(QueryResult::with_affected(affected as u64));
    }

    let columns: Vec<String> = stmt.column_names().iter().map(|s| (*s).to_string()).collect();

    let mut rows = stmt
        .query(params_from_iter(params.iter().cloned()))
        .map_err(|e| DbTapError::query_failed(format!("Failed to execute query: {e}")))?;

    let mut rows_data = Vec::new();
    while let Some(row) = rows
        .next()
        .map_err(|e| DbTapError::query_failed(format!("Failed to fetch row: {e}")))?
    {
        let mut values = Vec::with_capacity(columns.len());
        for idx in 0..columns.len() {
            let value_ref = row.get_ref(idx).map_err(|e| {
                DbTapError::query_failed(format!("Failed to get column {idx}: {e}"))
            })?;
            values.push(sqlite_value_to_json(value_ref)?);
        }
        rows_data.push(values);
    }

    Ok(QueryResult::with_rows(columns, rows_data))
}

/// Bind JSON parameter values to native SQLite types
fn bind_params(params: &[serde_json::Value]) -> Vec<SqlValue> {
    params
        .iter()
        .map(|value| match value {
            serde_json::Value::Null => SqlValue::Null,
            serde_json::Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    SqlValue::Integer(i)
                } else {
                    // Large unsigned and fractional values bind as REAL
                    SqlValue::Real(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            serde_json::Value::String(s) => SqlValue::Text(s.clone()),
            // JSON text form, per the JSON1 convention
            serde_json::Value::Array(_) | serde_json::Value::Object(_) => {
                SqlValue::Text(value.to_string())
            }
        })
        .collect()
}

/// Convert a single SQLite value to a JSON value
fn sqlite_value_to_json(value: ValueRef<'_>) -> Result<serde_json::Value> {
    let converted = match value {
        ValueRef::Null => serde_json::Value::Null,
        ValueRef::Integer(i) => serde_json::Value::Number(i.into()),
        ValueRef::Real(f) => serde_json::Number::from_f64(f)
            .map_or(serde_json::Value::Null, serde_json::Value::Number), // NaN/Infinity as null
        ValueRef::Text(t) => {
            let text = std::str::from_utf8(t).map_err(|e| {
                DbTapError::query_failed(format!("Column text is not valid UTF-8: {e}"))
            })?;
            serde_json::Value::String(text.to_string())
        }
        ValueRef::Blob(b) => {
            use base64::Engine;
            let encoded = base64::engine::general_purpose::STANDARD.encode(b);
            serde_json::Value::String(encoded)
        }
    };

    Ok(converted)
}
