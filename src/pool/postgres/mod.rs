//! PostgreSQL Fallback Pool Backend
//!
//! [`PostgresPool`] satisfies [`Queryable`] on top of a `deadpool-postgres`
//! pool over the native `tokio-postgres` driver.
//!
//! # Implementation Notes
//! - Construction is synchronous and performs no I/O; connections are opened
//!   lazily by the pool on first checkout. This keeps the fallback factory
//!   non-blocking, as the lazy-initialization contract requires.
//! - JSON parameters are bound to native PostgreSQL types; arrays and objects
//!   bind as JSONB via the driver's serde_json integration.
//! - Rows are converted to JSON-safe values. BYTEA is Base64-encoded,
//!   NaN/Infinity floats become null, and unmapped column types surface as
//!   their SQL text form where the driver allows it, null otherwise.

use deadpool_postgres::{Manager, ManagerConfig, Pool, RecyclingMethod, Runtime};
use tokio_postgres::types::ToSql;
use tokio_postgres::{NoTls, Row};

use async_trait::async_trait;

use crate::config::PoolSettings;
use crate::error::{DbTapError, Result};
use crate::queryable::{QueryResult, Queryable};

/// PostgreSQL-backed fallback pool
#[derive(Debug)]
pub struct PostgresPool {
    pool: Pool,
}

impl PostgresPool {
    /// Build a pool from `settings` without connecting
    ///
    /// Fails only on invalid pool configuration or unresolvable credentials;
    /// an unreachable server surfaces later, on the first `execute`.
    pub fn connect(settings: &PoolSettings) -> Result<Self> {
        let password = settings.resolve_password()?;

        let mut config = tokio_postgres::Config::new();
        config
            .host(&settings.host)
            .port(settings.port)
            .user(&settings.user)
            .dbname(&settings.database);
        if let Some(password) = password {
            config.password(&password);
        }

        let manager = Manager::from_config(
            config,
            NoTls,
            ManagerConfig { recycling_method: RecyclingMethod::Fast },
        );

        let pool = Pool::builder(manager)
            .max_size(settings.max_connections as usize)
            .runtime(Runtime::Tokio1)
            .build()
            .map_err(|e| DbTapError::pool_init(format!("Failed to build postgres pool: {e}")))?;

        tracing::debug!(
            host = %settings.host,
            database = %settings.database,
            max_connections = settings.max_connections,
            "postgres fallback pool constructed"
        );

        Ok(Self { pool })
    }
}

#[async_trait]
impl Queryable for PostgresPool {
    async fn execute(&self, statement: &str, params: &[serde_json::Value]) -> Result<QueryResult> {
        let client = self.pool.get().await.map_err(|e| {
            DbTapError::connection_failed(format!("Failed to check out connection: {e}"))
        })?;

        let stmt = client
            .prepare(statement)
            .await
            .map_err(|e| DbTapError::query_failed(format!("Failed to prepare statement: {e}")))?;

        let bound = bind_params(params)?;
        let param_refs: Vec<&(dyn ToSql + Sync)> =
            bound.iter().map(|p| p.as_ref() as &(dyn ToSql + Sync)).collect();

        // Row-returning statements have a non-empty column list
        if stmt.columns().is_empty() {
            let rows_affected = client.execute(&stmt, &param_refs).await.map_err(|e| {
                DbTapError::query_failed(format!("Failed to execute statement: {e}"))
            })?;

            return Ok(QueryResult::with_affected(rows_affected));
        }

        let rows = client
            .query(&stmt, &param_refs)
            .await
            .map_err(|e| DbTapError::query_failed(format!("Failed to execute query: {e}")))?;

        let columns: Vec<String> = stmt.columns().iter().map(|c| c.name().to_string()).collect();

        let mut rows_data = Vec::with_capacity(rows.len());
        for row in &rows {
            rows_data.push(row_to_json(&columns, row)?);
        }

        Ok(QueryResult::with_rows(columns, rows_data))
    }
}

/// Bind JSON parameter values to native PostgreSQL types
fn bind_params(params: &[serde_json::Value]) -> Result<Vec<Box<dyn ToSql + Sync + Send>>> {
    let mut bound: Vec<Box<dyn ToSql + Sync + Send>> = Vec::with_capacity(params.len());

    for value in params {
        match value {
            serde_json::Value::Null => bound.push(Box::new(Option::<String>::None)),
            serde_json::Value::Bool(b) => bound.push(Box::new(*b)),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    bound.push(Box::new(i));
                } else if let Some(f) = n.as_f64() {
                    bound.push(Box::new(f));
                } else {
                    return Err(DbTapError::invalid_input(format!(
                        "Numeric parameter out of range: {n}"
                    )));
                }
            }
            serde_json::Value::String(s) => bound.push(Box::new(s.clone())),
            // Arrays and objects bind as JSONB through the driver
            serde_json::Value::Array(_) | serde_json::Value::Object(_) => {
                bound.push(Box::new(value.clone()));
            }
        }
    }

    Ok(bound)
}

/// Convert a PostgreSQL row to a JSON-safe `Vec`
fn row_to_json(column_names: &[String], row: &Row) -> Result<Vec<serde_json::Value>> {
    let mut values = Vec::with_capacity(column_names.len());

    for idx in 0..column_names.len() {
        values.push(postgres_value_to_json(row, idx)?);
    }

    Ok(values)
}

/// Convert a single PostgreSQL value to a JSON value
fn postgres_value_to_json(row: &Row, idx: usize) -> Result<serde_json::Value> {
    use tokio_postgres::types::Type;

    let column = &row.columns()[idx];
    let col_type = column.type_();

    let value = match *col_type {
        // Boolean
        Type::BOOL => match get_opt::<bool>(row, idx, "boolean")? {
            Some(v) => serde_json::Value::Bool(v),
            None => serde_json::Value::Null,
        },

        // Integers
        Type::INT2 => match get_opt::<i16>(row, idx, "i16")? {
            Some(v) => serde_json::Value::Number(v.into()),
            None => serde_json::Value::Null,
        },
        Type::INT4 => match get_opt::<i32>(row, idx, "i32")? {
            Some(v) => serde_json::Value::Number(v.into()),
            None => serde_json::Value::Null,
        },
        Type::INT8 => match get_opt::<i64>(row, idx, "i64")? {
            Some(v) => serde_json::Value::Number(v.into()),
            None => serde_json::Value::Null,
        },

        // Floats (NaN/Infinity become null)
        Type::FLOAT4 => match get_opt::<f32>(row, idx, "f32")? {
            Some(v) => serde_json::Number::from_f64(f64::from(v))
                .map_or(serde_json::Value::Null, serde_json::Value::Number),
            None => serde_json::Value::Null,
        },
        Type::FLOAT8 => match get_opt::<f64>(row, idx, "f64")? {
            Some(v) => serde_json::Number::from_f64(v)
                .map_or(serde_json::Value::Null, serde_json::Value::Number),
            None => serde_json::Value::Null,
        },

        // Text types (VARCHAR, TEXT, CHAR, etc.)
        Type::VARCHAR | Type::TEXT | Type::BPCHAR | Type::NAME => {
            match get_opt::<String>(row, idx, "string")? {
                Some(v) => serde_json::Value::String(v),
                None => serde_json::Value::Null,
            }
        }

        // JSON types pass through
        Type::JSON | Type::JSONB => {
            get_opt::<serde_json::Value>(row, idx, "json")?.unwrap_or(serde_json::Value::Null)
        }

        // BYTEA (binary data) - encode as Base64
        Type::BYTEA => match get_opt::<Vec<u8>>(row, idx, "bytea")? {
            Some(v) => {
                use base64::Engine;
                let encoded = base64::engine::general_purpose::STANDARD.encode(&v);
                serde_json::Value::String(encoded)
            }
            None => serde_json::Value::Null,
        },

        // Everything else: take the driver's text form when available
        _ => match row.try_get::<_, Option<String>>(idx) {
            Ok(Some(v)) => serde_json::Value::String(v),
            Ok(None) | Err(_) => serde_json::Value::Null,
        },
    };

    Ok(value)
}

/// Fetch an optional column value, mapping driver errors to `QueryFailed`
fn get_opt<'a, T>(row: &'a Row, idx: usize, kind: &str) -> Result<Option<T>>
where
    T: tokio_postgres::types::FromSql<'a>,
{
    row.try_get::<_, Option<T>>(idx)
        .map_err(|e| DbTapError::query_failed(format!("Failed to get {kind} value: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connect_performs_no_io() {
        // No server is listening on these settings; construction must still
        // succeed because connections are opened lazily.
        let settings = PoolSettings {
            host: "127.0.0.1".to_string(),
            port: 59999,
            ..Default::default()
        };

        let pool = PostgresPool::connect(&settings);
        assert!(pool.is_ok(), "pool construction must not connect");
    }

    #[test]
    fn test_connect_rejects_unresolvable_password_env() {
        let settings = PoolSettings {
            password_env: Some("DBTAP_TEST_PG_PW_UNSET".to_string()),
            ..Default::default()
        };

        let result = PostgresPool::connect(&settings);
        assert!(result.is_err());
        assert_eq!(result.unwrap_err().error_code(), "CONFIG_ERROR");
    }

    #[test]
    fn test_bind_params_shapes() {
        let params = vec![
            serde_json::Value::Null,
            serde_json::json!(true),
            serde_json::json!(42),
            serde_json::json!(2.5),
            serde_json::json!("text"),
            serde_json::json!({"nested": [1, 2]}),
        ];

        let bound = bind_params(&params).unwrap();
        assert_eq!(bound.len(), params.len());
    }

    #[test]
    fn test_bind_params_large_unsigned_binds_as_float() {
        // u64::MAX has no i64 representation and falls through to the f64 binding.
        let params = vec![serde_json::json!(u64::MAX)];
        let bound = bind_params(&params).unwrap();
        assert_eq!(bound.len(), 1);
    }
}
