//! Queryable Capability Trait and Core Types
//!
//! This module defines the capability contract that every resolvable database
//! handle satisfies: a single asynchronous `execute` operation taking a SQL
//! statement and an ordered sequence of JSON parameters.
//!
//! # Capability, Not Implementation
//! `Queryable` says nothing about where connections come from or how they are
//! pooled. A registered framework handle, a nested integration pool, and the
//! crate's own fallback pool backends all satisfy the same trait and are
//! interchangeable to callers.
//!
//! # Sharing
//! Handles are shared as `Arc<dyn Queryable>`. The resolver returns clones of
//! the registered `Arc`, so the object a caller receives is identity-equal to
//! the one the host attached, never a wrapper or a copy.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Query-capable database handle
///
/// Implementations must be `Send + Sync`; handles are shared across tasks as
/// `Arc<dyn Queryable>` and may be executed concurrently.
#[async_trait]
pub trait Queryable: Send + Sync {
    /// Execute a statement with positional parameters
    ///
    /// Parameters are JSON values bound in order to the statement's
    /// placeholders. Returns rows for SELECT-shaped statements and
    /// `rows_affected` for everything else.
    ///
    /// Failures surface as [`DbTapError::QueryFailed`] or
    /// [`DbTapError::ConnectionFailed`] and pass through the resolver
    /// untouched; retry policy belongs to the backend, not the resolver.
    ///
    /// [`DbTapError::QueryFailed`]: crate::error::DbTapError::QueryFailed
    /// [`DbTapError::ConnectionFailed`]: crate::error::DbTapError::ConnectionFailed
    async fn execute(&self, statement: &str, params: &[serde_json::Value]) -> Result<QueryResult>;
}

/// Query execution result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResult {
    /// Column names in result set
    pub columns: Vec<String>,

    /// Result rows (positional values, aligned with `columns`)
    pub rows: Vec<Vec<serde_json::Value>>,

    /// Number of rows affected (for INSERT/UPDATE/DELETE)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rows_affected: Option<u64>,
}

impl QueryResult {
    /// Create a result for a row-returning statement
    #[must_use]
    pub const fn with_rows(columns: Vec<String>, rows: Vec<Vec<serde_json::Value>>) -> Self {
        Self { columns, rows, rows_affected: None }
    }

    /// Create a result for a non-SELECT statement
    #[must_use]
    pub const fn with_affected(rows_affected: u64) -> Self {
        Self { columns: Vec::new(), rows: Vec::new(), rows_affected: Some(rows_affected) }
    }

    /// Whether the statement returned rows
    #[must_use]
    pub fn is_row_set(&self) -> bool {
        !self.columns.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_set_result() {
        let result = QueryResult::with_rows(
            vec!["id".to_string(), "name".to_string()],
            vec![vec![serde_json::json!(1), serde_json::json!("Alice")]],
        );
        assert!(result.is_row_set());
        assert!(result.rows_affected.is_none());
        assert_eq!(result.rows.len(), 1);
    }

    #[test]
    fn test_affected_result() {
        let result = QueryResult::with_affected(3);
        assert!(!result.is_row_set());
        assert_eq!(result.rows_affected, Some(3));
        assert!(result.rows.is_empty());
    }

    #[test]
    fn test_result_serialization() {
        let result = QueryResult::with_rows(
            vec!["id".to_string()],
            vec![vec![serde_json::json!(42)]],
        );
        let json = serde_json::to_string(&result).unwrap();
        assert!(json.contains(r#""columns":["id"]"#));
        assert!(json.contains(r#""rows":[[42]]"#));
        // rows_affected should be omitted when None
        assert!(!json.contains("rows_affected"));
    }
}
