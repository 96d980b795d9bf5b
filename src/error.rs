//! Error Handling Infrastructure
//!
//! This module defines all error types used throughout dbtap.
//! All errors are structured and map to stable error codes for programmatic handling.
//!
//! # Error Categories
//! - `QueryFailed`: Failures surfaced by a `Queryable::execute` call
//! - `ConnectionFailed`: Connection checkout or connect errors inside a pool
//! - `PoolInit`: Fallback pool construction errors
//! - `InvalidInput`: Malformed parameters passed to a pool backend
//! - `ConfigError`: Configuration file or environment variable errors
//!
//! Handle resolution itself never fails; every variant here belongs to the
//! pool backends, their configuration, or the returned handle's execute path.

use thiserror::Error;

/// Main error type for dbtap operations
#[derive(Error, Debug)]
pub enum DbTapError {
    /// Query execution failed inside the resolved handle
    #[error("Query execution failed: {0}")]
    QueryFailed(String),

    /// Connection checkout or connect failed inside a pool backend
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Fallback pool construction failed
    #[error("Pool initialization failed: {0}")]
    PoolInit(String),

    /// Invalid input or unsupported parameter value
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Configuration error (file not found, invalid JSON, missing env var, etc.)
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl DbTapError {
    /// Convert error to a stable error code string
    ///
    /// Error codes are stable and suitable for programmatic handling by callers.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::QueryFailed(_) => "QUERY_FAILED",
            Self::ConnectionFailed(_) => "CONNECTION_FAILED",
            Self::PoolInit(_) => "POOL_INIT_FAILED",
            Self::InvalidInput(_) => "INVALID_INPUT",
            Self::ConfigError(_) => "CONFIG_ERROR",
        }
    }

    /// Get human-readable error message (no credentials or other sensitive data)
    #[must_use]
    pub fn message(&self) -> String {
        // Use Display implementation from thiserror
        self.to_string()
    }

    /// Create a query failed error
    pub fn query_failed(message: impl Into<String>) -> Self {
        Self::QueryFailed(message.into())
    }

    /// Create a connection failed error
    pub fn connection_failed(message: impl Into<String>) -> Self {
        Self::ConnectionFailed(message.into())
    }

    /// Create a pool initialization error
    pub fn pool_init(message: impl Into<String>) -> Self {
        Self::PoolInit(message.into())
    }

    /// Create an invalid input error
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    /// Create a configuration error
    pub fn config_error(message: impl Into<String>) -> Self {
        Self::ConfigError(message.into())
    }
}

/// Result type alias for dbtap operations
pub type Result<T> = std::result::Result<T, DbTapError>;
