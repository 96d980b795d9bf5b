//! dbtap - Shared Database Handle Resolution
//!
//! dbtap answers one question for a host process: "which query handle should
//! I use?" Hosts that already own a database handle register it on a shared
//! context; hosts that don't get a process-wide fallback pool, constructed
//! lazily and exactly once. No second, redundant pool is ever created.
//!
//! # Core Principles
//! - Candidate registrations win over the fallback, in a fixed priority order
//! - Resolution is total (never fails) and identity-preserving (no wrapping)
//! - Exactly-once fallback construction, safe under concurrent first use
//! - The fallback holder is an explicit value, not hidden global state
//! - Downstream query failures pass through untouched (no retry, no wrapping)
//!
//! # Priority Order
//! Highest first: the `db` slot, the `pg` slot's direct handle, the `pg`
//! slot's nested `pool` handle, then the fallback pool.
//!
//! # Module Organization
//! - [`error`] - Error types with stable error codes
//! - [`queryable`] - The `Queryable` capability trait and result types
//! - [`registry`] - Typed host context of candidate registrations
//! - [`resolver`] - Priority-ordered handle resolution
//! - [`pool`] - Fallback pool holder and backends (postgres, sqlite)
//! - [`config`] - Fallback pool settings (env vars, config files)
//!
//! # Example
//! ```no_run
//! use std::sync::Arc;
//! use dbtap::{FallbackPool, HostContext, PoolSettings, resolve};
//! # #[cfg(feature = "postgres")]
//! use dbtap::pool::postgres::PostgresPool;
//!
//! # #[cfg(feature = "postgres")]
//! # fn main() -> dbtap::Result<()> {
//! let settings = PoolSettings::load()?;
//! let fallback = FallbackPool::seeded(Arc::new(PostgresPool::connect(&settings)?));
//!
//! // The host attaches whatever handles its initialization produced.
//! let ctx = HostContext::new();
//!
//! // Empty context: the fallback handle comes back, same instance every time.
//! let handle = resolve(&ctx, &fallback);
//! # let _ = handle;
//! # Ok(())
//! # }
//! # #[cfg(not(feature = "postgres"))]
//! # fn main() {}
//! ```

// Core modules
pub mod config; // Fallback pool settings
pub mod error; // Error handling infrastructure
pub mod pool; // Fallback pool holder and backends
pub mod queryable; // Capability trait and result types
pub mod registry; // Typed host context
pub mod resolver; // Priority-ordered resolution

// Re-export commonly used types for convenience
pub use config::PoolSettings;
pub use error::{DbTapError, Result};
pub use pool::FallbackPool;
pub use queryable::{QueryResult, Queryable};
pub use registry::{HostContext, PgIntegration};
pub use resolver::{resolve, resolve_with_source, HandleSource};
