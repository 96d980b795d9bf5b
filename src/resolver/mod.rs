//! Shared Handle Resolution
//!
//! Given a host context that may carry zero or more candidate registrations,
//! return a single query-capable handle. Candidates win in a fixed priority
//! order; when none is registered, the process-wide fallback pool is used,
//! constructing it on first need.
//!
//! # Priority Order
//! Highest first. Callers may depend on which concrete instance is returned
//! when multiple registrations exist, so this order is part of the contract:
//!
//! 1. `db` slot, direct handle
//! 2. `pg` slot, direct handle
//! 3. `pg` slot, nested `pool` handle
//! 4. Fallback pool
//!
//! # Totality
//! Resolution never fails. An empty context is not an error; it is the
//! documented degraded-but-correct path onto the fallback pool. The returned
//! handle is the registered object itself - no wrapping, no copying - so
//! failures raised later by its `execute` calls pass through untouched.
//!
//! # Concurrency
//! Resolution is a synchronous read of already-published references. The only
//! side effect is the one-time lazy fallback construction, which
//! [`FallbackPool`] guards with an exactly-once cell.

use std::sync::Arc;

use crate::pool::FallbackPool;
use crate::queryable::Queryable;
use crate::registry::HostContext;

/// Tier that produced a resolved handle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleSource {
    /// Primary `db` slot
    Db,
    /// Direct handle on the `pg` slot
    Pg,
    /// Nested pool handle on the `pg` slot
    PgPool,
    /// Process-wide fallback pool
    Fallback,
}

impl HandleSource {
    /// Get the tier name as a string
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Db => "db",
            Self::Pg => "pg",
            Self::PgPool => "pg.pool",
            Self::Fallback => "fallback",
        }
    }
}

impl std::fmt::Display for HandleSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Resolve the shared query handle for `ctx`
///
/// Total: always returns a handle. See the module docs for the tier order.
pub fn resolve(ctx: &HostContext, fallback: &FallbackPool) -> Arc<dyn Queryable> {
    resolve_with_source(ctx, fallback).0
}

/// Resolve the shared query handle, reporting which tier matched
///
/// Same selection as [`resolve`]; the source is useful for logging and for
/// hosts that surface their integration state in diagnostics.
pub fn resolve_with_source(
    ctx: &HostContext,
    fallback: &FallbackPool,
) -> (Arc<dyn Queryable>, HandleSource) {
    let (handle, source) = select(ctx, fallback);
    tracing::debug!(source = %source, "resolved shared query handle");
    (handle, source)
}

/// First-match walk over the candidate tiers
fn select(ctx: &HostContext, fallback: &FallbackPool) -> (Arc<dyn Queryable>, HandleSource) {
    if let Some(handle) = ctx.db() {
        return (Arc::clone(handle), HandleSource::Db);
    }

    if let Some(pg) = ctx.pg() {
        if let Some(handle) = pg.handle() {
            return (Arc::clone(handle), HandleSource::Pg);
        }
        if let Some(pool) = pg.pool() {
            return (Arc::clone(pool), HandleSource::PgPool);
        }
    }

    (fallback.handle(), HandleSource::Fallback)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;
    use crate::queryable::QueryResult;
    use crate::registry::PgIntegration;
    use async_trait::async_trait;

    struct StubHandle;

    #[async_trait]
    impl Queryable for StubHandle {
        async fn execute(
            &self,
            _statement: &str,
            _params: &[serde_json::Value],
        ) -> Result<QueryResult> {
            Ok(QueryResult::with_affected(0))
        }
    }

    fn stub() -> Arc<dyn Queryable> {
        Arc::new(StubHandle)
    }

    fn fallback() -> FallbackPool {
        FallbackPool::new(|| Arc::new(StubHandle))
    }

    #[test]
    fn test_db_slot_wins_over_everything() {
        let db = stub();
        let mut ctx = HostContext::new();
        ctx.attach_db(Arc::clone(&db));
        ctx.attach_pg(PgIntegration::new(Some(stub()), Some(stub())));

        let (resolved, source) = resolve_with_source(&ctx, &fallback());
        assert!(Arc::ptr_eq(&resolved, &db));
        assert_eq!(source, HandleSource::Db);
    }

    #[test]
    fn test_pg_direct_handle_second() {
        let pg = stub();
        let mut ctx = HostContext::new();
        ctx.attach_pg(PgIntegration::new(Some(Arc::clone(&pg)), Some(stub())));

        let (resolved, source) = resolve_with_source(&ctx, &fallback());
        assert!(Arc::ptr_eq(&resolved, &pg));
        assert_eq!(source, HandleSource::Pg);
    }

    #[test]
    fn test_nested_pool_third() {
        let pool = stub();
        let mut ctx = HostContext::new();
        ctx.attach_pg(PgIntegration::pooled(Arc::clone(&pool)));

        let (resolved, source) = resolve_with_source(&ctx, &fallback());
        assert!(Arc::ptr_eq(&resolved, &pool));
        assert_eq!(source, HandleSource::PgPool);
    }

    #[test]
    fn test_empty_context_falls_back() {
        let ctx = HostContext::new();
        let fallback = fallback();

        let (first, source) = resolve_with_source(&ctx, &fallback);
        assert_eq!(source, HandleSource::Fallback);

        // Repeated resolution returns the identical singleton, never a new one.
        let second = resolve(&ctx, &fallback);
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_empty_pg_registration_is_skipped() {
        let mut ctx = HostContext::new();
        ctx.attach_pg(PgIntegration::empty());

        let (_, source) = resolve_with_source(&ctx, &fallback());
        assert_eq!(source, HandleSource::Fallback);
    }

    #[test]
    fn test_resolution_does_not_touch_fallback_when_candidate_exists() {
        let mut ctx = HostContext::new();
        ctx.attach_db(stub());
        let fallback = fallback();

        let _ = resolve(&ctx, &fallback);
        assert!(!fallback.initialized(), "candidate hit must not construct the fallback");
    }

    #[test]
    fn test_handle_source_display() {
        assert_eq!(HandleSource::Db.as_str(), "db");
        assert_eq!(HandleSource::Pg.as_str(), "pg");
        assert_eq!(HandleSource::PgPool.as_str(), "pg.pool");
        assert_eq!(HandleSource::Fallback.to_string(), "fallback");
    }
}
