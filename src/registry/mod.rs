//! Host Context Registry
//!
//! A host process exposes zero or more candidate registrations of a
//! query-capable handle: a primary `db` slot and a `pg` integration slot
//! whose handle may sit one level deeper under a nested `pool` field.
//!
//! Slots are attached and detached by host initialization and shutdown code
//! only. The resolver reads them and never mutates the context. A slot that
//! holds no usable handle is represented as `None` and skipped during
//! resolution; there is no runtime shape-checking at this boundary.

use std::sync::Arc;

use crate::queryable::Queryable;

/// Typed registry of candidate handle registrations
///
/// Construct with [`HostContext::new`] (or `Default`) and attach whatever
/// handles the host's initialization produced. An empty context is valid and
/// resolves to the fallback pool.
#[derive(Default)]
pub struct HostContext {
    /// Primary handle slot ("db"), highest priority
    db: Option<Arc<dyn Queryable>>,

    /// Integration slot ("pg"), checked after `db`
    pg: Option<PgIntegration>,
}

impl HostContext {
    /// Create an empty context with no registrations
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a handle to the primary `db` slot
    pub fn attach_db(&mut self, handle: Arc<dyn Queryable>) {
        self.db = Some(handle);
    }

    /// Attach an integration registration to the `pg` slot
    pub fn attach_pg(&mut self, registration: PgIntegration) {
        self.pg = Some(registration);
    }

    /// Detach the primary `db` registration (host shutdown path)
    pub fn detach_db(&mut self) -> Option<Arc<dyn Queryable>> {
        self.db.take()
    }

    /// Detach the `pg` registration (host shutdown path)
    pub fn detach_pg(&mut self) -> Option<PgIntegration> {
        self.pg.take()
    }

    /// Handle registered in the primary `db` slot, if any
    #[must_use]
    pub fn db(&self) -> Option<&Arc<dyn Queryable>> {
        self.db.as_ref()
    }

    /// Registration in the `pg` slot, if any
    #[must_use]
    pub fn pg(&self) -> Option<&PgIntegration> {
        self.pg.as_ref()
    }
}

impl std::fmt::Debug for HostContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostContext")
            .field("db", &self.db.is_some())
            .field("pg", &self.pg.as_ref().map(|_| "registered"))
            .finish_non_exhaustive()
    }
}

/// Integration-slot registration with one level of nested indirection
///
/// Mirrors framework integrations that decorate the host twice: the slot
/// itself may expose a handle directly, and may also carry a nested `pool`
/// handle. Either, both, or neither may be present.
pub struct PgIntegration {
    handle: Option<Arc<dyn Queryable>>,
    pool: Option<Arc<dyn Queryable>>,
}

impl PgIntegration {
    /// Registration exposing a handle directly on the slot
    #[must_use]
    pub fn direct(handle: Arc<dyn Queryable>) -> Self {
        Self { handle: Some(handle), pool: None }
    }

    /// Registration exposing only a nested pool handle
    #[must_use]
    pub fn pooled(pool: Arc<dyn Queryable>) -> Self {
        Self { handle: None, pool: Some(pool) }
    }

    /// Registration with explicit direct and nested handles
    #[must_use]
    pub fn new(handle: Option<Arc<dyn Queryable>>, pool: Option<Arc<dyn Queryable>>) -> Self {
        Self { handle, pool }
    }

    /// Empty registration (slot attached, nothing usable on it)
    #[must_use]
    pub fn empty() -> Self {
        Self { handle: None, pool: None }
    }

    /// Direct handle on the slot, if any
    #[must_use]
    pub fn handle(&self) -> Option<&Arc<dyn Queryable>> {
        self.handle.as_ref()
    }

    /// Nested pool handle, if any
    #[must_use]
    pub fn pool(&self) -> Option<&Arc<dyn Queryable>> {
        self.pool.as_ref()
    }
}

impl std::fmt::Debug for PgIntegration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PgIntegration")
            .field("handle", &self.handle.is_some())
            .field("pool", &self.pool.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;
    use crate::queryable::QueryResult;
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

    #[test]
    fn test_empty_context() {
        let ctx = HostContext::new();
        assert!(ctx.db().is_none());
        assert!(ctx.pg().is_none());
    }

    #[test]
    fn test_attach_and_detach() {
        let mut ctx = HostContext::new();
        ctx.attach_db(Arc::new(StubHandle));
        ctx.attach_pg(PgIntegration::direct(Arc::new(StubHandle)));
        assert!(ctx.db().is_some());
        assert!(ctx.pg().is_some());

        assert!(ctx.detach_db().is_some());
        assert!(ctx.detach_pg().is_some());
        assert!(ctx.db().is_none());
        assert!(ctx.pg().is_none());
    }

    #[test]
    fn test_pg_registration_shapes() {
        let direct = PgIntegration::direct(Arc::new(StubHandle));
        assert!(direct.handle().is_some());
        assert!(direct.pool().is_none());

        let pooled = PgIntegration::pooled(Arc::new(StubHandle));
        assert!(pooled.handle().is_none());
        assert!(pooled.pool().is_some());

        let empty = PgIntegration::empty();
        assert!(empty.handle().is_none());
        assert!(empty.pool().is_none());
    }

    #[test]
    fn test_registered_handle_identity_is_preserved() {
        let handle: Arc<dyn Queryable> = Arc::new(StubHandle);
        let mut ctx = HostContext::new();
        ctx.attach_db(Arc::clone(&handle));

        let stored = ctx.db().expect("db slot should be registered");
        assert!(Arc::ptr_eq(stored, &handle));
    }
}
