//! Fallback Pool Ownership
//!
//! When no candidate registration yields a handle, resolution falls back to a
//! single pool owned for the whole process lifetime. [`FallbackPool`] holds
//! that singleton: construction runs at most once, on first need, and the
//! published handle is never replaced or reset afterwards.
//!
//! # Exactly-Once Construction
//! The lazy path is guarded by `once_cell::sync::OnceCell::get_or_init`.
//! Concurrent first-time callers race into the cell; exactly one runs the
//! factory, the rest block until the handle is published and then observe the
//! same instance. The read path after initialization is lock-free.
//!
//! # Explicit, Not Global
//! The holder is an ordinary value the host constructs and threads through to
//! resolution call sites, not module-level mutable state. Hosts that build
//! their pool during single-threaded startup can use [`FallbackPool::seeded`]
//! and skip the lazy path entirely.
//!
//! # Backends
//! - [`postgres`] - PostgreSQL pool over `deadpool-postgres` / `tokio-postgres`
//! - [`sqlite`] - SQLite pool over `r2d2` / `rusqlite`

use std::sync::Arc;

use once_cell::sync::OnceCell;

use crate::queryable::Queryable;

#[cfg(feature = "postgres")]
pub mod postgres;

#[cfg(feature = "sqlite")]
pub mod sqlite;

/// Factory producing the fallback handle
///
/// Infallible by signature: the resolver is total, so a reachable constructor
/// is a precondition. Backend constructors return `Result` and are run by the
/// host before wiring the factory.
type HandleFactory = dyn Fn() -> Arc<dyn Queryable> + Send + Sync;

/// Process-lifetime holder for the singleton fallback handle
pub struct FallbackPool {
    handle: OnceCell<Arc<dyn Queryable>>,
    factory: Box<HandleFactory>,
}

impl FallbackPool {
    /// Create an uninitialized holder
    ///
    /// Nothing is constructed here; the factory runs on the first
    /// [`handle`](Self::handle) call that finds the cell empty.
    pub fn new<F>(factory: F) -> Self
    where
        F: Fn() -> Arc<dyn Queryable> + Send + Sync + 'static,
    {
        Self { handle: OnceCell::new(), factory: Box::new(factory) }
    }

    /// Create a holder already initialized with `handle`
    ///
    /// For hosts that construct the pool during startup and pass it through
    /// explicitly. The factory slot is present but can never run.
    #[must_use]
    pub fn seeded(handle: Arc<dyn Queryable>) -> Self {
        Self {
            handle: OnceCell::with_value(handle),
            factory: Box::new(|| unreachable!("seeded fallback pool never runs its factory")),
        }
    }

    /// Return the fallback handle, constructing it on first use
    ///
    /// Subsequent calls return clones of the same `Arc`; the underlying
    /// instance is shared for the rest of the process lifetime.
    pub fn handle(&self) -> Arc<dyn Queryable> {
        let handle = self.handle.get_or_init(|| {
            tracing::info!("initializing fallback pool");
            (self.factory)()
        });
        Arc::clone(handle)
    }

    /// Whether the singleton has been constructed yet
    #[must_use]
    pub fn initialized(&self) -> bool {
        self.handle.get().is_some()
    }
}

impl std::fmt::Debug for FallbackPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FallbackPool")
            .field("initialized", &self.initialized())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;
    use crate::queryable::QueryResult;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Barrier;

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
    fn test_construction_is_lazy() {
        let invocations = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&invocations);

        let pool = FallbackPool::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Arc::new(StubHandle)
        });

        assert!(!pool.initialized());
        assert_eq!(invocations.load(Ordering::SeqCst), 0);

        let _handle = pool.handle();
        assert!(pool.initialized());
        assert_eq!(invocations.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_repeated_calls_return_same_instance() {
        let pool = FallbackPool::new(|| Arc::new(StubHandle));
        let first = pool.handle();
        let second = pool.handle();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_concurrent_first_use_constructs_once() {
        const THREADS: usize = 8;

        let invocations = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&invocations);
        let pool = Arc::new(FallbackPool::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Arc::new(StubHandle)
        }));
        let barrier = Arc::new(Barrier::new(THREADS));

        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                let pool = Arc::clone(&pool);
                let barrier = Arc::clone(&barrier);
                std::thread::spawn(move || {
                    barrier.wait();
                    pool.handle()
                })
            })
            .collect();

        let resolved: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert_eq!(invocations.load(Ordering::SeqCst), 1, "factory must run exactly once");
        for handle in &resolved[1..] {
            assert!(Arc::ptr_eq(&resolved[0], handle), "all threads must observe one instance");
        }
    }

    #[test]
    fn test_seeded_pool_reports_initialized() {
        let handle: Arc<dyn Queryable> = Arc::new(StubHandle);
        let pool = FallbackPool::seeded(Arc::clone(&handle));

        assert!(pool.initialized());
        assert!(Arc::ptr_eq(&pool.handle(), &handle));
    }
}
