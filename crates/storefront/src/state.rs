//! Application state shared across handlers.

use std::sync::Arc;

use reve_essence_catalog::CatalogSynchronizer;
use sqlx::PgPool;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to the
/// catalog and, when running against `PostgreSQL`, the connection pool.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    synchronizer: CatalogSynchronizer,
    pool: Option<PgPool>,
}

impl AppState {
    /// Create state over a synchronizer with no database behind it.
    #[must_use]
    pub fn new(synchronizer: CatalogSynchronizer) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                synchronizer,
                pool: None,
            }),
        }
    }

    /// Create state backed by a `PostgreSQL` pool.
    #[must_use]
    pub fn with_pool(synchronizer: CatalogSynchronizer, pool: PgPool) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                synchronizer,
                pool: Some(pool),
            }),
        }
    }

    /// Get a reference to the catalog synchronizer.
    #[must_use]
    pub fn synchronizer(&self) -> &CatalogSynchronizer {
        &self.inner.synchronizer
    }

    /// Get a reference to the database connection pool, if any.
    #[must_use]
    pub fn pool(&self) -> Option<&PgPool> {
        self.inner.pool.as_ref()
    }
}
