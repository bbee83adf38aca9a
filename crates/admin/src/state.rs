//! Application state shared across handlers.

use std::sync::Arc;

use reve_essence_catalog::CatalogSynchronizer;
use sqlx::PgPool;

use crate::middleware::SessionProvider;

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    synchronizer: CatalogSynchronizer,
    sessions: SessionProvider,
    pool: Option<PgPool>,
}

impl AppState {
    /// Create state over a synchronizer with no database to probe for
    /// readiness (in-memory backends).
    #[must_use]
    pub fn new(synchronizer: CatalogSynchronizer, sessions: SessionProvider) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                synchronizer,
                sessions,
                pool: None,
            }),
        }
    }

    /// Create state backed by a `PostgreSQL` pool.
    #[must_use]
    pub fn with_pool(
        synchronizer: CatalogSynchronizer,
        sessions: SessionProvider,
        pool: PgPool,
    ) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                synchronizer,
                sessions,
                pool: Some(pool),
            }),
        }
    }

    #[must_use]
    pub fn synchronizer(&self) -> &CatalogSynchronizer {
        &self.inner.synchronizer
    }

    #[must_use]
    pub fn sessions(&self) -> &SessionProvider {
        &self.inner.sessions
    }

    /// Database pool, when the catalog is backed by `PostgreSQL`.
    #[must_use]
    pub fn pool(&self) -> Option<&PgPool> {
        self.inner.pool.as_ref()
    }
}
