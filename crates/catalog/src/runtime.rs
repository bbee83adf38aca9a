//! Wiring for binaries: pool, object store, notifier, change feed, view.

use std::sync::Arc;

use sqlx::PgPool;
use tokio::task::JoinHandle;
use tracing::info;

use crate::config::CatalogConfig;
use crate::db::{PgCatalogStore, create_pool};
use crate::notifier::{ChangeNotifier, PgChangeFeed};
use crate::sync::CatalogSynchronizer;

/// A connected catalog with its background tasks running.
#[derive(Debug)]
pub struct CatalogRuntime {
    pub pool: PgPool,
    pub synchronizer: CatalogSynchronizer,
    /// Change feed listener and view invalidation tasks.
    pub tasks: Vec<JoinHandle<()>>,
}

impl CatalogRuntime {
    /// Connect to the database, build the configured object store, start
    /// following catalog changes and keep the cached view in step.
    ///
    /// # Errors
    ///
    /// Returns `sqlx::Error` if the pool or the change listener cannot
    /// connect.
    pub async fn start(config: &CatalogConfig) -> Result<Self, sqlx::Error> {
        let pool = create_pool(&config.database_url).await?;
        info!("Connected to catalog database");

        let notifier = ChangeNotifier::new();
        let feed = PgChangeFeed::spawn(&pool, notifier.clone()).await?;

        let synchronizer = CatalogSynchronizer::new(
            Arc::new(PgCatalogStore::new(pool.clone())),
            config.assets.build(),
            notifier,
            config.sync_options(),
        );
        let invalidation = synchronizer.spawn_invalidation();

        info!(
            bucket = config.assets.bucket(),
            orphan_policy = %config.orphan_policy,
            "Catalog ready"
        );

        Ok(Self {
            pool,
            synchronizer,
            tasks: vec![feed, invalidation],
        })
    }

    /// Stop the background tasks.
    pub fn shutdown(&self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}
