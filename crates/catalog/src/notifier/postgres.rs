//! Cross-process change feed over `PostgreSQL` `LISTEN`/`NOTIFY`.
//!
//! Statement-level triggers on `catalog.products` and `catalog.categories`
//! call `pg_notify('catalog_changes', <topic>)`. Each process runs one
//! listener that republishes into its local [`ChangeNotifier`], so writes
//! made by any process reach every viewer.

use sqlx::PgPool;
use sqlx::postgres::PgListener;
use tokio::task::JoinHandle;

use super::{ChangeEvent, ChangeNotifier};

/// Channel the catalog triggers notify on.
pub const CHANGE_CHANNEL: &str = "catalog_changes";

/// Bridge from the database change channel into a local notifier.
pub struct PgChangeFeed;

impl PgChangeFeed {
    /// Start listening in a background task.
    ///
    /// # Errors
    ///
    /// Returns `sqlx::Error` if the initial `LISTEN` fails.
    pub async fn spawn(
        pool: &PgPool,
        notifier: ChangeNotifier,
    ) -> Result<JoinHandle<()>, sqlx::Error> {
        let mut listener = PgListener::connect_with(pool).await?;
        listener.listen(CHANGE_CHANNEL).await?;
        tracing::info!(channel = CHANGE_CHANNEL, "Listening for catalog changes");

        Ok(tokio::spawn(async move {
            loop {
                match listener.try_recv().await {
                    Ok(Some(notification)) => {
                        match ChangeEvent::from_topic(notification.payload()) {
                            Some(event) => {
                                notifier.publish(event);
                            }
                            None => tracing::debug!(
                                payload = notification.payload(),
                                "Ignoring unknown catalog change topic"
                            ),
                        }
                    }
                    Ok(None) => {
                        // Connection dropped; notifications sent meanwhile are lost
                        tracing::warn!("Catalog change listener reconnecting");
                        notifier.publish(ChangeEvent::CategoriesChanged);
                        notifier.publish(ChangeEvent::ProductsChanged);
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Catalog change listener failed");
                        tokio::time::sleep(std::time::Duration::from_secs(1)).await;
                    }
                }
            }
        }))
    }
}
