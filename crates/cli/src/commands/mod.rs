//! Command implementations.

pub mod assets;
pub mod category;
pub mod migrate;
pub mod product;

use std::sync::Arc;

use thiserror::Error;

use reve_essence_catalog::config::get_database_url;
use reve_essence_catalog::{
    CatalogConfig, CatalogSynchronizer, ChangeNotifier, ConfigError, PgCatalogStore, create_pool,
};
use reve_essence_core::{AdminSession, CatalogError};

/// Subject recorded on sessions the CLI issues itself.
const CLI_SUBJECT: &str = "reve-cli";

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum CommandError {
    /// Configuration is missing or invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Database connection error.
    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),

    /// Migration failed.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A catalog operation failed.
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    /// Destructive command run without confirmation.
    #[error("{0}")]
    Unconfirmed(String),
}

/// Connect to the catalog database only (no object storage).
async fn connect_store() -> Result<Arc<PgCatalogStore>, CommandError> {
    dotenvy::dotenv().ok();
    let database_url = get_database_url("CATALOG_DATABASE_URL")?;

    tracing::info!("Connecting to catalog database...");
    let pool = create_pool(&database_url).await?;
    Ok(Arc::new(PgCatalogStore::new(pool)))
}

/// Connect a full synchronizer: database plus the configured object store.
///
/// Other running processes see the CLI's writes through the database change
/// feed, so no in-process listeners are started.
async fn connect_synchronizer() -> Result<(CatalogSynchronizer, AdminSession), CommandError> {
    let config = CatalogConfig::from_env()?;

    tracing::info!("Connecting to catalog database...");
    let pool = create_pool(&config.database_url).await?;
    let synchronizer = CatalogSynchronizer::new(
        Arc::new(PgCatalogStore::new(pool)),
        config.assets.build(),
        ChangeNotifier::new(),
        config.sync_options(),
    );
    Ok((synchronizer, AdminSession::new(CLI_SUBJECT)))
}
