//! Database migration command.
//!
//! # Usage
//!
//! ```bash
//! reve-cli migrate
//! ```
//!
//! # Environment Variables
//!
//! - `CATALOG_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//!
//! Migrations live in `crates/catalog/migrations/` and are embedded at build
//! time.

use reve_essence_catalog::MIGRATOR;

use super::{CommandError, connect_store};

/// Run catalog database migrations.
///
/// # Errors
///
/// Returns an error if the database is unreachable or a migration fails.
pub async fn run() -> Result<(), CommandError> {
    let store = connect_store().await?;

    tracing::info!("Running catalog migrations...");
    MIGRATOR.run(store.pool()).await?;

    tracing::info!("Catalog migrations complete!");
    Ok(())
}
