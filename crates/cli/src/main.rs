//! Reve Essence CLI - catalog migrations and maintenance.
//!
//! # Usage
//!
//! ```bash
//! # Run catalog database migrations
//! reve-cli migrate
//!
//! # Categories
//! reve-cli category list
//! reve-cli category create "Wrist Watches"
//! reve-cli category delete <id> --yes
//!
//! # Products
//! reve-cli product list
//!
//! # Remove product images no product references
//! reve-cli assets sweep --dry-run
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

use reve_essence_core::CategoryId;

mod commands;

use commands::CommandError;
use commands::assets::DEFAULT_GRACE_SECS;

#[derive(Parser)]
#[command(name = "reve-cli")]
#[command(author, version, about = "Reve Essence catalog tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run catalog database migrations
    Migrate,
    /// Manage categories
    Category {
        #[command(subcommand)]
        action: CategoryAction,
    },
    /// Inspect products
    Product {
        #[command(subcommand)]
        action: ProductAction,
    },
    /// Maintain stored product images
    Assets {
        #[command(subcommand)]
        action: AssetsAction,
    },
}

#[derive(Subcommand)]
enum CategoryAction {
    /// List categories
    List,
    /// Create a category
    Create {
        /// Display name; the slug is derived from it
        name: String,
    },
    /// Delete a category and every product in it
    Delete {
        /// Category ID
        id: CategoryId,

        /// Confirm the deletion
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Subcommand)]
enum ProductAction {
    /// List products, newest first
    List,
}

#[derive(Subcommand)]
enum AssetsAction {
    /// Remove stored images no product references
    Sweep {
        /// Report orphans without removing them
        #[arg(long)]
        dry_run: bool,

        /// Leave unreferenced images younger than this alone
        #[arg(long, default_value_t = DEFAULT_GRACE_SECS)]
        grace_secs: u64,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "reve_essence_cli=info,reve_essence_catalog=info".into()),
        )
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), CommandError> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Category { action } => match action {
            CategoryAction::List => commands::category::list().await?,
            CategoryAction::Create { name } => commands::category::create(&name).await?,
            CategoryAction::Delete { id, yes } => commands::category::delete(id, yes).await?,
        },
        Commands::Product { action } => match action {
            ProductAction::List => commands::product::list().await?,
        },
        Commands::Assets { action } => match action {
            AssetsAction::Sweep {
                dry_run,
                grace_secs,
            } => commands::assets::sweep(dry_run, grace_secs).await?,
        },
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_category_delete() {
        let id = CategoryId::generate();
        let cli = Cli::try_parse_from(["reve-cli", "category", "delete", &id.to_string(), "--yes"])
            .unwrap_or_else(|e| panic!("{e}"));
        assert!(matches!(
            cli.command,
            Commands::Category {
                action: CategoryAction::Delete { id: parsed, yes: true }
            } if parsed == id
        ));
    }

    #[test]
    fn test_parse_sweep_defaults() {
        let cli = Cli::try_parse_from(["reve-cli", "assets", "sweep"]).unwrap_or_else(|e| panic!("{e}"));
        assert!(matches!(
            cli.command,
            Commands::Assets {
                action: AssetsAction::Sweep {
                    dry_run: false,
                    grace_secs: DEFAULT_GRACE_SECS
                }
            }
        ));
    }
}
