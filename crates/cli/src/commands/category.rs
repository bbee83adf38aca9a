//! Category management commands.
//!
//! # Usage
//!
//! ```bash
//! reve-cli category list
//! reve-cli category create "Wrist Watches"
//! reve-cli category delete <id>          # shows how many products would go
//! reve-cli category delete <id> --yes    # deletes category and its products
//! ```

use reve_essence_catalog::{CategoryRepository, ChangeNotifier};
use reve_essence_core::CategoryId;

use super::{CommandError, connect_store, connect_synchronizer};

/// Print every category.
///
/// # Errors
///
/// Returns an error if the database is unreachable.
pub async fn list() -> Result<(), CommandError> {
    let store = connect_store().await?;
    let categories = CategoryRepository::new(store, ChangeNotifier::new())
        .list()
        .await?;

    #[allow(clippy::print_stdout)]
    {
        for category in &categories {
            println!("{}  {:<24} {}", category.id, category.slug, category.name);
        }
        println!("{} categories", categories.len());
    }
    Ok(())
}

/// Create a category.
///
/// # Errors
///
/// Returns an error for a blank name, a taken slug, or a database failure.
pub async fn create(name: &str) -> Result<(), CommandError> {
    let store = connect_store().await?;
    let category = CategoryRepository::new(store, ChangeNotifier::new())
        .create(name)
        .await?;

    tracing::info!(category_id = %category.id, slug = %category.slug, "Category created");
    Ok(())
}

/// Delete a category, or report what deleting it would remove.
///
/// # Errors
///
/// Returns `CommandError::Unconfirmed` when `confirmed` is false, and the
/// catalog error if the category does not exist.
pub async fn delete(id: CategoryId, confirmed: bool) -> Result<(), CommandError> {
    let (synchronizer, session) = connect_synchronizer().await?;

    if !confirmed {
        let category = synchronizer.category(id).await?;
        let products = synchronizer.preview_category_delete(&session, id).await?;
        return Err(CommandError::Unconfirmed(format!(
            "Deleting '{}' also deletes {products} product(s); re-run with --yes to confirm",
            category.name
        )));
    }

    let removal = synchronizer.delete_category(&session, id).await?;
    tracing::info!(
        category = %removal.category.name,
        products = removal.cascaded_products.len(),
        "Category deleted"
    );
    Ok(())
}
