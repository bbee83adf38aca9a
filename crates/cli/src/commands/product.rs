//! Product listing command.

use reve_essence_catalog::{ChangeNotifier, ProductRepository};

use super::{CommandError, connect_store};

/// Print every product with its category, newest first.
///
/// # Errors
///
/// Returns an error if the database is unreachable.
pub async fn list() -> Result<(), CommandError> {
    let store = connect_store().await?;
    let products = ProductRepository::new(store.clone(), store, ChangeNotifier::new())
        .list()
        .await?;

    #[allow(clippy::print_stdout)]
    {
        for listing in &products {
            let product = &listing.product;
            println!(
                "{}  {:<32} {:>12}  {:<16} {} image(s)",
                product.id,
                product.name,
                product.price,
                listing.category_name,
                product.image_paths.len()
            );
        }
        println!("{} products", products.len());
    }
    Ok(())
}
