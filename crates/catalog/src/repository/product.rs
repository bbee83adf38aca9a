//! Product repository.

use std::sync::Arc;

use tracing::{info, instrument};

use reve_essence_core::{
    CatalogError, CatalogResult, CategoryId, CategoryStore, Entity, Product, ProductDraft,
    ProductFields, ProductId, ProductListing, ProductStore, ValidationError,
};

use crate::notifier::{ChangeEvent, ChangeNotifier};

/// Repository for products.
#[derive(Clone)]
pub struct ProductRepository {
    products: Arc<dyn ProductStore>,
    categories: Arc<dyn CategoryStore>,
    notifier: ChangeNotifier,
}

impl ProductRepository {
    #[must_use]
    pub fn new(
        products: Arc<dyn ProductStore>,
        categories: Arc<dyn CategoryStore>,
        notifier: ChangeNotifier,
    ) -> Self {
        Self {
            products,
            categories,
            notifier,
        }
    }

    /// All products joined with their category, newest first.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Storage` if the store fails.
    pub async fn list(&self) -> CatalogResult<Vec<ProductListing>> {
        self.products.list_products().await
    }

    /// Look up a single product.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::NotFound` if no product has this id.
    pub async fn get(&self, id: ProductId) -> CatalogResult<Product> {
        self.products
            .find_product(id)
            .await?
            .ok_or_else(|| CatalogError::not_found(Entity::Product, id))
    }

    /// Validate a draft and create a product from it.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Validation` naming the first failing field.
    #[instrument(skip(self, draft), fields(name = %draft.name))]
    pub async fn create(&self, draft: ProductDraft) -> CatalogResult<Product> {
        let fields = self.validate(draft).await?;
        let product = self.products.insert_product(fields).await?;

        info!(product_id = %product.id, images = product.image_paths.len(), "Created product");
        self.notifier.publish(ChangeEvent::ProductsChanged);
        Ok(product)
    }

    /// Replace every mutable field of a product with the draft's.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Validation` naming the first failing field, or
    /// `CatalogError::NotFound` if the product does not exist (nothing is
    /// changed).
    #[instrument(skip(self, draft), fields(product_id = %id))]
    pub async fn update(&self, id: ProductId, draft: ProductDraft) -> CatalogResult<Product> {
        let fields = self.validate(draft).await?;
        let product = self
            .products
            .replace_product(id, fields)
            .await?
            .ok_or_else(|| CatalogError::not_found(Entity::Product, id))?;

        info!(images = product.image_paths.len(), "Updated product");
        self.notifier.publish(ChangeEvent::ProductsChanged);
        Ok(product)
    }

    /// Delete a product record, returning what was deleted.
    ///
    /// Stored images are not touched.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::NotFound` if the product does not exist.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn delete(&self, id: ProductId) -> CatalogResult<Product> {
        let product = self
            .products
            .delete_product(id)
            .await?
            .ok_or_else(|| CatalogError::not_found(Entity::Product, id))?;

        info!("Deleted product");
        self.notifier.publish(ChangeEvent::ProductsChanged);
        Ok(product)
    }

    /// Field checks first, then the category existence round trip.
    async fn validate(&self, draft: ProductDraft) -> CatalogResult<ProductFields> {
        let fields = draft.validate()?;
        self.ensure_category(fields.category_id).await?;
        Ok(fields)
    }

    async fn ensure_category(&self, id: CategoryId) -> CatalogResult<()> {
        if self.categories.find_category(id).await?.is_none() {
            return Err(ValidationError::new("category_id", "category does not exist").into());
        }
        Ok(())
    }
}
