//! Category repository.

use std::sync::Arc;

use tracing::{info, instrument};

use reve_essence_core::{
    CatalogError, CatalogResult, Category, CategoryId, CategoryRemoval, CategoryStore, Entity,
    NewCategory,
};

use crate::notifier::{ChangeEvent, ChangeNotifier};

/// Repository for the category taxonomy.
#[derive(Clone)]
pub struct CategoryRepository {
    store: Arc<dyn CategoryStore>,
    notifier: ChangeNotifier,
}

impl CategoryRepository {
    #[must_use]
    pub fn new(store: Arc<dyn CategoryStore>, notifier: ChangeNotifier) -> Self {
        Self { store, notifier }
    }

    /// All categories, sorted by name ascending.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Storage` if the store fails.
    pub async fn list(&self) -> CatalogResult<Vec<Category>> {
        self.store.list_categories().await
    }

    /// Look up a single category.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::NotFound` if no category has this id.
    pub async fn get(&self, id: CategoryId) -> CatalogResult<Category> {
        self.store
            .find_category(id)
            .await?
            .ok_or_else(|| CatalogError::not_found(Entity::Category, id))
    }

    /// Create a category from a display name.
    ///
    /// The slug is derived from the name (trimmed, lowercased, whitespace
    /// runs collapsed to `-`).
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Validation` if the name is blank and
    /// `CatalogError::Conflict` if the derived slug is already taken.
    #[instrument(skip(self))]
    pub async fn create(&self, name: &str) -> CatalogResult<Category> {
        let new = NewCategory::from_name(name)?;
        let category = self.store.insert_category(new).await?;

        info!(category_id = %category.id, slug = %category.slug, "Created category");
        self.notifier.publish(ChangeEvent::CategoriesChanged);
        Ok(category)
    }

    /// Number of products a delete of this category would remove.
    ///
    /// Informational only: products may be added or removed before the
    /// delete runs.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::NotFound` if the category does not exist.
    pub async fn preview_delete(&self, id: CategoryId) -> CatalogResult<u64> {
        self.get(id).await?;
        self.store.count_products_in(id).await
    }

    /// Delete a category and every product in it.
    ///
    /// Irreversible. Stored images are left alone; the returned report lists
    /// the cascaded products so the caller can decide what to do with them.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::NotFound` if the category does not exist.
    #[instrument(skip(self), fields(category_id = %id))]
    pub async fn delete(&self, id: CategoryId) -> CatalogResult<CategoryRemoval> {
        let removal = self
            .store
            .delete_category(id)
            .await?
            .ok_or_else(|| CatalogError::not_found(Entity::Category, id))?;

        info!(
            slug = %removal.category.slug,
            cascaded = removal.cascaded_products.len(),
            "Deleted category"
        );
        self.notifier.publish(ChangeEvent::CategoriesChanged);
        self.notifier.publish(ChangeEvent::ProductsChanged);
        Ok(removal)
    }
}
