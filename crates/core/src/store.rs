//! Interfaces to the external collaborators the catalog relies on.
//!
//! - [`CategoryStore`] / [`ProductStore`] - a relational store with
//!   server-assigned identifiers and timestamps, unique-constraint
//!   enforcement on category slugs, and cascade-on-delete from category to
//!   product.
//! - [`ObjectStore`] - content upload and removal by path, plus stable public
//!   URL resolution.
//!
//! Implementations own atomicity per record; callers never hold locks
//! across calls.

use async_trait::async_trait;

use crate::error::CatalogResult;
use crate::types::{
    Category, CategoryId, CategoryRemoval, ImageLocator, NewCategory, Product, ProductFields,
    ProductId, ProductListing, StorageKey,
};

/// Category records in the relational store.
#[async_trait]
pub trait CategoryStore: Send + Sync {
    /// All categories ordered by name, then id.
    async fn list_categories(&self) -> CatalogResult<Vec<Category>>;

    async fn find_category(&self, id: CategoryId) -> CatalogResult<Option<Category>>;

    /// Insert a category.
    ///
    /// Fails with `CatalogError::Conflict` if the slug is taken.
    async fn insert_category(&self, new: NewCategory) -> CatalogResult<Category>;

    /// Number of products that currently reference the category.
    async fn count_products_in(&self, id: CategoryId) -> CatalogResult<u64>;

    /// Delete a category and, by cascade, its products.
    ///
    /// Returns `None` if the category does not exist.
    async fn delete_category(&self, id: CategoryId) -> CatalogResult<Option<CategoryRemoval>>;
}

/// Product records in the relational store.
#[async_trait]
pub trait ProductStore: Send + Sync {
    /// All products joined with their category, newest first, then by id.
    async fn list_products(&self) -> CatalogResult<Vec<ProductListing>>;

    async fn find_product(&self, id: ProductId) -> CatalogResult<Option<Product>>;

    /// Insert a product.
    ///
    /// Fails with a `category_id` validation error if the category vanished
    /// between the caller's check and the write.
    async fn insert_product(&self, fields: ProductFields) -> CatalogResult<Product>;

    /// Replace every mutable field of a product, keeping `id` and `created_at`.
    ///
    /// Returns `None` if the product does not exist.
    async fn replace_product(
        &self,
        id: ProductId,
        fields: ProductFields,
    ) -> CatalogResult<Option<Product>>;

    /// Delete a product record. Returns `None` if it does not exist.
    async fn delete_product(&self, id: ProductId) -> CatalogResult<Option<Product>>;
}

/// Failure reported by an object store backend.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{0}")]
pub struct ObjectStoreError(pub String);

/// Binary object storage addressed by [`StorageKey`].
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Bucket name; public locators contain `/<bucket>/` before the key.
    fn bucket(&self) -> &str;

    /// Store `bytes` under `key`.
    async fn put(
        &self,
        key: &StorageKey,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), ObjectStoreError>;

    /// Remove the object at `key`. Removing a missing object is not an error.
    async fn delete(&self, key: &StorageKey) -> Result<(), ObjectStoreError>;

    /// Public locator for `key`.
    fn public_url(&self, key: &StorageKey) -> ImageLocator;

    /// Keys of every object whose path starts with `prefix`.
    async fn list(&self, prefix: &str) -> Result<Vec<StorageKey>, ObjectStoreError>;
}
