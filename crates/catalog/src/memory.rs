//! In-memory backends.
//!
//! [`MemoryCatalogStore`] behaves like the `PostgreSQL` schema (unique slugs,
//! cascade on category delete, server-assigned ids and timestamps) and
//! [`MemoryObjectStore`] like a public bucket. Both can be told to fail so
//! partial-failure paths are testable without a network.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use tokio::sync::Mutex;

use reve_essence_core::{
    CatalogError, CatalogResult, Category, CategoryId, CategoryRemoval, CategoryStore,
    ImageLocator, NewCategory, ObjectStore, ObjectStoreError, Product, ProductFields, ProductId,
    ProductListing, ProductStore, StorageKey, ValidationError,
};

// =============================================================================
// Relational store
// =============================================================================

#[derive(Debug, Default)]
struct Tables {
    categories: Vec<Category>,
    products: Vec<Product>,
    last_created_at: Option<DateTime<Utc>>,
}

impl Tables {
    /// Strictly increasing creation timestamps at microsecond precision.
    fn next_timestamp(&mut self) -> DateTime<Utc> {
        let now = Utc::now();
        let now = DateTime::from_timestamp_micros(now.timestamp_micros()).unwrap_or(now);
        let stamp = match self.last_created_at {
            Some(last) if now <= last => last + TimeDelta::microseconds(1),
            _ => now,
        };
        self.last_created_at = Some(stamp);
        stamp
    }

    fn category_exists(&self, id: CategoryId) -> bool {
        self.categories.iter().any(|c| c.id == id)
    }
}

/// Catalog store held in process memory.
#[derive(Debug, Default)]
pub struct MemoryCatalogStore {
    tables: Mutex<Tables>,
    fail_writes: AtomicBool,
}

impl MemoryCatalogStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent write fail with a storage error (or succeed again).
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn check_writable(&self) -> CatalogResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(CatalogError::Storage("store unavailable".to_owned()));
        }
        Ok(())
    }
}

fn sorted_categories(categories: &[Category]) -> Vec<Category> {
    let mut sorted = categories.to_vec();
    sorted.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.as_uuid().cmp(&b.id.as_uuid())));
    sorted
}

#[async_trait]
impl CategoryStore for MemoryCatalogStore {
    async fn list_categories(&self) -> CatalogResult<Vec<Category>> {
        let tables = self.tables.lock().await;
        Ok(sorted_categories(&tables.categories))
    }

    async fn find_category(&self, id: CategoryId) -> CatalogResult<Option<Category>> {
        let tables = self.tables.lock().await;
        Ok(tables.categories.iter().find(|c| c.id == id).cloned())
    }

    async fn insert_category(&self, new: NewCategory) -> CatalogResult<Category> {
        self.check_writable()?;
        let mut tables = self.tables.lock().await;

        if tables.categories.iter().any(|c| c.slug == new.slug) {
            return Err(CatalogError::Conflict(format!(
                "a category with slug '{}' already exists",
                new.slug
            )));
        }

        let category = Category {
            id: CategoryId::generate(),
            name: new.name,
            slug: new.slug,
            created_at: tables.next_timestamp(),
        };
        tables.categories.push(category.clone());
        Ok(category)
    }

    async fn count_products_in(&self, id: CategoryId) -> CatalogResult<u64> {
        let tables = self.tables.lock().await;
        let count = tables
            .products
            .iter()
            .filter(|p| p.category_id == id)
            .count();
        Ok(u64::try_from(count).unwrap_or(u64::MAX))
    }

    async fn delete_category(&self, id: CategoryId) -> CatalogResult<Option<CategoryRemoval>> {
        self.check_writable()?;
        let mut tables = self.tables.lock().await;

        let Some(position) = tables.categories.iter().position(|c| c.id == id) else {
            return Ok(None);
        };
        let category = tables.categories.remove(position);

        let (cascaded_products, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut tables.products)
            .into_iter()
            .partition(|p| p.category_id == id);
        tables.products = kept;

        Ok(Some(CategoryRemoval {
            category,
            cascaded_products,
        }))
    }
}

#[async_trait]
impl ProductStore for MemoryCatalogStore {
    async fn list_products(&self) -> CatalogResult<Vec<ProductListing>> {
        let tables = self.tables.lock().await;

        let mut listings: Vec<ProductListing> = tables
            .products
            .iter()
            .filter_map(|product| {
                let category = tables.categories.iter().find(|c| c.id == product.category_id)?;
                Some(ProductListing {
                    product: product.clone(),
                    category_name: category.name.clone(),
                    category_slug: category.slug.clone(),
                })
            })
            .collect();

        listings.sort_by(|a, b| {
            b.product
                .created_at
                .cmp(&a.product.created_at)
                .then(a.product.id.as_uuid().cmp(&b.product.id.as_uuid()))
        });
        Ok(listings)
    }

    async fn find_product(&self, id: ProductId) -> CatalogResult<Option<Product>> {
        let tables = self.tables.lock().await;
        Ok(tables.products.iter().find(|p| p.id == id).cloned())
    }

    async fn insert_product(&self, fields: ProductFields) -> CatalogResult<Product> {
        self.check_writable()?;
        let mut tables = self.tables.lock().await;

        if !tables.category_exists(fields.category_id) {
            return Err(ValidationError::new("category_id", "category does not exist").into());
        }

        let product = Product {
            id: ProductId::generate(),
            name: fields.name,
            description: fields.description,
            price: fields.price,
            category_id: fields.category_id,
            material: fields.material,
            sizes: fields.sizes,
            colors: fields.colors,
            image_paths: fields.image_paths,
            created_at: tables.next_timestamp(),
        };
        tables.products.push(product.clone());
        Ok(product)
    }

    async fn replace_product(
        &self,
        id: ProductId,
        fields: ProductFields,
    ) -> CatalogResult<Option<Product>> {
        self.check_writable()?;
        let mut tables = self.tables.lock().await;

        if !tables.products.iter().any(|p| p.id == id) {
            return Ok(None);
        }
        if !tables.category_exists(fields.category_id) {
            return Err(ValidationError::new("category_id", "category does not exist").into());
        }

        let Some(product) = tables.products.iter_mut().find(|p| p.id == id) else {
            return Ok(None);
        };
        product.name = fields.name;
        product.description = fields.description;
        product.price = fields.price;
        product.category_id = fields.category_id;
        product.material = fields.material;
        product.sizes = fields.sizes;
        product.colors = fields.colors;
        product.image_paths = fields.image_paths;
        Ok(Some(product.clone()))
    }

    async fn delete_product(&self, id: ProductId) -> CatalogResult<Option<Product>> {
        self.check_writable()?;
        let mut tables = self.tables.lock().await;

        let position = tables.products.iter().position(|p| p.id == id);
        Ok(position.map(|index| tables.products.remove(index)))
    }
}

// =============================================================================
// Object store
// =============================================================================

/// An object held by [`MemoryObjectStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

#[derive(Debug, Default)]
struct Bucket {
    objects: BTreeMap<StorageKey, StoredObject>,
    /// Remaining successful puts before uploads start failing.
    put_budget: Option<usize>,
    fail_deletes: bool,
}

/// Object store held in process memory.
#[derive(Debug)]
pub struct MemoryObjectStore {
    bucket: String,
    public_base_url: String,
    state: Mutex<Bucket>,
}

impl MemoryObjectStore {
    /// Create a store whose locators look like `<public_base_url>/<bucket>/<key>`.
    #[must_use]
    pub fn new(public_base_url: impl Into<String>, bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            public_base_url: public_base_url.into().trim_end_matches('/').to_owned(),
            state: Mutex::new(Bucket::default()),
        }
    }

    /// Allow `successful_puts` more uploads, then fail every one after.
    pub async fn fail_puts_after(&self, successful_puts: usize) {
        self.state.lock().await.put_budget = Some(successful_puts);
    }

    /// Make deletes fail (or succeed again).
    pub async fn fail_deletes(&self, fail: bool) {
        self.state.lock().await.fail_deletes = fail;
    }

    /// Keys currently stored, in key order.
    pub async fn keys(&self) -> Vec<StorageKey> {
        self.state.lock().await.objects.keys().cloned().collect()
    }

    pub async fn get(&self, key: &StorageKey) -> Option<StoredObject> {
        self.state.lock().await.objects.get(key).cloned()
    }

    pub async fn len(&self) -> usize {
        self.state.lock().await.objects.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.state.lock().await.objects.is_empty()
    }
}

impl Default for MemoryObjectStore {
    fn default() -> Self {
        Self::new("memory://assets", crate::assets::DEFAULT_BUCKET)
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn put(
        &self,
        key: &StorageKey,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), ObjectStoreError> {
        let mut state = self.state.lock().await;

        match state.put_budget {
            Some(0) => return Err(ObjectStoreError("simulated upload failure".to_owned())),
            Some(remaining) => state.put_budget = Some(remaining - 1),
            None => {}
        }

        state.objects.insert(
            key.clone(),
            StoredObject {
                bytes,
                content_type: content_type.to_owned(),
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &StorageKey) -> Result<(), ObjectStoreError> {
        let mut state = self.state.lock().await;
        if state.fail_deletes {
            return Err(ObjectStoreError("simulated delete failure".to_owned()));
        }
        state.objects.remove(key);
        Ok(())
    }

    fn public_url(&self, key: &StorageKey) -> ImageLocator {
        ImageLocator::new(format!("{}/{}/{key}", self.public_base_url, self.bucket))
    }

    async fn list(&self, prefix: &str) -> Result<Vec<StorageKey>, ObjectStoreError> {
        let state = self.state.lock().await;
        Ok(state
            .objects
            .keys()
            .filter(|key| key.as_str().starts_with(prefix))
            .cloned()
            .collect())
    }
}
