//! Cached read model shared by the admin and storefront views.
//!
//! Each collection is cached under its own key with a time-to-live. An
//! invalidation bumps the collection's epoch before evicting, and a fill only
//! lands if the epoch it started under is still current, so a fetch that
//! straddles an invalidation can never reinstate stale data.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use moka::future::Cache;
use tracing::debug;

use reve_essence_core::{CatalogResult, Category, CategorySection, ProductListing, group_by_category};

use crate::notifier::ChangeEvent;
use crate::repository::{CategoryRepository, ProductRepository};

/// Default time-to-live for cached collections.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);

#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
enum ViewKey {
    Categories,
    Products,
}

impl From<ChangeEvent> for ViewKey {
    fn from(event: ChangeEvent) -> Self {
        match event {
            ChangeEvent::CategoriesChanged => Self::Categories,
            ChangeEvent::ProductsChanged => Self::Products,
        }
    }
}

#[derive(Debug, Clone)]
enum ViewValue {
    Categories(Arc<Vec<Category>>),
    Products(Arc<Vec<ProductListing>>),
}

/// Cached catalog read model.
pub struct CatalogView {
    categories: CategoryRepository,
    products: ProductRepository,
    cache: Cache<ViewKey, ViewValue>,
    categories_epoch: AtomicU64,
    products_epoch: AtomicU64,
}

impl CatalogView {
    #[must_use]
    pub fn new(categories: CategoryRepository, products: ProductRepository, ttl: Duration) -> Self {
        let cache = Cache::builder().max_capacity(8).time_to_live(ttl).build();

        Self {
            categories,
            products,
            cache,
            categories_epoch: AtomicU64::new(0),
            products_epoch: AtomicU64::new(0),
        }
    }

    const fn epoch(&self, key: ViewKey) -> &AtomicU64 {
        match key {
            ViewKey::Categories => &self.categories_epoch,
            ViewKey::Products => &self.products_epoch,
        }
    }

    /// All categories, sorted by name.
    ///
    /// # Errors
    ///
    /// Returns the repository error if a cache miss has to re-fetch and the
    /// fetch fails.
    pub async fn categories(&self) -> CatalogResult<Arc<Vec<Category>>> {
        if let Some(ViewValue::Categories(categories)) = self.cache.get(&ViewKey::Categories).await
        {
            debug!("Cache hit for categories");
            return Ok(categories);
        }

        let epoch = self.categories_epoch.load(Ordering::SeqCst);
        let categories = Arc::new(self.categories.list().await?);
        self.fill(ViewKey::Categories, epoch, ViewValue::Categories(categories.clone()))
            .await;
        Ok(categories)
    }

    /// All products with their category, newest first.
    ///
    /// # Errors
    ///
    /// Returns the repository error if a cache miss has to re-fetch and the
    /// fetch fails.
    pub async fn products(&self) -> CatalogResult<Arc<Vec<ProductListing>>> {
        if let Some(ViewValue::Products(products)) = self.cache.get(&ViewKey::Products).await {
            debug!("Cache hit for products");
            return Ok(products);
        }

        let epoch = self.products_epoch.load(Ordering::SeqCst);
        let products = Arc::new(self.products.list().await?);
        self.fill(ViewKey::Products, epoch, ViewValue::Products(products.clone()))
            .await;
        Ok(products)
    }

    /// Products grouped under their categories.
    ///
    /// Sections follow category name order; products inside a section keep
    /// the newest-first order of the listing.
    ///
    /// # Errors
    ///
    /// Returns the repository error if either collection has to be
    /// re-fetched and the fetch fails.
    pub async fn sections(&self) -> CatalogResult<Vec<CategorySection>> {
        let categories = self.categories().await?;
        let products = self.products().await?;
        Ok(group_by_category(&categories, &products))
    }

    /// Drop the cached copy of the collection an event refers to.
    pub async fn invalidate(&self, event: ChangeEvent) {
        let key = ViewKey::from(event);
        self.epoch(key).fetch_add(1, Ordering::SeqCst);
        self.cache.invalidate(&key).await;
        debug!(%event, "Invalidated cached collection");
    }

    /// Drop every cached collection.
    pub async fn invalidate_all(&self) {
        self.categories_epoch.fetch_add(1, Ordering::SeqCst);
        self.products_epoch.fetch_add(1, Ordering::SeqCst);
        self.cache.invalidate_all();
        self.cache.run_pending_tasks().await;
        debug!("Invalidated all cached collections");
    }

    async fn fill(&self, key: ViewKey, epoch: u64, value: ViewValue) {
        let counter = self.epoch(key);
        if counter.load(Ordering::SeqCst) != epoch {
            debug!(?key, "Discarding fetch that raced an invalidation");
            return;
        }
        self.cache.insert(key, value).await;
        // An invalidation may have slipped in between the check and the insert
        if counter.load(Ordering::SeqCst) != epoch {
            self.cache.invalidate(&key).await;
        }
    }
}

impl std::fmt::Debug for CatalogView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogView")
            .field("entries", &self.cache.entry_count())
            .field("categories_epoch", &self.categories_epoch)
            .field("products_epoch", &self.products_epoch)
            .finish_non_exhaustive()
    }
}
