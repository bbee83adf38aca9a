//! Catalog synchronizer: the single entry point both views go through.
//!
//! Reads are served from a cached [`CatalogView`]. Writes are multi-step:
//!
//! 1. Check every field of the draft that can be checked locally, including
//!    "at least one image" counting the images about to be uploaded.
//! 2. Upload new images one at a time, in order. The first failure aborts the
//!    submission; images already uploaded stay in the bucket.
//! 3. Write retained images followed by uploaded ones in a single
//!    create/update.
//! 4. Invalidate the local view right away; the repository has already
//!    published the change for every other viewer.
//! 5. Under [`OrphanPolicy::Reclaim`], remove images the write released
//!    that no remaining product still references. This never fails the
//!    write.

mod view;

use core::fmt;
use core::str::FromStr;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{info, instrument, warn};

use reve_essence_core::{
    AdminSession, CatalogResult, Category, CategoryId, CategoryRemoval, CategorySection,
    CategoryStore, ImageLocator, ObjectStore, Product, ProductDraft, ProductId, ProductListing,
    ProductStore,
};

use crate::assets::AssetGateway;
use crate::notifier::{ChangeEvent, ChangeNotifier};
use crate::repository::{CategoryRepository, ProductRepository};

pub use view::{CatalogView, DEFAULT_CACHE_TTL};

/// What to do with stored images a write no longer references.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OrphanPolicy {
    /// Leave them in the bucket.
    Retain,
    /// Remove them after the write commits (best-effort).
    #[default]
    Reclaim,
}

impl FromStr for OrphanPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "retain" => Ok(Self::Retain),
            "reclaim" => Ok(Self::Reclaim),
            other => Err(format!("expected 'retain' or 'reclaim', got '{other}'")),
        }
    }
}

impl fmt::Display for OrphanPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Retain => f.write_str("retain"),
            Self::Reclaim => f.write_str("reclaim"),
        }
    }
}

/// A new image attached to a submission.
#[derive(Clone, PartialEq, Eq)]
pub struct ImageUpload {
    /// Name of the file as the admin picked it; only its extension is kept.
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl ImageUpload {
    #[must_use]
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes,
        }
    }
}

impl fmt::Debug for ImageUpload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageUpload")
            .field("file_name", &self.file_name)
            .field("size", &self.bytes.len())
            .finish()
    }
}

/// A product form submission: field values, the existing images the admin
/// kept (in `draft.image_paths`), and new images to upload.
#[derive(Debug, Clone, Default)]
pub struct ProductSubmission {
    pub draft: ProductDraft,
    pub uploads: Vec<ImageUpload>,
}

/// Tunables for the synchronizer.
#[derive(Debug, Clone, Copy)]
pub struct SyncOptions {
    pub orphan_policy: OrphanPolicy,
    pub cache_ttl: Duration,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            orphan_policy: OrphanPolicy::default(),
            cache_ttl: DEFAULT_CACHE_TTL,
        }
    }
}

/// Orchestrates repositories, asset gateway, notifier and cached view.
#[derive(Clone)]
pub struct CatalogSynchronizer {
    categories: CategoryRepository,
    products: ProductRepository,
    assets: AssetGateway,
    notifier: ChangeNotifier,
    view: Arc<CatalogView>,
    orphan_policy: OrphanPolicy,
}

impl CatalogSynchronizer {
    /// Wire a synchronizer over a relational store and an object store.
    ///
    /// `store` is typically a single backend implementing both store traits.
    #[must_use]
    pub fn new<S>(
        store: Arc<S>,
        objects: Arc<dyn ObjectStore>,
        notifier: ChangeNotifier,
        options: SyncOptions,
    ) -> Self
    where
        S: CategoryStore + ProductStore + 'static,
    {
        let categories = CategoryRepository::new(store.clone(), notifier.clone());
        let products = ProductRepository::new(store.clone(), store, notifier.clone());
        let view = Arc::new(CatalogView::new(
            categories.clone(),
            products.clone(),
            options.cache_ttl,
        ));

        Self {
            categories,
            products,
            assets: AssetGateway::new(objects),
            notifier,
            view,
            orphan_policy: options.orphan_policy,
        }
    }

    #[must_use]
    pub const fn notifier(&self) -> &ChangeNotifier {
        &self.notifier
    }

    #[must_use]
    pub const fn assets(&self) -> &AssetGateway {
        &self.assets
    }

    #[must_use]
    pub const fn orphan_policy(&self) -> OrphanPolicy {
        self.orphan_policy
    }

    /// Keep the cached view in step with change events until the notifier
    /// is dropped.
    ///
    /// A receiver that falls behind has missed events it cannot recover, so
    /// it drops everything.
    #[must_use]
    pub fn spawn_invalidation(&self) -> JoinHandle<()> {
        let mut events = self.notifier.subscribe();
        let view = Arc::clone(&self.view);

        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => view.invalidate(event).await,
                    Err(RecvError::Lagged(missed)) => {
                        warn!(missed, "Change listener lagged, invalidating everything");
                        view.invalidate_all().await;
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        })
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// All categories, sorted by name.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Storage` if the store fails.
    pub async fn categories(&self) -> CatalogResult<Arc<Vec<Category>>> {
        self.view.categories().await
    }

    /// All products with their category, newest first.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Storage` if the store fails.
    pub async fn products(&self) -> CatalogResult<Arc<Vec<ProductListing>>> {
        self.view.products().await
    }

    /// Products grouped by category for browsing.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Storage` if the store fails.
    pub async fn sections(&self) -> CatalogResult<Vec<CategorySection>> {
        self.view.sections().await
    }

    /// A single product, read through to the store.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::NotFound` if the product does not exist.
    pub async fn product(&self, id: ProductId) -> CatalogResult<Product> {
        self.products.get(id).await
    }

    /// A single category, read through to the store.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::NotFound` if the category does not exist.
    pub async fn category(&self, id: CategoryId) -> CatalogResult<Category> {
        self.categories.get(id).await
    }

    // =========================================================================
    // Category writes
    // =========================================================================

    /// Create a category.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Validation` for a blank name and
    /// `CatalogError::Conflict` for a taken slug.
    #[instrument(skip(self, session), fields(admin = session.subject()))]
    pub async fn create_category(
        &self,
        session: &AdminSession,
        name: &str,
    ) -> CatalogResult<Category> {
        let category = self.categories.create(name).await?;
        self.view.invalidate(ChangeEvent::CategoriesChanged).await;
        Ok(category)
    }

    /// How many products deleting a category would remove.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::NotFound` if the category does not exist.
    #[instrument(skip(self, session), fields(admin = session.subject(), category_id = %id))]
    pub async fn preview_category_delete(
        &self,
        session: &AdminSession,
        id: CategoryId,
    ) -> CatalogResult<u64> {
        self.categories.preview_delete(id).await
    }

    /// Delete a category and, by cascade, its products.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::NotFound` if the category does not exist.
    #[instrument(skip(self, session), fields(admin = session.subject(), category_id = %id))]
    pub async fn delete_category(
        &self,
        session: &AdminSession,
        id: CategoryId,
    ) -> CatalogResult<CategoryRemoval> {
        let removal = self.categories.delete(id).await?;
        self.view.invalidate(ChangeEvent::CategoriesChanged).await;
        self.view.invalidate(ChangeEvent::ProductsChanged).await;

        self.reclaim(removal.released_images()).await;
        Ok(removal)
    }

    // =========================================================================
    // Product writes
    // =========================================================================

    /// Create a product from a form submission.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Validation` before anything is uploaded when a
    /// field is invalid, `CatalogError::Upload` if an image upload fails
    /// (nothing is written), or the store's error if the write fails.
    #[instrument(skip(self, session, submission), fields(admin = session.subject()))]
    pub async fn create_product(
        &self,
        session: &AdminSession,
        submission: ProductSubmission,
    ) -> CatalogResult<Product> {
        submission.draft.precheck(submission.uploads.len())?;

        let draft = self.attach_uploads(submission).await?;
        let product = self.products.create(draft).await?;
        self.view.invalidate(ChangeEvent::ProductsChanged).await;
        Ok(product)
    }

    /// Replace a product's fields from a form submission.
    ///
    /// Images present before the update but absent from the result are
    /// released.
    ///
    /// # Errors
    ///
    /// As [`Self::create_product`], plus `CatalogError::NotFound` if the
    /// product does not exist.
    #[instrument(skip(self, session, submission), fields(admin = session.subject(), product_id = %id))]
    pub async fn update_product(
        &self,
        session: &AdminSession,
        id: ProductId,
        submission: ProductSubmission,
    ) -> CatalogResult<Product> {
        submission.draft.precheck(submission.uploads.len())?;
        let previous = self.products.get(id).await?;

        let draft = self.attach_uploads(submission).await?;
        let product = self.products.update(id, draft).await?;
        self.view.invalidate(ChangeEvent::ProductsChanged).await;

        let kept: HashSet<&ImageLocator> = product.image_paths.iter().collect();
        self.reclaim(
            previous
                .image_paths
                .iter()
                .filter(|locator| !kept.contains(locator)),
        )
        .await;
        Ok(product)
    }

    /// Delete a product.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::NotFound` if the product does not exist.
    #[instrument(skip(self, session), fields(admin = session.subject(), product_id = %id))]
    pub async fn delete_product(
        &self,
        session: &AdminSession,
        id: ProductId,
    ) -> CatalogResult<Product> {
        let product = self.products.delete(id).await?;
        self.view.invalidate(ChangeEvent::ProductsChanged).await;

        self.reclaim(product.image_paths.iter()).await;
        Ok(product)
    }

    /// Upload the submission's images in order and append their locators to
    /// the retained ones.
    async fn attach_uploads(&self, submission: ProductSubmission) -> CatalogResult<ProductDraft> {
        let ProductSubmission { mut draft, uploads } = submission;
        let total = uploads.len();

        for (index, upload) in uploads.into_iter().enumerate() {
            let locator = self
                .assets
                .upload(upload.bytes, &upload.file_name)
                .await
                .inspect_err(|e| {
                    warn!(
                        uploaded = index,
                        total,
                        error = %e,
                        "Image upload failed, aborting submission"
                    );
                })?;
            draft.image_paths.push(locator);
        }

        Ok(draft)
    }

    async fn reclaim<'a, I>(&self, released: I)
    where
        I: IntoIterator<Item = &'a ImageLocator>,
    {
        if self.orphan_policy == OrphanPolicy::Retain {
            return;
        }
        let mut released: Vec<&ImageLocator> = released.into_iter().collect();
        if released.is_empty() {
            return;
        }

        // Another product may still point at a released image
        let live = match self.products.list().await {
            Ok(live) => live,
            Err(e) => {
                warn!(error = %e, "Could not list live images, skipping reclaim");
                return;
            }
        };
        let referenced: HashSet<&ImageLocator> = live
            .iter()
            .flat_map(|listing| listing.product.image_paths.iter())
            .collect();
        let total = released.len();
        released.retain(|locator| !referenced.contains(locator));

        let remaining = released.len();
        let failures = self.assets.remove_best_effort(released).await;
        info!(
            released = total,
            removed = remaining.saturating_sub(failures),
            failures,
            "Reclaimed released product images"
        );
    }
}

impl fmt::Debug for CatalogSynchronizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CatalogSynchronizer")
            .field("assets", &self.assets)
            .field("view", &self.view)
            .field("orphan_policy", &self.orphan_policy)
            .finish_non_exhaustive()
    }
}
