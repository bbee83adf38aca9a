//! Asset store gateway: product image upload, removal and orphan sweeping.
//!
//! Uploads are written under `products/` with a collision-resistant key
//! (`<unix-millis>-<random-token>.<ext>`) and addressed afterwards by their
//! public locator. Removal is best-effort: a locator that does not point into
//! the bucket is ignored rather than treated as an error.

pub mod local;
pub mod supabase;

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, info, instrument, warn};

use reve_essence_core::{
    CatalogError, CatalogResult, ImageLocator, ObjectStore, PRODUCT_IMAGE_PREFIX, StorageKey,
};

pub use local::LocalObjectStore;
pub use supabase::SupabaseObjectStore;

/// Bucket product images live in unless configured otherwise.
pub const DEFAULT_BUCKET: &str = "product-images";

/// Length of the random part of an upload key.
const TOKEN_LENGTH: usize = 10;

/// Default age below which unreferenced objects are not swept.
pub const DEFAULT_SWEEP_GRACE: Duration = Duration::from_secs(60 * 60);

/// Result of an orphan sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Number of stored objects examined.
    pub scanned: usize,
    /// Objects no product references (removed unless this was a dry run).
    pub orphaned: Vec<StorageKey>,
    /// Unreferenced objects left alone because they are inside the grace
    /// period.
    pub recent: usize,
    /// Orphans whose removal failed.
    pub failed: Vec<StorageKey>,
}

/// How an orphan sweep behaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweepOptions {
    /// Report orphans without removing them.
    pub dry_run: bool,
    /// Minimum age of an unreferenced object before it counts as orphaned.
    pub grace: Duration,
}

impl Default for SweepOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            grace: DEFAULT_SWEEP_GRACE,
        }
    }
}

/// Gateway between the catalog and an [`ObjectStore`].
#[derive(Clone)]
pub struct AssetGateway {
    store: Arc<dyn ObjectStore>,
}

impl AssetGateway {
    #[must_use]
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }

    #[must_use]
    pub fn bucket(&self) -> &str {
        self.store.bucket()
    }

    /// Store an image and return its public locator.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Upload` if the object store rejects the write.
    #[instrument(skip(self, bytes), fields(size = bytes.len()))]
    pub async fn upload(
        &self,
        bytes: Vec<u8>,
        original_filename: &str,
    ) -> CatalogResult<ImageLocator> {
        let key = StorageKey::compose(
            chrono::Utc::now().timestamp_millis(),
            &random_token(),
            original_filename,
        );
        let content_type = content_type_for(&key);

        self.store
            .put(&key, bytes, content_type)
            .await
            .map_err(|e| CatalogError::Upload(format!("{original_filename}: {e}")))?;

        let locator = self.store.public_url(&key);
        info!(key = %key, "Uploaded product image");
        Ok(locator)
    }

    /// Delete the object behind a locator.
    ///
    /// Locators that do not contain the bucket path segment are a silent
    /// no-op. Removing an object that no longer exists succeeds.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Storage` if the object store fails.
    #[instrument(skip(self), fields(locator = %locator))]
    pub async fn remove(&self, locator: &ImageLocator) -> CatalogResult<()> {
        let Some(key) = locator.storage_key(self.store.bucket()) else {
            debug!("Locator is not in the asset bucket, nothing to remove");
            return Ok(());
        };

        self.store
            .delete(&key)
            .await
            .map_err(|e| CatalogError::Storage(format!("failed to remove {key}: {e}")))?;

        info!(key = %key, "Removed product image");
        Ok(())
    }

    /// Remove several locators, logging failures instead of returning them.
    ///
    /// Returns how many removals failed.
    pub async fn remove_best_effort<'a, I>(&self, locators: I) -> usize
    where
        I: IntoIterator<Item = &'a ImageLocator>,
    {
        let mut failures = 0;
        for locator in locators {
            if let Err(e) = self.remove(locator).await {
                warn!(locator = %locator, error = %e, "Failed to remove product image");
                failures += 1;
            }
        }
        failures
    }

    /// Keys of every stored object under `prefix`.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Storage` if the listing fails.
    pub async fn list_keys(&self, prefix: &str) -> CatalogResult<Vec<StorageKey>> {
        self.store
            .list(prefix)
            .await
            .map_err(|e| CatalogError::Storage(format!("failed to list {prefix}: {e}")))
    }

    /// Find stored product images that no locator in `referenced` points at,
    /// and remove them unless this is a dry run.
    ///
    /// Objects uploaded within the grace period are left alone: they may
    /// belong to a submission whose store write has not landed yet.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Storage` if the bucket cannot be listed.
    /// Individual removal failures are reported in the returned
    /// [`SweepReport`].
    #[instrument(skip(self, referenced))]
    pub async fn sweep_orphans<'a, I>(
        &self,
        referenced: I,
        options: SweepOptions,
    ) -> CatalogResult<SweepReport>
    where
        I: IntoIterator<Item = &'a ImageLocator>,
    {
        let bucket = self.store.bucket();
        let live: HashSet<StorageKey> = referenced
            .into_iter()
            .filter_map(|locator| locator.storage_key(bucket))
            .collect();

        let grace_millis = i64::try_from(options.grace.as_millis()).unwrap_or(i64::MAX);
        let cutoff = Utc::now().timestamp_millis().saturating_sub(grace_millis);

        let stored = self.list_keys(PRODUCT_IMAGE_PREFIX).await?;
        let mut report = SweepReport {
            scanned: stored.len(),
            ..SweepReport::default()
        };

        for key in stored.into_iter().filter(|key| !live.contains(key)) {
            if uploaded_at_millis(&key).is_some_and(|uploaded| uploaded > cutoff) {
                debug!(key = %key, "Skipping recent unreferenced image");
                report.recent += 1;
                continue;
            }
            if !options.dry_run
                && let Err(e) = self.store.delete(&key).await
            {
                warn!(key = %key, error = %e, "Failed to remove orphaned image");
                report.failed.push(key.clone());
            }
            report.orphaned.push(key);
        }

        info!(
            scanned = report.scanned,
            orphaned = report.orphaned.len(),
            recent = report.recent,
            failed = report.failed.len(),
            dry_run = options.dry_run,
            "Orphan sweep finished"
        );
        Ok(report)
    }
}

impl std::fmt::Debug for AssetGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssetGateway")
            .field("bucket", &self.store.bucket())
            .finish_non_exhaustive()
    }
}

/// Random lowercase base-36 token.
fn random_token() -> String {
    use rand::Rng;

    let mut rng = rand::rng();
    (0..TOKEN_LENGTH)
        .map(|_| char::from_digit(rng.random_range(0..36), 36).unwrap_or('0'))
        .collect()
}

/// Upload time encoded in a key's file name (`<unix-millis>-<token>.<ext>`).
fn uploaded_at_millis(key: &StorageKey) -> Option<i64> {
    key.file_name().split_once('-')?.0.parse().ok()
}

/// MIME type for a key, derived from its extension.
fn content_type_for(key: &StorageKey) -> &'static str {
    let extension = key.as_str().rsplit_once('.').map_or("", |(_, ext)| ext);
    match extension {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "avif" => "image/avif",
        "svg" => "image/svg+xml",
        _ => "application/octet-stream",
    }
}
