//! Image locators and storage keys.
//!
//! A product holds its images by value as an ordered list of public
//! locators. The object store is addressed by storage key; the key is
//! recoverable from a locator by matching the bucket path segment.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Folder inside the bucket where product images are written.
pub const PRODUCT_IMAGE_PREFIX: &str = "products/";

/// Extension used when the uploaded file name has none.
const FALLBACK_EXTENSION: &str = "bin";

/// A durable, publicly resolvable reference to a stored image.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageLocator(String);

impl ImageLocator {
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self(url.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }

    /// Extract the storage key by matching `/<bucket>/` in the locator.
    ///
    /// Returns `None` for locators that do not contain the bucket segment
    /// (externally hosted or malformed URLs) or that have nothing after it.
    /// Query strings and fragments are not part of the key.
    #[must_use]
    pub fn storage_key(&self, bucket: &str) -> Option<StorageKey> {
        let marker = format!("/{bucket}/");
        let (_, rest) = self.0.split_once(&marker)?;
        let key = rest
            .split(['?', '#'])
            .next()
            .unwrap_or_default()
            .trim_matches('/');

        if key.is_empty() {
            return None;
        }
        Some(StorageKey(key.to_owned()))
    }
}

impl fmt::Display for ImageLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for ImageLocator {
    fn from(url: String) -> Self {
        Self(url)
    }
}

/// Path of an object inside the asset bucket (e.g. `products/1700000000000-k3j2h1g0f9.jpg`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StorageKey(String);

impl StorageKey {
    /// Wrap an existing object path.
    #[must_use]
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    /// Compose the key for a new upload:
    /// `products/<millisecond-timestamp>-<random-token>.<original-extension>`.
    ///
    /// The extension is everything after the last `.` of the original file
    /// name, lowercased. Names without an extension fall back to `bin`.
    ///
    /// ```
    /// use reve_essence_core::StorageKey;
    ///
    /// let key = StorageKey::compose(1_700_000_000_000, "abc123", "Watch.JPG");
    /// assert_eq!(key.as_str(), "products/1700000000000-abc123.jpg");
    /// ```
    #[must_use]
    pub fn compose(millis: i64, token: &str, original_filename: &str) -> Self {
        let extension = original_filename
            .rsplit_once('.')
            .map(|(_, ext)| ext.trim())
            .filter(|ext| !ext.is_empty() && ext.chars().all(char::is_alphanumeric))
            .map_or_else(|| FALLBACK_EXTENSION.to_owned(), str::to_lowercase);

        Self(format!("{PRODUCT_IMAGE_PREFIX}{millis}-{token}.{extension}"))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// File name portion of the key (after the last `/`).
    #[must_use]
    pub fn file_name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }
}

impl fmt::Display for StorageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
