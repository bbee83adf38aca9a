//! URL-safe category slugs.

use core::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// A normalized, URL-safe identifier derived from a display name.
///
/// Derivation trims the name, lowercases it and collapses every run of
/// internal whitespace into a single `-`.
///
/// ## Examples
///
/// ```
/// use reve_essence_core::Slug;
///
/// assert_eq!(Slug::from_name("Wrist Watches").unwrap().as_str(), "wrist-watches");
/// assert_eq!(Slug::from_name("  Shoes ").unwrap().as_str(), "shoes");
/// assert!(Slug::from_name("   ").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Slug(String);

impl Slug {
    /// Derive a slug from a display name.
    ///
    /// # Errors
    ///
    /// Returns a `ValidationError` on the `name` field if the name is empty
    /// after trimming.
    pub fn from_name(name: &str) -> Result<Self, ValidationError> {
        let slug = name
            .split_whitespace()
            .map(str::to_lowercase)
            .collect::<Vec<_>>()
            .join("-");

        if slug.is_empty() {
            return Err(ValidationError::required("name"));
        }

        Ok(Self(slug))
    }

    /// Returns the slug as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the `Slug` and returns its inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }

    /// Wrap a slug read back from storage.
    ///
    /// Stored slugs were derived by [`Slug::from_name`] when written.
    #[must_use]
    pub const fn from_stored(slug: String) -> Self {
        Self(slug)
    }
}

impl fmt::Display for Slug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Slug {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
