//! Category records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{CategoryId, Product, Slug};
use crate::error::ValidationError;

/// A node of the catalog taxonomy.
///
/// Categories are never renamed; they are created and deleted by admins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    /// Display name (trimmed, non-empty).
    pub name: String,
    /// Unique URL-safe slug derived from the name.
    pub slug: Slug,
    pub created_at: DateTime<Utc>,
}

/// A validated request to create a category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCategory {
    pub name: String,
    pub slug: Slug,
}

impl NewCategory {
    /// Validate a display name and derive its slug.
    ///
    /// # Errors
    ///
    /// Returns a `ValidationError` on `name` if it is empty after trimming.
    pub fn from_name(name: &str) -> Result<Self, ValidationError> {
        let slug = Slug::from_name(name)?;
        Ok(Self {
            name: name.trim().to_owned(),
            slug,
        })
    }
}

/// Outcome of deleting a category.
///
/// Carries the products the store removed through the cascade so callers
/// can release the images those products referenced.
#[derive(Debug, Clone)]
pub struct CategoryRemoval {
    pub category: Category,
    pub cascaded_products: Vec<Product>,
}

impl CategoryRemoval {
    /// Image locators held by the cascaded products, in product order.
    pub fn released_images(&self) -> impl Iterator<Item = &super::ImageLocator> {
        self.cascaded_products
            .iter()
            .flat_map(|product| product.image_paths.iter())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_new_category_trims_name() {
        let new = NewCategory::from_name("  Wrist Watches ").unwrap();
        assert_eq!(new.name, "Wrist Watches");
        assert_eq!(new.slug.as_str(), "wrist-watches");
    }

    #[test]
    fn test_new_category_rejects_blank() {
        assert_eq!(NewCategory::from_name(" ").unwrap_err().field, "name");
    }
}
