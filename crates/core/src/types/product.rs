//! Product records, drafts, and the grouped read model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use super::{Category, CategoryId, ImageLocator, LabelSet, Price, ProductId, Slug};
use crate::error::ValidationError;

/// A persisted product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: String,
    pub price: Price,
    pub category_id: CategoryId,
    pub material: String,
    pub sizes: LabelSet,
    pub colors: LabelSet,
    /// Ordered image locators; never empty for a persisted product.
    pub image_paths: Vec<ImageLocator>,
    pub created_at: DateTime<Utc>,
}

/// A product joined with its owning category's display fields.
///
/// This is the read model both viewers consume.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductListing {
    #[serde(flatten)]
    pub product: Product,
    pub category_name: String,
    pub category_slug: Slug,
}

/// Raw product fields as submitted by an admin.
///
/// `price` is kept as text because it arrives from a form; it is parsed
/// during validation. JSON clients may send it as a string or a number.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductDraft {
    pub name: String,
    pub description: String,
    #[serde(deserialize_with = "price_text")]
    pub price: String,
    pub category_id: Option<CategoryId>,
    pub material: String,
    #[serde(default)]
    pub sizes: LabelSet,
    #[serde(default)]
    pub colors: LabelSet,
    /// Retained image locators (existing images the admin kept).
    #[serde(default)]
    pub image_paths: Vec<ImageLocator>,
}

fn price_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum PriceInput {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(match PriceInput::deserialize(deserializer)? {
        PriceInput::Text(text) => text,
        PriceInput::Number(number) => number.to_string(),
    })
}

/// Validated mutable fields of a product, ready for a single store write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductFields {
    pub name: String,
    pub description: String,
    pub price: Price,
    pub category_id: CategoryId,
    pub material: String,
    pub sizes: LabelSet,
    pub colors: LabelSet,
    pub image_paths: Vec<ImageLocator>,
}

impl ProductDraft {
    /// Check every field-level precondition, in order: `name`,
    /// `description`, `material`, `price`, `category_id`, `image_paths`.
    ///
    /// Whether `category_id` references a live category needs a store round
    /// trip and is checked by the repository afterwards.
    ///
    /// # Errors
    ///
    /// Returns the first failing field as a `ValidationError`.
    pub fn validate(self) -> Result<ProductFields, ValidationError> {
        let name = required_text("name", &self.name)?;
        let description = required_text("description", &self.description)?;
        let material = required_text("material", &self.material)?;
        let price = Price::parse(&self.price)?;
        let category_id = self
            .category_id
            .ok_or_else(|| ValidationError::required("category_id"))?;

        if self.image_paths.is_empty() {
            return Err(ValidationError::new(
                "image_paths",
                "at least one image is required",
            ));
        }

        Ok(ProductFields {
            name,
            description,
            price,
            category_id,
            material,
            sizes: self.sizes,
            colors: self.colors,
            image_paths: self.image_paths,
        })
    }

    /// Check every field-level precondition except the image list.
    ///
    /// Used before uploading new images so an obviously invalid submission
    /// never reaches the asset store.
    ///
    /// # Errors
    ///
    /// Returns the first failing field as a `ValidationError`.
    pub fn precheck(&self, pending_images: usize) -> Result<(), ValidationError> {
        required_text("name", &self.name)?;
        required_text("description", &self.description)?;
        required_text("material", &self.material)?;
        Price::parse(&self.price)?;
        if self.category_id.is_none() {
            return Err(ValidationError::required("category_id"));
        }
        if self.image_paths.is_empty() && pending_images == 0 {
            return Err(ValidationError::new(
                "image_paths",
                "at least one image is required",
            ));
        }
        Ok(())
    }
}

impl From<&Product> for ProductDraft {
    fn from(product: &Product) -> Self {
        Self {
            name: product.name.clone(),
            description: product.description.clone(),
            price: product.price.to_string(),
            category_id: Some(product.category_id),
            material: product.material.clone(),
            sizes: product.sizes.clone(),
            colors: product.colors.clone(),
            image_paths: product.image_paths.clone(),
        }
    }
}

fn required_text(field: &'static str, value: &str) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::required(field));
    }
    Ok(trimmed.to_owned())
}

/// One category with the products that belong to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategorySection {
    pub category: Category,
    pub products: Vec<ProductListing>,
}

/// Group a product listing under its categories.
///
/// Sections follow the order of `categories`; within a section products
/// keep their listing order. Categories without products yield empty
/// sections, and products whose category is not in `categories` are
/// dropped (they belong to a category deleted since the listing was read).
#[must_use]
pub fn group_by_category(
    categories: &[Category],
    products: &[ProductListing],
) -> Vec<CategorySection> {
    categories
        .iter()
        .map(|category| CategorySection {
            category: category.clone(),
            products: products
                .iter()
                .filter(|listing| listing.product.category_id == category.id)
                .cloned()
                .collect(),
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn valid_draft() -> ProductDraft {
        ProductDraft {
            name: " Royal Oak ".to_owned(),
            description: "Gold watch".to_owned(),
            price: "125000".to_owned(),
            category_id: Some(CategoryId::generate()),
            material: "Gold".to_owned(),
            sizes: LabelSet::new(),
            colors: ["Gold"].into_iter().collect(),
            image_paths: vec![ImageLocator::new("http://cdn/product-images/products/a.png")],
        }
    }

    #[test]
    fn test_valid_draft_trims_text() {
        let fields = valid_draft().validate().unwrap();
        assert_eq!(fields.name, "Royal Oak");
        assert_eq!(fields.colors.as_slice(), ["Gold"]);
    }

    #[test]
    fn test_empty_images_always_rejected() {
        let draft = ProductDraft {
            image_paths: vec![],
            ..valid_draft()
        };
        assert_eq!(draft.validate().unwrap_err().field, "image_paths");
    }

    #[test]
    fn test_first_failing_field_reported() {
        let draft = ProductDraft {
            name: "  ".to_owned(),
            price: "-5".to_owned(),
            image_paths: vec![],
            ..valid_draft()
        };
        assert_eq!(draft.validate().unwrap_err().field, "name");

        let draft = ProductDraft {
            material: String::new(),
            price: "abc".to_owned(),
            ..valid_draft()
        };
        assert_eq!(draft.validate().unwrap_err().field, "material");

        let draft = ProductDraft {
            price: "abc".to_owned(),
            category_id: None,
            ..valid_draft()
        };
        assert_eq!(draft.validate().unwrap_err().field, "price");

        let draft = ProductDraft {
            category_id: None,
            ..valid_draft()
        };
        assert_eq!(draft.validate().unwrap_err().field, "category_id");
    }

    #[test]
    fn test_price_accepts_text_or_number() {
        let mut json = serde_json::to_value(valid_draft()).unwrap();
        json["price"] = serde_json::json!(125_000);
        let draft: ProductDraft = serde_json::from_value(json.clone()).unwrap();
        assert_eq!(draft.price, "125000");
        assert_eq!(draft.validate().unwrap().price.to_string(), "125000");

        json["price"] = serde_json::json!(-5);
        let draft: ProductDraft = serde_json::from_value(json.clone()).unwrap();
        assert_eq!(draft.validate().unwrap_err().field, "price");

        json["price"] = serde_json::json!("99.50");
        let draft: ProductDraft = serde_json::from_value(json.clone()).unwrap();
        assert_eq!(draft.price, "99.50");

        json["price"] = serde_json::json!(true);
        assert!(serde_json::from_value::<ProductDraft>(json).is_err());
    }

    #[test]
    fn test_precheck_counts_pending_images() {
        let draft = ProductDraft {
            image_paths: vec![],
            ..valid_draft()
        };
        assert_eq!(draft.precheck(0).unwrap_err().field, "image_paths");
        assert!(draft.precheck(1).is_ok());
    }

    #[test]
    fn test_group_by_category_keeps_order_and_empty_sections() {
        let now = Utc::now();
        let watches = Category {
            id: CategoryId::generate(),
            name: "Watches".to_owned(),
            slug: Slug::from_name("Watches").unwrap(),
            created_at: now,
        };
        let shoes = Category {
            id: CategoryId::generate(),
            name: "Shoes".to_owned(),
            slug: Slug::from_name("Shoes").unwrap(),
            created_at: now,
        };
        let fields = ProductDraft {
            category_id: Some(watches.id),
            ..valid_draft()
        }
        .validate()
        .unwrap();
        let listing = ProductListing {
            product: Product {
                id: ProductId::generate(),
                name: fields.name,
                description: fields.description,
                price: fields.price,
                category_id: fields.category_id,
                material: fields.material,
                sizes: fields.sizes,
                colors: fields.colors,
                image_paths: fields.image_paths,
                created_at: now,
            },
            category_name: watches.name.clone(),
            category_slug: watches.slug.clone(),
        };

        let sections = group_by_category(&[shoes.clone(), watches.clone()], &[listing]);
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].category, shoes);
        assert!(sections[0].products.is_empty());
        assert_eq!(sections[1].products.len(), 1);
    }

    #[test]
    fn test_draft_without_category_serializes_null() {
        let json = serde_json::to_value(ProductDraft::default()).unwrap();
        assert!(json.get("category_id").unwrap().is_null());
    }
}
