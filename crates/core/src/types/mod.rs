//! Core types for the Reve Essence catalog.
//!
//! This module provides type-safe wrappers for catalog domain concepts.

pub mod category;
pub mod id;
pub mod image;
pub mod labels;
pub mod price;
pub mod product;
pub mod session;
pub mod slug;

pub use category::{Category, CategoryRemoval, NewCategory};
pub use id::*;
pub use image::{ImageLocator, PRODUCT_IMAGE_PREFIX, StorageKey};
pub use labels::LabelSet;
pub use price::Price;
pub use product::{
    CategorySection, Product, ProductDraft, ProductFields, ProductListing, group_by_category,
};
pub use session::AdminSession;
pub use slug::Slug;
