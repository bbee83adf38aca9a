//! Reve Essence Core - Shared catalog types and store traits.
//!
//! This crate provides the types used across all Reve Essence components:
//! - `catalog` - Repositories, asset gateway, change notifier, synchronizer
//! - `storefront` - Public browsing view
//! - `admin` - Catalog administration (reads and writes)
//! - `cli` - Command-line tools for migrations and maintenance
//!
//! # Architecture
//!
//! The core crate contains only types and traits - no I/O, no database access,
//! no HTTP clients. Backends implement the [`store`] traits elsewhere.
//!
//! # Modules
//!
//! - [`types`] - IDs, slugs, prices, label sets, image locators, records
//! - [`error`] - The catalog error taxonomy
//! - [`store`] - Relational store and object store interfaces

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod error;
pub mod store;
pub mod types;

pub use error::{CatalogError, CatalogResult, Entity, ValidationError};
pub use store::{CategoryStore, ObjectStore, ObjectStoreError, ProductStore};
pub use types::*;
