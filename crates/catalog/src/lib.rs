//! Reve Essence Catalog - keeps the admin and storefront views of the
//! catalog consistent.
//!
//! # Components
//!
//! - [`repository`] - Category and product repositories (validation,
//!   not-found handling, change publication)
//! - [`assets`] - Asset store gateway and object store backends
//! - [`notifier`] - Coarse change fan-out, in process and across processes
//! - [`sync`] - Catalog synchronizer and its cached read model
//! - [`db`] - `PostgreSQL` relational store
//! - [`memory`] - In-memory stores for tests and local development
//! - [`config`] - Environment configuration
//!
//! # Write path
//!
//! ```text
//! admin ──▶ CatalogSynchronizer ──▶ AssetGateway (uploads, in order)
//!                  │
//!                  ├──▶ ProductRepository ──▶ store (single write)
//!                  │          └──▶ ChangeNotifier ──▶ every view
//!                  └──▶ local view invalidation (immediate)
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod assets;
pub mod config;
pub mod db;
pub mod memory;
pub mod notifier;
pub mod repository;
pub mod runtime;
pub mod sync;

pub use assets::{AssetGateway, SweepOptions, SweepReport};
pub use config::{CatalogConfig, ConfigError};
pub use db::{MIGRATOR, PgCatalogStore, RepositoryError, create_pool};
pub use notifier::{ChangeEvent, ChangeNotifier, PgChangeFeed};
pub use repository::{CategoryRepository, ProductRepository};
pub use runtime::CatalogRuntime;
pub use sync::{
    CatalogSynchronizer, CatalogView, ImageUpload, OrphanPolicy, ProductSubmission, SyncOptions,
};
