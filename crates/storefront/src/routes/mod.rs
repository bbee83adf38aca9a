//! HTTP route handlers for the storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET /health                - Liveness
//! GET /health/ready          - Readiness (database reachable)
//!
//! GET /api/catalog           - Products grouped by category
//! GET /api/catalog/{slug}    - One category's section
//! GET /api/categories        - Categories, by name
//! GET /api/products          - Products with their category, newest first
//! GET /api/products/{id}     - One product with its category
//! GET /api/changes           - Server-sent change notifications
//!
//! GET /{bucket}/*            - Product images (local asset backend only)
//! ```

pub mod catalog;
pub mod changes;
pub mod health;

use axum::Router;

use crate::state::AppState;

/// Build the storefront router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .merge(catalog::router())
        .merge(changes::router())
}
