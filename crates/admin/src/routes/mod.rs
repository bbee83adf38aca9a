//! HTTP route handlers for admin.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                       - Liveness
//! GET    /health/ready                 - Readiness (database reachable)
//!
//! # Categories (bearer auth)
//! GET    /api/categories               - List categories
//! POST   /api/categories               - Create category
//! GET    /api/categories/{id}/impact   - Products a delete would remove
//! DELETE /api/categories/{id}          - Delete category (cascades)
//!
//! # Products (bearer auth)
//! GET    /api/products                 - List products with their category
//! GET    /api/products/{id}            - Single product
//! POST   /api/products                 - Create (multipart)
//! PUT    /api/products/{id}            - Replace (multipart)
//! DELETE /api/products/{id}            - Delete
//! ```

pub mod categories;
pub mod health;
pub mod products;

use axum::Router;

use crate::state::AppState;

/// Build the admin router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .merge(categories::router())
        .merge(products::router())
}
