//! Catalog browsing handlers.
//!
//! Everything here is served from the cached catalog view, which the change
//! feed keeps current.

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::get,
};

use reve_essence_core::{
    CatalogError, Category, CategorySection, Entity, ProductId, ProductListing,
};

use crate::{error::Result, state::AppState};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/catalog", get(sections))
        .route("/api/catalog/{slug}", get(section))
        .route("/api/categories", get(categories))
        .route("/api/products", get(products))
        .route("/api/products/{id}", get(product))
}

/// Products grouped under their categories.
///
/// # Errors
///
/// Returns 500 if the catalog cannot be read.
pub async fn sections(State(state): State<AppState>) -> Result<Json<Vec<CategorySection>>> {
    Ok(Json(state.synchronizer().sections().await?))
}

/// A single category's section, looked up by slug.
///
/// # Errors
///
/// Returns 404 if no category has the slug.
pub async fn section(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<CategorySection>> {
    state
        .synchronizer()
        .sections()
        .await?
        .into_iter()
        .find(|section| section.category.slug.as_str() == slug)
        .map(Json)
        .ok_or_else(|| CatalogError::not_found(Entity::Category, slug).into())
}

/// Categories, sorted by name.
///
/// # Errors
///
/// Returns 500 if the catalog cannot be read.
pub async fn categories(State(state): State<AppState>) -> Result<Json<Vec<Category>>> {
    Ok(Json(state.synchronizer().categories().await?.to_vec()))
}

/// Products with their category, newest first.
///
/// # Errors
///
/// Returns 500 if the catalog cannot be read.
pub async fn products(State(state): State<AppState>) -> Result<Json<Vec<ProductListing>>> {
    Ok(Json(state.synchronizer().products().await?.to_vec()))
}

/// One product with its category.
///
/// # Errors
///
/// Returns 404 if the product is not in the catalog.
pub async fn product(
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
) -> Result<Json<ProductListing>> {
    state
        .synchronizer()
        .products()
        .await?
        .iter()
        .find(|listing| listing.product.id == id)
        .cloned()
        .map(Json)
        .ok_or_else(|| CatalogError::not_found(Entity::Product, id).into())
}
