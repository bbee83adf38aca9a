//! Category API handlers.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::get,
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use reve_essence_core::{Category, CategoryId};

use crate::{error::AppError, middleware::RequireAdmin, state::AppState};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/categories", get(list).post(create))
        .route("/api/categories/{id}", axum::routing::delete(delete))
        .route("/api/categories/{id}/impact", get(impact))
}

/// Request body for creating a category.
#[derive(Debug, Deserialize)]
pub struct CreateCategoryRequest {
    pub name: String,
}

/// What deleting a category would remove.
#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteImpact {
    pub category_id: CategoryId,
    pub product_count: u64,
}

/// Result of deleting a category.
#[derive(Debug, Serialize, Deserialize)]
pub struct CategoryDeleted {
    pub category: Category,
    /// Products removed along with the category.
    pub removed_products: usize,
}

/// List categories, sorted by name.
///
/// # Errors
///
/// Returns an error if the catalog cannot be read.
pub async fn list(
    RequireAdmin(_session): RequireAdmin,
    State(state): State<AppState>,
) -> Result<Json<Vec<Category>>, AppError> {
    let categories = state.synchronizer().categories().await?;
    Ok(Json(categories.to_vec()))
}

/// Create a category.
///
/// # Errors
///
/// Returns 422 for a blank name and 409 if the derived slug is taken.
#[instrument(skip(session, state), fields(admin = session.subject()))]
pub async fn create(
    RequireAdmin(session): RequireAdmin,
    State(state): State<AppState>,
    Json(body): Json<CreateCategoryRequest>,
) -> Result<(StatusCode, Json<Category>), AppError> {
    let category = state
        .synchronizer()
        .create_category(&session, &body.name)
        .await?;
    Ok((StatusCode::CREATED, Json(category)))
}

/// Number of products that deleting the category would remove, for the
/// confirmation prompt.
///
/// # Errors
///
/// Returns 404 if the category does not exist.
pub async fn impact(
    RequireAdmin(session): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<CategoryId>,
) -> Result<Json<DeleteImpact>, AppError> {
    let product_count = state
        .synchronizer()
        .preview_category_delete(&session, id)
        .await?;
    Ok(Json(DeleteImpact {
        category_id: id,
        product_count,
    }))
}

/// Delete a category and every product in it.
///
/// # Errors
///
/// Returns 404 if the category does not exist.
#[instrument(skip(session, state), fields(admin = session.subject()))]
pub async fn delete(
    RequireAdmin(session): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<CategoryId>,
) -> Result<Json<CategoryDeleted>, AppError> {
    let removal = state.synchronizer().delete_category(&session, id).await?;
    Ok(Json(CategoryDeleted {
        removed_products: removal.cascaded_products.len(),
        category: removal.category,
    }))
}
