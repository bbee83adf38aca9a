//! Product API handlers.
//!
//! Create and update take `multipart/form-data`:
//!
//! - `product` - JSON [`ProductDraft`]; `image_paths` lists the existing
//!   images to keep, in order
//! - `images` - zero or more files, uploaded in the order sent and appended
//!   after the kept images

use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::StatusCode,
    routing::get,
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use reve_essence_catalog::{ImageUpload, ProductSubmission};
use reve_essence_core::{Product, ProductDraft, ProductId, ProductListing};

use crate::{error::AppError, middleware::RequireAdmin, state::AppState};

/// Multipart part carrying the product fields.
pub const PRODUCT_PART: &str = "product";
/// Multipart part name for each new image.
pub const IMAGES_PART: &str = "images";
/// Largest accepted product submission.
pub const MAX_SUBMISSION_BYTES: usize = 50 * 1024 * 1024;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/products", get(list).post(create))
        .route("/api/products/{id}", get(show).put(update).delete(delete))
        .layer(DefaultBodyLimit::max(MAX_SUBMISSION_BYTES))
}

/// Result of deleting a product.
#[derive(Debug, Serialize, Deserialize)]
pub struct ProductDeleted {
    pub id: ProductId,
    /// Images the product referenced.
    pub released_images: usize,
}

/// Read a product submission from a multipart body.
///
/// Empty file parts (a file input left blank) are skipped.
///
/// # Errors
///
/// Returns `AppError::BadRequest` if the body is malformed, the `product`
/// part is missing, or it is not a valid draft.
pub async fn read_submission(mut multipart: Multipart) -> Result<ProductSubmission, AppError> {
    let mut draft: Option<ProductDraft> = None;
    let mut uploads = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.body_text()))?
    {
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some(PRODUCT_PART) => {
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(e.body_text()))?;
                let parsed = serde_json::from_slice(&bytes).map_err(|e| {
                    AppError::BadRequest(format!("invalid '{PRODUCT_PART}' part: {e}"))
                })?;
                draft = Some(parsed);
            }
            Some(IMAGES_PART) => {
                let file_name = field.file_name().unwrap_or_default().to_owned();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(e.body_text()))?;
                if bytes.is_empty() {
                    continue;
                }
                uploads.push(ImageUpload::new(file_name, bytes.to_vec()));
            }
            other => {
                tracing::debug!(part = ?other, "Ignoring unknown multipart part");
            }
        }
    }

    let draft = draft
        .ok_or_else(|| AppError::BadRequest(format!("missing '{PRODUCT_PART}' part")))?;
    Ok(ProductSubmission { draft, uploads })
}

/// List products with their category, newest first.
///
/// # Errors
///
/// Returns an error if the catalog cannot be read.
pub async fn list(
    RequireAdmin(_session): RequireAdmin,
    State(state): State<AppState>,
) -> Result<Json<Vec<ProductListing>>, AppError> {
    let products = state.synchronizer().products().await?;
    Ok(Json(products.to_vec()))
}

/// Fetch one product for the edit form.
///
/// # Errors
///
/// Returns 404 if the product does not exist.
pub async fn show(
    RequireAdmin(_session): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
) -> Result<Json<Product>, AppError> {
    Ok(Json(state.synchronizer().product(id).await?))
}

/// Create a product.
///
/// # Errors
///
/// Returns 400 for a malformed body, 422 for invalid fields, 502 if an image
/// upload fails.
#[instrument(skip(session, state, multipart), fields(admin = session.subject()))]
pub async fn create(
    RequireAdmin(session): RequireAdmin,
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<Product>), AppError> {
    let submission = read_submission(multipart).await?;
    let product = state
        .synchronizer()
        .create_product(&session, submission)
        .await?;
    Ok((StatusCode::CREATED, Json(product)))
}

/// Replace a product's fields and images.
///
/// # Errors
///
/// As [`create`], plus 404 if the product does not exist.
#[instrument(skip(session, state, multipart), fields(admin = session.subject()))]
pub async fn update(
    RequireAdmin(session): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
    multipart: Multipart,
) -> Result<Json<Product>, AppError> {
    let submission = read_submission(multipart).await?;
    let product = state
        .synchronizer()
        .update_product(&session, id, submission)
        .await?;
    Ok(Json(product))
}

/// Delete a product.
///
/// # Errors
///
/// Returns 404 if the product does not exist.
#[instrument(skip(session, state), fields(admin = session.subject()))]
pub async fn delete(
    RequireAdmin(session): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
) -> Result<Json<ProductDeleted>, AppError> {
    let product = state.synchronizer().delete_product(&session, id).await?;
    Ok(Json(ProductDeleted {
        id: product.id,
        released_images: product.image_paths.len(),
    }))
}
