//! Unified error handling for admin.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use reve_essence_core::CatalogError;

/// Application-level error type for the admin API.
#[derive(Debug, Error)]
pub enum AppError {
    /// A catalog operation failed.
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    /// Caller did not present a valid admin token.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Malformed request (bad multipart body, unparsable JSON part).
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// JSON body returned for every error.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    /// Offending field for validation failures.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<&'static str>,
}

impl AppError {
    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Catalog(CatalogError::Validation(_)) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Catalog(CatalogError::Conflict(_)) => StatusCode::CONFLICT,
            Self::Catalog(CatalogError::NotFound { .. }) => StatusCode::NOT_FOUND,
            Self::Catalog(CatalogError::Upload(_)) => StatusCode::BAD_GATEWAY,
            Self::Catalog(CatalogError::Storage(_)) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }

    const fn is_server_error(&self) -> bool {
        matches!(
            self,
            Self::Catalog(CatalogError::Storage(_) | CatalogError::Upload(_)) | Self::Internal(_)
        )
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Log server errors with Sentry
        if self.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Admin request error"
            );
        }

        let status = self.status();

        // Don't expose internal error details to clients
        let body = match &self {
            Self::Catalog(CatalogError::Storage(_)) | Self::Internal(_) => ErrorBody {
                error: "Internal server error".to_string(),
                field: None,
            },
            Self::Catalog(CatalogError::Upload(_)) => ErrorBody {
                error: "Image upload failed, please retry".to_string(),
                field: None,
            },
            Self::Catalog(CatalogError::Validation(e)) => ErrorBody {
                error: self.to_string(),
                field: Some(e.field),
            },
            _ => ErrorBody {
                error: self.to_string(),
                field: None,
            },
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use reve_essence_core::{Entity, ValidationError};

    use super::*;

    fn get_status(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::BadRequest("missing product part".to_string());
        assert_eq!(err.to_string(), "Bad request: missing product part");

        let err = AppError::from(CatalogError::not_found(Entity::Product, "p-1"));
        assert_eq!(err.to_string(), "product p-1 not found");
    }

    #[test]
    fn test_catalog_error_status_codes() {
        assert_eq!(
            get_status(CatalogError::from(ValidationError::required("name")).into()),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            get_status(CatalogError::Conflict("slug taken".to_string()).into()),
            StatusCode::CONFLICT
        );
        assert_eq!(
            get_status(CatalogError::not_found(Entity::Category, "c-1").into()),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(CatalogError::Upload("timeout".to_string()).into()),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            get_status(CatalogError::Storage("pool closed".to_string()).into()),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_app_error_status_codes() {
        assert_eq!(
            get_status(AppError::Unauthorized("test".to_string())),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            get_status(AppError::BadRequest("test".to_string())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(AppError::Internal("test".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
