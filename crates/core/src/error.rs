//! Catalog error taxonomy.
//!
//! Every repository, gateway and synchronizer operation returns either a
//! success value or a [`CatalogError`]. None of them retry internally; the
//! caller decides what to do with a failure.

use core::fmt;

use thiserror::Error;

/// A client-supplied value violated a precondition.
///
/// Names the first failing field so the caller can point the user at it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    /// Name of the offending field (e.g. `"price"`).
    pub field: &'static str,
    /// Human-readable description of the problem.
    pub message: String,
}

impl ValidationError {
    /// Create a validation error for `field`.
    #[must_use]
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }

    /// Shorthand for a required field that was empty after trimming.
    #[must_use]
    pub fn required(field: &'static str) -> Self {
        Self::new(field, "is required")
    }
}

/// Kind of record an operation targeted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    Category,
    Product,
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Category => f.write_str("category"),
            Self::Product => f.write_str("product"),
        }
    }
}

/// Errors surfaced by the catalog core.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Client data violated a precondition; the user must correct the input.
    #[error("invalid input: {0}")]
    Validation(#[from] ValidationError),

    /// Uniqueness violation (e.g. duplicate category slug).
    #[error("conflict: {0}")]
    Conflict(String),

    /// The targeted identifier does not exist; cached state is stale.
    #[error("{entity} {id} not found")]
    NotFound {
        /// Kind of record that was missing.
        entity: Entity,
        /// Identifier the caller asked for.
        id: String,
    },

    /// Transport or storage failure while uploading an image.
    #[error("upload failed: {0}")]
    Upload(String),

    /// Transport or backing-store failure.
    #[error("storage error: {0}")]
    Storage(String),
}

impl CatalogError {
    /// Build a `NotFound` error for the given entity and id.
    #[must_use]
    pub fn not_found(entity: Entity, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Returns true if the caller should re-fetch before retrying.
    #[must_use]
    pub const fn is_stale_state(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Returns true if the error was caused by client input.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::Validation(_) | Self::Conflict(_) | Self::NotFound { .. }
        )
    }
}

/// Result alias used throughout the catalog.
pub type CatalogResult<T> = Result<T, CatalogError>;
