//! Reve Essence Storefront library.
//!
//! The public, read-only catalog API as a library so the router can be
//! exercised in tests.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod state;

pub use config::StorefrontConfig;
pub use error::AppError;
pub use state::AppState;
