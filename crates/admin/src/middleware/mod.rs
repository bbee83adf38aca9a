//! HTTP middleware for admin.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (capture errors, transactions)
//! 2. `TraceLayer` (request span with status and latency)
//! 3. Request ID (correlation header)
//! 4. [`RequireAdmin`] extractor on every `/api` handler

pub mod auth;
pub mod request_id;

pub use auth::{AdminAuthRejection, RequireAdmin, SessionProvider};
pub use request_id::{REQUEST_ID_HEADER, request_id_middleware};
