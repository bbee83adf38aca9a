//! Reve Essence Admin library.
//!
//! The catalog administration API as a library, so the router can be
//! exercised in tests without binding a socket.
//!
//! # Security
//!
//! Every `/api` route requires the admin bearer token. The binary binds to
//! loopback by default; expose it only behind a trusted network boundary.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod state;

pub use config::AdminConfig;
pub use error::AppError;
pub use state::AppState;
