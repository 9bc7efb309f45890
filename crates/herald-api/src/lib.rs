//! # herald-api
//!
//! HTTP API layer for Herald built on Axum.
//!
//! Exposes event intake for controllers, push-target registration, a
//! presence endpoint for clients without a socket, the `/ws` upgrade, and
//! the `AppError` → HTTP mapping.

pub mod dto;
pub mod error;
pub mod handlers;
pub mod router;
pub mod state;

pub use router::build_router;
pub use state::AppState;
