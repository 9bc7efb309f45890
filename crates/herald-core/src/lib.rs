//! # herald-core
//!
//! Core crate for Herald, the notification fan-out service. Contains the
//! configuration schemas, typed identifiers, the notification event model,
//! the collaborator traits (directory, push targets, push provider,
//! real-time channel, presence, cache), and the unified error system.
//!
//! This crate has **no** internal dependencies on other Herald crates.

pub mod config;
pub mod error;
pub mod events;
pub mod result;
pub mod traits;
pub mod types;

pub use error::AppError;
pub use result::AppResult;
