//! HTTP and WebSocket handlers.

pub mod events;
pub mod health;
pub mod presence;
pub mod push_targets;
pub mod ws;
