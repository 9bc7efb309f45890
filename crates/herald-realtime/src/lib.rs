//! # herald-realtime
//!
//! Real-time side of Herald. Provides:
//!
//! - Socket session management (multiple sessions per user)
//! - Per-user emit, used as the low-latency notification channel
//! - Presence: the in-app context each user reports as active, in a
//!   process-local or cache-backed store
//! - Inbound/outbound socket message types

pub mod connection;
pub mod message;
pub mod presence;
pub mod server;

pub use connection::manager::ConnectionManager;
pub use presence::cached::CachedPresenceStore;
pub use presence::tracker::PresenceTracker;
pub use server::RealtimeEngine;
