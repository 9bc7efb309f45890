//! Core traits defined in `herald-core` and implemented by other crates or
//! by the host application.

pub mod cache;
pub mod directory;
pub mod presence;
pub mod push;
pub mod realtime;

pub use cache::CacheProvider;
pub use directory::{EntityDirectory, PushTargetStore};
pub use presence::PresenceStore;
pub use push::PushProvider;
pub use realtime::{RealtimeChannel, SocketNotification};
