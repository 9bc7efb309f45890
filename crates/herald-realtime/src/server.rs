//! Top-level real-time engine tying sessions and presence together.

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::info;

use herald_core::config::RealtimeConfig;
use herald_core::traits::presence::PresenceStore;
use herald_core::traits::realtime::RealtimeChannel;

use crate::connection::manager::ConnectionManager;

/// Coordinates socket sessions and the presence store.
#[derive(Clone)]
pub struct RealtimeEngine {
    /// Connection manager.
    pub connections: Arc<ConnectionManager>,
    /// Presence store shared with the channel selector.
    pub presence: Arc<dyn PresenceStore>,
    /// Shutdown signal sender.
    shutdown_tx: broadcast::Sender<()>,
}

impl std::fmt::Debug for RealtimeEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RealtimeEngine")
            .field("connections", &self.connections.connection_count())
            .finish()
    }
}

impl RealtimeEngine {
    /// Creates a new real-time engine over the given presence store.
    pub fn new(config: RealtimeConfig, presence: Arc<dyn PresenceStore>) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        let connections = Arc::new(ConnectionManager::new(config, presence.clone()));

        info!("Real-time engine initialized");

        Self {
            connections,
            presence,
            shutdown_tx,
        }
    }

    /// The session manager as the notification socket channel.
    pub fn channel(&self) -> Arc<dyn RealtimeChannel> {
        self.connections.clone()
    }

    /// Returns a shutdown receiver; socket tasks exit when it fires.
    pub fn shutdown_receiver(&self) -> broadcast::Receiver<()> {
        self.shutdown_tx.subscribe()
    }

    /// Signals every socket task to stop and drops all sessions.
    pub fn shutdown(&self) {
        info!("Shutting down real-time engine");
        let _ = self.shutdown_tx.send(());
        self.connections.close_all();
        info!("Real-time engine shut down");
    }
}
