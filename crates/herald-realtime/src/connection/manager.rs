//! Connection manager: session lifecycle, inbound handling, and per-user emit.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use herald_core::config::RealtimeConfig;
use herald_core::traits::presence::PresenceStore;
use herald_core::traits::realtime::{RealtimeChannel, SocketNotification};
use herald_core::types::id::UserId;
use herald_core::types::presence::ActiveContext;

use crate::message::types::{InboundMessage, OutboundMessage};

use super::handle::{ConnectionHandle, ConnectionId};
use super::pool::ConnectionPool;

/// Manages all live socket sessions.
#[derive(Debug)]
pub struct ConnectionManager {
    /// Connection pool.
    pool: Arc<ConnectionPool>,
    /// Where reported screens are recorded.
    presence: Arc<dyn PresenceStore>,
    /// Configuration.
    config: RealtimeConfig,
}

impl ConnectionManager {
    /// Creates a new connection manager.
    pub fn new(config: RealtimeConfig, presence: Arc<dyn PresenceStore>) -> Self {
        Self {
            pool: Arc::new(ConnectionPool::new()),
            presence,
            config,
        }
    }

    /// Registers a new session for `user_id`.
    ///
    /// Returns the connection handle and a receiver for serialized outbound
    /// messages. When the user is at the session limit the oldest session is
    /// closed first.
    pub fn register(&self, user_id: UserId) -> (Arc<ConnectionHandle>, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(self.config.channel_buffer_size.max(1));
        let handle = Arc::new(ConnectionHandle::new(user_id, tx));

        let existing = self.pool.get_user_connections(&user_id);
        if existing.len() >= self.config.max_connections_per_user.max(1) {
            warn!(
                user_id = %user_id,
                count = existing.len(),
                max = self.config.max_connections_per_user,
                "User at max connections, oldest will be replaced"
            );
            if let Some(oldest) = existing.first() {
                oldest.mark_closed();
                self.pool.remove(&oldest.id);
            }
        }

        self.pool.add(handle.clone());

        let welcome = OutboundMessage::Connected {
            connection_id: handle.id,
        };
        if let Ok(json) = serde_json::to_string(&welcome) {
            handle.send(json);
        }

        info!(conn_id = %handle.id, user_id = %user_id, "Socket session registered");

        (handle, rx)
    }

    /// Unregisters a session. The user's active context is cleared once their
    /// last session is gone.
    pub async fn unregister(&self, conn_id: &ConnectionId) {
        let Some(handle) = self.pool.remove(conn_id) else {
            return;
        };
        handle.mark_closed();

        if self.pool.user_connection_count(&handle.user_id) == 0 {
            if let Err(e) = self.presence.set(handle.user_id, None).await {
                warn!(user_id = %handle.user_id, error = %e, "Failed to clear presence");
            }
        }

        info!(conn_id = %conn_id, user_id = %handle.user_id, "Socket session unregistered");
    }

    /// Processes an inbound message from a client.
    pub async fn handle_inbound(&self, conn_id: &ConnectionId, raw_message: &str) {
        let Some(handle) = self.pool.get(conn_id) else {
            warn!(conn_id = %conn_id, "Message from unknown connection");
            return;
        };

        handle.touch().await;

        let msg: InboundMessage = match serde_json::from_str(raw_message) {
            Ok(m) => m,
            Err(e) => {
                self.reply(
                    &handle,
                    &OutboundMessage::Error {
                        code: "INVALID_MESSAGE".to_string(),
                        message: format!("Failed to parse message: {e}"),
                    },
                );
                return;
            }
        };

        match msg {
            InboundMessage::SetActiveContext { context } => {
                self.update_presence(&handle, Some(context)).await;
            }
            InboundMessage::ClearActiveContext => {
                self.update_presence(&handle, None).await;
            }
            InboundMessage::Ping { timestamp } => {
                self.reply(&handle, &OutboundMessage::Pong { timestamp });
            }
        }
    }

    async fn update_presence(&self, handle: &ConnectionHandle, context: Option<ActiveContext>) {
        match self.presence.set(handle.user_id, context).await {
            Ok(()) => {
                debug!(user_id = %handle.user_id, context = ?context, "Active context updated");
            }
            Err(e) => {
                warn!(user_id = %handle.user_id, error = %e, "Failed to update presence");
                self.reply(
                    handle,
                    &OutboundMessage::Error {
                        code: "PRESENCE_UNAVAILABLE".to_string(),
                        message: "Active context could not be recorded".to_string(),
                    },
                );
            }
        }
    }

    fn reply(&self, handle: &ConnectionHandle, message: &OutboundMessage) {
        match serde_json::to_string(message) {
            Ok(json) => {
                handle.send(json);
            }
            Err(e) => error!(error = %e, "Failed to serialize outbound message"),
        }
    }

    /// Sends a message to every session of a user. Returns how many
    /// sessions accepted it.
    pub fn send_to_user(&self, user_id: &UserId, message: &OutboundMessage) -> usize {
        let connections = self.pool.get_user_connections(user_id);
        if connections.is_empty() {
            return 0;
        }
        let msg = match serde_json::to_string(message) {
            Ok(m) => m,
            Err(e) => {
                error!(error = %e, "Failed to serialize outbound message");
                return 0;
            }
        };

        let mut delivered = 0;
        for conn in &connections {
            if conn.send(msg.clone()) {
                delivered += 1;
            } else {
                warn!(conn_id = %conn.id, "Failed to send to user connection");
            }
        }
        delivered
    }

    /// Closes all connections.
    pub fn close_all(&self) {
        let all = self.pool.all_connections();
        for conn in &all {
            conn.mark_closed();
            self.pool.remove(&conn.id);
        }
        info!(count = all.len(), "All connections closed");
    }

    /// Returns the total connection count.
    pub fn connection_count(&self) -> usize {
        self.pool.connection_count()
    }

    /// Returns the number of unique connected users.
    pub fn user_count(&self) -> usize {
        self.pool.user_count()
    }

    /// Returns a reference to the connection pool.
    pub fn pool(&self) -> &Arc<ConnectionPool> {
        &self.pool
    }
}

#[async_trait]
impl RealtimeChannel for ConnectionManager {
    async fn emit_to_user(&self, user_id: UserId, notification: &SocketNotification) -> usize {
        self.send_to_user(&user_id, &OutboundMessage::from(notification))
    }

    fn is_user_connected(&self, user_id: UserId) -> bool {
        self.pool.user_connection_count(&user_id) > 0
    }
}
