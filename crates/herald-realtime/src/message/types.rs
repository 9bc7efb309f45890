//! Inbound and outbound socket message type definitions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use herald_core::events::EventKind;
use herald_core::traits::realtime::SocketNotification;
use herald_core::types::id::EventId;
use herald_core::types::presence::ActiveContext;

/// Messages sent by the client to the server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InboundMessage {
    /// The client opened a chat or post screen.
    SetActiveContext {
        /// The screen now in front.
        context: ActiveContext,
    },
    /// The client left the screen (or went to background).
    ClearActiveContext,
    /// Keep-alive.
    Ping {
        /// Echoed timestamp.
        timestamp: i64,
    },
}

/// Messages sent by the server to the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundMessage {
    /// Session established.
    Connected {
        /// Connection ID.
        connection_id: Uuid,
    },
    /// Notification delivery.
    Notification {
        /// Event being delivered.
        event_id: EventId,
        /// Event kind.
        kind: EventKind,
        /// Banner title.
        title: String,
        /// Banner body.
        body: String,
        /// Structured data.
        data: serde_json::Value,
        /// Timestamp.
        timestamp: DateTime<Utc>,
    },
    /// Reply to a ping.
    Pong {
        /// Echoed timestamp.
        timestamp: i64,
    },
    /// Error message.
    Error {
        /// Error code.
        code: String,
        /// Error message.
        message: String,
    },
}

impl From<&SocketNotification> for OutboundMessage {
    fn from(n: &SocketNotification) -> Self {
        Self::Notification {
            event_id: n.event_id,
            kind: n.kind,
            title: n.title.clone(),
            body: n.body.clone(),
            data: n.data.clone(),
            timestamp: n.timestamp,
        }
    }
}
