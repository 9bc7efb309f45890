//! Real-time channel trait: live socket sessions.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::events::EventKind;
use crate::types::id::{EventId, UserId};

/// Payload emitted to a recipient's live sessions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SocketNotification {
    /// Event being delivered.
    pub event_id: EventId,
    /// Event kind.
    pub kind: EventKind,
    /// Banner title.
    pub title: String,
    /// Banner body.
    pub body: String,
    /// Structured data (entity ids, sender, avatar).
    pub data: serde_json::Value,
    /// When the interaction happened.
    pub timestamp: DateTime<Utc>,
}

/// Live socket sessions, addressed per user.
#[async_trait]
pub trait RealtimeChannel: Send + Sync + std::fmt::Debug + 'static {
    /// Emit to every live session of `user_id`. Returns the number of
    /// sessions that accepted the payload; zero when not connected.
    async fn emit_to_user(&self, user_id: UserId, notification: &SocketNotification) -> usize;

    /// Whether the user holds at least one live session.
    fn is_user_connected(&self, user_id: UserId) -> bool;
}
