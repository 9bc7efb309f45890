//! Per-recipient channel decisions and delivery attempt records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::{AttemptId, EventId, UserId};
use super::push::PushTarget;

/// Delivery channel chosen for a recipient.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    /// Push notification through the provider.
    Push,
    /// Live socket emit. Push is still attempted alongside for other devices.
    Socket,
    /// Nothing is sent.
    Suppressed,
}

impl Channel {
    /// Converts to string.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Push => "push",
            Self::Socket => "socket",
            Self::Suppressed => "suppressed",
        }
    }
}

/// Why the selector picked a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionReason {
    /// The recipient has the referenced chat/post open right now.
    ViewingContext,
    /// The recipient muted this kind of notification.
    Muted,
    /// The recipient holds at least one live socket session.
    SocketConnected,
    /// No live session on record.
    Offline,
}

/// Channel decision for one recipient of one event. Recomputed per event,
/// never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipientDecision {
    /// The recipient.
    pub recipient_id: UserId,
    /// Chosen channel.
    pub channel: Channel,
    /// Why it was chosen.
    pub reason: DecisionReason,
}

/// State of a delivery attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum AttemptOutcome {
    /// Submitted, result not known yet.
    Pending,
    /// Accepted by the channel.
    Success,
    /// Rejected. `terminal` is set when no further attempt will follow.
    Failed {
        /// Error description.
        error: String,
        /// Whether this failure ends the attempt chain.
        terminal: bool,
    },
}

/// One delivery attempt through one channel to one recipient (and, for
/// push, one target).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryAttempt {
    /// Attempt record ID.
    pub id: AttemptId,
    /// The event being delivered.
    pub event_id: EventId,
    /// The recipient.
    pub recipient_id: UserId,
    /// Socket or Push.
    pub channel: Channel,
    /// Push target, for push attempts.
    pub target: Option<PushTarget>,
    /// 1-based attempt number within this target's chain.
    pub attempt_number: u32,
    /// Outcome.
    pub outcome: AttemptOutcome,
    /// When this record was produced.
    pub recorded_at: DateTime<Utc>,
}

impl DeliveryAttempt {
    /// Build a push attempt record.
    pub fn push(
        event_id: EventId,
        target: &PushTarget,
        attempt_number: u32,
        outcome: AttemptOutcome,
    ) -> Self {
        Self {
            id: AttemptId::new(),
            event_id,
            recipient_id: target.user_id,
            channel: Channel::Push,
            target: Some(target.clone()),
            attempt_number,
            outcome,
            recorded_at: Utc::now(),
        }
    }

    /// Build a socket attempt record. Socket delivery is never retried.
    pub fn socket(event_id: EventId, recipient_id: UserId, outcome: AttemptOutcome) -> Self {
        Self {
            id: AttemptId::new(),
            event_id,
            recipient_id,
            channel: Channel::Socket,
            target: None,
            attempt_number: 1,
            outcome,
            recorded_at: Utc::now(),
        }
    }

    /// Whether no further attempt will follow this one.
    pub fn is_terminal(&self) -> bool {
        match &self.outcome {
            AttemptOutcome::Pending => false,
            AttemptOutcome::Success => true,
            AttemptOutcome::Failed { terminal, .. } => *terminal,
        }
    }

    /// Whether the attempt succeeded.
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, AttemptOutcome::Success)
    }
}
