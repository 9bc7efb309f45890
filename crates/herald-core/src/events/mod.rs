//! Notification events emitted by social interactions.
//!
//! An event is created by a controller right after the interaction (like,
//! comment, follow, message) has been persisted. It is immutable and is
//! consumed once by the notification pipeline.

pub mod subject;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::id::{ChatId, EventId, PostId, UserId};

pub use subject::EventSubject;

/// Kind of social interaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// A post was liked.
    Like,
    /// A post received a comment.
    Comment,
    /// A user was followed.
    Follow,
    /// A chat message was sent.
    Message,
}

impl EventKind {
    /// Converts to string.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Like => "like",
            Self::Comment => "comment",
            Self::Follow => "follow",
            Self::Message => "message",
        }
    }
}

/// The user who performed the interaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    /// User ID.
    pub id: UserId,
    /// Display name shown in the notification.
    pub name: String,
    /// Avatar URL.
    #[serde(default)]
    pub avatar: Option<String>,
}

impl Actor {
    /// Create an actor without an avatar.
    pub fn new(id: UserId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            avatar: None,
        }
    }

    /// Set the avatar URL.
    pub fn with_avatar(mut self, avatar: impl Into<String>) -> Self {
        self.avatar = Some(avatar.into());
        self
    }
}

/// Content snippet carried by the event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventPayload {
    /// Text snippet (comment body, message text).
    #[serde(default)]
    pub text: Option<String>,
    /// Whether the content includes an image.
    #[serde(default)]
    pub has_image: bool,
}

impl EventPayload {
    /// Payload with a text snippet.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            has_image: false,
        }
    }

    /// Payload carrying only an image.
    pub fn image() -> Self {
        Self {
            text: None,
            has_image: true,
        }
    }
}

/// A social-interaction event to fan out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationEvent {
    /// Unique event ID.
    #[serde(default)]
    pub id: EventId,
    /// Who performed the interaction.
    pub actor: Actor,
    /// What the interaction was about.
    pub subject: EventSubject,
    /// Content snippet.
    #[serde(default)]
    pub payload: EventPayload,
    /// When the interaction happened.
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl NotificationEvent {
    /// Create a new event.
    pub fn new(actor: Actor, subject: EventSubject, payload: EventPayload) -> Self {
        Self {
            id: EventId::new(),
            actor,
            subject,
            payload,
            created_at: Utc::now(),
        }
    }

    /// A like on a post.
    pub fn like(actor: Actor, post_id: PostId, owner: Option<UserId>) -> Self {
        Self::new(
            actor,
            EventSubject::Like { post_id, owner },
            EventPayload::default(),
        )
    }

    /// A comment on a post.
    pub fn comment(
        actor: Actor,
        post_id: PostId,
        owner: Option<UserId>,
        payload: EventPayload,
    ) -> Self {
        Self::new(actor, EventSubject::Comment { post_id, owner }, payload)
    }

    /// A follow.
    pub fn follow(actor: Actor, followee: UserId) -> Self {
        Self::new(
            actor,
            EventSubject::Follow { followee },
            EventPayload::default(),
        )
    }

    /// A chat message. `participants` may be empty to have them looked up.
    pub fn message(
        actor: Actor,
        chat_id: ChatId,
        participants: Vec<UserId>,
        is_group: bool,
        payload: EventPayload,
    ) -> Self {
        Self::new(
            actor,
            EventSubject::Message {
                chat_id,
                participants,
                is_group,
            },
            payload,
        )
    }

    /// The event kind.
    pub fn kind(&self) -> EventKind {
        self.subject.kind()
    }

    /// The acting user.
    pub fn actor_id(&self) -> UserId {
        self.actor.id
    }
}
