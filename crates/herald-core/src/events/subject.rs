//! What an event is about, per kind.

use serde::{Deserialize, Serialize};

use crate::types::id::{ChatId, PostId, UserId};
use crate::types::presence::ActiveContext;

use super::EventKind;

/// The interaction an event describes.
///
/// Each variant carries the entity its kind refers to, so a `Message` can
/// never point at a post. Owner/participant hints are optional: controllers
/// usually know them already; when absent they are fetched from the
/// directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventSubject {
    /// A post was liked.
    Like {
        /// The liked post.
        post_id: PostId,
        /// Post owner, if known.
        #[serde(default)]
        owner: Option<UserId>,
    },
    /// A post received a comment.
    Comment {
        /// The commented post.
        post_id: PostId,
        /// Post owner, if known.
        #[serde(default)]
        owner: Option<UserId>,
    },
    /// A user was followed.
    Follow {
        /// The followed user.
        followee: UserId,
    },
    /// A chat message was sent.
    Message {
        /// The chat.
        chat_id: ChatId,
        /// All chat participants (sender included), if known.
        #[serde(default)]
        participants: Vec<UserId>,
        /// Whether the chat is a group chat.
        #[serde(default)]
        is_group: bool,
    },
}

impl EventSubject {
    /// The event kind this subject belongs to.
    pub fn kind(&self) -> EventKind {
        match self {
            Self::Like { .. } => EventKind::Like,
            Self::Comment { .. } => EventKind::Comment,
            Self::Follow { .. } => EventKind::Follow,
            Self::Message { .. } => EventKind::Message,
        }
    }

    /// The screen context that shows this event's content, if any.
    /// A follow has no such screen.
    pub fn context(&self) -> Option<ActiveContext> {
        match self {
            Self::Like { post_id, .. } | Self::Comment { post_id, .. } => {
                Some(ActiveContext::Post(*post_id))
            }
            Self::Message { chat_id, .. } => Some(ActiveContext::Chat(*chat_id)),
            Self::Follow { .. } => None,
        }
    }

    /// The referenced post, for likes and comments.
    pub fn post_id(&self) -> Option<PostId> {
        match self {
            Self::Like { post_id, .. } | Self::Comment { post_id, .. } => Some(*post_id),
            _ => None,
        }
    }

    /// The referenced chat, for messages.
    pub fn chat_id(&self) -> Option<ChatId> {
        match self {
            Self::Message { chat_id, .. } => Some(*chat_id),
            _ => None,
        }
    }
}
