//! Presence: which screen a user currently has open.

use serde::{Deserialize, Serialize};

use super::id::{ChatId, PostId};

/// The in-app context a client reports as active.
///
/// A user has at most one active context; a newer report replaces the older
/// one (last write wins).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum ActiveContext {
    /// A chat screen is open.
    Chat(ChatId),
    /// A post detail screen is open.
    Post(PostId),
}
