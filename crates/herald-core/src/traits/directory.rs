//! Persistence collaborators: entity ownership, chat membership, blocks,
//! preferences, and push target registrations.
//!
//! These are implemented by the application's database layer. Herald only
//! reads through them, except for push target registration and pruning.

use async_trait::async_trait;

use crate::result::AppResult;
use crate::types::id::{ChatId, PostId, UserId};
use crate::types::preferences::NotificationPreferences;
use crate::types::push::PushTarget;

/// Read access to the social graph needed to resolve recipients.
#[async_trait]
pub trait EntityDirectory: Send + Sync + std::fmt::Debug + 'static {
    /// Owner of a post. `None` if the post no longer exists.
    async fn get_entity_owner(&self, post_id: PostId) -> AppResult<Option<UserId>>;

    /// All participants of a chat, sender included. Empty if the chat no
    /// longer exists.
    async fn get_chat_participants(&self, chat_id: ChatId) -> AppResult<Vec<UserId>>;

    /// Whether either user has blocked the other.
    async fn is_blocked(&self, a: UserId, b: UserId) -> AppResult<bool>;

    /// Notification preferences of a user.
    async fn get_preferences(&self, _user_id: UserId) -> AppResult<NotificationPreferences> {
        Ok(NotificationPreferences::default())
    }
}

/// Push target registrations.
#[async_trait]
pub trait PushTargetStore: Send + Sync + std::fmt::Debug + 'static {
    /// All active targets of a user.
    async fn get_push_targets(&self, user_id: UserId) -> AppResult<Vec<PushTarget>>;

    /// Register (or re-assign) a device token.
    async fn upsert_push_target(&self, target: PushTarget) -> AppResult<()>;

    /// Remove a target. Returns `true` if it was present.
    async fn remove_push_target(&self, target: &PushTarget) -> AppResult<bool>;
}
