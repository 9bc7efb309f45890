//! Presence store trait.

use async_trait::async_trait;

use crate::result::AppResult;
use crate::types::id::UserId;
use crate::types::presence::ActiveContext;

/// Keyed store `user -> active context`, last write wins.
///
/// Staleness only weakens suppression (an extra push), never silences a
/// notification, so implementations need no cross-key coordination.
#[async_trait]
pub trait PresenceStore: Send + Sync + std::fmt::Debug + 'static {
    /// Current context of a user, if any.
    async fn get(&self, user_id: UserId) -> AppResult<Option<ActiveContext>>;

    /// Replace the context of a user. `None` clears it.
    async fn set(&self, user_id: UserId, context: Option<ActiveContext>) -> AppResult<()>;
}
