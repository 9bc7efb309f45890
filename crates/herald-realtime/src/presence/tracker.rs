//! Presence tracker: process-local `user -> active context` map.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;

use herald_core::result::AppResult;
use herald_core::traits::presence::PresenceStore;
use herald_core::types::id::UserId;
use herald_core::types::presence::ActiveContext;

/// Tracks the active context of every user served by this process.
#[derive(Debug, Default)]
pub struct PresenceTracker {
    /// User ID → (context, when it was reported)
    contexts: DashMap<UserId, (ActiveContext, DateTime<Utc>)>,
}

impl PresenceTracker {
    /// Create a new presence tracker
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace a user's context; `None` clears it.
    pub fn set_context(&self, user_id: UserId, context: Option<ActiveContext>) {
        match context {
            Some(ctx) => {
                self.contexts.insert(user_id, (ctx, Utc::now()));
            }
            None => {
                self.contexts.remove(&user_id);
            }
        }
    }

    /// A user's current context.
    pub fn context(&self, user_id: UserId) -> Option<ActiveContext> {
        self.contexts.get(&user_id).map(|r| r.value().0)
    }

    /// When the user's current context was reported.
    pub fn reported_at(&self, user_id: UserId) -> Option<DateTime<Utc>> {
        self.contexts.get(&user_id).map(|r| r.value().1)
    }

    /// Number of users with an active context.
    pub fn tracked_count(&self) -> usize {
        self.contexts.len()
    }
}

#[async_trait]
impl PresenceStore for PresenceTracker {
    async fn get(&self, user_id: UserId) -> AppResult<Option<ActiveContext>> {
        Ok(self.context(user_id))
    }

    async fn set(&self, user_id: UserId, context: Option<ActiveContext>) -> AppResult<()> {
        self.set_context(user_id, context);
        Ok(())
    }
}
