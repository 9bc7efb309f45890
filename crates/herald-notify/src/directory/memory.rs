//! In-memory directory backed by `DashMap`s.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;

use herald_core::error::AppError;
use herald_core::result::AppResult;
use herald_core::traits::directory::{EntityDirectory, PushTargetStore};
use herald_core::types::id::{ChatId, PostId, UserId};
use herald_core::types::preferences::NotificationPreferences;
use herald_core::types::push::PushTarget;

/// Posts, chats, blocks, preferences and push targets held in memory.
#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    /// Post → owner
    posts: DashMap<PostId, UserId>,
    /// Chat → participants
    chats: DashMap<ChatId, Vec<UserId>>,
    /// Blocker → blocked users
    blocks: DashMap<UserId, HashSet<UserId>>,
    /// User → preferences
    preferences: DashMap<UserId, NotificationPreferences>,
    /// User → registered targets
    targets: DashMap<UserId, Vec<PushTarget>>,
    /// When set, graph lookups fail (simulates a database outage).
    fail_lookups: AtomicBool,
}

impl InMemoryDirectory {
    /// Create an empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a post and its owner.
    pub fn add_post(&self, post_id: PostId, owner: UserId) {
        self.posts.insert(post_id, owner);
    }

    /// Register a chat and its participants.
    pub fn add_chat(&self, chat_id: ChatId, participants: Vec<UserId>) {
        self.chats.insert(chat_id, participants);
    }

    /// Record that `blocker` blocked `blocked`.
    pub fn block(&self, blocker: UserId, blocked: UserId) {
        self.blocks.entry(blocker).or_default().insert(blocked);
    }

    /// Replace a user's preferences.
    pub fn set_preferences(&self, user_id: UserId, prefs: NotificationPreferences) {
        self.preferences.insert(user_id, prefs);
    }

    /// Make every graph lookup fail, or stop doing so.
    pub fn fail_lookups(&self, fail: bool) {
        self.fail_lookups.store(fail, Ordering::SeqCst);
    }

    /// Append a target without token uniqueness checks, as a store with
    /// duplicate rows would return it.
    pub fn add_push_target_unchecked(&self, target: PushTarget) {
        self.targets.entry(target.user_id).or_default().push(target);
    }

    /// Total registered targets.
    pub fn target_count(&self) -> usize {
        self.targets.iter().map(|e| e.len()).sum()
    }

    fn check_available(&self) -> AppResult<()> {
        if self.fail_lookups.load(Ordering::SeqCst) {
            return Err(AppError::directory("directory unavailable"));
        }
        Ok(())
    }
}

#[async_trait]
impl EntityDirectory for InMemoryDirectory {
    async fn get_entity_owner(&self, post_id: PostId) -> AppResult<Option<UserId>> {
        self.check_available()?;
        Ok(self.posts.get(&post_id).map(|e| *e.value()))
    }

    async fn get_chat_participants(&self, chat_id: ChatId) -> AppResult<Vec<UserId>> {
        self.check_available()?;
        Ok(self
            .chats
            .get(&chat_id)
            .map(|e| e.value().clone())
            .unwrap_or_default())
    }

    async fn is_blocked(&self, a: UserId, b: UserId) -> AppResult<bool> {
        self.check_available()?;
        let blocks = |x: UserId, y: UserId| {
            self.blocks
                .get(&x)
                .is_some_and(|set| set.contains(&y))
        };
        Ok(blocks(a, b) || blocks(b, a))
    }

    async fn get_preferences(&self, user_id: UserId) -> AppResult<NotificationPreferences> {
        self.check_available()?;
        Ok(self
            .preferences
            .get(&user_id)
            .map(|e| e.value().clone())
            .unwrap_or_default())
    }
}

#[async_trait]
impl PushTargetStore for InMemoryDirectory {
    async fn get_push_targets(&self, user_id: UserId) -> AppResult<Vec<PushTarget>> {
        Ok(self
            .targets
            .get(&user_id)
            .map(|e| e.value().clone())
            .unwrap_or_default())
    }

    /// A token belongs to one user at a time: registering it moves it away
    /// from any previous owner.
    async fn upsert_push_target(&self, target: PushTarget) -> AppResult<()> {
        for mut entry in self.targets.iter_mut() {
            if *entry.key() != target.user_id {
                entry.value_mut().retain(|t| t.token != target.token);
            }
        }
        self.targets.retain(|_, list| !list.is_empty());

        let mut list = self.targets.entry(target.user_id).or_default();
        match list.iter_mut().find(|t| t.token == target.token) {
            Some(existing) => *existing = target,
            None => list.push(target),
        }
        Ok(())
    }

    async fn remove_push_target(&self, target: &PushTarget) -> AppResult<bool> {
        let Some(mut list) = self.targets.get_mut(&target.user_id) else {
            return Ok(false);
        };
        let before = list.len();
        list.retain(|t| t.token != target.token);
        Ok(list.len() < before)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use herald_core::types::push::Platform;

    #[tokio::test]
    async fn test_block_is_symmetric() {
        let dir = InMemoryDirectory::new();
        let (a, b) = (UserId::new(), UserId::new());
        dir.block(a, b);
        assert!(dir.is_blocked(a, b).await.unwrap());
        assert!(dir.is_blocked(b, a).await.unwrap());
        assert!(!dir.is_blocked(a, UserId::new()).await.unwrap());
    }

    #[tokio::test]
    async fn test_token_moves_between_users() {
        let dir = InMemoryDirectory::new();
        let (a, b) = (UserId::new(), UserId::new());
        dir.upsert_push_target(PushTarget::new(a, "tok", Platform::Android))
            .await
            .unwrap();
        dir.upsert_push_target(PushTarget::new(b, "tok", Platform::Android))
            .await
            .unwrap();
        assert!(dir.get_push_targets(a).await.unwrap().is_empty());
        assert_eq!(dir.get_push_targets(b).await.unwrap().len(), 1);
        assert_eq!(dir.target_count(), 1);
    }

    #[tokio::test]
    async fn test_remove_target() {
        let dir = InMemoryDirectory::new();
        let target = PushTarget::new(UserId::new(), "tok", Platform::Web);
        dir.upsert_push_target(target.clone()).await.unwrap();
        assert!(dir.remove_push_target(&target).await.unwrap());
        assert!(!dir.remove_push_target(&target).await.unwrap());
    }

    #[tokio::test]
    async fn test_failing_lookups() {
        let dir = InMemoryDirectory::new();
        dir.fail_lookups(true);
        let err = dir.get_entity_owner(PostId::new()).await.unwrap_err();
        assert_eq!(err.kind, herald_core::error::ErrorKind::Directory);
    }
}
