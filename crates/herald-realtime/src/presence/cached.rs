//! Cache-backed presence store, shared by every instance using the same cache.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use herald_cache::keys;
use herald_core::result::AppResult;
use herald_core::traits::cache::CacheProvider;
use herald_core::traits::presence::PresenceStore;
use herald_core::types::id::UserId;
use herald_core::types::presence::ActiveContext;

/// Presence entries stored as JSON under `herald:presence:{user}`.
///
/// Entries expire after `ttl` so a client that vanished without clearing
/// its context stops suppressing notifications eventually.
#[derive(Debug)]
pub struct CachedPresenceStore<C: CacheProvider> {
    cache: Arc<C>,
    ttl: Duration,
}

impl<C: CacheProvider> CachedPresenceStore<C> {
    /// Create a store over `cache` with the given entry lifetime.
    pub fn new(cache: Arc<C>, ttl_seconds: u64) -> Self {
        Self {
            cache,
            ttl: Duration::from_secs(ttl_seconds.max(1)),
        }
    }
}

#[async_trait]
impl<C: CacheProvider> PresenceStore for CachedPresenceStore<C> {
    async fn get(&self, user_id: UserId) -> AppResult<Option<ActiveContext>> {
        self.cache
            .get_json::<ActiveContext>(&keys::presence_context(user_id))
            .await
    }

    async fn set(&self, user_id: UserId, context: Option<ActiveContext>) -> AppResult<()> {
        let key = keys::presence_context(user_id);
        match context {
            Some(ctx) => self.cache.set_json(&key, &ctx, self.ttl).await,
            None => self.cache.delete(&key).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use herald_cache::CacheManager;
    use herald_core::config::CacheConfig;
    use herald_core::types::id::ChatId;

    #[tokio::test]
    async fn test_roundtrip_through_cache() {
        let cache = Arc::new(CacheManager::new(&CacheConfig::default()).await.unwrap());
        let store = CachedPresenceStore::new(cache.clone(), 60);
        let user = UserId::new();
        let chat = ChatId::new();

        store.set(user, Some(ActiveContext::Chat(chat))).await.unwrap();
        assert_eq!(store.get(user).await.unwrap(), Some(ActiveContext::Chat(chat)));
        assert!(cache.exists(&keys::presence_context(user)).await.unwrap());

        store.set(user, None).await.unwrap();
        assert_eq!(store.get(user).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_corrupt_entry_is_an_error() {
        let cache = Arc::new(CacheManager::new(&CacheConfig::default()).await.unwrap());
        let store = CachedPresenceStore::new(cache.clone(), 60);
        let user = UserId::new();
        cache
            .set_default(&keys::presence_context(user), "not json")
            .await
            .unwrap();
        assert!(store.get(user).await.is_err());
    }
}
