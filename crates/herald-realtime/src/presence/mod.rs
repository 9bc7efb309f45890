//! Presence: the in-app context each user currently has open.

pub mod cached;
pub mod tracker;

use std::sync::Arc;

use tracing::info;

use herald_cache::CacheManager;
use herald_core::config::NotifyConfig;
use herald_core::error::AppError;
use herald_core::result::AppResult;
use herald_core::traits::presence::PresenceStore;

pub use cached::CachedPresenceStore;
pub use tracker::PresenceTracker;

/// Build the presence store selected by `notify.presence_backend`.
///
/// `memory` keeps presence in this process; `cache` shares it across
/// instances through the configured cache provider.
pub fn build_presence_store(
    config: &NotifyConfig,
    cache: Arc<CacheManager>,
) -> AppResult<Arc<dyn PresenceStore>> {
    match config.presence_backend.as_str() {
        "memory" => {
            info!("Using in-process presence tracker");
            Ok(Arc::new(PresenceTracker::new()))
        }
        "cache" => {
            info!("Using cache-backed presence store");
            Ok(Arc::new(CachedPresenceStore::new(
                cache,
                config.presence_ttl_seconds,
            )))
        }
        other => Err(AppError::configuration(format!(
            "Unknown presence backend: '{other}'. Supported: memory, cache"
        ))),
    }
}
