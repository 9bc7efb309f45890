//! Application state shared across all handlers.

use std::sync::Arc;

use herald_cache::CacheManager;
use herald_core::config::AppConfig;
use herald_notify::NotificationService;
use herald_realtime::RealtimeEngine;

/// Application state containing all shared dependencies.
///
/// Passed to every Axum handler via `State<AppState>`.
/// All fields are cheap to clone.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<AppConfig>,
    /// Cache manager (Redis or in-memory)
    pub cache: Arc<CacheManager>,
    /// Socket sessions and presence
    pub realtime: RealtimeEngine,
    /// Notification pipeline
    pub notifications: Arc<NotificationService>,
}
