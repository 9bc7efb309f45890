//! Deduplication of events delivered more than once by the caller.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use tokio::time::Instant;

use herald_core::types::id::EventId;

/// Event deduplicator: drops an event id seen within the window.
#[derive(Debug)]
pub struct EventDeduplicator {
    /// Window duration
    window: Duration,
    /// First seen time per event
    seen: Mutex<HashMap<EventId, Instant>>,
}

impl EventDeduplicator {
    /// Create a new deduplicator with the given window
    pub fn new(window_ms: u64) -> Self {
        Self {
            window: Duration::from_millis(window_ms),
            seen: Mutex::new(HashMap::new()),
        }
    }

    /// Check if an event should be dispatched or deduplicated.
    ///
    /// Returns `true` if the event should proceed, `false` if it's a duplicate.
    pub fn should_dispatch(&self, event_id: EventId) -> bool {
        let mut map = self.seen.lock().unwrap_or_else(|e| e.into_inner());
        let now = Instant::now();

        if let Some(first) = map.get(&event_id) {
            if now.duration_since(*first) < self.window {
                return false;
            }
        }

        map.insert(event_id, now);
        true
    }

    /// Forget entries older than the window.
    pub fn cleanup(&self) {
        let mut map = self.seen.lock().unwrap_or_else(|e| e.into_inner());
        let now = Instant::now();
        map.retain(|_, v| now.duration_since(*v) < self.window);
    }

    /// Number of remembered events.
    pub fn len(&self) -> usize {
        self.seen.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Whether no event is remembered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_duplicate_within_window_is_dropped() {
        let dedup = EventDeduplicator::new(1_000);
        let id = EventId::new();
        assert!(dedup.should_dispatch(id));
        assert!(!dedup.should_dispatch(id));
        assert!(dedup.should_dispatch(EventId::new()));

        tokio::time::advance(Duration::from_millis(1_001)).await;
        assert!(dedup.should_dispatch(id));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cleanup_drops_expired() {
        let dedup = EventDeduplicator::new(500);
        dedup.should_dispatch(EventId::new());
        tokio::time::advance(Duration::from_millis(600)).await;
        dedup.should_dispatch(EventId::new());
        dedup.cleanup();
        assert_eq!(dedup.len(), 1);
    }
}
