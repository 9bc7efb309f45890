//! Append-only record of delivery attempts, queryable per event.

use chrono::{Duration as ChronoDuration, TimeDelta, Utc};
use dashmap::DashMap;

use herald_core::types::delivery::DeliveryAttempt;
use herald_core::types::id::EventId;

/// In-memory delivery log.
///
/// Attempts are only ever appended. Whole events are dropped by
/// [`DeliveryLog::cleanup`] once their newest attempt is older than the
/// retention period.
#[derive(Debug, Default)]
pub struct DeliveryLog {
    entries: DashMap<EventId, Vec<DeliveryAttempt>>,
}

impl DeliveryLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one attempt.
    pub fn record(&self, attempt: DeliveryAttempt) {
        self.entries.entry(attempt.event_id).or_default().push(attempt);
    }

    /// Append several attempts.
    pub fn record_all(&self, attempts: impl IntoIterator<Item = DeliveryAttempt>) {
        for attempt in attempts {
            self.record(attempt);
        }
    }

    /// All attempts of an event, in recording order.
    pub fn attempts_for(&self, event_id: EventId) -> Vec<DeliveryAttempt> {
        self.entries
            .get(&event_id)
            .map(|e| e.value().clone())
            .unwrap_or_default()
    }

    /// Attempts of an event addressed to one push token.
    pub fn attempts_for_token(&self, event_id: EventId, token: &str) -> Vec<DeliveryAttempt> {
        self.attempts_for(event_id)
            .into_iter()
            .filter(|a| a.target.as_ref().is_some_and(|t| t.token == token))
            .collect()
    }

    /// Number of events with at least one attempt.
    pub fn event_count(&self) -> usize {
        self.entries.len()
    }

    /// Drop events whose newest attempt is older than `retention_seconds`.
    /// Returns how many events were dropped. A retention too large to
    /// represent keeps everything.
    pub fn cleanup(&self, retention_seconds: u64) -> usize {
        let Some(cutoff) = i64::try_from(retention_seconds)
            .ok()
            .and_then(TimeDelta::try_seconds)
            .and_then(|retention| Utc::now().checked_sub_signed(retention))
        else {
            return 0;
        };
        let before = self.entries.len();
        self.entries.retain(|_, attempts| {
            attempts
                .iter()
                .map(|a| a.recorded_at)
                .max()
                .is_some_and(|newest| newest >= cutoff)
        });
        before - self.entries.len()
    }
}
