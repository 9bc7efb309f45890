//! Retry coordination for failed push deliveries.
//!
//! Every transient push failure produces a [`RetryTicket`]. The coordinator
//! runs one tracked task per ticket: wait a flat delay, resend to the single
//! token, record the attempt, repeat until the token accepts, turns out to be
//! dead, or the attempt budget is spent.
//!
//! Outstanding retries are grouped per token under a shared
//! [`CancellationToken`], so pruning a token stops all of its retries at
//! once, whichever events they belong to. Each retry also checks that the
//! token still belongs to its recipient before resending.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};
use uuid::Uuid;

use herald_core::config::NotifyConfig;
use herald_core::traits::directory::PushTargetStore;
use herald_core::traits::push::PushProvider;
use herald_core::types::delivery::{AttemptOutcome, DeliveryAttempt};
use herald_core::types::id::{EventId, UserId};
use herald_core::types::push::{PushMessage, PushTarget};

use crate::dispatcher::{SendFailure, classify};
use crate::log::DeliveryLog;

/// A pending retry of one push to one target.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetryTicket {
    /// Ticket ID.
    pub id: Uuid,
    /// Event being delivered.
    pub event_id: EventId,
    /// Recipient owning the target.
    pub recipient_id: UserId,
    /// The single target to resend to.
    pub target: PushTarget,
    /// Payload to resend.
    pub message: PushMessage,
    /// Number of the attempt that just failed. The next one is `+ 1`.
    pub attempt_number: u32,
    /// When the next attempt is due.
    pub next_attempt_at: DateTime<Utc>,
}

impl RetryTicket {
    /// Ticket following the failed attempt `attempt_number`.
    pub fn new(
        event_id: EventId,
        target: PushTarget,
        message: PushMessage,
        attempt_number: u32,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            event_id,
            recipient_id: target.user_id,
            target,
            message,
            attempt_number,
            next_attempt_at: Utc::now(),
        }
    }
}

/// Outstanding retries for one token.
#[derive(Debug)]
struct TokenRetries {
    cancel: CancellationToken,
    pending: HashMap<Uuid, PendingRetry>,
}

#[derive(Debug)]
struct PendingRetry {
    ticket: RetryTicket,
    cancel: CancellationToken,
}

#[derive(Debug)]
struct Inner {
    push: Arc<dyn PushProvider>,
    targets: Arc<dyn PushTargetStore>,
    log: Arc<DeliveryLog>,
    max_retries: u32,
    delay: Duration,
    by_token: DashMap<String, TokenRetries>,
}

/// Schedules, tracks, and cancels push retries.
#[derive(Debug, Clone)]
pub struct RetryCoordinator {
    inner: Arc<Inner>,
    tracker: TaskTracker,
}

impl RetryCoordinator {
    /// Create a coordinator recording into `log`.
    pub fn new(
        config: &NotifyConfig,
        push: Arc<dyn PushProvider>,
        targets: Arc<dyn PushTargetStore>,
        log: Arc<DeliveryLog>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                push,
                targets,
                log,
                max_retries: config.max_retries.max(1),
                delay: config.retry_delay(),
                by_token: DashMap::new(),
            }),
            tracker: TaskTracker::new(),
        }
    }

    /// Start retrying `ticket` in the background.
    ///
    /// A ticket whose attempt budget is already spent is dropped.
    pub fn schedule(&self, mut ticket: RetryTicket) {
        if ticket.attempt_number >= self.inner.max_retries {
            debug!(ticket = %ticket.id, "Retry budget already spent, not scheduling");
            return;
        }
        ticket.next_attempt_at = next_due(self.inner.delay);

        let cancel = {
            let mut entry = self
                .inner
                .by_token
                .entry(ticket.target.token.clone())
                .or_insert_with(|| TokenRetries {
                    cancel: CancellationToken::new(),
                    pending: HashMap::new(),
                });
            let cancel = entry.cancel.child_token();
            entry.pending.insert(
                ticket.id,
                PendingRetry {
                    ticket: ticket.clone(),
                    cancel: cancel.clone(),
                },
            );
            cancel
        };

        debug!(
            event_id = %ticket.event_id,
            token = %ticket.target.token,
            attempt = ticket.attempt_number + 1,
            "Push retry scheduled"
        );

        let inner = self.inner.clone();
        self.tracker.spawn(async move {
            inner.run(ticket, cancel).await;
        });
    }

    /// Remove a dead target from the store and cancel its outstanding
    /// retries. Store failures are logged; cancellation always happens.
    pub async fn prune(&self, target: &PushTarget) {
        self.inner.prune(target).await;
    }

    /// Cancel every outstanding retry for `token`. Returns how many were
    /// pending.
    pub fn cancel_token(&self, token: &str) -> usize {
        self.inner.cancel_token(token)
    }

    /// Cancel outstanding retries for `token` addressed to anyone but
    /// `owner`. Used when a device changes hands. Returns how many were
    /// cancelled.
    pub fn cancel_foreign(&self, token: &str, owner: UserId) -> usize {
        let Some(mut entry) = self.inner.by_token.get_mut(token) else {
            return 0;
        };
        let foreign: Vec<Uuid> = entry
            .pending
            .iter()
            .filter(|(_, p)| p.ticket.recipient_id != owner)
            .map(|(id, _)| *id)
            .collect();
        for id in &foreign {
            if let Some(pending) = entry.pending.remove(id) {
                pending.cancel.cancel();
            }
        }
        let empty = entry.pending.is_empty();
        drop(entry);
        if empty {
            self.inner.by_token.remove_if(token, |_, r| r.pending.is_empty());
        }
        foreign.len()
    }

    /// Cancel every outstanding retry.
    pub fn cancel_all(&self) {
        let tokens: Vec<String> = self
            .inner
            .by_token
            .iter()
            .map(|e| e.key().clone())
            .collect();
        for token in tokens {
            self.inner.cancel_token(&token);
        }
    }

    /// Outstanding tickets for a token.
    pub fn pending_for(&self, token: &str) -> Vec<RetryTicket> {
        self.inner
            .by_token
            .get(token)
            .map(|e| e.pending.values().map(|p| p.ticket.clone()).collect())
            .unwrap_or_default()
    }

    /// Number of outstanding tickets across all tokens.
    pub fn pending_count(&self) -> usize {
        self.inner.by_token.iter().map(|e| e.pending.len()).sum()
    }

    /// Wait until every retry task scheduled so far has finished.
    pub async fn settle(&self) {
        self.tracker.close();
        self.tracker.wait().await;
        self.tracker.reopen();
    }
}

impl Inner {
    async fn run(&self, mut ticket: RetryTicket, cancel: CancellationToken) {
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    debug!(
                        event_id = %ticket.event_id,
                        token = %ticket.target.token,
                        "Push retry cancelled"
                    );
                    break;
                }
                _ = tokio::time::sleep(self.delay) => {}
            }

            if !self.still_owned(&ticket).await {
                break;
            }

            let attempt_number = ticket.attempt_number + 1;
            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    debug!(
                        event_id = %ticket.event_id,
                        token = %ticket.target.token,
                        "Push retry cancelled mid-send"
                    );
                    break;
                }
                result = self.send_one(&ticket) => result,
            };

            match result {
                Ok(()) => {
                    self.record(&ticket, attempt_number, AttemptOutcome::Success);
                    debug!(
                        event_id = %ticket.event_id,
                        token = %ticket.target.token,
                        attempt = attempt_number,
                        "Push retry delivered"
                    );
                    break;
                }
                Err(failure @ SendFailure::Permanent(_)) => {
                    self.record(
                        &ticket,
                        attempt_number,
                        AttemptOutcome::Failed {
                            error: failure.to_string(),
                            terminal: true,
                        },
                    );
                    self.prune(&ticket.target).await;
                    break;
                }
                Err(failure @ SendFailure::Transient(_)) => {
                    let terminal = attempt_number >= self.max_retries;
                    self.record(
                        &ticket,
                        attempt_number,
                        AttemptOutcome::Failed {
                            error: failure.to_string(),
                            terminal,
                        },
                    );
                    if terminal {
                        warn!(
                            event_id = %ticket.event_id,
                            recipient = %ticket.recipient_id,
                            token = %ticket.target.token,
                            attempts = attempt_number,
                            error = %failure,
                            "Push delivery failed, retries exhausted"
                        );
                        break;
                    }
                    ticket.attempt_number = attempt_number;
                    ticket.next_attempt_at = next_due(self.delay);
                    if let Some(mut entry) = self.by_token.get_mut(&ticket.target.token) {
                        if let Some(pending) = entry.pending.get_mut(&ticket.id) {
                            pending.ticket = ticket.clone();
                        }
                    }
                }
            }
        }

        self.finish(&ticket);
    }

    /// Whether the ticket's token is still registered to its recipient.
    /// A lookup failure counts as no: resending to a device of unknown
    /// ownership could reach the wrong user.
    async fn still_owned(&self, ticket: &RetryTicket) -> bool {
        match self.targets.get_push_targets(ticket.recipient_id).await {
            Ok(targets) if targets.iter().any(|t| t.token == ticket.target.token) => true,
            Ok(_) => {
                debug!(
                    event_id = %ticket.event_id,
                    recipient = %ticket.recipient_id,
                    token = %ticket.target.token,
                    "Token no longer registered to recipient, dropping retry"
                );
                false
            }
            Err(e) => {
                warn!(
                    event_id = %ticket.event_id,
                    token = %ticket.target.token,
                    error = %e,
                    "Cannot confirm token owner, dropping retry"
                );
                false
            }
        }
    }

    async fn send_one(&self, ticket: &RetryTicket) -> Result<(), SendFailure> {
        let token = ticket.target.token.clone();
        match self
            .push
            .multicast_send(std::slice::from_ref(&token), &ticket.message)
            .await
        {
            Ok(response) => classify(response.result_for(&token)),
            Err(e) => Err(SendFailure::Transient(e.to_string())),
        }
    }

    fn record(&self, ticket: &RetryTicket, attempt_number: u32, outcome: AttemptOutcome) {
        self.log.record(DeliveryAttempt::push(
            ticket.event_id,
            &ticket.target,
            attempt_number,
            outcome,
        ));
    }

    async fn prune(&self, target: &PushTarget) {
        match self.targets.remove_push_target(target).await {
            Ok(removed) => info!(
                user_id = %target.user_id,
                token = %target.token,
                removed,
                "Pruned dead push target"
            ),
            Err(e) => warn!(
                user_id = %target.user_id,
                token = %target.token,
                error = %e,
                "Failed to remove dead push target"
            ),
        }
        let cancelled = self.cancel_token(&target.token);
        if cancelled > 0 {
            debug!(token = %target.token, cancelled, "Cancelled retries of pruned target");
        }
    }

    fn cancel_token(&self, token: &str) -> usize {
        match self.by_token.remove(token) {
            Some((_, retries)) => {
                retries.cancel.cancel();
                retries.pending.len()
            }
            None => 0,
        }
    }

    fn finish(&self, ticket: &RetryTicket) {
        self.by_token
            .remove_if_mut(&ticket.target.token, |_, retries| {
                retries.pending.remove(&ticket.id);
                retries.pending.is_empty()
            });
    }
}

fn next_due(delay: Duration) -> DateTime<Utc> {
    let now = Utc::now();
    chrono::Duration::from_std(delay)
        .ok()
        .and_then(|d| now.checked_add_signed(d))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use herald_core::result::AppResult;
    use herald_core::types::push::{MulticastResponse, Platform, PushErrorCode, SendResponse};

    use crate::directory::memory::InMemoryDirectory;

    /// Replies from a script, then succeeds.
    #[derive(Debug, Default)]
    struct ScriptedPush {
        script: Mutex<VecDeque<Result<String, PushErrorCode>>>,
        calls: Mutex<u32>,
    }

    impl ScriptedPush {
        fn new(script: Vec<Result<String, PushErrorCode>>) -> Self {
            Self {
                script: Mutex::new(script.into()),
                calls: Mutex::new(0),
            }
        }

        fn calls(&self) -> u32 {
            *self.calls.lock().unwrap()
        }
    }

    #[async_trait]
    impl PushProvider for ScriptedPush {
        fn provider_type(&self) -> &str {
            "scripted"
        }

        async fn multicast_send(
            &self,
            tokens: &[String],
            _message: &PushMessage,
        ) -> AppResult<MulticastResponse> {
            *self.calls.lock().unwrap() += 1;
            let next = self
                .script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok("ok".to_string()));
            Ok(MulticastResponse::from_responses(
                tokens
                    .iter()
                    .map(|t| SendResponse {
                        token: t.clone(),
                        result: next.clone(),
                    })
                    .collect(),
            ))
        }
    }

    fn setup(
        script: Vec<Result<String, PushErrorCode>>,
    ) -> (RetryCoordinator, Arc<ScriptedPush>, Arc<InMemoryDirectory>, Arc<DeliveryLog>) {
        let push = Arc::new(ScriptedPush::new(script));
        let dir = Arc::new(InMemoryDirectory::new());
        let log = Arc::new(DeliveryLog::new());
        let coordinator =
            RetryCoordinator::new(&NotifyConfig::default(), push.clone(), dir.clone(), log.clone());
        (coordinator, push, dir, log)
    }

    fn ticket(token: &str) -> RetryTicket {
        let target = PushTarget::new(UserId::new(), token, Platform::Android);
        let message = PushMessage {
            title: "t".to_string(),
            body: "b".to_string(),
            data: HashMap::new(),
        };
        RetryTicket::new(EventId::new(), target, message, 1)
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_succeeds_on_second_attempt() {
        let (coordinator, push, dir, log) = setup(vec![]);
        let t = ticket("tok");
        dir.upsert_push_target(t.target.clone()).await.unwrap();
        coordinator.schedule(t.clone());
        assert_eq!(coordinator.pending_for("tok").len(), 1);

        coordinator.settle().await;
        let attempts = log.attempts_for(t.event_id);
        assert_eq!(attempts.len(), 1);
        assert_eq!(attempts[0].attempt_number, 2);
        assert!(attempts[0].is_success());
        assert_eq!(push.calls(), 1);
        assert_eq!(coordinator.pending_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_stop_at_budget() {
        let (coordinator, push, dir, log) = setup(vec![
            Err(PushErrorCode::Unavailable),
            Err(PushErrorCode::Unavailable),
            Err(PushErrorCode::Unavailable),
        ]);
        let t = ticket("tok");
        dir.upsert_push_target(t.target.clone()).await.unwrap();
        coordinator.schedule(t.clone());
        coordinator.settle().await;

        let attempts = log.attempts_for(t.event_id);
        assert_eq!(
            attempts.iter().map(|a| a.attempt_number).collect::<Vec<_>>(),
            vec![2, 3]
        );
        assert!(!attempts[0].is_terminal());
        assert!(attempts[1].is_terminal());
        assert_eq!(push.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_permanent_failure_prunes_target() {
        let (coordinator, _, dir, log) = setup(vec![Err(PushErrorCode::Unregistered)]);
        let t = ticket("dead");
        dir.upsert_push_target(t.target.clone()).await.unwrap();
        coordinator.schedule(t.clone());
        coordinator.settle().await;

        assert!(dir.get_push_targets(t.recipient_id).await.unwrap().is_empty());
        let attempts = log.attempts_for(t.event_id);
        assert_eq!(attempts.len(), 1);
        assert!(attempts[0].is_terminal());
    }

    #[tokio::test(start_paused = true)]
    async fn test_prune_cancels_pending_without_recording() {
        let (coordinator, push, _, log) = setup(vec![]);
        let first = ticket("tok");
        let mut second = ticket("tok");
        second.target = first.target.clone();
        coordinator.schedule(first.clone());
        coordinator.schedule(second.clone());
        assert_eq!(coordinator.pending_for("tok").len(), 2);

        coordinator.prune(&first.target).await;
        assert!(coordinator.pending_for("tok").is_empty());
        coordinator.settle().await;

        assert_eq!(push.calls(), 0);
        assert!(log.attempts_for(first.event_id).is_empty());
        assert!(log.attempts_for(second.event_id).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_ticket_not_scheduled() {
        let (coordinator, _, _, _) = setup(vec![]);
        let mut t = ticket("tok");
        t.attempt_number = 3;
        coordinator.schedule(t);
        assert_eq!(coordinator.pending_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_moved_token_is_not_resent() {
        let (coordinator, push, dir, log) = setup(vec![]);
        let t = ticket("shared");
        dir.upsert_push_target(t.target.clone()).await.unwrap();
        coordinator.schedule(t.clone());

        let new_owner = UserId::new();
        dir.upsert_push_target(PushTarget::new(new_owner, "shared", Platform::Android))
            .await
            .unwrap();
        coordinator.settle().await;

        assert_eq!(push.calls(), 0);
        assert!(log.attempts_for(t.event_id).is_empty());
        assert_eq!(coordinator.pending_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_foreign_keeps_owner_tickets() {
        let (coordinator, push, dir, _) = setup(vec![]);
        let theirs = ticket("shared");
        let mut mine = ticket("shared");
        mine.target.user_id = UserId::new();
        mine.recipient_id = mine.target.user_id;
        dir.upsert_push_target(mine.target.clone()).await.unwrap();
        coordinator.schedule(theirs.clone());
        coordinator.schedule(mine.clone());

        assert_eq!(coordinator.cancel_foreign("shared", mine.recipient_id), 1);
        let pending = coordinator.pending_for("shared");
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, mine.id);

        coordinator.settle().await;
        assert_eq!(push.calls(), 1);
    }

    /// Never answers within the test.
    #[derive(Debug, Default)]
    struct StalledPush {
        calls: Mutex<u32>,
    }

    #[async_trait]
    impl PushProvider for StalledPush {
        fn provider_type(&self) -> &str {
            "stalled"
        }

        async fn multicast_send(
            &self,
            tokens: &[String],
            _message: &PushMessage,
        ) -> AppResult<MulticastResponse> {
            *self.calls.lock().unwrap() += 1;
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(MulticastResponse::from_responses(
                tokens
                    .iter()
                    .map(|t| SendResponse {
                        token: t.clone(),
                        result: Ok("late".to_string()),
                    })
                    .collect(),
            ))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_prune_interrupts_send_in_flight() {
        let push = Arc::new(StalledPush::default());
        let dir = Arc::new(InMemoryDirectory::new());
        let log = Arc::new(DeliveryLog::new());
        let coordinator =
            RetryCoordinator::new(&NotifyConfig::default(), push.clone(), dir.clone(), log.clone());
        let t = ticket("tok");
        dir.upsert_push_target(t.target.clone()).await.unwrap();
        coordinator.schedule(t.clone());

        // Past the retry delay: the resend is now waiting on the provider.
        tokio::time::sleep(Duration::from_millis(2500)).await;
        assert_eq!(*push.calls.lock().unwrap(), 1);

        coordinator.prune(&t.target).await;
        coordinator.settle().await;

        assert!(log.attempts_for(t.event_id).is_empty());
        assert_eq!(coordinator.pending_count(), 0);
    }
}
