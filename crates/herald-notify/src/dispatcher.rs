//! Delivery dispatch: executes one recipient's channel decision.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, warn};

use herald_core::events::NotificationEvent;
use herald_core::traits::directory::PushTargetStore;
use herald_core::traits::push::PushProvider;
use herald_core::traits::realtime::RealtimeChannel;
use herald_core::types::delivery::{AttemptOutcome, Channel, DeliveryAttempt, RecipientDecision};
use herald_core::types::id::UserId;
use herald_core::types::push::{PushErrorCode, PushTarget};

use crate::formatter::NotificationFormatter;
use crate::retry::RetryTicket;

/// Why a push to one token failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SendFailure {
    /// The token is dead; never retry, prune it.
    #[error("permanent push failure: {}", .0.as_str())]
    Permanent(PushErrorCode),

    /// The send may succeed later.
    #[error("transient push failure: {0}")]
    Transient(String),
}

/// Map the provider's result for one token.
pub fn classify(result: Option<&Result<String, PushErrorCode>>) -> Result<(), SendFailure> {
    match result {
        Some(Ok(_)) => Ok(()),
        Some(Err(code)) if code.is_permanent() => Err(SendFailure::Permanent(*code)),
        Some(Err(code)) => Err(SendFailure::Transient(code.as_str().to_string())),
        None => Err(SendFailure::Transient(
            "provider returned no result for token".to_string(),
        )),
    }
}

/// What dispatching one decision produced.
#[derive(Debug, Default)]
pub struct DispatchOutcome {
    /// Attempts to append to the delivery log.
    pub attempts: Vec<DeliveryAttempt>,
    /// Targets found dead; remove them and cancel their retries.
    pub prune: Vec<PushTarget>,
    /// Retries to schedule.
    pub retries: Vec<RetryTicket>,
}

/// Executes channel decisions against the socket layer and the push
/// provider.
#[derive(Debug, Clone)]
pub struct DeliveryDispatcher {
    realtime: Arc<dyn RealtimeChannel>,
    push: Arc<dyn PushProvider>,
    targets: Arc<dyn PushTargetStore>,
    max_retries: u32,
}

impl DeliveryDispatcher {
    /// Create a dispatcher. `max_retries` counts every push attempt, the
    /// first included.
    pub fn new(
        realtime: Arc<dyn RealtimeChannel>,
        push: Arc<dyn PushProvider>,
        targets: Arc<dyn PushTargetStore>,
        max_retries: u32,
    ) -> Self {
        Self {
            realtime,
            push,
            targets,
            max_retries: max_retries.max(1),
        }
    }

    /// Deliver `event` to one recipient over the decided channel.
    ///
    /// A socket decision also runs the push path so the recipient's other
    /// devices are reached; the push is marked seen when a live session took
    /// the event.
    pub async fn dispatch(
        &self,
        decision: &RecipientDecision,
        event: &NotificationEvent,
    ) -> DispatchOutcome {
        let mut outcome = DispatchOutcome::default();
        match decision.channel {
            Channel::Suppressed => {}
            Channel::Socket => {
                let seen = self.dispatch_socket(decision.recipient_id, event, &mut outcome).await;
                self.dispatch_push(decision.recipient_id, event, seen, &mut outcome)
                    .await;
            }
            Channel::Push => {
                self.dispatch_push(decision.recipient_id, event, false, &mut outcome)
                    .await;
            }
        }
        outcome
    }

    async fn dispatch_socket(
        &self,
        recipient: UserId,
        event: &NotificationEvent,
        outcome: &mut DispatchOutcome,
    ) -> bool {
        let notification = NotificationFormatter::socket_notification(event);
        let sessions = self.realtime.emit_to_user(recipient, &notification).await;
        if sessions == 0 {
            debug!(event_id = %event.id, recipient = %recipient, "No live session took the event");
            return false;
        }
        outcome.attempts.push(DeliveryAttempt::socket(
            event.id,
            recipient,
            AttemptOutcome::Success,
        ));
        debug!(event_id = %event.id, recipient = %recipient, sessions, "Socket delivery done");
        true
    }

    async fn dispatch_push(
        &self,
        recipient: UserId,
        event: &NotificationEvent,
        seen: bool,
        outcome: &mut DispatchOutcome,
    ) {
        let targets = match self.targets.get_push_targets(recipient).await {
            Ok(targets) => dedup_by_token(targets),
            Err(e) => {
                warn!(event_id = %event.id, recipient = %recipient, error = %e, "Failed to load push targets");
                return;
            }
        };
        if targets.is_empty() {
            debug!(event_id = %event.id, recipient = %recipient, "Recipient has no push targets");
            return;
        }

        let message = NotificationFormatter::push_message(event, seen);
        let tokens: Vec<String> = targets.iter().map(|t| t.token.clone()).collect();
        let response = self.push.multicast_send(&tokens, &message).await;
        if let Err(e) = &response {
            warn!(
                event_id = %event.id,
                recipient = %recipient,
                provider = self.push.provider_type(),
                error = %e,
                "Push provider call failed"
            );
        }

        for target in targets {
            let result = match &response {
                Ok(resp) => classify(resp.result_for(&target.token)),
                Err(e) => Err(SendFailure::Transient(e.to_string())),
            };
            match result {
                Ok(()) => {
                    outcome.attempts.push(DeliveryAttempt::push(
                        event.id,
                        &target,
                        1,
                        AttemptOutcome::Success,
                    ));
                }
                Err(failure @ SendFailure::Permanent(_)) => {
                    outcome.attempts.push(DeliveryAttempt::push(
                        event.id,
                        &target,
                        1,
                        AttemptOutcome::Failed {
                            error: failure.to_string(),
                            terminal: true,
                        },
                    ));
                    outcome.prune.push(target);
                }
                Err(failure @ SendFailure::Transient(_)) => {
                    let terminal = self.max_retries <= 1;
                    outcome.attempts.push(DeliveryAttempt::push(
                        event.id,
                        &target,
                        1,
                        AttemptOutcome::Failed {
                            error: failure.to_string(),
                            terminal,
                        },
                    ));
                    if terminal {
                        warn!(
                            event_id = %event.id,
                            recipient = %recipient,
                            token = %target.token,
                            error = %failure,
                            "Push delivery failed, retries disabled"
                        );
                    } else {
                        outcome
                            .retries
                            .push(RetryTicket::new(event.id, target, message.clone(), 1));
                    }
                }
            }
        }
    }
}

/// Keep the first target per token.
fn dedup_by_token(targets: Vec<PushTarget>) -> Vec<PushTarget> {
    let mut seen = HashSet::new();
    targets
        .into_iter()
        .filter(|t| seen.insert(t.token.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use herald_core::AppError;
    use herald_core::events::Actor;
    use herald_core::result::AppResult;
    use herald_core::traits::realtime::SocketNotification;
    use herald_core::types::id::PostId;
    use herald_core::types::push::{MulticastResponse, Platform, PushMessage, SendResponse};
    use std::sync::Mutex;

    use crate::directory::memory::InMemoryDirectory;

    #[derive(Debug)]
    struct FixedPush {
        per_token: fn(&str) -> Result<String, PushErrorCode>,
        fail_call: bool,
        sent: Mutex<Vec<PushMessage>>,
    }

    #[async_trait]
    impl PushProvider for FixedPush {
        fn provider_type(&self) -> &str {
            "fixed"
        }

        async fn multicast_send(
            &self,
            tokens: &[String],
            message: &PushMessage,
        ) -> AppResult<MulticastResponse> {
            self.sent.lock().unwrap().push(message.clone());
            if self.fail_call {
                return Err(AppError::external("connection reset"));
            }
            Ok(MulticastResponse::from_responses(
                tokens
                    .iter()
                    .map(|t| SendResponse {
                        token: t.clone(),
                        result: (self.per_token)(t),
                    })
                    .collect(),
            ))
        }
    }

    #[derive(Debug)]
    struct Sessions(usize);

    #[async_trait]
    impl RealtimeChannel for Sessions {
        async fn emit_to_user(&self, _user_id: UserId, _n: &SocketNotification) -> usize {
            self.0
        }

        fn is_user_connected(&self, _user_id: UserId) -> bool {
            self.0 > 0
        }
    }

    fn push(per_token: fn(&str) -> Result<String, PushErrorCode>) -> Arc<FixedPush> {
        Arc::new(FixedPush {
            per_token,
            fail_call: false,
            sent: Mutex::new(Vec::new()),
        })
    }

    async fn directory(user: UserId, tokens: &[&str]) -> Arc<InMemoryDirectory> {
        let dir = Arc::new(InMemoryDirectory::new());
        for token in tokens {
            dir.upsert_push_target(PushTarget::new(user, *token, Platform::Ios))
                .await
                .unwrap();
        }
        dir
    }

    fn decision(user: UserId, channel: Channel) -> RecipientDecision {
        let reason = match channel {
            Channel::Socket => herald_core::types::DecisionReason::SocketConnected,
            Channel::Push => herald_core::types::DecisionReason::Offline,
            Channel::Suppressed => herald_core::types::DecisionReason::ViewingContext,
        };
        RecipientDecision {
            recipient_id: user,
            channel,
            reason,
        }
    }

    fn like() -> NotificationEvent {
        NotificationEvent::like(Actor::new(UserId::new(), "Ann"), PostId::new(), None)
    }

    #[tokio::test]
    async fn test_socket_also_pushes_marked_seen() {
        let user = UserId::new();
        let provider = push(|_| Ok("id".to_string()));
        let dispatcher = DeliveryDispatcher::new(
            Arc::new(Sessions(2)),
            provider.clone(),
            directory(user, &["a"]).await,
            3,
        );
        let out = dispatcher.dispatch(&decision(user, Channel::Socket), &like()).await;

        let channels: Vec<Channel> = out.attempts.iter().map(|a| a.channel).collect();
        assert_eq!(channels, vec![Channel::Socket, Channel::Push]);
        assert!(out.attempts.iter().all(|a| a.is_success()));
        assert_eq!(provider.sent.lock().unwrap()[0].data["seen"], "true");
    }

    #[tokio::test]
    async fn test_suppressed_records_nothing() {
        let user = UserId::new();
        let provider = push(|_| Ok("id".to_string()));
        let dispatcher = DeliveryDispatcher::new(
            Arc::new(Sessions(1)),
            provider.clone(),
            directory(user, &["a"]).await,
            3,
        );
        let out = dispatcher
            .dispatch(&decision(user, Channel::Suppressed), &like())
            .await;
        assert!(out.attempts.is_empty());
        assert!(provider.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_tokens_sent_once() {
        let user = UserId::new();
        let dir = Arc::new(InMemoryDirectory::new());
        dir.add_push_target_unchecked(PushTarget::new(user, "a", Platform::Android));
        dir.add_push_target_unchecked(PushTarget::new(user, "a", Platform::Android));
        let dispatcher =
            DeliveryDispatcher::new(Arc::new(Sessions(0)), push(|_| Ok("id".to_string())), dir, 3);
        let out = dispatcher.dispatch(&decision(user, Channel::Push), &like()).await;
        assert_eq!(out.attempts.len(), 1);
    }

    #[tokio::test]
    async fn test_per_target_outcomes() {
        let user = UserId::new();
        let provider = push(|t| match t {
            "good" => Ok("id".to_string()),
            "dead" => Err(PushErrorCode::Unregistered),
            _ => Err(PushErrorCode::Unavailable),
        });
        let dispatcher = DeliveryDispatcher::new(
            Arc::new(Sessions(0)),
            provider,
            directory(user, &["good", "dead", "flaky"]).await,
            3,
        );
        let out = dispatcher.dispatch(&decision(user, Channel::Push), &like()).await;

        assert_eq!(out.attempts.len(), 3);
        assert_eq!(out.prune.len(), 1);
        assert_eq!(out.prune[0].token, "dead");
        assert_eq!(out.retries.len(), 1);
        assert_eq!(out.retries[0].target.token, "flaky");
        assert_eq!(out.retries[0].attempt_number, 1);

        let dead = out.attempts.iter().find(|a| a.target.as_ref().unwrap().token == "dead").unwrap();
        assert!(dead.is_terminal());
        let flaky = out.attempts.iter().find(|a| a.target.as_ref().unwrap().token == "flaky").unwrap();
        assert!(!flaky.is_terminal());
    }

    #[tokio::test]
    async fn test_whole_call_failure_retries_every_target() {
        let user = UserId::new();
        let provider = Arc::new(FixedPush {
            per_token: |_| Ok("id".to_string()),
            fail_call: true,
            sent: Mutex::new(Vec::new()),
        });
        let dispatcher = DeliveryDispatcher::new(
            Arc::new(Sessions(0)),
            provider,
            directory(user, &["a", "b"]).await,
            3,
        );
        let out = dispatcher.dispatch(&decision(user, Channel::Push), &like()).await;
        assert_eq!(out.retries.len(), 2);
        assert!(out.prune.is_empty());
    }

    #[tokio::test]
    async fn test_single_attempt_budget_is_terminal() {
        let user = UserId::new();
        let dispatcher = DeliveryDispatcher::new(
            Arc::new(Sessions(0)),
            push(|_| Err(PushErrorCode::Internal)),
            directory(user, &["a"]).await,
            1,
        );
        let out = dispatcher.dispatch(&decision(user, Channel::Push), &like()).await;
        assert!(out.retries.is_empty());
        assert!(out.attempts[0].is_terminal());
    }

    #[test]
    fn test_classify_missing_result_is_transient() {
        assert!(matches!(classify(None), Err(SendFailure::Transient(_))));
        assert_eq!(
            classify(Some(&Err(PushErrorCode::SenderIdMismatch))),
            Err(SendFailure::Permanent(PushErrorCode::SenderIdMismatch))
        );
    }
}
