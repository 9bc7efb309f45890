//! Notification service: the entry point controllers call after persisting
//! an interaction.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

use herald_core::config::NotifyConfig;
use herald_core::events::NotificationEvent;
use herald_core::result::AppResult;
use herald_core::traits::directory::{EntityDirectory, PushTargetStore};
use herald_core::traits::presence::PresenceStore;
use herald_core::traits::push::PushProvider;
use herald_core::traits::realtime::RealtimeChannel;
use herald_core::types::delivery::{DeliveryAttempt, RecipientDecision};
use herald_core::types::id::{EventId, UserId};
use herald_core::types::presence::ActiveContext;
use herald_core::types::push::PushTarget;

use crate::dedup::EventDeduplicator;
use crate::dispatcher::{DeliveryDispatcher, DispatchOutcome};
use crate::log::DeliveryLog;
use crate::resolver::resolve_recipients;
use crate::retry::{RetryCoordinator, RetryTicket};
use crate::selector::select_channel;

/// How often the delivery log and dedup window are swept.
const MAINTENANCE_INTERVAL: Duration = Duration::from_secs(60);

/// Summary of one pipeline run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DeliveryReport {
    /// The event.
    pub event_id: EventId,
    /// Set when the event was already processed and was skipped.
    pub duplicate: bool,
    /// Per-recipient channel decisions.
    pub decisions: Vec<RecipientDecision>,
    /// Attempts recorded by the first delivery pass.
    pub attempts: Vec<DeliveryAttempt>,
    /// Targets pruned as dead.
    pub pruned: Vec<PushTarget>,
    /// Retries scheduled.
    pub retries_scheduled: usize,
}

/// Fan-out pipeline over the injected collaborators.
#[derive(Debug)]
pub struct NotificationService {
    config: NotifyConfig,
    directory: Arc<dyn EntityDirectory>,
    targets: Arc<dyn PushTargetStore>,
    presence: Arc<dyn PresenceStore>,
    realtime: Arc<dyn RealtimeChannel>,
    dispatcher: DeliveryDispatcher,
    retries: RetryCoordinator,
    log: Arc<DeliveryLog>,
    dedup: EventDeduplicator,
    tasks: TaskTracker,
}

impl NotificationService {
    /// Create the service.
    pub fn new(
        config: NotifyConfig,
        directory: Arc<dyn EntityDirectory>,
        targets: Arc<dyn PushTargetStore>,
        presence: Arc<dyn PresenceStore>,
        realtime: Arc<dyn RealtimeChannel>,
        push: Arc<dyn PushProvider>,
    ) -> Self {
        let log = Arc::new(DeliveryLog::new());
        let dispatcher = DeliveryDispatcher::new(
            realtime.clone(),
            push.clone(),
            targets.clone(),
            config.max_retries,
        );
        let retries = RetryCoordinator::new(&config, push, targets.clone(), log.clone());
        let dedup = EventDeduplicator::new(config.dedup_window_ms);

        Self {
            config,
            directory,
            targets,
            presence,
            realtime,
            dispatcher,
            retries,
            log,
            dedup,
            tasks: TaskTracker::new(),
        }
    }

    /// Fire-and-forget entry point. Returns immediately; delivery runs in the
    /// background and never reports an error to the caller.
    pub fn notify(self: &Arc<Self>, event: NotificationEvent) {
        let service = Arc::clone(self);
        self.tasks.spawn(async move {
            service.deliver(event).await;
        });
    }

    /// Run the pipeline for one event and wait for the first delivery pass.
    /// Retries continue in the background.
    pub async fn deliver(&self, event: NotificationEvent) -> DeliveryReport {
        let mut report = DeliveryReport {
            event_id: event.id,
            ..DeliveryReport::default()
        };

        if !self.dedup.should_dispatch(event.id) {
            debug!(event_id = %event.id, "Duplicate event skipped");
            report.duplicate = true;
            return report;
        }

        let recipients = resolve_recipients(&event, self.directory.as_ref()).await;
        if recipients.is_empty() {
            return report;
        }

        let per_recipient = join_all(
            recipients
                .iter()
                .map(|recipient| self.deliver_to(*recipient, &event)),
        )
        .await;

        let mut prune = Vec::new();
        let mut tickets: Vec<RetryTicket> = Vec::new();
        for (decision, outcome) in per_recipient {
            let DispatchOutcome {
                attempts,
                prune: dead,
                retries,
            } = outcome;
            report.decisions.push(decision);
            report.attempts.extend(attempts);
            prune.extend(dead);
            tickets.extend(retries);
        }

        self.log.record_all(report.attempts.iter().cloned());

        for target in &prune {
            self.retries.prune(target).await;
        }
        report.retries_scheduled = tickets.len();
        for ticket in tickets {
            self.retries.schedule(ticket);
        }
        report.pruned = prune;

        info!(
            event_id = %event.id,
            kind = event.kind().as_str(),
            recipients = report.decisions.len(),
            attempts = report.attempts.len(),
            pruned = report.pruned.len(),
            retries = report.retries_scheduled,
            "Event delivered"
        );
        report
    }

    async fn deliver_to(
        &self,
        recipient: UserId,
        event: &NotificationEvent,
    ) -> (RecipientDecision, DispatchOutcome) {
        let presence = match self.presence.get(recipient).await {
            Ok(ctx) => ctx,
            Err(e) => {
                debug!(recipient = %recipient, error = %e, "Presence unavailable, assuming none");
                None
            }
        };
        let prefs = match self.directory.get_preferences(recipient).await {
            Ok(prefs) => prefs,
            Err(e) => {
                warn!(recipient = %recipient, error = %e, "Preferences unavailable, using defaults");
                Default::default()
            }
        };
        let connected = self.realtime.is_user_connected(recipient);

        let decision = select_channel(recipient, event, presence, connected, &prefs, &self.config);
        debug!(
            event_id = %event.id,
            recipient = %recipient,
            channel = decision.channel.as_str(),
            reason = ?decision.reason,
            "Channel selected"
        );

        let outcome = self.dispatcher.dispatch(&decision, event).await;
        (decision, outcome)
    }

    /// Register (or move) a device token. Retries still pending for a
    /// previous owner of the token are cancelled.
    pub async fn register_push_target(&self, target: PushTarget) -> AppResult<()> {
        let cancelled = self.retries.cancel_foreign(&target.token, target.user_id);
        if cancelled > 0 {
            info!(
                user_id = %target.user_id,
                token = %target.token,
                cancelled,
                "Push target changed owner, cancelled retries of previous owner"
            );
        }
        self.targets.upsert_push_target(target).await
    }

    /// Remove a device token and cancel its outstanding retries.
    pub async fn unregister_push_target(&self, target: &PushTarget) -> AppResult<bool> {
        let removed = self.targets.remove_push_target(target).await?;
        let cancelled = self.retries.cancel_token(&target.token);
        debug!(token = %target.token, removed, cancelled, "Push target unregistered");
        Ok(removed)
    }

    /// Record which screen a user has open; `None` clears it.
    pub async fn set_active_context(
        &self,
        user_id: UserId,
        context: Option<ActiveContext>,
    ) -> AppResult<()> {
        self.presence.set(user_id, context).await
    }

    /// Attempts recorded for an event so far.
    pub fn attempts_for(&self, event_id: EventId) -> Vec<DeliveryAttempt> {
        self.log.attempts_for(event_id)
    }

    /// Outstanding retry tickets for a token.
    pub fn pending_retries(&self, token: &str) -> Vec<RetryTicket> {
        self.retries.pending_for(token)
    }

    /// The delivery log.
    pub fn delivery_log(&self) -> &Arc<DeliveryLog> {
        &self.log
    }

    /// Wait for every background pipeline and retry started so far.
    pub async fn settle(&self) {
        self.tasks.close();
        self.tasks.wait().await;
        self.tasks.reopen();
        self.retries.settle().await;
    }

    /// Drop expired delivery records and dedup entries.
    pub fn run_maintenance(&self) {
        let dropped = self
            .log
            .cleanup(self.config.delivery_log_retention_seconds);
        self.dedup.cleanup();
        if dropped > 0 {
            debug!(dropped, "Expired delivery records removed");
        }
    }

    /// Sweep periodically until `shutdown` fires.
    pub fn spawn_maintenance(self: &Arc<Self>, shutdown: CancellationToken) {
        let service = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(MAINTENANCE_INTERVAL);
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = ticker.tick() => service.run_maintenance(),
                }
            }
        });
    }

    /// Let in-flight deliveries and retries finish within `grace`; cancel
    /// whatever is still pending after that.
    pub async fn shutdown(&self, grace: Duration) {
        info!(pending = self.retries.pending_count(), "Draining notification deliveries");
        if tokio::time::timeout(grace, self.settle()).await.is_err() {
            warn!(
                pending = self.retries.pending_count(),
                "Grace period elapsed, cancelling outstanding retries"
            );
            self.retries.cancel_all();
            self.settle().await;
        }
        info!("Notification service stopped");
    }
}
