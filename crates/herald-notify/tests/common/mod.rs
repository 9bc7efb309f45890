//! Shared fixtures: recording collaborators around the in-memory directory.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use herald_core::config::NotifyConfig;
use herald_core::events::Actor;
use herald_core::result::AppResult;
use herald_core::traits::directory::PushTargetStore;
use herald_core::traits::push::PushProvider;
use herald_core::traits::realtime::{RealtimeChannel, SocketNotification};
use herald_core::types::id::UserId;
use herald_core::types::push::{
    MulticastResponse, Platform, PushErrorCode, PushMessage, PushTarget, SendResponse,
};
use herald_notify::NotificationService;
use herald_notify::directory::InMemoryDirectory;
use herald_realtime::PresenceTracker;

/// Push provider answering per token from a script (then succeeding) and
/// recording every call.
#[derive(Debug, Default)]
pub struct RecordingPush {
    scripts: Mutex<HashMap<String, VecDeque<Result<String, PushErrorCode>>>>,
    calls: Mutex<Vec<(Vec<String>, PushMessage)>>,
}

impl RecordingPush {
    /// Queue replies for a token.
    pub fn script(&self, token: &str, replies: Vec<Result<String, PushErrorCode>>) {
        self.scripts
            .lock()
            .unwrap()
            .entry(token.to_string())
            .or_default()
            .extend(replies);
    }

    /// Number of sends addressed to a token.
    pub fn sends_to(&self, token: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(tokens, _)| tokens.iter().any(|t| t == token))
            .count()
    }

    /// Number of provider calls.
    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Messages sent so far.
    pub fn messages(&self) -> Vec<PushMessage> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(_, m)| m.clone())
            .collect()
    }
}

#[async_trait]
impl PushProvider for RecordingPush {
    fn provider_type(&self) -> &str {
        "recording"
    }

    async fn multicast_send(
        &self,
        tokens: &[String],
        message: &PushMessage,
    ) -> AppResult<MulticastResponse> {
        self.calls
            .lock()
            .unwrap()
            .push((tokens.to_vec(), message.clone()));
        let mut scripts = self.scripts.lock().unwrap();
        let responses = tokens
            .iter()
            .map(|token| SendResponse {
                token: token.clone(),
                result: scripts
                    .get_mut(token)
                    .and_then(|q| q.pop_front())
                    .unwrap_or_else(|| Ok(format!("msg-{token}"))),
            })
            .collect();
        Ok(MulticastResponse::from_responses(responses))
    }
}

/// Socket layer where "connected" users hold exactly one session.
#[derive(Debug, Default)]
pub struct RecordingRealtime {
    connected: Mutex<HashSet<UserId>>,
    emitted: Mutex<Vec<(UserId, SocketNotification)>>,
}

impl RecordingRealtime {
    /// Mark a user as connected.
    pub fn connect(&self, user: UserId) {
        self.connected.lock().unwrap().insert(user);
    }

    /// Payloads emitted so far.
    pub fn emitted(&self) -> Vec<(UserId, SocketNotification)> {
        self.emitted.lock().unwrap().clone()
    }
}

#[async_trait]
impl RealtimeChannel for RecordingRealtime {
    async fn emit_to_user(&self, user_id: UserId, notification: &SocketNotification) -> usize {
        if !self.is_user_connected(user_id) {
            return 0;
        }
        self.emitted
            .lock()
            .unwrap()
            .push((user_id, notification.clone()));
        1
    }

    fn is_user_connected(&self, user_id: UserId) -> bool {
        self.connected.lock().unwrap().contains(&user_id)
    }
}

/// A service wired to recording collaborators.
pub struct Harness {
    pub service: Arc<NotificationService>,
    pub directory: Arc<InMemoryDirectory>,
    pub presence: Arc<PresenceTracker>,
    pub realtime: Arc<RecordingRealtime>,
    pub push: Arc<RecordingPush>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(NotifyConfig::default())
    }

    pub fn with_config(config: NotifyConfig) -> Self {
        let directory = Arc::new(InMemoryDirectory::new());
        let presence = Arc::new(PresenceTracker::new());
        let realtime = Arc::new(RecordingRealtime::default());
        let push = Arc::new(RecordingPush::default());
        let service = Arc::new(NotificationService::new(
            config,
            directory.clone(),
            directory.clone(),
            presence.clone(),
            realtime.clone(),
            push.clone(),
        ));
        Self {
            service,
            directory,
            presence,
            realtime,
            push,
        }
    }

    /// Register a device token for a user.
    pub async fn device(&self, user: UserId, token: &str) -> PushTarget {
        let target = PushTarget::new(user, token, Platform::Android);
        self.directory
            .upsert_push_target(target.clone())
            .await
            .unwrap();
        target
    }
}

pub fn actor(id: UserId) -> Actor {
    Actor::new(id, "Ann").with_avatar("https://cdn.example/ann.png")
}
