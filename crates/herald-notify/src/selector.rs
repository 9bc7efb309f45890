//! Channel selection: how one recipient is reached for one event.

use herald_core::config::NotifyConfig;
use herald_core::events::NotificationEvent;
use herald_core::types::delivery::{Channel, DecisionReason, RecipientDecision};
use herald_core::types::id::UserId;
use herald_core::types::preferences::NotificationPreferences;
use herald_core::types::presence::ActiveContext;

/// Pick the delivery channel for `recipient`.
///
/// Rules, first match wins:
/// 1. muted kind: suppressed;
/// 2. suppressible kind and the recipient is viewing the event's chat/post:
///    suppressed;
/// 3. live socket session: socket (push still follows, marked seen);
/// 4. otherwise push.
///
/// `presence` is `None` when unknown, which never suppresses.
pub fn select_channel(
    recipient: UserId,
    event: &NotificationEvent,
    presence: Option<ActiveContext>,
    connected: bool,
    prefs: &NotificationPreferences,
    config: &NotifyConfig,
) -> RecipientDecision {
    let kind = event.kind();
    let (channel, reason) = if prefs.is_muted(kind) {
        (Channel::Suppressed, DecisionReason::Muted)
    } else if config.suppresses_when_viewing(kind)
        && presence.is_some()
        && presence == event.subject.context()
    {
        (Channel::Suppressed, DecisionReason::ViewingContext)
    } else if connected {
        (Channel::Socket, DecisionReason::SocketConnected)
    } else {
        (Channel::Push, DecisionReason::Offline)
    };

    RecipientDecision {
        recipient_id: recipient,
        channel,
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use herald_core::events::{Actor, EventKind, EventPayload};
    use herald_core::types::id::{ChatId, PostId};

    fn message(chat: ChatId) -> NotificationEvent {
        NotificationEvent::message(
            Actor::new(UserId::new(), "a"),
            chat,
            vec![],
            false,
            EventPayload::text("hi"),
        )
    }

    #[test]
    fn test_viewing_chat_suppresses_message() {
        let chat = ChatId::new();
        let d = select_channel(
            UserId::new(),
            &message(chat),
            Some(ActiveContext::Chat(chat)),
            true,
            &NotificationPreferences::default(),
            &NotifyConfig::default(),
        );
        assert_eq!(d.channel, Channel::Suppressed);
        assert_eq!(d.reason, DecisionReason::ViewingContext);
    }

    #[test]
    fn test_other_chat_open_goes_to_socket() {
        let d = select_channel(
            UserId::new(),
            &message(ChatId::new()),
            Some(ActiveContext::Chat(ChatId::new())),
            true,
            &NotificationPreferences::default(),
            &NotifyConfig::default(),
        );
        assert_eq!(d.channel, Channel::Socket);
    }

    #[test]
    fn test_like_on_open_post_not_suppressed_by_default() {
        let post = PostId::new();
        let event = NotificationEvent::like(Actor::new(UserId::new(), "a"), post, None);
        let d = select_channel(
            UserId::new(),
            &event,
            Some(ActiveContext::Post(post)),
            false,
            &NotificationPreferences::default(),
            &NotifyConfig::default(),
        );
        assert_eq!(d.channel, Channel::Push);
        assert_eq!(d.reason, DecisionReason::Offline);
    }

    #[test]
    fn test_comment_suppression_is_configurable() {
        let post = PostId::new();
        let event = NotificationEvent::comment(
            Actor::new(UserId::new(), "a"),
            post,
            None,
            EventPayload::text("nice"),
        );
        let config = NotifyConfig {
            suppress_when_viewing: vec![EventKind::Message, EventKind::Comment],
            ..NotifyConfig::default()
        };
        let d = select_channel(
            UserId::new(),
            &event,
            Some(ActiveContext::Post(post)),
            true,
            &NotificationPreferences::default(),
            &config,
        );
        assert_eq!(d.channel, Channel::Suppressed);
    }

    #[test]
    fn test_muted_kind_suppressed() {
        let prefs = NotificationPreferences {
            muted_kinds: [EventKind::Message].into_iter().collect(),
        };
        let d = select_channel(
            UserId::new(),
            &message(ChatId::new()),
            None,
            true,
            &prefs,
            &NotifyConfig::default(),
        );
        assert_eq!(d.channel, Channel::Suppressed);
        assert_eq!(d.reason, DecisionReason::Muted);
    }

    #[test]
    fn test_unknown_presence_offline_is_push() {
        let d = select_channel(
            UserId::new(),
            &message(ChatId::new()),
            None,
            false,
            &NotificationPreferences::default(),
            &NotifyConfig::default(),
        );
        assert_eq!(d.channel, Channel::Push);
    }
}
