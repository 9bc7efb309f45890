//! Notification text and payload formatting.

use std::collections::HashMap;

use herald_core::events::{EventSubject, NotificationEvent};
use herald_core::traits::realtime::SocketNotification;
use herald_core::types::push::PushMessage;

/// Longest text snippet shown in a banner, in characters.
const SNIPPET_MAX_CHARS: usize = 100;

/// Builds banner text and payloads for events.
pub struct NotificationFormatter;

impl NotificationFormatter {
    /// Banner title and body for an event.
    pub fn banner(event: &NotificationEvent) -> (String, String) {
        let name = event.actor.name.clone();
        let body = match &event.subject {
            EventSubject::Like { .. } => "liked your post".to_string(),
            EventSubject::Comment { .. } => match event.payload.text.as_deref() {
                Some(text) if !text.trim().is_empty() => {
                    format!("commented: {}", snippet(text))
                }
                _ => "commented on your post".to_string(),
            },
            EventSubject::Follow { .. } => "started following you".to_string(),
            EventSubject::Message { .. } => match event.payload.text.as_deref() {
                Some(text) if !text.trim().is_empty() => snippet(text),
                _ if event.payload.has_image => "sent a photo".to_string(),
                _ => "sent you a message".to_string(),
            },
        };
        (name, body)
    }

    /// Push payload. `seen` tells the client whether the recipient already
    /// got the event over a live socket, so it can skip the banner.
    pub fn push_message(event: &NotificationEvent, seen: bool) -> PushMessage {
        let (title, body) = Self::banner(event);
        let mut data = HashMap::new();
        data.insert("type".to_string(), event.kind().as_str().to_string());
        data.insert("eventId".to_string(), event.id.to_string());
        data.insert("senderId".to_string(), event.actor.id.to_string());
        data.insert("senderName".to_string(), event.actor.name.clone());
        if let Some(avatar) = &event.actor.avatar {
            data.insert("avatar".to_string(), avatar.clone());
        }
        match &event.subject {
            EventSubject::Like { post_id, .. } | EventSubject::Comment { post_id, .. } => {
                data.insert("postId".to_string(), post_id.to_string());
            }
            EventSubject::Message {
                chat_id, is_group, ..
            } => {
                data.insert("chatId".to_string(), chat_id.to_string());
                data.insert("isGroup".to_string(), is_group.to_string());
            }
            EventSubject::Follow { .. } => {}
        }
        data.insert("seen".to_string(), seen.to_string());

        PushMessage { title, body, data }
    }

    /// Payload emitted over live socket sessions.
    pub fn socket_notification(event: &NotificationEvent) -> SocketNotification {
        let (title, body) = Self::banner(event);
        let data = serde_json::json!({
            "senderId": event.actor.id,
            "avatar": event.actor.avatar,
            "postId": event.subject.post_id(),
            "chatId": event.subject.chat_id(),
            "text": event.payload.text,
            "hasImage": event.payload.has_image,
        });
        SocketNotification {
            event_id: event.id,
            kind: event.kind(),
            title,
            body,
            data,
            timestamp: event.created_at,
        }
    }
}

fn snippet(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.chars().count() <= SNIPPET_MAX_CHARS {
        return trimmed.to_string();
    }
    let mut cut: String = trimmed.chars().take(SNIPPET_MAX_CHARS).collect();
    cut.push('…');
    cut
}

#[cfg(test)]
mod tests {
    use super::*;
    use herald_core::events::{Actor, EventPayload};
    use herald_core::types::id::{ChatId, PostId, UserId};

    fn actor() -> Actor {
        Actor::new(UserId::new(), "Ann").with_avatar("https://cdn/ann.png")
    }

    #[test]
    fn test_like_push_payload() {
        let post = PostId::new();
        let event = NotificationEvent::like(actor(), post, None);
        let msg = NotificationFormatter::push_message(&event, false);
        assert_eq!(msg.title, "Ann");
        assert_eq!(msg.body, "liked your post");
        assert_eq!(msg.data["type"], "like");
        assert_eq!(msg.data["postId"], post.to_string());
        assert_eq!(msg.data["avatar"], "https://cdn/ann.png");
        assert_eq!(msg.data["seen"], "false");
        assert!(!msg.data.contains_key("chatId"));
    }

    #[test]
    fn test_message_body_falls_back_to_photo() {
        let chat = ChatId::new();
        let event = NotificationEvent::message(actor(), chat, vec![], true, EventPayload::image());
        let msg = NotificationFormatter::push_message(&event, true);
        assert_eq!(msg.body, "sent a photo");
        assert_eq!(msg.data["chatId"], chat.to_string());
        assert_eq!(msg.data["isGroup"], "true");
        assert_eq!(msg.data["seen"], "true");
    }

    #[test]
    fn test_long_comment_is_truncated() {
        let text = "x".repeat(150);
        let event = NotificationEvent::comment(
            actor(),
            PostId::new(),
            None,
            EventPayload::text(text),
        );
        let (_, body) = NotificationFormatter::banner(&event);
        assert!(body.starts_with("commented: "));
        assert!(body.ends_with('…'));
        assert_eq!(body.chars().count(), "commented: ".len() + SNIPPET_MAX_CHARS + 1);
    }

    #[test]
    fn test_socket_notification_carries_entity() {
        let post = PostId::new();
        let event = NotificationEvent::like(actor(), post, None);
        let n = NotificationFormatter::socket_notification(&event);
        assert_eq!(n.event_id, event.id);
        assert_eq!(n.data["postId"], serde_json::json!(post));
        assert!(n.data["chatId"].is_null());
    }
}
