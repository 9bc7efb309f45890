//! Recipient resolution: who is notified about an event.
//!
//! Resolution is split in two. [`fetch_context`] performs every directory
//! lookup the event needs; [`resolve`] is a pure function of the event and
//! that context, so the same inputs always produce the same recipient set.

use std::collections::{BTreeSet, HashSet};

use tracing::{debug, warn};

use herald_core::events::{EventSubject, NotificationEvent};
use herald_core::result::AppResult;
use herald_core::traits::directory::EntityDirectory;
use herald_core::types::id::UserId;

/// Directory facts needed to resolve one event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolutionContext {
    /// Owner of the referenced post (likes, comments).
    pub owner: Option<UserId>,
    /// Chat participants, sender included (messages).
    pub participants: Vec<UserId>,
    /// Candidates in a block relationship with the actor.
    pub blocked: HashSet<UserId>,
}

/// Candidates before block filtering. The actor is never among them.
fn candidates(event: &NotificationEvent, ctx: &ResolutionContext) -> BTreeSet<UserId> {
    let actor = event.actor_id();
    let raw: Vec<UserId> = match &event.subject {
        EventSubject::Like { .. } | EventSubject::Comment { .. } => ctx.owner.into_iter().collect(),
        EventSubject::Follow { followee } => vec![*followee],
        EventSubject::Message { .. } => ctx.participants.clone(),
    };
    raw.into_iter().filter(|id| *id != actor).collect()
}

/// Recipients of `event` given the directory facts in `ctx`.
pub fn resolve(event: &NotificationEvent, ctx: &ResolutionContext) -> BTreeSet<UserId> {
    candidates(event, ctx)
        .into_iter()
        .filter(|id| !ctx.blocked.contains(id))
        .collect()
}

/// Look up everything [`resolve`] needs. Hints carried by the event are used
/// as-is; missing ones are fetched from the directory.
pub async fn fetch_context(
    event: &NotificationEvent,
    directory: &dyn EntityDirectory,
) -> AppResult<ResolutionContext> {
    let mut ctx = ResolutionContext::default();

    match &event.subject {
        EventSubject::Like { post_id, owner } | EventSubject::Comment { post_id, owner } => {
            ctx.owner = match owner {
                Some(owner) => Some(*owner),
                None => directory.get_entity_owner(*post_id).await?,
            };
        }
        EventSubject::Follow { .. } => {}
        EventSubject::Message {
            chat_id,
            participants,
            ..
        } => {
            ctx.participants = if participants.is_empty() {
                directory.get_chat_participants(*chat_id).await?
            } else {
                participants.clone()
            };
        }
    }

    let actor = event.actor_id();
    for candidate in candidates(event, &ctx) {
        if directory.is_blocked(actor, candidate).await? {
            ctx.blocked.insert(candidate);
        }
    }

    Ok(ctx)
}

/// Resolve the recipients of `event`.
///
/// Never fails: a lookup error or an entity that no longer exists yields an
/// empty set and a warning.
pub async fn resolve_recipients(
    event: &NotificationEvent,
    directory: &dyn EntityDirectory,
) -> BTreeSet<UserId> {
    let ctx = match fetch_context(event, directory).await {
        Ok(ctx) => ctx,
        Err(e) => {
            warn!(
                event_id = %event.id,
                kind = event.kind().as_str(),
                error = %e,
                "Recipient resolution failed, nobody will be notified"
            );
            return BTreeSet::new();
        }
    };

    if let EventSubject::Like { post_id, .. } | EventSubject::Comment { post_id, .. } =
        &event.subject
    {
        if ctx.owner.is_none() {
            warn!(event_id = %event.id, post_id = %post_id, "Post not found, nobody will be notified");
        }
    }
    if let EventSubject::Message { chat_id, .. } = &event.subject {
        if ctx.participants.is_empty() {
            warn!(event_id = %event.id, chat_id = %chat_id, "Chat has no participants, nobody will be notified");
        }
    }

    let recipients = resolve(event, &ctx);
    debug!(
        event_id = %event.id,
        recipients = recipients.len(),
        blocked = ctx.blocked.len(),
        "Recipients resolved"
    );
    recipients
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::memory::InMemoryDirectory;
    use herald_core::events::{Actor, EventPayload};
    use herald_core::types::id::{ChatId, PostId};

    fn actor(id: UserId) -> Actor {
        Actor::new(id, "actor")
    }

    #[test]
    fn test_like_notifies_owner() {
        let (a, owner) = (UserId::new(), UserId::new());
        let event = NotificationEvent::like(actor(a), PostId::new(), None);
        let ctx = ResolutionContext {
            owner: Some(owner),
            ..Default::default()
        };
        assert_eq!(resolve(&event, &ctx), BTreeSet::from([owner]));
    }

    #[test]
    fn test_self_like_and_self_comment_are_empty() {
        let a = UserId::new();
        let ctx = ResolutionContext {
            owner: Some(a),
            ..Default::default()
        };
        let like = NotificationEvent::like(actor(a), PostId::new(), None);
        let comment =
            NotificationEvent::comment(actor(a), PostId::new(), None, EventPayload::text("hi"));
        assert!(resolve(&like, &ctx).is_empty());
        assert!(resolve(&comment, &ctx).is_empty());
    }

    #[test]
    fn test_message_excludes_sender() {
        let sender = UserId::new();
        let others: Vec<UserId> = (0..4).map(|_| UserId::new()).collect();
        let mut participants = others.clone();
        participants.push(sender);
        let event = NotificationEvent::message(
            actor(sender),
            ChatId::new(),
            participants.clone(),
            true,
            EventPayload::text("hey"),
        );
        let ctx = ResolutionContext {
            participants,
            ..Default::default()
        };
        let recipients = resolve(&event, &ctx);
        assert_eq!(recipients.len(), others.len());
        assert!(!recipients.contains(&sender));
    }

    #[test]
    fn test_blocked_recipient_removed() {
        let (a, b, c) = (UserId::new(), UserId::new(), UserId::new());
        let event = NotificationEvent::message(
            actor(a),
            ChatId::new(),
            vec![a, b, c],
            true,
            EventPayload::text("hey"),
        );
        let ctx = ResolutionContext {
            participants: vec![a, b, c],
            blocked: HashSet::from([b]),
            ..Default::default()
        };
        assert_eq!(resolve(&event, &ctx), BTreeSet::from([c]));
    }

    #[test]
    fn test_resolve_is_idempotent() {
        let (a, b) = (UserId::new(), UserId::new());
        let event = NotificationEvent::follow(actor(a), b);
        let ctx = ResolutionContext::default();
        assert_eq!(resolve(&event, &ctx), resolve(&event, &ctx));
        assert_eq!(resolve(&event, &ctx), BTreeSet::from([b]));
    }

    #[tokio::test]
    async fn test_owner_fetched_when_not_hinted() {
        let dir = InMemoryDirectory::new();
        let (a, owner, post) = (UserId::new(), UserId::new(), PostId::new());
        dir.add_post(post, owner);
        let event = NotificationEvent::like(actor(a), post, None);
        assert_eq!(
            resolve_recipients(&event, &dir).await,
            BTreeSet::from([owner])
        );
    }

    #[tokio::test]
    async fn test_missing_post_is_empty() {
        let dir = InMemoryDirectory::new();
        let event = NotificationEvent::like(actor(UserId::new()), PostId::new(), None);
        assert!(resolve_recipients(&event, &dir).await.is_empty());
    }

    #[tokio::test]
    async fn test_participants_fetched_and_block_applied() {
        let dir = InMemoryDirectory::new();
        let (a, b, c, chat) = (UserId::new(), UserId::new(), UserId::new(), ChatId::new());
        dir.add_chat(chat, vec![a, b, c]);
        dir.block(c, a);
        let event =
            NotificationEvent::message(actor(a), chat, vec![], true, EventPayload::text("yo"));
        assert_eq!(resolve_recipients(&event, &dir).await, BTreeSet::from([b]));
    }

    #[tokio::test]
    async fn test_lookup_error_is_empty() {
        let dir = InMemoryDirectory::new();
        dir.fail_lookups(true);
        let event = NotificationEvent::follow(actor(UserId::new()), UserId::new());
        assert!(resolve_recipients(&event, &dir).await.is_empty());
    }
}
