//! # Chat
//!
//! Direct messages between two users. Threads are derived on every call
//! from the flat message collection.

use std::collections::HashMap;

use erie_core::validation;
use erie_core::{new_id, AppError, ChatThread, Message, MessageKind, Result, ValidationError};
use tracing::debug;

use crate::context::AppContext;

pub async fn send(
    ctx: &AppContext,
    sender_id: &str,
    receiver_id: &str,
    content: &str,
    kind: MessageKind,
) -> Result<Message> {
    let content = validation::validate_content("message", content)?;
    if receiver_id.trim().is_empty() {
        return Err(ValidationError::EmptyContent("receiver").into());
    }
    if ctx.store.users().find_by_id(sender_id).await?.is_none() {
        return Err(AppError::not_found("User", sender_id));
    }

    let message = Message {
        id: new_id(),
        sender_id: sender_id.to_string(),
        receiver_id: receiver_id.to_string(),
        content,
        kind,
        timestamp: ctx.clock.now(),
        read: false,
    };
    ctx.store.messages().upsert(message.clone()).await?;
    debug!(message_id = %message.id, sender_id, receiver_id, "message sent");
    Ok(message)
}

/// Messages exchanged between `a` and `b`, oldest first.
pub async fn conversation(ctx: &AppContext, a: &str, b: &str) -> Result<Vec<Message>> {
    let mut messages = ctx.store.messages().find_by(|m| m.is_between(a, b)).await?;
    messages.sort_by(|x, y| x.timestamp.cmp(&y.timestamp));
    Ok(messages)
}

/// One entry per counterpart with the latest message and the number of
/// unread messages sent to `user_id`. Most recent thread first.
pub async fn threads(ctx: &AppContext, user_id: &str) -> Result<Vec<ChatThread>> {
    let messages = ctx.store.messages().load_all().await?;
    let mut latest: HashMap<String, (Message, usize)> = HashMap::new();
    for message in messages {
        let Some(other) = message.counterpart(user_id).map(str::to_string) else {
            continue;
        };
        let unread = usize::from(message.receiver_id == user_id && !message.read);
        match latest.get_mut(&other) {
            Some((last, count)) => {
                *count += unread;
                if message.timestamp >= last.timestamp {
                    *last = message;
                }
            }
            None => {
                latest.insert(other, (message, unread));
            }
        }
    }

    let users = ctx.store.users().load_all().await?;
    let mut threads: Vec<ChatThread> = latest
        .into_iter()
        .map(|(participant_id, (last, unread_count))| {
            let participant = users.iter().find(|u| u.id == participant_id);
            ChatThread {
                participant_name: participant
                    .map(|u| u.name.clone())
                    .unwrap_or_else(|| participant_id.clone()),
                participant_username: participant
                    .map(|u| u.username.clone())
                    .unwrap_or_else(|| participant_id.clone()),
                participant_avatar: participant.and_then(|u| u.avatar.clone()),
                participant_id,
                last_message: last.content,
                timestamp: last.timestamp,
                unread_count,
            }
        })
        .collect();
    threads.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    Ok(threads)
}

/// Marks everything `counterpart_id` sent to `user_id` as read.
pub async fn mark_read(ctx: &AppContext, user_id: &str, counterpart_id: &str) -> Result<usize> {
    ctx.store
        .messages()
        .update_where(
            |m| m.sender_id == counterpart_id && m.receiver_id == user_id && !m.read,
            |m| m.read = true,
        )
        .await
}

/// Deletes the conversation for both sides.
pub async fn clear_conversation(ctx: &AppContext, a: &str, b: &str) -> Result<usize> {
    let removed = ctx.store.messages().remove_where(|m| m.is_between(a, b)).await?;
    debug!(a, b, removed, "conversation cleared");
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{context, member};
    use chrono::Duration;
    use erie_core::ManualClock;
    use std::sync::Arc;

    #[tokio::test]
    async fn threads_group_by_counterpart_and_count_unread() {
        let clock = Arc::new(ManualClock::new(crate::test_support::start()));
        let ctx = context().with_clock(clock.clone());
        let ana = member(&ctx, "ana_lima").await;
        let bia = member(&ctx, "bia_souza").await;
        let caio = member(&ctx, "caio_reis").await;

        send(&ctx, &bia.id, &ana.id, "oi", MessageKind::Text).await.unwrap();
        clock.advance(Duration::seconds(1));
        send(&ctx, &bia.id, &ana.id, "tudo bem?", MessageKind::Text).await.unwrap();
        clock.advance(Duration::seconds(1));
        send(&ctx, &ana.id, &caio.id, "hey", MessageKind::Text).await.unwrap();

        let threads = threads(&ctx, &ana.id).await.unwrap();
        assert_eq!(threads.len(), 2);
        assert_eq!(threads[0].participant_id, caio.id);
        assert_eq!(threads[0].unread_count, 0);
        assert_eq!(threads[1].participant_username, "bia_souza");
        assert_eq!(threads[1].last_message, "tudo bem?");
        assert_eq!(threads[1].unread_count, 2);

        assert_eq!(mark_read(&ctx, &ana.id, &bia.id).await.unwrap(), 2);
        assert_eq!(mark_read(&ctx, &ana.id, &bia.id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn clearing_removes_only_that_pair() {
        let ctx = context();
        let ana = member(&ctx, "ana_lima").await;
        let bia = member(&ctx, "bia_souza").await;
        send(&ctx, &ana.id, &bia.id, "one", MessageKind::Text).await.unwrap();
        send(&ctx, &bia.id, &ana.id, "two", MessageKind::Text).await.unwrap();
        send(&ctx, &ana.id, "someone", "three", MessageKind::Text).await.unwrap();

        assert_eq!(clear_conversation(&ctx, &bia.id, &ana.id).await.unwrap(), 2);
        assert!(conversation(&ctx, &ana.id, &bia.id).await.unwrap().is_empty());
        assert_eq!(ctx.store.messages().load_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn blank_message_is_rejected() {
        let ctx = context();
        let ana = member(&ctx, "ana_lima").await;
        let err = send(&ctx, &ana.id, "x", "   ", MessageKind::Text).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(ValidationError::EmptyContent("message"))));
    }
}
