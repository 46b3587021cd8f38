//! Help-desk tickets and the notification inbox. Both collections are
//! global: they are not scoped to a user.

use erie_core::validation;
use erie_core::{new_id, Notification, Result, SupportTicket, TicketStatus};
use tracing::info;

use crate::context::AppContext;

pub async fn submit_ticket(ctx: &AppContext, subject: &str, message: &str) -> Result<SupportTicket> {
    let subject = validation::validate_content("subject", subject)?;
    let message = validation::validate_content("message", message)?;
    let ticket = SupportTicket {
        id: new_id(),
        subject,
        message,
        status: TicketStatus::Open,
        timestamp: ctx.clock.now(),
    };
    ctx.store.tickets().upsert(ticket.clone()).await?;
    info!(ticket_id = %ticket.id, "support ticket opened");
    Ok(ticket)
}

/// Newest first.
pub async fn tickets(ctx: &AppContext) -> Result<Vec<SupportTicket>> {
    let mut tickets = ctx.store.tickets().load_all().await?;
    tickets.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    Ok(tickets)
}

/// Newest first.
pub async fn notifications(ctx: &AppContext) -> Result<Vec<Notification>> {
    let mut notes = ctx.store.notifications().load_all().await?;
    notes.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    Ok(notes)
}

pub async fn unread_notifications(ctx: &AppContext) -> Result<usize> {
    Ok(ctx.store.notifications().find_by(|n| !n.read).await?.len())
}

pub async fn mark_all_notifications_read(ctx: &AppContext) -> Result<usize> {
    ctx.store
        .notifications()
        .update_where(|n| !n.read, |n| n.read = true)
        .await
}
