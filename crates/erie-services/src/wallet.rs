//! # Wallet
//!
//! Earning (daily check-in, ad views) and cashing out. Every credit lands in
//! the settled balance together with a completed transaction; a withdrawal
//! moves funds to the pending balance and stays `pending`.

use std::sync::Arc;

use erie_core::{
    AppError, PayoutMethod, Result, Transaction, TransactionKind, User, ValidationError,
};
use rust_decimal::Decimal;
use tracing::info;

use crate::accounts::ensure_active;
use crate::context::AppContext;
use crate::scheduler::ScheduledTask;

/// Daily bonus. One per UTC calendar day; the streak grows when the previous
/// check-in was the day before and restarts at 1 otherwise.
pub async fn check_in(ctx: &AppContext, user_id: &str) -> Result<(User, Transaction)> {
    let now = ctx.clock.now();
    let bonus = ctx.rewards.check_in_bonus;
    ctx.store
        .credit_user(user_id, TransactionKind::Checkin, now, |user, _config| {
            ensure_active(user)?;
            let today = now.date_naive();
            match user.last_check_in.map(|t| t.date_naive()) {
                Some(day) if day == today => return Err(ValidationError::AlreadyCheckedIn.into()),
                Some(day) if day.succ_opt() == Some(today) => user.check_in_streak += 1,
                _ => user.check_in_streak = 1,
            }
            user.last_check_in = Some(now);
            Ok(bonus)
        })
        .await
}

/// Starts an ad view. The reward is credited when the returned task
/// completes; cancelling it (or logging out) before then credits nothing.
/// The amount uses the config in force when the ad finishes.
pub async fn watch_ad(
    ctx: &AppContext,
    user_id: &str,
) -> Result<ScheduledTask<Result<(User, Transaction)>>> {
    let user = ctx
        .store
        .users()
        .find_by_id(user_id)
        .await?
        .ok_or_else(|| AppError::not_found("User", user_id))?;
    ensure_active(&user)?;

    let store = Arc::clone(&ctx.store);
    let clock = Arc::clone(&ctx.clock);
    let user_id = user.id;
    let task = ctx.scheduler.schedule(ctx.rewards.ad_reward_delay, move || async move {
        store
            .credit_user(&user_id, TransactionKind::Reward, clock.now(), |user, config| {
                ensure_active(user)?;
                user.total_ads_watched += 1;
                Ok(config.ad_reward())
            })
            .await
    });
    info!(task_id = task.id(), "ad view started");
    Ok(task)
}

pub async fn request_withdrawal(
    ctx: &AppContext,
    user_id: &str,
    amount: Decimal,
    method: PayoutMethod,
    pix_key: &str,
) -> Result<Transaction> {
    ctx.store
        .record_withdrawal(user_id, amount, method, pix_key, ctx.clock.now())
        .await
}

/// The user's transactions, newest first.
pub async fn history(ctx: &AppContext, user_id: &str) -> Result<Vec<Transaction>> {
    let mut txs = ctx
        .store
        .transactions()
        .find_by(|t| t.user_id == user_id)
        .await?;
    txs.sort_by(|a, b| b.date.cmp(&a.date));
    Ok(txs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::TaskOutcome;
    use crate::test_support::{context, member};
    use chrono::Duration;
    use erie_core::{ManualClock, TransactionStatus};
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn check_in_streak_grows_then_resets() {
        let clock = Arc::new(ManualClock::new(crate::test_support::start()));
        let ctx = context().with_clock(clock.clone());
        let user = member(&ctx, "streaker").await;

        let (after, tx) = check_in(&ctx, &user.id).await.unwrap();
        assert_eq!(after.check_in_streak, 1);
        assert_eq!(after.balance, dec!(0.50));
        assert_eq!(tx.kind, TransactionKind::Checkin);
        assert_eq!(tx.status, TransactionStatus::Completed);

        let err = check_in(&ctx, &user.id).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(ValidationError::AlreadyCheckedIn)));

        clock.advance(Duration::days(1));
        let (after, _) = check_in(&ctx, &user.id).await.unwrap();
        assert_eq!(after.check_in_streak, 2);

        clock.advance(Duration::days(2));
        let (after, _) = check_in(&ctx, &user.id).await.unwrap();
        assert_eq!(after.check_in_streak, 1);
        assert_eq!(after.balance, dec!(1.50));
    }

    #[tokio::test(start_paused = true)]
    async fn finished_ad_credits_the_user_share() {
        let ctx = context();
        let user = member(&ctx, "viewer").await;

        let task = watch_ad(&ctx, &user.id).await.unwrap();
        let TaskOutcome::Completed(credited) = task.outcome().await.unwrap() else {
            panic!("ad reward was cancelled");
        };
        let (after, tx) = credited.unwrap();
        assert_eq!(after.balance, dec!(0.11));
        assert_eq!(after.total_ads_watched, 1);
        assert_eq!(tx.kind, TransactionKind::Reward);
        assert_eq!(history(&ctx, &user.id).await.unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn abandoned_ad_credits_nothing() {
        let ctx = context();
        let user = member(&ctx, "quitter").await;

        let task = watch_ad(&ctx, &user.id).await.unwrap();
        task.cancel();
        assert!(task.outcome().await.unwrap().is_cancelled());

        let stored = ctx.store.users().find_by_id(&user.id).await.unwrap().unwrap();
        assert_eq!(stored.balance, Decimal::ZERO);
        assert_eq!(stored.total_ads_watched, 0);
        assert!(history(&ctx, &user.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn watch_ad_for_unknown_user_is_not_found() {
        let ctx = context();
        let err = watch_ad(&ctx, "ghost").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_, _)));
        assert_eq!(ctx.scheduler.pending_count(), 0);
    }
}
