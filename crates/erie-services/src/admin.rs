//! # Admin Console
//!
//! Operator views over the collections and the economy settings. A
//! [`Console`] can only be obtained with an admin session or with operator
//! credentials checked by the `CredentialVerifier`; reading the config needs
//! neither.

use std::time::{Duration, Instant};

use erie_core::{
    AccountStatus, AppError, Result, SystemConfig, SystemConfigEdit, SystemStats, Transaction,
    TransactionKind, TransactionStatus, User,
};
use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use crate::context::AppContext;

/// Accounts scoring at or above this are counted as fraud alerts.
pub const FRAUD_ALERT_THRESHOLD: f64 = 70.0;

/// Operator capability over one context.
pub struct Console<'a> {
    ctx: &'a AppContext,
}

/// Opens the console for the signed-in operator.
pub async fn console(ctx: &AppContext) -> Result<Console<'_>> {
    ctx.require_admin().await?;
    Ok(Console { ctx })
}

/// Opens the console for out-of-band tooling. The session key is left
/// alone.
pub async fn console_with_credentials<'a>(
    ctx: &'a AppContext,
    email: &str,
    passphrase: &str,
) -> Result<Console<'a>> {
    if !ctx.auth.verify_admin(email.trim(), passphrase).await {
        warn!(email = email.trim(), "console credentials rejected");
        return Err(AppError::Unauthorized("invalid admin credentials".into()));
    }
    Ok(Console { ctx })
}

impl Console<'_> {
    /// Dashboard counters computed from the collections.
    pub async fn stats(&self) -> Result<SystemStats> {
        let store = &self.ctx.store;
        let config = store.config().await?;
        let users = store.users().load_all().await?;
        let transactions = store.transactions().load_all().await?;
        let today = self.ctx.clock.now().date_naive();

        let total_ads: u64 = users.iter().map(|u| u.total_ads_watched).sum();
        let total_paid: Decimal = transactions
            .iter()
            .filter(|t| t.kind == TransactionKind::Withdrawal && t.status == TransactionStatus::Completed)
            .map(|t| t.amount)
            .sum();

        Ok(SystemStats {
            total_users: users.len(),
            active_today: users
                .iter()
                .filter(|u| u.last_check_in.is_some_and(|t| t.date_naive() == today))
                .count(),
            total_ads,
            total_revenue: Decimal::from(total_ads) * config.ad_value,
            total_paid,
            fraud_alerts: users
                .iter()
                .filter(|u| u.fraud_score >= FRAUD_ALERT_THRESHOLD)
                .count(),
        })
    }

    /// Every account, newest first.
    pub async fn users(&self) -> Result<Vec<User>> {
        let mut users = self.ctx.store.users().load_all().await?;
        users.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(users)
    }

    pub async fn set_user_status(&self, user_id: &str, status: AccountStatus) -> Result<User> {
        let user = self
            .ctx
            .store
            .users()
            .update(user_id, |u| u.status = status)
            .await?
            .ok_or_else(|| AppError::not_found("User", user_id))?;
        info!(user_id, ?status, "account status changed");
        Ok(user)
    }

    /// Withdrawal requests awaiting payout, oldest first.
    pub async fn pending_withdrawals(&self) -> Result<Vec<Transaction>> {
        let mut pending = self
            .ctx
            .store
            .transactions()
            .find_by(|t| t.kind == TransactionKind::Withdrawal && t.status == TransactionStatus::Pending)
            .await?;
        pending.sort_by(|a, b| a.date.cmp(&b.date));
        Ok(pending)
    }

    pub async fn update_config(&self, edit: &SystemConfigEdit) -> Result<SystemConfig> {
        self.ctx.store.update_config(edit).await
    }
}

pub async fn stats(ctx: &AppContext) -> Result<SystemStats> {
    console(ctx).await?.stats().await
}

pub async fn users(ctx: &AppContext) -> Result<Vec<User>> {
    console(ctx).await?.users().await
}

pub async fn set_user_status(ctx: &AppContext, user_id: &str, status: AccountStatus) -> Result<User> {
    console(ctx).await?.set_user_status(user_id, status).await
}

pub async fn pending_withdrawals(ctx: &AppContext) -> Result<Vec<Transaction>> {
    console(ctx).await?.pending_withdrawals().await
}

/// Readable by anyone; the wallet shows the minimum withdrawal from here.
pub async fn config(ctx: &AppContext) -> Result<SystemConfig> {
    ctx.store.config().await
}

pub async fn update_config(ctx: &AppContext, edit: &SystemConfigEdit) -> Result<SystemConfig> {
    console(ctx).await?.update_config(edit).await
}

/// Hidden entry to the admin login: a run of quick taps on the logo.
#[derive(Debug, Clone)]
pub struct SecretTap {
    taps_required: u32,
    max_gap: Duration,
    count: u32,
    last_tap: Option<Instant>,
}

impl Default for SecretTap {
    fn default() -> Self {
        Self::new(5, Duration::from_millis(500))
    }
}

impl SecretTap {
    pub fn new(taps_required: u32, max_gap: Duration) -> Self {
        Self {
            taps_required,
            max_gap,
            count: 0,
            last_tap: None,
        }
    }

    /// Records a tap. Returns `true` on the tap that completes the run, after
    /// which counting starts over.
    pub fn tap(&mut self, at: Instant) -> bool {
        let quick = self
            .last_tap
            .is_some_and(|last| at.saturating_duration_since(last) < self.max_gap);
        self.last_tap = Some(at);

        if !quick {
            self.count = 1;
            return false;
        }
        self.count += 1;
        if self.count == self.taps_required {
            self.count = 0;
            debug!("secret tap sequence completed");
            return true;
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accounts;
    use crate::test_support::{context, member};
    use erie_core::ValidationError;
    use rust_decimal_macros::dec;

    async fn as_admin(ctx: &AppContext) {
        accounts::admin_login(ctx, "admin@erie.com", "open sesame")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn console_calls_need_an_admin_session() {
        let ctx = context();
        let user = member(&ctx, "ana_lima").await;
        ctx.session().set_session(&user).await.unwrap();

        assert!(matches!(stats(&ctx).await, Err(AppError::Unauthorized(_))));
        assert!(matches!(
            update_config(&ctx, &SystemConfigEdit::default()).await,
            Err(AppError::Unauthorized(_))
        ));
        assert_eq!(config(&ctx).await.unwrap(), SystemConfig::default());
    }

    #[tokio::test]
    async fn stats_sum_the_collections() {
        let ctx = context();
        let ana = member(&ctx, "ana_lima").await;
        ctx.store
            .users()
            .update(&ana.id, |u| {
                u.total_ads_watched = 10;
                u.last_check_in = Some(crate::test_support::start());
                u.fraud_score = 90.0;
            })
            .await
            .unwrap();
        member(&ctx, "bia_souza").await;
        as_admin(&ctx).await;

        let stats = stats(&ctx).await.unwrap();
        assert_eq!(stats.total_users, 2);
        assert_eq!(stats.active_today, 1);
        assert_eq!(stats.total_ads, 10);
        assert_eq!(stats.total_revenue, dec!(1.50));
        assert_eq!(stats.total_paid, Decimal::ZERO);
        assert_eq!(stats.fraud_alerts, 1);
    }

    #[tokio::test]
    async fn out_of_range_share_is_rejected() {
        let ctx = context();
        as_admin(&ctx).await;
        let edit = SystemConfigEdit {
            revenue_share_user: Some(95),
            ..Default::default()
        };
        let err = update_config(&ctx, &edit).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(ValidationError::OutOfRange { .. })));

        let edit = SystemConfigEdit {
            revenue_share_user: Some(80),
            ..Default::default()
        };
        assert_eq!(update_config(&ctx, &edit).await.unwrap().revenue_share_user, 80);
    }

    #[tokio::test]
    async fn suspending_an_account() {
        let ctx = context();
        let ana = member(&ctx, "ana_lima").await;
        as_admin(&ctx).await;
        let updated = set_user_status(&ctx, &ana.id, AccountStatus::Suspended).await.unwrap();
        assert_eq!(updated.status, AccountStatus::Suspended);
        assert!(matches!(
            set_user_status(&ctx, "ghost", AccountStatus::Blocked).await,
            Err(AppError::NotFound(_, _))
        ));
    }

    #[tokio::test]
    async fn credentials_open_the_console_without_a_session() {
        let ctx = context();
        member(&ctx, "ana_lima").await;
        assert!(console_with_credentials(&ctx, "admin@erie.com", "nope").await.is_err());

        let console = console_with_credentials(&ctx, "admin@erie.com", "open sesame")
            .await
            .unwrap();
        assert_eq!(console.users().await.unwrap().len(), 1);
        assert!(console.pending_withdrawals().await.unwrap().is_empty());
        assert!(ctx.session().get_session().await.unwrap().is_none());
    }

    #[test]
    fn five_quick_taps_unlock() {
        let mut tap = SecretTap::default();
        let t0 = Instant::now();
        let unlocked: Vec<bool> = (0..5)
            .map(|i| tap.tap(t0 + Duration::from_millis(i * 300)))
            .collect();
        assert_eq!(unlocked, [false, false, false, false, true]);
    }

    #[test]
    fn a_slow_tap_restarts_the_count() {
        let mut tap = SecretTap::default();
        let t0 = Instant::now();
        for i in 0..4 {
            assert!(!tap.tap(t0 + Duration::from_millis(i * 100)));
        }
        // 600 ms gap: this tap counts as the first of a new run
        let restart = t0 + Duration::from_millis(900);
        assert!(!tap.tap(restart));
        for i in 1..4 {
            assert!(!tap.tap(restart + Duration::from_millis(i * 100)));
        }
        assert!(tap.tap(restart + Duration::from_millis(400)));
    }
}
