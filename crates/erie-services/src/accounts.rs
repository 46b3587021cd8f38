//! # Accounts
//!
//! Sign-up, sign-in and sign-out. Passwords are shape-checked only; there is
//! no stored credential to compare against. The console operator signs in
//! through the [`CredentialVerifier`](erie_core::traits::CredentialVerifier)
//! port instead.

use chrono::{DateTime, Duration, Utc};
use erie_core::validation;
use erie_core::{
    new_id, AccountStatus, AppError, LoginType, Notification, Result, User, ValidationError,
};
use serde::Serialize;
use tracing::{info, warn};

use crate::context::AppContext;

/// How long a recovery code stays valid.
pub const RECOVERY_CODE_TTL_MINUTES: i64 = 30;

/// Sign-up form.
#[derive(Debug, Clone)]
pub struct Registration {
    pub name: String,
    pub username: String,
    pub email: String,
    pub password: String,
    pub phone: Option<String>,
}

/// What the identity provider hands back after a social sign-in.
#[derive(Debug, Clone)]
pub struct GoogleProfile {
    pub name: String,
    pub email: String,
    pub avatar: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RecoveryChannel {
    Email,
    Phone,
}

/// Acknowledges a recovery request. Nothing is actually sent.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecoveryReceipt {
    pub channel: RecoveryChannel,
    pub destination: String,
    pub expires_at: DateTime<Utc>,
}

fn welcome_notification(user: &User, now: DateTime<Utc>) -> Notification {
    Notification {
        id: new_id(),
        title: "Welcome to ERIE".to_string(),
        message: format!(
            "Hi {}, your account is ready. Check in daily and watch ads to earn.",
            user.name
        ),
        timestamp: now,
        read: false,
    }
}

pub(crate) fn ensure_active(user: &User) -> Result<()> {
    match user.status {
        AccountStatus::Active => Ok(()),
        status => Err(AppError::Unauthorized(format!("account is {status:?}").to_lowercase())),
    }
}

/// Creates an account and signs it in.
pub async fn register(ctx: &AppContext, form: Registration) -> Result<User> {
    // 1. Form checks, before anything is read
    let name = form.name.trim();
    if name.is_empty() {
        return Err(ValidationError::EmptyName.into());
    }
    let email = validation::validate_email(&form.email)?;
    let username = validation::normalize_username(&form.username)?;
    validation::validate_password(&form.password)?;

    // 2. Persist the account and its welcome note together
    let now = ctx.clock.now();
    let mut user = User::new_member(username, name.to_string(), email, LoginType::Email, now);
    user.phone = form
        .phone
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty());
    let welcome = welcome_notification(&user, now);
    ctx.store.create_user(&user, Some(welcome)).await?;

    // 3. Open the session
    ctx.session().set_session(&user).await?;
    info!(user_id = %user.id, "user registered");
    Ok(user)
}

/// Signs in by e-mail. The password is only checked for length.
pub async fn login(ctx: &AppContext, email: &str, password: &str) -> Result<User> {
    let email = validation::validate_email(email)?;
    validation::validate_password(password)?;

    let Some(user) = ctx.store.find_user_by_email(&email).await? else {
        warn!(%email, "login for unknown e-mail");
        return Err(AppError::not_found("User", email));
    };
    if let Err(e) = ensure_active(&user) {
        warn!(user_id = %user.id, status = ?user.status, "login refused");
        return Err(e);
    }

    ctx.session().set_session(&user).await?;
    info!(user_id = %user.id, "user logged in");
    Ok(user)
}

/// Signs in with a provider profile, creating the account on first use.
pub async fn social_login(ctx: &AppContext, profile: GoogleProfile) -> Result<User> {
    let email = validation::validate_email(&profile.email)?;

    if let Some(user) = ctx.store.find_user_by_email(&email).await? {
        ensure_active(&user)?;
        ctx.session().set_session(&user).await?;
        info!(user_id = %user.id, "social login");
        return Ok(user);
    }

    let name = match profile.name.trim() {
        "" => email.split('@').next().unwrap_or_default().to_string(),
        n => n.to_string(),
    };
    let username = derive_username(ctx, &name, &email).await?;
    let now = ctx.clock.now();
    let mut user = User::new_member(username, name, email, LoginType::Google, now);
    if let Some(avatar) = profile.avatar.filter(|a| !a.trim().is_empty()) {
        user.avatar = Some(avatar);
    }
    let welcome = welcome_notification(&user, now);
    ctx.store.create_user(&user, Some(welcome)).await?;
    ctx.session().set_session(&user).await?;
    info!(user_id = %user.id, username = %user.username, "account created from social login");
    Ok(user)
}

/// Builds a free handle from the display name, falling back to the e-mail
/// local part, then appends `_2`, `_3`, ... until nobody owns it.
async fn derive_username(ctx: &AppContext, name: &str, email: &str) -> Result<String> {
    let local_part = email.split('@').next().unwrap_or_default();
    let base = validation::normalize_username(name)
        .or_else(|_| validation::normalize_username(local_part))
        .or_else(|_| validation::normalize_username(&format!("user_{local_part}")))
        .unwrap_or_else(|_| "erie_user".to_string());

    let taken: Vec<String> = ctx
        .store
        .users()
        .load_all()
        .await?
        .into_iter()
        .map(|u| u.username.to_lowercase())
        .collect();
    if !taken.contains(&base) {
        return Ok(base);
    }
    let mut suffix = 2;
    loop {
        let candidate = format!("{base}_{suffix}");
        if !taken.contains(&candidate) {
            return Ok(candidate);
        }
        suffix += 1;
    }
}

/// Opens the admin console. The session holds the operator pseudo-user.
pub async fn admin_login(ctx: &AppContext, email: &str, passphrase: &str) -> Result<User> {
    let email = email.trim();
    if !ctx.auth.verify_admin(email, passphrase).await {
        warn!(%email, "admin login rejected");
        return Err(AppError::Unauthorized("invalid admin credentials".into()));
    }
    let admin = User::admin(email, ctx.clock.now());
    ctx.session().set_session(&admin).await?;
    info!(%email, "admin console opened");
    Ok(admin)
}

/// The signed-in user, if any.
pub async fn current_user(ctx: &AppContext) -> Result<Option<User>> {
    ctx.session().get_session().await
}

/// Ends the session. Pending ad rewards are cancelled; the account record
/// is kept.
pub async fn logout(ctx: &AppContext) -> Result<()> {
    let cancelled = ctx.scheduler.cancel_all();
    ctx.session().clear_session().await?;
    info!(cancelled_tasks = cancelled, "logged out");
    Ok(())
}

pub async fn request_password_recovery(
    ctx: &AppContext,
    channel: RecoveryChannel,
    destination: &str,
) -> Result<RecoveryReceipt> {
    let destination = match channel {
        RecoveryChannel::Email => validation::validate_email(destination)?,
        RecoveryChannel::Phone => validation::validate_content("phone", destination)?,
    };
    let receipt = RecoveryReceipt {
        channel,
        destination,
        expires_at: ctx.clock.now() + Duration::minutes(RECOVERY_CODE_TTL_MINUTES),
    };
    info!(?channel, "password recovery requested");
    Ok(receipt)
}
