//! # Record Store
//!
//! The repository every service receives. It owns one typed [`Collection`]
//! per entity, the [`SystemConfig`] singleton, and the mutations that must
//! touch more than one key at once.
//!
//! Multi-key mutations go through [`RecordStore::commit`]: all values are
//! encoded first, then written in order; if a write fails, keys already
//! written in the batch are put back to their previous value.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::collection::{upsert_into, Collection};
use crate::error::{AppError, Result, ValidationError};
use crate::models::{
    new_id, Message, Notification, PayoutMethod, Post, SettingsEdit, SupportTicket, SystemConfig,
    SystemConfigEdit, Transaction, TransactionKind, TransactionStatus, User, UserProfileEdit,
};
use crate::traits::BlobStore;
use crate::validation;

/// Well-known storage keys.
pub mod keys {
    pub const USERS: &str = "erie_users";
    pub const POSTS: &str = "erie_posts";
    pub const TRANSACTIONS: &str = "erie_transactions";
    pub const MESSAGES: &str = "erie_messages";
    pub const NOTIFICATIONS: &str = "erie_notifications";
    pub const TICKETS: &str = "erie_tickets";
    pub const CONFIG: &str = "erie_config";
    pub const SESSION: &str = "erie_user";

    /// Keys that hold a JSON array.
    pub const COLLECTIONS: [&str; 6] = [USERS, POSTS, TRANSACTIONS, MESSAGES, NOTIFICATIONS, TICKETS];
}

pub struct RecordStore {
    blobs: Arc<dyn BlobStore>,
    write_lock: Arc<Mutex<()>>,
    users: Collection<User>,
    posts: Collection<Post>,
    transactions: Collection<Transaction>,
    messages: Collection<Message>,
    notifications: Collection<Notification>,
    tickets: Collection<SupportTicket>,
}

impl RecordStore {
    pub fn new(blobs: Arc<dyn BlobStore>) -> Self {
        let write_lock = Arc::new(Mutex::new(()));
        let users = Collection::new(Arc::clone(&blobs), keys::USERS, Arc::clone(&write_lock));
        let posts = Collection::new(Arc::clone(&blobs), keys::POSTS, Arc::clone(&write_lock));
        let transactions =
            Collection::new(Arc::clone(&blobs), keys::TRANSACTIONS, Arc::clone(&write_lock));
        let messages = Collection::new(Arc::clone(&blobs), keys::MESSAGES, Arc::clone(&write_lock));
        let notifications =
            Collection::new(Arc::clone(&blobs), keys::NOTIFICATIONS, Arc::clone(&write_lock));
        let tickets = Collection::new(Arc::clone(&blobs), keys::TICKETS, Arc::clone(&write_lock));

        Self {
            blobs,
            write_lock,
            users,
            posts,
            transactions,
            messages,
            notifications,
            tickets,
        }
    }

    pub fn blobs(&self) -> &Arc<dyn BlobStore> {
        &self.blobs
    }

    pub fn users(&self) -> &Collection<User> {
        &self.users
    }

    pub fn posts(&self) -> &Collection<Post> {
        &self.posts
    }

    pub fn transactions(&self) -> &Collection<Transaction> {
        &self.transactions
    }

    pub fn messages(&self) -> &Collection<Message> {
        &self.messages
    }

    pub fn notifications(&self) -> &Collection<Notification> {
        &self.notifications
    }

    pub fn tickets(&self) -> &Collection<SupportTicket> {
        &self.tickets
    }

    /// Lazy schema creation: writes `[]` under every absent collection key
    /// and the default config when none is stored. Returns how many keys
    /// were created; a second call returns 0 and writes nothing.
    pub async fn ensure_defaults(&self) -> Result<usize> {
        let _guard = self.write_lock.lock().await;
        let mut created = 0;
        for key in keys::COLLECTIONS {
            if self.blobs.read(key).await?.is_none() {
                self.blobs.write(key, "[]").await?;
                created += 1;
            }
        }
        if self.blobs.read(keys::CONFIG).await?.is_none() {
            let raw = serde_json::to_string(&SystemConfig::default())?;
            self.blobs.write(keys::CONFIG, &raw).await?;
            created += 1;
        }
        if created > 0 {
            info!(created, "initialized default collections");
        }
        Ok(created)
    }

    // Config

    /// The stored config, or the defaults when absent or unreadable.
    pub async fn config(&self) -> Result<SystemConfig> {
        let Some(raw) = self.blobs.read(keys::CONFIG).await? else {
            return Ok(SystemConfig::default());
        };
        match serde_json::from_str(&raw) {
            Ok(config) => Ok(config),
            Err(e) => {
                warn!(error = %e, "stored config unreadable, using defaults");
                Ok(SystemConfig::default())
            }
        }
    }

    pub async fn save_config(&self, config: &SystemConfig) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let raw = serde_json::to_string(config)?;
        self.blobs.write(keys::CONFIG, &raw).await?;
        Ok(())
    }

    pub async fn update_config(&self, edit: &SystemConfigEdit) -> Result<SystemConfig> {
        validation::validate_config_edit(edit)?;
        let _guard = self.write_lock.lock().await;
        let mut config = self.config().await?;
        if let Some(v) = edit.revenue_share_user {
            config.revenue_share_user = v;
        }
        if let Some(v) = edit.ad_value {
            config.ad_value = v;
        }
        if let Some(v) = edit.min_withdrawal {
            config.min_withdrawal = v;
        }
        if let Some(v) = edit.ui_shape {
            config.ui_shape = v;
        }
        if let Some(v) = &edit.primary_color {
            config.primary_color = v.clone();
        }
        let raw = serde_json::to_string(&config)?;
        self.blobs.write(keys::CONFIG, &raw).await?;
        info!(?config, "system config updated");
        Ok(config)
    }

    // Users

    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        self.users
            .find_first(|u| u.email.eq_ignore_ascii_case(email))
            .await
    }

    pub async fn find_user_by_username(&self, username: &str) -> Result<Option<User>> {
        self.users
            .find_first(|u| u.username.eq_ignore_ascii_case(username))
            .await
    }

    /// Inserts a new account and its welcome notification together.
    /// E-mail and username must be free; otherwise nothing is written.
    pub async fn create_user(&self, user: &User, welcome: Option<Notification>) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut users = self.users.load_all().await?;
        if users.iter().any(|u| u.email.eq_ignore_ascii_case(&user.email)) {
            return Err(ValidationError::EmailTaken(user.email.clone()).into());
        }
        if users
            .iter()
            .any(|u| u.username.eq_ignore_ascii_case(&user.username))
        {
            return Err(ValidationError::UsernameTaken(user.username.clone()).into());
        }
        users.push(user.clone());

        let mut writes = vec![(keys::USERS, self.users.encode(&users)?)];
        if let Some(welcome) = welcome {
            let mut notifications = self.notifications.load_all().await?;
            notifications.push(welcome);
            writes.push((keys::NOTIFICATIONS, self.notifications.encode(&notifications)?));
        }
        self.commit(writes).await?;
        info!(user_id = %user.id, username = %user.username, "account created");
        Ok(())
    }

    /// Applies a typed profile edit. A new username is normalized and must
    /// not belong to another account.
    pub async fn update_user(&self, user_id: &str, edit: &UserProfileEdit) -> Result<User> {
        let name = edit
            .name
            .as_deref()
            .map(|n| {
                let n = n.trim();
                if n.is_empty() {
                    Err(ValidationError::EmptyName)
                } else {
                    Ok(n.to_string())
                }
            })
            .transpose()?;
        let username = edit
            .username
            .as_deref()
            .map(validation::normalize_username)
            .transpose()?;

        let _guard = self.write_lock.lock().await;
        let mut users = self.users.load_all().await?;
        if let Some(username) = &username {
            if users
                .iter()
                .any(|u| u.id != user_id && u.username.eq_ignore_ascii_case(username))
            {
                return Err(ValidationError::UsernameTaken(username.clone()).into());
            }
        }
        let user = users
            .iter_mut()
            .find(|u| u.id == user_id)
            .ok_or_else(|| AppError::not_found("User", user_id))?;

        if let Some(name) = name {
            user.name = name;
        }
        if let Some(username) = username {
            user.username = username;
        }
        if let Some(bio) = &edit.bio {
            user.bio = Some(bio.trim().to_string()).filter(|b| !b.is_empty());
        }
        if let Some(phone) = &edit.phone {
            user.phone = Some(phone.trim().to_string()).filter(|p| !p.is_empty());
        }
        if let Some(avatar) = &edit.avatar {
            user.avatar = Some(avatar.clone());
        }
        let updated = user.clone();
        self.commit(vec![(keys::USERS, self.users.encode(&users)?)])
            .await?;
        debug!(user_id, "profile updated");
        Ok(updated)
    }

    pub async fn update_settings(&self, user_id: &str, edit: &SettingsEdit) -> Result<User> {
        self.users
            .update(user_id, |u| edit.apply(&mut u.settings))
            .await?
            .ok_or_else(|| AppError::not_found("User", user_id))
    }

    // Wallet

    /// Credits a user and appends the matching completed transaction in one
    /// batch. `apply` receives the stored user and the current config, may
    /// adjust counters, and returns the amount to credit (or rejects).
    pub async fn credit_user<F>(
        &self,
        user_id: &str,
        kind: TransactionKind,
        now: DateTime<Utc>,
        apply: F,
    ) -> Result<(User, Transaction)>
    where
        F: FnOnce(&mut User, &SystemConfig) -> Result<Decimal>,
    {
        let _guard = self.write_lock.lock().await;
        let config = self.config().await?;
        let mut users = self.users.load_all().await?;
        let user = users
            .iter_mut()
            .find(|u| u.id == user_id)
            .ok_or_else(|| AppError::not_found("User", user_id))?;

        let amount = apply(user, &config)?;
        user.balance += amount;
        let user = user.clone();
        let tx = Transaction::credit(&user, amount, kind, now);

        let mut transactions = self.transactions.load_all().await?;
        transactions.push(tx.clone());
        self.commit(vec![
            (keys::USERS, self.users.encode(&users)?),
            (keys::TRANSACTIONS, self.transactions.encode(&transactions)?),
        ])
        .await?;
        info!(user_id, ?kind, %amount, balance = %user.balance, "balance credited");
        Ok((user, tx))
    }

    /// Debits the settled balance, moves the amount to the pending balance
    /// and appends a pending withdrawal, as one call. Rejected requests write
    /// nothing.
    pub async fn record_withdrawal(
        &self,
        user_id: &str,
        amount: Decimal,
        method: PayoutMethod,
        pix_key: &str,
        now: DateTime<Utc>,
    ) -> Result<Transaction> {
        let _guard = self.write_lock.lock().await;
        let config = self.config().await?;
        let mut users = self.users.load_all().await?;
        let user = users
            .iter_mut()
            .find(|u| u.id == user_id)
            .ok_or_else(|| AppError::not_found("User", user_id))?;

        validation::validate_withdrawal(amount, user.balance, config.min_withdrawal)?;
        let pix_key = validation::validate_pix_key(pix_key)?;

        user.balance -= amount;
        user.pending_balance += amount;
        let tx = Transaction {
            id: new_id(),
            user_id: user.id.clone(),
            user_name: user.name.clone(),
            amount,
            kind: TransactionKind::Withdrawal,
            status: TransactionStatus::Pending,
            method: Some(method),
            pix_key: Some(pix_key),
            date: now,
        };
        let balance = user.balance;

        let mut transactions = self.transactions.load_all().await?;
        upsert_into(&mut transactions, tx.clone());
        self.commit(vec![
            (keys::USERS, self.users.encode(&users)?),
            (keys::TRANSACTIONS, self.transactions.encode(&transactions)?),
        ])
        .await?;
        info!(user_id, %amount, ?method, %balance, "withdrawal requested");
        Ok(tx)
    }

    /// Writes every `(key, value)` in order. Previous values are captured
    /// before the first write; on a write failure the keys already written
    /// are restored and the original error returned. Callers hold the write
    /// lock.
    async fn commit(&self, writes: Vec<(&'static str, String)>) -> Result<()> {
        let mut snapshot = Vec::with_capacity(writes.len());
        for (key, _) in &writes {
            snapshot.push(self.blobs.read(key).await?);
        }

        let mut applied: Vec<(&'static str, Option<String>)> = Vec::with_capacity(writes.len());
        for ((key, value), previous) in writes.into_iter().zip(snapshot) {
            if let Err(e) = self.blobs.write(key, &value).await {
                self.roll_back(applied).await;
                return Err(e.into());
            }
            applied.push((key, previous));
        }
        Ok(())
    }

    async fn roll_back(&self, applied: Vec<(&'static str, Option<String>)>) {
        for (key, previous) in applied.into_iter().rev() {
            let restored = match previous {
                Some(value) => self.blobs.write(key, &value).await,
                None => self.blobs.remove(key).await,
            };
            if let Err(e) = restored {
                error!(key, error = %e, "rollback failed, collection may be inconsistent");
            }
        }
    }
}
