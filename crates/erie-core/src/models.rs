//! # Domain Models
//!
//! These structs represent the records ERIE persists. Every collection is a
//! JSON array of one of these shapes, serialized in camelCase so the stored
//! documents stay readable by the web client.
//!
//! Fields that later client versions introduced carry `#[serde(default)]`:
//! a record written before the field existed loads with the default instead
//! of failing the whole collection.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

/// Anything stored in a [`crate::collection::Collection`].
pub trait Record: Serialize + serde::de::DeserializeOwned + Clone + Send + Sync + 'static {
    fn id(&self) -> &str;
}

/// Generates a fresh record id.
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum UserRole {
    #[default]
    User,
    Admin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountStatus {
    #[default]
    Active,
    Suspended,
    Blocked,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoginType {
    #[default]
    Email,
    Google,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSettings {
    pub notifications: bool,
    pub private_profile: bool,
    pub two_factor: bool,
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            notifications: true,
            private_profile: false,
            two_factor: false,
        }
    }
}

/// Identity plus wallet state of one account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    /// Unique handle, lowercase `[a-z0-9_]`
    #[serde(default)]
    pub username: String,
    pub name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(default)]
    pub role: UserRole,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    /// Settled funds
    #[serde(default, with = "rust_decimal::serde::float")]
    pub balance: Decimal,
    /// Funds awaiting clearance (requested withdrawals)
    #[serde(default, with = "rust_decimal::serde::float")]
    pub pending_balance: Decimal,
    #[serde(default)]
    pub check_in_streak: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_check_in: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub status: AccountStatus,
    #[serde(default)]
    pub login_type: LoginType,
    #[serde(default)]
    pub total_ads_watched: u64,
    /// Risk indicator; nothing computes it yet.
    #[serde(default)]
    pub fraud_score: f64,
    #[serde(default)]
    pub settings: UserSettings,
}

pub const ADMIN_USER_ID: &str = "admin_master";

impl User {
    /// A fresh account with an empty wallet.
    pub fn new_member(
        username: String,
        name: String,
        email: String,
        login_type: LoginType,
        now: DateTime<Utc>,
    ) -> Self {
        let avatar = format!("https://api.dicebear.com/7.x/avataaars/svg?seed={username}");
        Self {
            id: new_id(),
            username,
            name,
            email,
            phone: None,
            bio: None,
            role: UserRole::User,
            avatar: Some(avatar),
            balance: Decimal::ZERO,
            pending_balance: Decimal::ZERO,
            check_in_streak: 0,
            last_check_in: None,
            created_at: now,
            status: AccountStatus::Active,
            login_type,
            total_ads_watched: 0,
            fraud_score: 0.0,
            settings: UserSettings::default(),
        }
    }

    /// The console operator. Lives only in the session key, never in the
    /// users collection.
    pub fn admin(email: &str, now: DateTime<Utc>) -> Self {
        Self {
            id: ADMIN_USER_ID.to_string(),
            username: "admin".to_string(),
            name: "ERIE Admin".to_string(),
            email: email.to_string(),
            role: UserRole::Admin,
            avatar: None,
            ..Self::new_member(String::new(), String::new(), String::new(), LoginType::Email, now)
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

impl Record for User {
    fn id(&self) -> &str {
        &self.id
    }
}

/// Partial profile change. `None` leaves the field untouched.
#[derive(Debug, Clone, Default)]
pub struct UserProfileEdit {
    pub name: Option<String>,
    pub bio: Option<String>,
    pub username: Option<String>,
    pub phone: Option<String>,
    pub avatar: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct SettingsEdit {
    pub notifications: Option<bool>,
    pub private_profile: Option<bool>,
    pub two_factor: Option<bool>,
}

impl SettingsEdit {
    pub fn apply(&self, settings: &mut UserSettings) {
        if let Some(v) = self.notifications {
            settings.notifications = v;
        }
        if let Some(v) = self.private_profile {
            settings.private_profile = v;
        }
        if let Some(v) = self.two_factor {
            settings.two_factor = v;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Image,
    Video,
    Text,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostKind {
    #[default]
    Feed,
    Reel,
}

/// A feed entry or reel. Author fields are copied in at publish time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: String,
    pub user_id: String,
    pub user_name: String,
    #[serde(default)]
    pub user_username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_avatar: Option<String>,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_type: Option<MediaType>,
    /// Ids of users who liked the post, no duplicates
    #[serde(default)]
    pub likes: Vec<String>,
    #[serde(default)]
    pub comments: Vec<PostComment>,
    pub timestamp: DateTime<Utc>,
    #[serde(default, rename = "type")]
    pub kind: PostKind,
}

impl Record for Post {
    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostComment {
    pub id: String,
    pub user_id: String,
    pub user_name: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    #[default]
    Text,
    Image,
    Audio,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub sender_id: String,
    pub receiver_id: String,
    pub content: String,
    #[serde(default, rename = "type")]
    pub kind: MessageKind,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub read: bool,
}

impl Message {
    /// The other side of the conversation, seen from `user_id`.
    pub fn counterpart(&self, user_id: &str) -> Option<&str> {
        if self.sender_id == user_id {
            Some(&self.receiver_id)
        } else if self.receiver_id == user_id {
            Some(&self.sender_id)
        } else {
            None
        }
    }

    pub fn is_between(&self, a: &str, b: &str) -> bool {
        (self.sender_id == a && self.receiver_id == b) || (self.sender_id == b && self.receiver_id == a)
    }
}

impl Record for Message {
    fn id(&self) -> &str {
        &self.id
    }
}

/// Derived per-counterpart summary of a user's messages. Never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatThread {
    pub participant_id: String,
    pub participant_name: String,
    pub participant_username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub participant_avatar: Option<String>,
    pub last_message: String,
    pub timestamp: DateTime<Utc>,
    pub unread_count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Reward,
    Withdrawal,
    Checkin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Pending,
    Completed,
    Rejected,
}

/// Payout rails offered on the withdrawal form. Labels only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PayoutMethod {
    Pix,
    PayPal,
    PagBank,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: String,
    pub user_id: String,
    pub user_name: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    pub status: TransactionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<PayoutMethod>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pix_key: Option<String>,
    pub date: DateTime<Utc>,
}

impl Transaction {
    pub fn credit(user: &User, amount: Decimal, kind: TransactionKind, now: DateTime<Utc>) -> Self {
        Self {
            id: new_id(),
            user_id: user.id.clone(),
            user_name: user.name.clone(),
            amount,
            kind,
            status: TransactionStatus::Completed,
            method: None,
            pix_key: None,
            date: now,
        }
    }
}

impl Record for Transaction {
    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    pub title: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub read: bool,
}

impl Record for Notification {
    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TicketStatus {
    #[default]
    Open,
    Closed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupportTicket {
    /// Older clients wrote numeric ids.
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub subject: String,
    pub message: String,
    #[serde(default)]
    pub status: TicketStatus,
    pub timestamp: DateTime<Utc>,
}

impl Record for SupportTicket {
    fn id(&self) -> &str {
        &self.id
    }
}

fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Int(i64),
        Float(f64),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Text(s) => s,
        Raw::Int(n) => n.to_string(),
        Raw::Float(n) => n.to_string(),
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UiShape {
    #[default]
    Rounded,
    Square,
    Pill,
}

/// Process-wide economy and look-and-feel knobs, edited from the admin
/// console.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SystemConfig {
    /// Percentage of ad revenue passed on to the viewer
    pub revenue_share_user: u8,
    /// Gross revenue of one ad view
    #[serde(with = "rust_decimal::serde::float")]
    pub ad_value: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub min_withdrawal: Decimal,
    pub ui_shape: UiShape,
    pub primary_color: String,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            revenue_share_user: 70,
            ad_value: Decimal::new(15, 2),
            min_withdrawal: Decimal::new(2000, 2),
            ui_shape: UiShape::Rounded,
            primary_color: "#2563eb".to_string(),
        }
    }
}

impl SystemConfig {
    /// What the viewer earns for one ad, rounded to cents.
    pub fn ad_reward(&self) -> Decimal {
        (self.ad_value * Decimal::from(self.revenue_share_user) / Decimal::ONE_HUNDRED)
            .round_dp_with_strategy(2, rust_decimal::RoundingStrategy::MidpointAwayFromZero)
    }
}

/// Partial config change from the admin console.
#[derive(Debug, Clone, Default)]
pub struct SystemConfigEdit {
    pub revenue_share_user: Option<u8>,
    pub ad_value: Option<Decimal>,
    pub min_withdrawal: Option<Decimal>,
    pub ui_shape: Option<UiShape>,
    pub primary_color: Option<String>,
}

/// Console dashboard counters, computed from the collections.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemStats {
    pub total_users: usize,
    pub active_today: usize,
    pub total_ads: u64,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_revenue: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_paid: Decimal,
    pub fraud_alerts: usize,
}
