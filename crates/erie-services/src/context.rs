//! # App Context
//!
//! Everything a service call needs, passed explicitly.

use std::sync::Arc;
use std::time::Duration;

use erie_core::traits::{Clock, CredentialVerifier};
use erie_core::{RecordStore, SessionHolder, SessionState, SystemClock, User};
use erie_core::{AppError, Result};
use rust_decimal::Decimal;

use crate::scheduler::Scheduler;

/// Knobs that come from deployment configuration rather than the stored
/// `SystemConfig`.
#[derive(Debug, Clone)]
pub struct RewardSettings {
    pub check_in_bonus: Decimal,
    /// How long an ad "plays" before its reward is credited
    pub ad_reward_delay: Duration,
}

impl Default for RewardSettings {
    fn default() -> Self {
        Self {
            check_in_bonus: Decimal::new(50, 2),
            ad_reward_delay: Duration::from_secs(15),
        }
    }
}

/// Shared across every service call.
pub struct AppContext {
    pub store: Arc<RecordStore>,
    pub auth: Arc<dyn CredentialVerifier>,
    pub clock: Arc<dyn Clock>,
    pub scheduler: Scheduler,
    pub rewards: RewardSettings,
}

impl AppContext {
    pub fn new(store: Arc<RecordStore>, auth: Arc<dyn CredentialVerifier>) -> Self {
        Self {
            store,
            auth,
            clock: Arc::new(SystemClock),
            scheduler: Scheduler::new(),
            rewards: RewardSettings::default(),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_rewards(mut self, rewards: RewardSettings) -> Self {
        self.rewards = rewards;
        self
    }

    pub fn session(&self) -> SessionHolder<'_> {
        SessionHolder::new(&self.store)
    }

    /// The signed-in operator, or `Unauthorized`.
    pub async fn require_admin(&self) -> Result<User> {
        match self.session().state().await? {
            SessionState::Admin(admin) => Ok(admin),
            _ => Err(AppError::Unauthorized("admin session required".into())),
        }
    }
}
