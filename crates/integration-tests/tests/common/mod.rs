//! Shared fixtures for the integration suites.
#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use erie_core::traits::BlobStore;
use erie_core::StoreError;
use erie_core::{LoginType, ManualClock, MemoryBlobStore, MockCredentialVerifier, RecordStore, User};
use erie_services::{AppContext, RewardSettings};
use rust_decimal::Decimal;

pub const ADMIN_EMAIL: &str = "admin@erie.com";
pub const ADMIN_PASSPHRASE: &str = "open sesame";

pub fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 10, 9, 30, 0).unwrap()
}

/// Admin verifier that accepts exactly one credential pair.
pub fn admin_verifier() -> MockCredentialVerifier {
    let mut auth = MockCredentialVerifier::new();
    auth.expect_verify_admin()
        .returning(|email, passphrase| email == ADMIN_EMAIL && passphrase == ADMIN_PASSPHRASE);
    auth
}

pub fn context_over(blobs: Arc<dyn BlobStore>, clock: Arc<ManualClock>) -> AppContext {
    AppContext::new(Arc::new(RecordStore::new(blobs)), Arc::new(admin_verifier()))
        .with_clock(clock)
        .with_rewards(RewardSettings {
            check_in_bonus: Decimal::new(50, 2),
            ad_reward_delay: Duration::from_secs(15),
        })
}

pub fn memory_context() -> (AppContext, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(start()));
    (context_over(Arc::new(MemoryBlobStore::new()), clock.clone()), clock)
}

/// Inserts an account directly, without opening a session.
pub async fn seed_user(ctx: &AppContext, username: &str, balance: Decimal) -> User {
    let mut user = User::new_member(
        username.to_string(),
        username.to_string(),
        format!("{username}@erie.com"),
        LoginType::Email,
        ctx.clock.now(),
    );
    user.balance = balance;
    ctx.store.create_user(&user, None).await.unwrap();
    user
}

/// Behaviour every `BlobStore` backend must share.
pub async fn blob_store_contract(store: &dyn BlobStore) {
    assert_eq!(store.read("erie_posts").await.unwrap(), None);

    store.write("erie_posts", "[]").await.unwrap();
    store.write("erie_config", "{}").await.unwrap();
    assert_eq!(store.read("erie_posts").await.unwrap().as_deref(), Some("[]"));

    store.write("erie_posts", "[1]").await.unwrap();
    assert_eq!(store.read("erie_posts").await.unwrap().as_deref(), Some("[1]"));
    assert_eq!(store.keys().await.unwrap(), ["erie_config", "erie_posts"]);

    store.remove("erie_posts").await.unwrap();
    store.remove("erie_posts").await.unwrap();
    assert_eq!(store.read("erie_posts").await.unwrap(), None);
    assert_eq!(store.keys().await.unwrap(), ["erie_config"]);
}

/// Quota accounting every backend must share: key + value bytes, the
/// replaced value not counted. Expects a store opened with a 40 byte quota.
pub async fn quota_contract(store: &dyn BlobStore) {
    // 10 + 2
    store.write("erie_posts", "[]").await.unwrap();
    // 11 + 17, exactly at the limit
    store.write("erie_config", r#"{"uiShape":"sq"}x"#).await.unwrap();
    // replacing with an equal-length value still fits
    store.write("erie_posts", "{}").await.unwrap();

    let err = store.write("erie_posts", "[1,2]").await.unwrap_err();
    assert!(matches!(err, StoreError::QuotaExceeded { requested: 43, limit: 40, .. }));
    assert_eq!(store.read("erie_posts").await.unwrap().as_deref(), Some("{}"));
}
