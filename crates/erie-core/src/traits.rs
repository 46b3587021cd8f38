//! # Core Traits (Ports)
//!
//! Any plugin must implement these traits to be used by the binary.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::StoreError;

/// Durable, string-keyed string storage. Every collection lives under one key.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Returns `None` when the key has never been written.
    async fn read(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Replaces the value wholesale. Last writer wins.
    async fn write(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Removing an absent key is a no-op.
    async fn remove(&self, key: &str) -> Result<(), StoreError>;

    /// Lists every key currently stored.
    async fn keys(&self) -> Result<Vec<String>, StoreError>;
}

/// Console access check.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait CredentialVerifier: Send + Sync {
    /// Verifies operator credentials against a stored secret.
    async fn verify_admin(&self, email: &str, passphrase: &str) -> bool;
}

/// Wall-clock source, injected so day boundaries can be tested.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}
