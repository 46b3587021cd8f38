//! # erie-auth-simple
//!
//! Argon2-based implementation of `CredentialVerifier`.
//! The console passphrase is never stored in clear; configuration carries a
//! PHC-format Argon2 hash.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use async_trait::async_trait;
use erie_core::traits::CredentialVerifier;
use secrecy::{ExposeSecret, SecretString};
use tracing::warn;

pub struct Argon2AdminVerifier {
    /// Addresses allowed to open the console
    admin_emails: Vec<String>,
    /// PHC string, e.g. `$argon2id$v=19$...`
    passphrase_hash: SecretString,
}

impl Argon2AdminVerifier {
    pub fn new(admin_emails: Vec<String>, passphrase_hash: SecretString) -> Self {
        Self {
            admin_emails,
            passphrase_hash,
        }
    }
}

#[async_trait]
impl CredentialVerifier for Argon2AdminVerifier {
    /// Both the e-mail and the passphrase must match.
    async fn verify_admin(&self, email: &str, passphrase: &str) -> bool {
        let email = email.trim();
        if !self
            .admin_emails
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(email))
        {
            return false;
        }
        let parsed_hash = match PasswordHash::new(self.passphrase_hash.expose_secret()) {
            Ok(p) => p,
            Err(e) => {
                warn!(error = %e, "configured admin passphrase hash is not a valid PHC string");
                return false;
            }
        };
        Argon2::default()
            .verify_password(passphrase.as_bytes(), &parsed_hash)
            .is_ok()
    }
}

/// Verifier used when no admin hash is configured: the console stays shut.
pub struct DisabledAdminVerifier;

#[async_trait]
impl CredentialVerifier for DisabledAdminVerifier {
    async fn verify_admin(&self, _email: &str, _passphrase: &str) -> bool {
        false
    }
}

/// Produces a PHC string suitable for the `admin.passphrase_hash` setting.
pub fn hash_passphrase(passphrase: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default().hash_password(passphrase.as_bytes(), &salt)?;
    Ok(hash.to_string())
}
