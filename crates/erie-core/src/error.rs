//! # AppError
//!
//! Centralized error handling for the ERIE record store and services.
//! Maps domain-specific failures to actionable error types.

use rust_decimal::Decimal;
use thiserror::Error;

/// The primary error type for all erie-core operations.
#[derive(Error, Debug)]
pub enum AppError {
    /// Record not found (e.g., User, Post)
    #[error("{0} not found with ID {1}")]
    NotFound(String, String),

    /// User-input failure, recoverable by re-submission
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Credential or account-state failure (wrong admin passphrase, blocked account)
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Resource already exists
    #[error("conflict: {0}")]
    Conflict(String),

    /// Blob store failure (quota exceeded, disk I/O)
    #[error("storage error: {0}")]
    Storage(#[from] StoreError),

    /// A record could not be encoded for persistence
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("internal service error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn not_found(kind: &str, id: impl Into<String>) -> Self {
        AppError::NotFound(kind.to_string(), id.into())
    }
}

/// Failures raised by a [`crate::traits::BlobStore`] backend.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Writing the value would push the store past its byte quota.
    #[error("quota exceeded writing {key}: {requested} bytes requested, limit is {limit}")]
    QuotaExceeded {
        key: String,
        requested: usize,
        limit: usize,
    },

    #[error("invalid storage key: {0:?}")]
    InvalidKey(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Input rejected by a form-level check. Nothing is written when one of
/// these is returned.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("invalid e-mail address")]
    InvalidEmail,

    #[error("password must be at least {min} characters")]
    PasswordTooShort { min: usize },

    #[error("username must be at least {min} characters of [a-z0-9_]")]
    UsernameTooShort { min: usize },

    #[error("username @{0} is already taken")]
    UsernameTaken(String),

    #[error("an account with e-mail {0} already exists")]
    EmailTaken(String),

    #[error("name must not be empty")]
    EmptyName,

    #[error("{0} must not be empty")]
    EmptyContent(&'static str),

    #[error("amount must be greater than zero")]
    NonPositiveAmount,

    #[error("the minimum withdrawal is {minimum}")]
    BelowMinimumWithdrawal { minimum: Decimal },

    #[error("insufficient funds: requested {requested}, available {available}")]
    InsufficientFunds {
        requested: Decimal,
        available: Decimal,
    },

    #[error("a pix key is required")]
    MissingPixKey,

    #[error("already checked in today")]
    AlreadyCheckedIn,

    #[error("{field} must be between {min} and {max}")]
    OutOfRange {
        field: &'static str,
        min: Decimal,
        max: Decimal,
    },

    #[error("invalid color {0:?}, expected #rrggbb")]
    InvalidColor(String),
}

/// A specialized Result type for ERIE logic.
pub type Result<T> = std::result::Result<T, AppError>;
