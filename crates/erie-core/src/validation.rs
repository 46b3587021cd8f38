//! Form-level checks. Pure functions: they never touch storage.

use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;

use crate::error::ValidationError;
use crate::models::SystemConfigEdit;

pub const MIN_USERNAME_LEN: usize = 4;
pub const MIN_PASSWORD_LEN: usize = 6;

static EMAIL: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap());
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());
static HEX_COLOR: Lazy<Regex> = Lazy::new(|| Regex::new(r"^#[0-9a-fA-F]{6}$").unwrap());

/// Permissive `text@text.text` shape check. Returns the trimmed address.
pub fn validate_email(email: &str) -> Result<String, ValidationError> {
    let email = email.trim();
    if EMAIL.is_match(email) {
        Ok(email.to_string())
    } else {
        Err(ValidationError::InvalidEmail)
    }
}

/// Lowercases, turns whitespace runs into `_` and drops anything outside
/// `[a-z0-9_]`. A leading `@` is ignored.
pub fn normalize_username(raw: &str) -> Result<String, ValidationError> {
    let trimmed = raw.trim().trim_start_matches('@').to_lowercase();
    let underscored = WHITESPACE.replace_all(&trimmed, "_");
    let username: String = underscored
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '_')
        .collect();
    if username.len() < MIN_USERNAME_LEN {
        return Err(ValidationError::UsernameTooShort {
            min: MIN_USERNAME_LEN,
        });
    }
    Ok(username)
}

pub fn validate_password(password: &str) -> Result<(), ValidationError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ValidationError::PasswordTooShort {
            min: MIN_PASSWORD_LEN,
        });
    }
    Ok(())
}

/// Non-blank text; returns it trimmed.
pub fn validate_content(field: &'static str, text: &str) -> Result<String, ValidationError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(ValidationError::EmptyContent(field));
    }
    Ok(text.to_string())
}

/// Bounds for a withdrawal request against the configured minimum and the
/// settled balance.
pub fn validate_withdrawal(
    amount: Decimal,
    balance: Decimal,
    minimum: Decimal,
) -> Result<(), ValidationError> {
    if amount <= Decimal::ZERO {
        return Err(ValidationError::NonPositiveAmount);
    }
    if amount < minimum {
        return Err(ValidationError::BelowMinimumWithdrawal { minimum });
    }
    if amount > balance {
        return Err(ValidationError::InsufficientFunds {
            requested: amount,
            available: balance,
        });
    }
    Ok(())
}

pub fn validate_pix_key(key: &str) -> Result<String, ValidationError> {
    let key = key.trim();
    if key.is_empty() {
        return Err(ValidationError::MissingPixKey);
    }
    Ok(key.to_string())
}

/// Ranges offered by the console sliders.
pub fn validate_config_edit(edit: &SystemConfigEdit) -> Result<(), ValidationError> {
    if let Some(share) = edit.revenue_share_user {
        check_range("revenueShareUser", Decimal::from(share), Decimal::from(10), Decimal::from(90))?;
    }
    if let Some(value) = edit.ad_value {
        check_range("adValue", value, Decimal::new(1, 2), Decimal::ONE)?;
    }
    if let Some(min) = edit.min_withdrawal {
        if min <= Decimal::ZERO {
            return Err(ValidationError::NonPositiveAmount);
        }
    }
    if let Some(color) = &edit.primary_color {
        if !HEX_COLOR.is_match(color) {
            return Err(ValidationError::InvalidColor(color.clone()));
        }
    }
    Ok(())
}

fn check_range(
    field: &'static str,
    value: Decimal,
    min: Decimal,
    max: Decimal,
) -> Result<(), ValidationError> {
    if value < min || value > max {
        return Err(ValidationError::OutOfRange { field, min, max });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn email_shape() {
        assert_eq!(validate_email(" ana@erie.com ").unwrap(), "ana@erie.com");
        assert!(validate_email("ana@erie").is_err());
        assert!(validate_email("ana erie@x.com").is_err());
        assert!(validate_email("@erie.com").is_err());
    }

    #[test]
    fn username_normalization() {
        assert_eq!(normalize_username("Ana  Lima").unwrap(), "ana_lima");
        assert_eq!(normalize_username("@João.Silva!").unwrap(), "joosilva");
        assert_eq!(
            normalize_username("a b"),
            Err(ValidationError::UsernameTooShort { min: 4 })
        );
    }

    #[test]
    fn password_length() {
        assert!(validate_password("12345").is_err());
        assert!(validate_password("123456").is_ok());
    }

    #[test]
    fn withdrawal_bounds() {
        let min = dec!(20.00);
        assert!(validate_withdrawal(dec!(30.00), dec!(50.00), min).is_ok());
        assert!(validate_withdrawal(dec!(50.00), dec!(50.00), min).is_ok());
        assert_eq!(
            validate_withdrawal(dec!(10.00), dec!(50.00), min),
            Err(ValidationError::BelowMinimumWithdrawal { minimum: min })
        );
        assert_eq!(
            validate_withdrawal(dec!(60.00), dec!(50.00), min),
            Err(ValidationError::InsufficientFunds {
                requested: dec!(60.00),
                available: dec!(50.00)
            })
        );
        assert_eq!(
            validate_withdrawal(dec!(0), dec!(50.00), min),
            Err(ValidationError::NonPositiveAmount)
        );
    }

    #[test]
    fn config_edit_ranges() {
        let edit = SystemConfigEdit {
            revenue_share_user: Some(95),
            ..Default::default()
        };
        assert!(matches!(
            validate_config_edit(&edit),
            Err(ValidationError::OutOfRange { field: "revenueShareUser", .. })
        ));

        let edit = SystemConfigEdit {
            primary_color: Some("blue".into()),
            ..Default::default()
        };
        assert_eq!(
            validate_config_edit(&edit),
            Err(ValidationError::InvalidColor("blue".into()))
        );

        let edit = SystemConfigEdit {
            ad_value: Some(dec!(0.25)),
            primary_color: Some("#16a34a".into()),
            ..Default::default()
        };
        assert!(validate_config_edit(&edit).is_ok());
    }
}
