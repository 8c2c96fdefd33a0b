//! User accounts.
//!
//! A [`User`] owns its credit balance, but the balance is only ever changed
//! by the store while appending a ledger entry.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{LedgerError, Result};
use crate::UserId;

/// Credits granted to every new account.
pub const WELCOME_BONUS_CREDITS: i64 = 5;

/// Description recorded on the welcome bonus ledger entry.
pub const WELCOME_BONUS_DESCRIPTION: &str = "Welcome bonus - 5 free credits";

/// Minimum accepted password length.
pub const MIN_PASSWORD_LEN: usize = 6;

/// Minimum accepted display name length.
pub const MIN_NAME_LEN: usize = 2;

/// A registered user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Immutable user identifier.
    pub id: UserId,

    /// Unique, normalized email.
    pub email: String,

    /// Display name.
    pub name: String,

    /// Password hash in `v1$<salt>$<mac>` form. Never serialized to clients.
    pub password_hash: String,

    /// Current credit balance. Never negative.
    pub balance: i64,

    /// When the user registered.
    pub created_at: DateTime<Utc>,

    /// When the user record last changed.
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Create a new user with a zero balance.
    #[must_use]
    pub fn new(email: &str, name: &str, password_hash: String) -> Self {
        let now = Utc::now();
        Self {
            id: UserId::generate(),
            email: normalize_email(email),
            name: name.trim().to_string(),
            password_hash,
            balance: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Check if the balance covers `amount`.
    #[must_use]
    pub const fn has_sufficient_credits(&self, amount: i64) -> bool {
        self.balance >= amount
    }
}

/// Normalize an email for uniqueness checks.
#[must_use]
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Registration input after validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    /// Normalized email.
    pub email: String,
    /// Raw password, only held until hashed.
    pub password: String,
    /// Trimmed display name.
    pub name: String,
}

impl Registration {
    /// Validate raw registration input.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::InvalidRegistration`] when the email is not of
    /// the form `local@domain.tld`, the password is shorter than
    /// [`MIN_PASSWORD_LEN`], or the name is shorter than [`MIN_NAME_LEN`].
    pub fn parse(email: &str, password: &str, name: &str) -> Result<Self> {
        let email = normalize_email(email);
        if !looks_like_email(&email) {
            return Err(LedgerError::InvalidRegistration(format!(
                "invalid email: {email}"
            )));
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(LedgerError::InvalidRegistration(format!(
                "password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }
        let name = name.trim();
        if name.chars().count() < MIN_NAME_LEN {
            return Err(LedgerError::InvalidRegistration(format!(
                "name must be at least {MIN_NAME_LEN} characters"
            )));
        }

        Ok(Self {
            email,
            password: password.to_string(),
            name: name.to_string(),
        })
    }
}

fn looks_like_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !email.chars().any(char::is_whitespace)
        && domain
            .split_once('.')
            .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty())
        && !domain.ends_with('.')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_user_has_zero_balance() {
        let user = User::new("Ada@Example.com ", " Ada ", "hash".into());
        assert_eq!(user.balance, 0);
        assert_eq!(user.email, "ada@example.com");
        assert_eq!(user.name, "Ada");
    }

    #[test]
    fn sufficient_credits_is_inclusive() {
        let mut user = User::new("a@b.io", "Ab", "hash".into());
        user.balance = 2;
        assert!(user.has_sufficient_credits(2));
        assert!(!user.has_sufficient_credits(3));
    }

    #[test]
    fn registration_validates_fields() {
        assert!(Registration::parse("a@b.io", "secret", "Al").is_ok());
        assert!(matches!(
            Registration::parse("not-an-email", "secret", "Al"),
            Err(LedgerError::InvalidRegistration(_))
        ));
        assert!(matches!(
            Registration::parse("a@b.io", "short", "Al"),
            Err(LedgerError::InvalidRegistration(_))
        ));
        assert!(matches!(
            Registration::parse("a@b.io", "secret", " A "),
            Err(LedgerError::InvalidRegistration(_))
        ));
    }

    #[test]
    fn email_shape_checks() {
        assert!(looks_like_email("x@y.z"));
        assert!(!looks_like_email("x@y"));
        assert!(!looks_like_email("@y.z"));
        assert!(!looks_like_email("x y@y.z"));
        assert!(!looks_like_email("x@y.z."));
    }
}
