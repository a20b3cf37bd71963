//! Authentication service.
//!
//! Password accounts with signed credential tokens, plus the email-driven
//! password-reset flow.

mod error;
pub mod reset;
mod token;
mod verifier;

pub use error::AuthError;
pub use reset::{RESET_TOKEN_TTL_MINUTES, ResetToken, hash_reset_token};
pub use token::{Claims, TokenKeys};
pub use verifier::{AccountLookup, CredentialVerifier, TOKEN_COOKIE, credential_from_headers};

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::Utc;
use sqlx::PgPool;

use teeshop_core::{AccountId, Email, ImageRef, Role};

use crate::db::RepositoryError;
use crate::db::accounts::{AccountRepository, NewAccount};
use crate::models::Account;

/// Minimum password length.
pub const MIN_PASSWORD_LENGTH: usize = 6;

/// Authentication service.
///
/// Handles registration, login, password changes and password resets.
pub struct AuthService<'a> {
    accounts: AccountRepository<'a>,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            accounts: AccountRepository::new(pool),
        }
    }

    /// Register a new account with the default `user` role.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail` if the email format is invalid.
    /// Returns `AuthError::WeakPassword` if the password doesn't meet requirements.
    /// Returns `AuthError::AccountAlreadyExists` if the email is already registered.
    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
        photo: &ImageRef,
    ) -> Result<Account, AuthError> {
        self.register_with_role(name, email, password, &Role::user(), photo)
            .await
    }

    /// Register a new account with an explicit role.
    ///
    /// # Errors
    ///
    /// Same as [`Self::register`].
    pub async fn register_with_role(
        &self,
        name: &str,
        email: &str,
        password: &str,
        role: &Role,
        photo: &ImageRef,
    ) -> Result<Account, AuthError> {
        let email = Email::parse(email)?;
        validate_password(password)?;
        let password_hash = hash_password(password)?;

        self.accounts
            .create(NewAccount {
                name,
                email: &email,
                password_hash: &password_hash,
                role,
                photo,
            })
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::AccountAlreadyExists,
                other => AuthError::Repository(other),
            })
    }

    /// Login with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the email/password is wrong.
    pub async fn login(&self, email: &str, password: &str) -> Result<Account, AuthError> {
        let email = Email::parse(email).map_err(|_| AuthError::InvalidCredentials)?;

        let (account, password_hash) = self
            .accounts
            .get_password_hash(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        verify_password(password, &password_hash)?;

        Ok(account)
    }

    /// Change the password after checking the current one.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if `old_password` is wrong.
    /// Returns `AuthError::WeakPassword` if the new password is too short.
    pub async fn change_password(
        &self,
        id: AccountId,
        old_password: &str,
        new_password: &str,
    ) -> Result<(), AuthError> {
        let current = self
            .accounts
            .get_password_hash_by_id(id)
            .await?
            .ok_or(AuthError::AccountNotFound)?;
        verify_password(old_password, &current)?;
        validate_password(new_password)?;

        let password_hash = hash_password(new_password)?;
        self.accounts.update_password(id, &password_hash).await?;
        Ok(())
    }

    /// Create and store a reset token for the account registered under
    /// `email`.
    ///
    /// Returns the account with the token to mail, or `None` if no account
    /// uses the email.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail` if the email format is invalid.
    pub async fn start_password_reset(
        &self,
        email: &str,
    ) -> Result<Option<(Account, ResetToken)>, AuthError> {
        let email = Email::parse(email)?;
        let Some(account) = self.accounts.get_by_email(&email).await? else {
            return Ok(None);
        };

        let token = ResetToken::generate(Utc::now());
        self.accounts
            .set_reset_token(account.id, &token.hash, token.expires_at)
            .await?;

        Ok(Some((account, token)))
    }

    /// Drop a pending reset token, e.g. when the email could not be sent.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Repository` if the database operation fails.
    pub async fn cancel_password_reset(&self, id: AccountId) -> Result<(), AuthError> {
        self.accounts.clear_reset_token(id).await?;
        Ok(())
    }

    /// Set a new password using a raw reset token.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::WeakPassword` if the passwords differ or are too short.
    /// Returns `AuthError::ResetTokenInvalid` if the token is unknown or expired.
    pub async fn reset_password(
        &self,
        raw_token: &str,
        password: &str,
        confirm_password: &str,
    ) -> Result<Account, AuthError> {
        if password != confirm_password {
            return Err(AuthError::WeakPassword(
                "password and confirm password do not match".to_owned(),
            ));
        }
        validate_password(password)?;

        let password_hash = hash_password(password)?;
        self.accounts
            .reset_password(&hash_reset_token(raw_token), &password_hash, Utc::now())
            .await?
            .ok_or(AuthError::ResetTokenInvalid)
    }
}

/// Validate password meets requirements.
///
/// # Errors
///
/// Returns `AuthError::WeakPassword` if the password is too short.
pub fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(())
}

/// Hash a password using Argon2id.
///
/// # Errors
///
/// Returns `AuthError::PasswordHash` if hashing fails.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
///
/// # Errors
///
/// Returns `AuthError::InvalidCredentials` on mismatch or an unreadable hash.
pub fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("hunter22").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("hunter22", &hash).is_ok());
        assert!(matches!(
            verify_password("hunter23", &hash),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_salts_differ() {
        assert_ne!(hash_password("same").unwrap(), hash_password("same").unwrap());
    }

    #[test]
    fn test_unreadable_hash_is_invalid_credentials() {
        assert!(matches!(
            verify_password("pw", "not-a-phc-string"),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_password_length() {
        assert!(validate_password("12345").is_err());
        assert!(validate_password("123456").is_ok());
    }
}
