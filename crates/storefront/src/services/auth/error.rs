//! Authentication error types.

use thiserror::Error;

use crate::db::RepositoryError;

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// No credential on the request.
    #[error("login first to access this page")]
    Unauthenticated,

    /// Credential present but its signature or expiry does not verify.
    #[error("invalid or expired token")]
    InvalidCredential,

    /// Credential verified but names no existing account.
    #[error("account not found")]
    AccountNotFound,

    /// Account role is outside the accepted set.
    #[error(transparent)]
    Forbidden(#[from] teeshop_core::Forbidden),

    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] teeshop_core::EmailError),

    /// Wrong email or password.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Email already registered.
    #[error("account already exists")]
    AccountAlreadyExists,

    /// Password too weak or the confirmation does not match.
    #[error("password validation failed: {0}")]
    WeakPassword(String),

    /// Password-reset token unknown or expired.
    #[error("reset token is invalid or has expired")]
    ResetTokenInvalid,

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),

    /// Password hashing error.
    #[error("password hashing error")]
    PasswordHash,

    /// Token signing error.
    #[error("token signing error: {0}")]
    TokenSigning(String),
}
