//! Staff account management.
//!
//! # Usage
//!
//! ```bash
//! teeshop-cli admin create -e admin@example.com -n "Admin Name" -p 'secret!' -r admin \
//!     --photo-id users/admin --photo-url https://res.cloudinary.com/teeshop/admin.jpg
//! ```
//!
//! Signup through the API always yields a `user` account; this is how the
//! first administrator comes to exist.

use teeshop_core::{ImageRef, Role};
use teeshop_storefront::services::AuthError;
use teeshop_storefront::services::auth::AuthService;
use thiserror::Error;

use super::{CommandError, connect};

/// Errors that can occur during account operations.
#[derive(Debug, Error)]
pub enum AdminError {
    #[error(transparent)]
    Connect(#[from] CommandError),

    /// Invalid role.
    #[error("Invalid role: {0}. Valid roles: user, admin, manager")]
    InvalidRole(String),

    /// Display name rejected.
    #[error("Invalid name: {0}")]
    InvalidName(String),

    /// Registration rejected (bad email, weak password, duplicate email).
    #[error("{0}")]
    Auth(#[from] AuthError),
}

/// Create an account with an explicit role.
///
/// # Errors
///
/// Returns an error if the role is unknown, the credentials are rejected or
/// the email is already registered.
pub async fn create_account(
    email: &str,
    name: &str,
    password: &str,
    role: &str,
    photo: &ImageRef,
) -> Result<(), AdminError> {
    let role = Role::parse(role).map_err(|_| AdminError::InvalidRole(role.to_owned()))?;
    let name = teeshop_storefront::models::account::validate_name(name)
        .map_err(AdminError::InvalidName)?;

    let pool = connect().await?;

    tracing::info!("Creating account: {} ({})", email, role);
    let account = AuthService::new(&pool)
        .register_with_role(&name, email, password, &role, photo)
        .await?;

    tracing::info!(
        "Account created successfully! ID: {}, Email: {}, Role: {}",
        account.id,
        account.email,
        account.role
    );
    Ok(())
}
