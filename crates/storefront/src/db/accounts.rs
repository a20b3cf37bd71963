//! Account repository.
//!
//! Password hashes and reset-token hashes are read and written here and
//! nowhere else; everything returned to callers is an [`Account`].

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::types::Json;

use teeshop_core::{AccountId, Email, ImageRef, Role};

use super::{RepositoryError, conflict_on_unique};
use crate::models::Account;
use crate::services::auth::AccountLookup;

const ACCOUNT_COLUMNS: &str = "id, name, email, role, photo, created_at";

#[derive(sqlx::FromRow)]
struct AccountRow {
    id: AccountId,
    name: String,
    email: String,
    role: String,
    photo: Json<ImageRef>,
    created_at: DateTime<Utc>,
}

impl TryFrom<AccountRow> for Account {
    type Error = RepositoryError;

    fn try_from(row: AccountRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&row.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;
        let role = Role::parse(&row.role).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid role in database: {e}"))
        })?;
        Ok(Self {
            id: row.id,
            name: row.name,
            email,
            role,
            photo: row.photo.0,
            created_at: row.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct AccountWithHashRow {
    #[sqlx(flatten)]
    account: AccountRow,
    password_hash: String,
}

/// Fields for a new account.
#[derive(Debug)]
pub struct NewAccount<'a> {
    pub name: &'a str,
    pub email: &'a Email,
    pub password_hash: &'a str,
    pub role: &'a Role,
    pub photo: &'a ImageRef,
}

/// Repository for account database operations.
pub struct AccountRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> AccountRepository<'a> {
    /// Create a new account repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get an account by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the stored row is invalid.
    pub async fn get_by_id(&self, id: AccountId) -> Result<Option<Account>, RepositoryError> {
        let row = sqlx::query_as::<_, AccountRow>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM account WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        row.map(Account::try_from).transpose()
    }

    /// Get an account by email address.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_email(&self, email: &Email) -> Result<Option<Account>, RepositoryError> {
        let row = sqlx::query_as::<_, AccountRow>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM account WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(self.pool)
        .await?;

        row.map(Account::try_from).transpose()
    }

    /// Get an account and its password hash by email.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_password_hash(
        &self,
        email: &Email,
    ) -> Result<Option<(Account, String)>, RepositoryError> {
        let row = sqlx::query_as::<_, AccountWithHashRow>(&format!(
            "SELECT {ACCOUNT_COLUMNS}, password_hash FROM account WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(self.pool)
        .await?;

        row.map(|r| Ok((Account::try_from(r.account)?, r.password_hash)))
            .transpose()
    }

    /// Get the password hash of an account.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_password_hash_by_id(
        &self,
        id: AccountId,
    ) -> Result<Option<String>, RepositoryError> {
        let hash = sqlx::query_scalar::<_, String>("SELECT password_hash FROM account WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool)
            .await?;
        Ok(hash)
    }

    /// Create an account.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the email already exists.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create(&self, new: NewAccount<'_>) -> Result<Account, RepositoryError> {
        let row = sqlx::query_as::<_, AccountRow>(&format!(
            r"
            INSERT INTO account (name, email, password_hash, role, photo)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {ACCOUNT_COLUMNS}
            "
        ))
        .bind(new.name)
        .bind(new.email)
        .bind(new.password_hash)
        .bind(new.role.as_str())
        .bind(Json(new.photo))
        .fetch_one(self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "email"))?;

        row.try_into()
    }

    /// Replace the password hash.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the account doesn't exist.
    pub async fn update_password(
        &self,
        id: AccountId,
        password_hash: &str,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE account SET password_hash = $2 WHERE id = $1")
            .bind(id)
            .bind(password_hash)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Update name, email and, when given, the profile photo.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the account doesn't exist.
    /// Returns `RepositoryError::Conflict` if the email is taken.
    pub async fn update_profile(
        &self,
        id: AccountId,
        name: &str,
        email: &Email,
        photo: Option<&ImageRef>,
    ) -> Result<Account, RepositoryError> {
        let row = sqlx::query_as::<_, AccountRow>(&format!(
            r"
            UPDATE account
            SET name = $2, email = $3, photo = COALESCE($4, photo)
            WHERE id = $1
            RETURNING {ACCOUNT_COLUMNS}
            "
        ))
        .bind(id)
        .bind(name)
        .bind(email)
        .bind(photo.map(Json))
        .fetch_optional(self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "email"))?
        .ok_or(RepositoryError::NotFound)?;

        row.try_into()
    }

    /// Update name, email and role (administrator edit).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the account doesn't exist.
    /// Returns `RepositoryError::Conflict` if the email is taken.
    pub async fn update_by_admin(
        &self,
        id: AccountId,
        name: &str,
        email: &Email,
        role: &Role,
    ) -> Result<Account, RepositoryError> {
        let row = sqlx::query_as::<_, AccountRow>(&format!(
            r"
            UPDATE account SET name = $2, email = $3, role = $4
            WHERE id = $1
            RETURNING {ACCOUNT_COLUMNS}
            "
        ))
        .bind(id)
        .bind(name)
        .bind(email)
        .bind(role.as_str())
        .fetch_optional(self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "email"))?
        .ok_or(RepositoryError::NotFound)?;

        row.try_into()
    }

    /// Delete an account, returning it so its photo can be released.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the account doesn't exist.
    pub async fn delete(&self, id: AccountId) -> Result<Account, RepositoryError> {
        let row = sqlx::query_as::<_, AccountRow>(&format!(
            "DELETE FROM account WHERE id = $1 RETURNING {ACCOUNT_COLUMNS}"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        row.try_into()
    }

    /// List every account, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_all(&self) -> Result<Vec<Account>, RepositoryError> {
        let rows = sqlx::query_as::<_, AccountRow>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM account ORDER BY id"
        ))
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(Account::try_from).collect()
    }

    /// List accounts carrying `role`, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_by_role(&self, role: &Role) -> Result<Vec<Account>, RepositoryError> {
        let rows = sqlx::query_as::<_, AccountRow>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM account WHERE role = $1 ORDER BY id"
        ))
        .bind(role.as_str())
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(Account::try_from).collect()
    }

    /// Store a password-reset token hash and its expiry.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the account doesn't exist.
    pub async fn set_reset_token(
        &self,
        id: AccountId,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE account SET reset_token_hash = $2, reset_token_expires_at = $3 WHERE id = $1",
        )
        .bind(id)
        .bind(token_hash)
        .bind(expires_at)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Clear any pending password-reset token.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn clear_reset_token(&self, id: AccountId) -> Result<(), RepositoryError> {
        sqlx::query(
            "UPDATE account SET reset_token_hash = NULL, reset_token_expires_at = NULL WHERE id = $1",
        )
        .bind(id)
        .execute(self.pool)
        .await?;
        Ok(())
    }

    /// Consume a live reset token: set the new password hash and clear the
    /// token in one statement.
    ///
    /// Returns `None` when no account holds `token_hash` or it has expired.
    /// An expired pair is cleared.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn reset_password(
        &self,
        token_hash: &str,
        password_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Account>, RepositoryError> {
        let row = sqlx::query_as::<_, AccountRow>(&format!(
            r"
            UPDATE account
            SET password_hash = $2, reset_token_hash = NULL, reset_token_expires_at = NULL
            WHERE reset_token_hash = $1 AND reset_token_expires_at > $3
            RETURNING {ACCOUNT_COLUMNS}
            "
        ))
        .bind(token_hash)
        .bind(password_hash)
        .bind(now)
        .fetch_optional(self.pool)
        .await?;

        if row.is_none() {
            sqlx::query(
                r"
                UPDATE account SET reset_token_hash = NULL, reset_token_expires_at = NULL
                WHERE reset_token_hash = $1 AND reset_token_expires_at <= $2
                ",
            )
            .bind(token_hash)
            .bind(now)
            .execute(self.pool)
            .await?;
        }

        row.map(Account::try_from).transpose()
    }
}

impl AccountLookup for PgPool {
    async fn find_account(&self, id: AccountId) -> Result<Option<Account>, RepositoryError> {
        AccountRepository::new(self).get_by_id(id).await
    }
}
