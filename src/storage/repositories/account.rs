//! Account repository: credential storage and session-token bookkeeping.
//!
//! All mutations are expressed as explicit commands. Refresh-token rotation
//! goes through `compare_and_set_refresh_token`, a single conditional
//! UPDATE, so two concurrent rotations of the same token can never both
//! succeed.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use std::str::FromStr;
use tracing::instrument;

use crate::auth::account::{Account, NewAccount, Role};
use crate::domain::AccountId;
use crate::errors::{Error, Result};
use crate::storage::DbPool;

#[derive(Debug, Clone, FromRow)]
struct AccountRow {
    pub id: String,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub role: String,
    pub refresh_token: Option<String>,
    pub password_reset_token: Option<String>,
    pub password_reset_expires: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

const ACCOUNT_COLUMNS: &str = "id, username, email, password_hash, role, refresh_token, \
     password_reset_token, password_reset_expires, created_at, updated_at";

#[async_trait]
pub trait AccountRepository: Send + Sync {
    /// Create a new account
    async fn create_account(&self, account: NewAccount) -> Result<Account>;

    /// Get an account by ID
    async fn find_by_id(&self, id: &AccountId) -> Result<Option<Account>>;

    /// Get an account by email (normalized lowercase)
    async fn find_by_email(&self, email: &str) -> Result<Option<Account>>;

    /// Get an account by username or email, with its password hash,
    /// for login verification
    async fn find_by_identifier_with_password(
        &self,
        identifier: &str,
    ) -> Result<Option<(Account, String)>>;

    /// Get an account's password hash for re-verification
    async fn get_password_hash(&self, id: &AccountId) -> Result<Option<String>>;

    /// Replace an account's password hash
    async fn update_password(&self, id: &AccountId, password_hash: &str) -> Result<()>;

    /// Store a refresh token unconditionally (login)
    async fn set_refresh_token(&self, id: &AccountId, token: &str) -> Result<()>;

    /// Atomically rotate the refresh token: the write only happens when the
    /// stored value still equals `expected`. Returns whether it did.
    async fn compare_and_set_refresh_token(
        &self,
        id: &AccountId,
        expected: &str,
        new: &str,
    ) -> Result<bool>;

    /// Clear the stored refresh token (logout); idempotent
    async fn clear_refresh_token(&self, id: &AccountId) -> Result<()>;

    /// Read the stored refresh token
    async fn get_refresh_token(&self, id: &AccountId) -> Result<Option<String>>;

    /// Store a pending password-reset token hash and its expiry
    async fn set_reset_token(
        &self,
        id: &AccountId,
        token_hash: &str,
        expires: DateTime<Utc>,
    ) -> Result<()>;

    /// Clear any pending password-reset state; idempotent
    async fn clear_reset_token(&self, id: &AccountId) -> Result<()>;

    /// Find the account holding a given reset-token hash, along with the
    /// stored expiry. Expiry enforcement is the caller's job so that an
    /// expired match can still have its reset fields cleared.
    async fn find_by_reset_token_hash(
        &self,
        token_hash: &str,
    ) -> Result<Option<(Account, DateTime<Utc>)>>;
}

#[derive(Debug, Clone)]
pub struct SqlxAccountRepository {
    pool: DbPool,
}

impl SqlxAccountRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    fn row_to_account(&self, row: AccountRow) -> Result<Account> {
        let role = Role::from_str(&row.role)
            .map_err(|_| Error::validation(format!("Unknown account role '{}'", row.role)))?;

        Ok(Account {
            id: AccountId::from_string(row.id),
            username: row.username,
            email: row.email,
            role,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }

    async fn fetch_row(&self, id: &AccountId) -> Result<Option<AccountRow>> {
        sqlx::query_as::<_, AccountRow>(&format!(
            "SELECT {} FROM accounts WHERE id = $1",
            ACCOUNT_COLUMNS
        ))
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|err| Error::Database {
            source: err,
            context: "Failed to fetch account".to_string(),
        })
    }
}

#[async_trait]
impl AccountRepository for SqlxAccountRepository {
    #[instrument(skip(self, account), fields(username = %account.username), name = "db_create_account")]
    async fn create_account(&self, account: NewAccount) -> Result<Account> {
        let now = Utc::now();
        sqlx::query(
            r#"
            INSERT INTO accounts (id, username, email, password_hash, role, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(account.id.as_str())
        .bind(&account.username)
        .bind(Account::normalize_email(&account.email))
        .bind(&account.password_hash)
        .bind(account.role.as_str())
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|err| Error::Database {
            source: err,
            context: "Failed to create account".to_string(),
        })?;

        self.find_by_id(&account.id)
            .await?
            .ok_or_else(|| Error::internal("Account not found after creation"))
    }

    #[instrument(skip(self), fields(account_id = %id), name = "db_find_account")]
    async fn find_by_id(&self, id: &AccountId) -> Result<Option<Account>> {
        let row = self.fetch_row(id).await?;
        row.map(|r| self.row_to_account(r)).transpose()
    }

    #[instrument(skip(self, email), name = "db_find_account_by_email")]
    async fn find_by_email(&self, email: &str) -> Result<Option<Account>> {
        let row = sqlx::query_as::<_, AccountRow>(&format!(
            "SELECT {} FROM accounts WHERE email = $1",
            ACCOUNT_COLUMNS
        ))
        .bind(Account::normalize_email(email))
        .fetch_optional(&self.pool)
        .await
        .map_err(|err| Error::Database {
            source: err,
            context: "Failed to fetch account by email".to_string(),
        })?;

        row.map(|r| self.row_to_account(r)).transpose()
    }

    #[instrument(skip(self, identifier), name = "db_find_account_by_identifier")]
    async fn find_by_identifier_with_password(
        &self,
        identifier: &str,
    ) -> Result<Option<(Account, String)>> {
        let row = sqlx::query_as::<_, AccountRow>(&format!(
            "SELECT {} FROM accounts WHERE username = $1 OR email = $2",
            ACCOUNT_COLUMNS
        ))
        .bind(identifier)
        .bind(Account::normalize_email(identifier))
        .fetch_optional(&self.pool)
        .await
        .map_err(|err| Error::Database {
            source: err,
            context: "Failed to fetch account by identifier".to_string(),
        })?;

        match row {
            Some(row) => {
                let password_hash = row.password_hash.clone();
                Ok(Some((self.row_to_account(row)?, password_hash)))
            }
            None => Ok(None),
        }
    }

    #[instrument(skip(self), fields(account_id = %id), name = "db_get_password_hash")]
    async fn get_password_hash(&self, id: &AccountId) -> Result<Option<String>> {
        Ok(self.fetch_row(id).await?.map(|row| row.password_hash))
    }

    #[instrument(skip(self, password_hash), fields(account_id = %id), name = "db_update_password")]
    async fn update_password(&self, id: &AccountId, password_hash: &str) -> Result<()> {
        sqlx::query("UPDATE accounts SET password_hash = $1, updated_at = $2 WHERE id = $3")
            .bind(password_hash)
            .bind(Utc::now())
            .bind(id.as_str())
            .execute(&self.pool)
            .await
            .map_err(|err| Error::Database {
                source: err,
                context: "Failed to update password".to_string(),
            })?;

        Ok(())
    }

    #[instrument(skip(self, token), fields(account_id = %id), name = "db_set_refresh_token")]
    async fn set_refresh_token(&self, id: &AccountId, token: &str) -> Result<()> {
        sqlx::query("UPDATE accounts SET refresh_token = $1, updated_at = $2 WHERE id = $3")
            .bind(token)
            .bind(Utc::now())
            .bind(id.as_str())
            .execute(&self.pool)
            .await
            .map_err(|err| Error::Database {
                source: err,
                context: "Failed to store refresh token".to_string(),
            })?;

        Ok(())
    }

    #[instrument(skip(self, expected, new), fields(account_id = %id), name = "db_cas_refresh_token")]
    async fn compare_and_set_refresh_token(
        &self,
        id: &AccountId,
        expected: &str,
        new: &str,
    ) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE accounts SET refresh_token = $1, updated_at = $2 \
             WHERE id = $3 AND refresh_token = $4",
        )
        .bind(new)
        .bind(Utc::now())
        .bind(id.as_str())
        .bind(expected)
        .execute(&self.pool)
        .await
        .map_err(|err| Error::Database {
            source: err,
            context: "Failed to rotate refresh token".to_string(),
        })?;

        Ok(result.rows_affected() == 1)
    }

    #[instrument(skip(self), fields(account_id = %id), name = "db_clear_refresh_token")]
    async fn clear_refresh_token(&self, id: &AccountId) -> Result<()> {
        sqlx::query("UPDATE accounts SET refresh_token = NULL, updated_at = $1 WHERE id = $2")
            .bind(Utc::now())
            .bind(id.as_str())
            .execute(&self.pool)
            .await
            .map_err(|err| Error::Database {
                source: err,
                context: "Failed to clear refresh token".to_string(),
            })?;

        Ok(())
    }

    #[instrument(skip(self), fields(account_id = %id), name = "db_get_refresh_token")]
    async fn get_refresh_token(&self, id: &AccountId) -> Result<Option<String>> {
        Ok(self.fetch_row(id).await?.and_then(|row| row.refresh_token))
    }

    #[instrument(skip(self, token_hash), fields(account_id = %id), name = "db_set_reset_token")]
    async fn set_reset_token(
        &self,
        id: &AccountId,
        token_hash: &str,
        expires: DateTime<Utc>,
    ) -> Result<()> {
        sqlx::query(
            "UPDATE accounts SET password_reset_token = $1, password_reset_expires = $2, \
             updated_at = $3 WHERE id = $4",
        )
        .bind(token_hash)
        .bind(expires)
        .bind(Utc::now())
        .bind(id.as_str())
        .execute(&self.pool)
        .await
        .map_err(|err| Error::Database {
            source: err,
            context: "Failed to store reset token".to_string(),
        })?;

        Ok(())
    }

    #[instrument(skip(self), fields(account_id = %id), name = "db_clear_reset_token")]
    async fn clear_reset_token(&self, id: &AccountId) -> Result<()> {
        sqlx::query(
            "UPDATE accounts SET password_reset_token = NULL, password_reset_expires = NULL, \
             updated_at = $1 WHERE id = $2",
        )
        .bind(Utc::now())
        .bind(id.as_str())
        .execute(&self.pool)
        .await
        .map_err(|err| Error::Database {
            source: err,
            context: "Failed to clear reset token".to_string(),
        })?;

        Ok(())
    }

    #[instrument(skip(self, token_hash), name = "db_find_account_by_reset_token")]
    async fn find_by_reset_token_hash(
        &self,
        token_hash: &str,
    ) -> Result<Option<(Account, DateTime<Utc>)>> {
        let row = sqlx::query_as::<_, AccountRow>(&format!(
            "SELECT {} FROM accounts WHERE password_reset_token = $1",
            ACCOUNT_COLUMNS
        ))
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await
        .map_err(|err| Error::Database {
            source: err,
            context: "Failed to fetch account by reset token".to_string(),
        })?;

        match row {
            Some(row) => {
                let expires = row.password_reset_expires.ok_or_else(|| {
                    Error::internal("Reset token present without an expiry")
                })?;
                Ok(Some((self.row_to_account(row)?, expires)))
            }
            None => Ok(None),
        }
    }
}
