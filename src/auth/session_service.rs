//! Session lifecycle: login, refresh with rotation, logout, and password
//! change.
//!
//! Per account there is at most one live refresh token. Login overwrites
//! it, refresh rotates it through an atomic compare-and-swap, and logout
//! clears it. A presented refresh token that no longer matches the stored
//! value is treated as reuse and rejected.

use std::sync::Arc;

use tracing::{info, instrument, warn};

use crate::auth::account::Account;
use crate::auth::hashing::PasswordHasher;
use crate::auth::tokens::{TokenIssuer, TokenKind, TokenPair};
use crate::config::AuthConfig;
use crate::domain::AccountId;
use crate::errors::{AuthErrorType, Error, Result};
use crate::observability::metrics;
use crate::storage::repositories::{
    AccountRepository, AuditEvent, AuditLogRepository, SqlxAccountRepository,
};
use crate::storage::DbPool;

/// Service orchestrating credential verification and token lifecycle.
#[derive(Clone)]
pub struct SessionService {
    accounts: Arc<dyn AccountRepository>,
    audit: Arc<AuditLogRepository>,
    hasher: Arc<PasswordHasher>,
    tokens: Arc<TokenIssuer>,
    /// Verified against when a login names an unknown account, so the
    /// response time matches a real verification and cannot be used to
    /// enumerate accounts.
    dummy_hash: String,
}

impl SessionService {
    pub fn new(
        accounts: Arc<dyn AccountRepository>,
        audit: Arc<AuditLogRepository>,
        hasher: Arc<PasswordHasher>,
        tokens: Arc<TokenIssuer>,
    ) -> Result<Self> {
        let dummy_hash = hasher.hash("dummy-startup-value")?;
        Ok(Self { accounts, audit, hasher, tokens, dummy_hash })
    }

    /// Build a service over sqlx repositories for the given pool.
    pub fn from_config(pool: DbPool, config: &AuthConfig) -> Result<Self> {
        Self::new(
            Arc::new(SqlxAccountRepository::new(pool.clone())),
            Arc::new(AuditLogRepository::new(pool)),
            Arc::new(PasswordHasher::new(config)?),
            Arc::new(TokenIssuer::new(config)),
        )
    }

    /// Authenticate by username or email plus password.
    ///
    /// Unknown identifier and wrong password produce the same
    /// `InvalidCredentials` error so the response does not reveal which
    /// part was wrong. On success the refresh token is persisted and both
    /// tokens are returned alongside the sanitized account.
    #[instrument(skip(self, password), fields(identifier = %identifier))]
    pub async fn login(&self, identifier: &str, password: &str) -> Result<(Account, TokenPair)> {
        if identifier.trim().is_empty() || password.is_empty() {
            return Err(Error::validation("Identifier and password are required"));
        }

        let found = self.accounts.find_by_identifier_with_password(identifier.trim()).await?;

        let (account, password_hash) = match found {
            Some(result) => result,
            None => {
                // Burn the same hashing cost as a real verification.
                if let Err(e) = self.verify_password(password, &self.dummy_hash).await {
                    warn!(error = %e, "dummy hash verification failed unexpectedly");
                }
                warn!("login attempt for unknown identifier");
                metrics::record_authentication("invalid_credentials").await;
                return Err(Error::auth(
                    "Invalid username/email or password",
                    AuthErrorType::InvalidCredentials,
                ));
            }
        };

        if !self.verify_password(password, &password_hash).await? {
            warn!(account_id = %account.id, "login attempt with incorrect password");
            metrics::record_authentication("invalid_credentials").await;

            self.audit
                .record_auth_event(AuditEvent::new(
                    "auth.login.failed",
                    Some(account.id.as_str()),
                    serde_json::json!({ "reason": "invalid_password" }),
                ))
                .await?;

            return Err(Error::auth(
                "Invalid username/email or password",
                AuthErrorType::InvalidCredentials,
            ));
        }

        let pair = self.tokens.issue_pair(&account)?;
        self.accounts.set_refresh_token(&account.id, &pair.refresh_token).await?;

        self.audit
            .record_auth_event(AuditEvent::new(
                "auth.login.success",
                Some(account.id.as_str()),
                serde_json::json!({ "username": account.username }),
            ))
            .await?;

        metrics::record_authentication("success").await;
        metrics::record_tokens_issued(2).await;
        info!(account_id = %account.id, "account logged in");

        Ok((account, pair))
    }

    /// Exchange a refresh token for a new access/refresh pair, rotating
    /// the stored token.
    ///
    /// Rotation is a compare-and-swap against the presented token: when
    /// two calls race on the same token, exactly one wins and the other
    /// fails with `InvalidRefreshToken`. A token that fails the swap was
    /// either already rotated or revoked by logout; both are reuse.
    #[instrument(skip_all)]
    pub async fn refresh(&self, presented: Option<&str>) -> Result<(Account, TokenPair)> {
        let presented = match presented {
            Some(token) if !token.is_empty() => token,
            _ => {
                return Err(Error::auth(
                    "Refresh token is required",
                    AuthErrorType::MissingToken,
                ))
            }
        };

        let claims = match self.tokens.verify(presented, TokenKind::Refresh) {
            Ok(claims) => claims,
            Err(err) => {
                let outcome = match err.auth_error_type() {
                    Some(AuthErrorType::ExpiredToken) => "expired",
                    _ => "malformed",
                };
                metrics::record_refresh(outcome).await;
                return Err(err);
            }
        };

        let account_id = claims.account_id();
        let account = self
            .accounts
            .find_by_id(&account_id)
            .await?
            .ok_or_else(|| Error::not_found("Account for refresh token"))?;

        let pair = self.tokens.issue_pair(&account)?;

        let rotated = self
            .accounts
            .compare_and_set_refresh_token(&account.id, presented, &pair.refresh_token)
            .await?;

        if !rotated {
            warn!(account_id = %account.id, "refresh token reuse detected");
            metrics::record_refresh("reuse_detected").await;

            self.audit
                .record_auth_event(AuditEvent::new(
                    "auth.refresh.reuse_detected",
                    Some(account.id.as_str()),
                    serde_json::json!({}),
                ))
                .await?;

            return Err(Error::auth(
                "Refresh token does not match the active session",
                AuthErrorType::InvalidRefreshToken,
            ));
        }

        self.audit
            .record_auth_event(AuditEvent::new(
                "auth.refresh.success",
                Some(account.id.as_str()),
                serde_json::json!({}),
            ))
            .await?;

        metrics::record_refresh("success").await;
        metrics::record_tokens_issued(2).await;

        Ok((account, pair))
    }

    /// Clear the stored refresh token. Logging out twice is not an error.
    #[instrument(skip(self), fields(account_id = %account_id))]
    pub async fn logout(&self, account_id: &AccountId) -> Result<()> {
        self.accounts.clear_refresh_token(account_id).await?;

        self.audit
            .record_auth_event(AuditEvent::new(
                "auth.logout",
                Some(account_id.as_str()),
                serde_json::json!({}),
            ))
            .await?;

        info!("account logged out");
        Ok(())
    }

    /// Replace the password after verifying the current one.
    ///
    /// Also clears the stored refresh token: a password change ends any
    /// session established under the old credential.
    #[instrument(skip(self, old_password, new_password), fields(account_id = %account_id))]
    pub async fn change_password(
        &self,
        account_id: &AccountId,
        old_password: &str,
        new_password: &str,
    ) -> Result<()> {
        if new_password.is_empty() {
            return Err(Error::validation("New password is required"));
        }

        let current_hash = self
            .accounts
            .get_password_hash(account_id)
            .await?
            .ok_or_else(|| Error::not_found("Account"))?;

        if !self.verify_password(old_password, &current_hash).await? {
            warn!("password change attempt with incorrect current password");

            self.audit
                .record_auth_event(AuditEvent::new(
                    "auth.password_change.failed",
                    Some(account_id.as_str()),
                    serde_json::json!({ "reason": "invalid_password" }),
                ))
                .await?;

            return Err(Error::auth(
                "Current password is incorrect",
                AuthErrorType::InvalidCredentials,
            ));
        }

        let new_hash = self.hash_password(new_password).await?;
        self.accounts.update_password(account_id, &new_hash).await?;
        self.accounts.clear_refresh_token(account_id).await?;

        self.audit
            .record_auth_event(AuditEvent::new(
                "auth.password_change.success",
                Some(account_id.as_str()),
                serde_json::json!({}),
            ))
            .await?;

        info!("password changed");
        Ok(())
    }

    /// The issuer in use, shared with the HTTP layer for the auth gate.
    pub fn token_issuer(&self) -> Arc<TokenIssuer> {
        self.tokens.clone()
    }

    // Argon2 is intentionally slow; keep it off the async reactor.

    async fn hash_password(&self, plaintext: &str) -> Result<String> {
        let hasher = self.hasher.clone();
        let plaintext = plaintext.to_string();
        tokio::task::spawn_blocking(move || hasher.hash(&plaintext))
            .await
            .map_err(|err| Error::internal(format!("Hashing task failed: {}", err)))?
    }

    async fn verify_password(&self, plaintext: &str, stored: &str) -> Result<bool> {
        let hasher = self.hasher.clone();
        let plaintext = plaintext.to_string();
        let stored = stored.to_string();
        tokio::task::spawn_blocking(move || hasher.verify(&plaintext, &stored))
            .await
            .map_err(|err| Error::internal(format!("Hashing task failed: {}", err)))?
    }
}
