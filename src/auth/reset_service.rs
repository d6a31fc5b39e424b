//! One-time password-reset tokens.
//!
//! Only the SHA-256 digest of a reset token is ever persisted; the raw
//! value travels once, inside the emailed reset link. A token is consumed
//! exactly once, and observing an expired token clears the pending reset
//! state as if it never existed.

use std::sync::Arc;

use chrono::Utc;
use rand::RngCore;
use sha2::{Digest, Sha256};
use tracing::{info, instrument, warn};

use crate::auth::hashing::PasswordHasher;
use crate::errors::{AuthErrorType, Error, Result};
use crate::mail::{EmailMessage, Mailer};
use crate::observability::metrics;
use crate::storage::repositories::{AccountRepository, AuditEvent, AuditLogRepository};

/// Number of random bytes behind a raw reset token (hex-encoded to 64
/// characters).
const RESET_TOKEN_BYTES: usize = 32;

/// Hash a raw reset token the way it is stored.
pub fn hash_reset_token(raw: &str) -> String {
    hex::encode(Sha256::digest(raw.as_bytes()))
}

/// Service driving the request/consume reset lifecycle.
#[derive(Clone)]
pub struct PasswordResetService {
    accounts: Arc<dyn AccountRepository>,
    audit: Arc<AuditLogRepository>,
    hasher: Arc<PasswordHasher>,
    mailer: Arc<dyn Mailer>,
    token_ttl: chrono::Duration,
    public_base_url: String,
}

impl PasswordResetService {
    pub fn new(
        accounts: Arc<dyn AccountRepository>,
        audit: Arc<AuditLogRepository>,
        hasher: Arc<PasswordHasher>,
        mailer: Arc<dyn Mailer>,
        token_ttl: chrono::Duration,
        public_base_url: String,
    ) -> Self {
        Self { accounts, audit, hasher, mailer, token_ttl, public_base_url }
    }

    /// Start a reset for the given email.
    ///
    /// Succeeds without any state change when the email is unknown, so the
    /// response cannot be used to probe which addresses have accounts. If
    /// the reset email cannot be delivered the pending reset is rolled
    /// back and the call fails.
    #[instrument(skip_all)]
    pub async fn request_reset(&self, email: &str) -> Result<()> {
        if email.trim().is_empty() {
            return Err(Error::validation("Email is required"));
        }

        let account = match self.accounts.find_by_email(email).await? {
            Some(account) => account,
            None => {
                info!("reset requested for unknown email");
                metrics::record_password_reset("unknown_email").await;
                return Ok(());
            }
        };

        let raw_token = generate_raw_token();
        let token_hash = hash_reset_token(&raw_token);
        let expires = Utc::now() + self.token_ttl;

        self.accounts.set_reset_token(&account.id, &token_hash, expires).await?;

        let reset_url = format!(
            "{}/reset-password/{}",
            self.public_base_url.trim_end_matches('/'),
            raw_token
        );
        let message = EmailMessage {
            to: account.email.clone(),
            subject: "Password Reset".to_string(),
            text: format!("You requested a password reset. Click here: {}", reset_url),
            html: Some(format!(
                "<p>You requested a password reset.</p>\
                 <p>Click <a href=\"{}\">here</a> to reset your password. \
                 The link expires in {} minutes.</p>",
                reset_url,
                self.token_ttl.num_minutes()
            )),
        };

        if let Err(err) = self.mailer.send(&message).await {
            // The stored hash is useless without a delivered link; roll it
            // back so no stale pending reset lingers.
            warn!(account_id = %account.id, error = %err, "reset email delivery failed");
            self.accounts.clear_reset_token(&account.id).await?;

            self.audit
                .record_auth_event(AuditEvent::new(
                    "auth.password_reset.delivery_failed",
                    Some(account.id.as_str()),
                    serde_json::json!({}),
                ))
                .await?;

            metrics::record_password_reset("delivery_failed").await;
            return Err(Error::mail("Unable to send the password reset email"));
        }

        self.audit
            .record_auth_event(AuditEvent::new(
                "auth.password_reset.requested",
                Some(account.id.as_str()),
                serde_json::json!({ "expires_at": expires }),
            ))
            .await?;

        metrics::record_password_reset("requested").await;
        info!(account_id = %account.id, "password reset email sent");
        Ok(())
    }

    /// Consume a raw reset token and set the new password.
    ///
    /// "Token unknown" and "token expired" collapse into one error so a
    /// caller cannot distinguish them. Consumption clears the reset state
    /// and the stored refresh token: a reset ends any session established
    /// under the old credential.
    #[instrument(skip_all)]
    pub async fn consume_reset(&self, raw_token: &str, new_password: &str) -> Result<()> {
        if raw_token.is_empty() || new_password.is_empty() {
            return Err(Error::validation("Token and new password are required"));
        }

        let token_hash = hash_reset_token(raw_token);

        let (account, expires) = match self.accounts.find_by_reset_token_hash(&token_hash).await? {
            Some(found) => found,
            None => {
                metrics::record_password_reset("invalid_or_expired").await;
                return Err(Error::auth(
                    "Reset token is invalid or has expired",
                    AuthErrorType::ResetTokenInvalidOrExpired,
                ));
            }
        };

        if expires <= Utc::now() {
            // Expired pending reset behaves as if it never existed.
            self.accounts.clear_reset_token(&account.id).await?;

            self.audit
                .record_auth_event(AuditEvent::new(
                    "auth.password_reset.expired",
                    Some(account.id.as_str()),
                    serde_json::json!({}),
                ))
                .await?;

            metrics::record_password_reset("invalid_or_expired").await;
            return Err(Error::auth(
                "Reset token is invalid or has expired",
                AuthErrorType::ResetTokenInvalidOrExpired,
            ));
        }

        let new_hash = self.hash_password(new_password).await?;
        self.accounts.update_password(&account.id, &new_hash).await?;
        self.accounts.clear_reset_token(&account.id).await?;
        self.accounts.clear_refresh_token(&account.id).await?;

        self.audit
            .record_auth_event(AuditEvent::new(
                "auth.password_reset.consumed",
                Some(account.id.as_str()),
                serde_json::json!({}),
            ))
            .await?;

        metrics::record_password_reset("consumed").await;
        info!(account_id = %account.id, "password reset completed");
        Ok(())
    }

    async fn hash_password(&self, plaintext: &str) -> Result<String> {
        let hasher = self.hasher.clone();
        let plaintext = plaintext.to_string();
        tokio::task::spawn_blocking(move || hasher.hash(&plaintext))
            .await
            .map_err(|err| Error::internal(format!("Hashing task failed: {}", err)))?
    }
}

fn generate_raw_token() -> String {
    let mut bytes = [0u8; RESET_TOKEN_BYTES];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}
