//! Shared test harness: in-memory database, cheap Argon2 profile, and a
//! recording mailer.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use streamgate::auth::account::{Account, NewAccount, Role};
use streamgate::auth::hashing::PasswordHasher;
use streamgate::auth::reset_service::PasswordResetService;
use streamgate::auth::session_service::SessionService;
use streamgate::auth::tokens::TokenIssuer;
use streamgate::config::{AuthConfig, DatabaseConfig};
use streamgate::domain::AccountId;
use streamgate::errors::{Error, Result};
use streamgate::mail::{EmailMessage, Mailer};
use streamgate::storage::repositories::{
    AccountRepository, AuditLogRepository, SqlxAccountRepository,
};
use streamgate::storage::{create_pool, DbPool};

pub const PUBLIC_BASE_URL: &str = "https://streamgate.test";

/// Mailer double that records every message and can be told to fail.
#[derive(Default)]
pub struct RecordingMailer {
    pub sent: Mutex<Vec<EmailMessage>>,
    pub fail_next: AtomicBool,
}

impl RecordingMailer {
    pub fn sent_messages(&self) -> Vec<EmailMessage> {
        self.sent.lock().unwrap().clone()
    }

    pub fn fail_next_send(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, message: &EmailMessage) -> Result<()> {
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(Error::mail("simulated SMTP outage"));
        }
        self.sent.lock().unwrap().push(message.clone());
        Ok(())
    }
}

pub fn test_auth_config() -> AuthConfig {
    AuthConfig {
        access_token_secret: "access-secret-for-tests-0123456789ab".to_string(),
        refresh_token_secret: "refresh-secret-for-tests-0123456789a".to_string(),
        password_hash_memory_kib: 768,
        password_hash_iterations: 1,
        ..AuthConfig::default()
    }
}

pub struct TestHarness {
    pub pool: DbPool,
    pub accounts: Arc<SqlxAccountRepository>,
    pub session: SessionService,
    pub reset: PasswordResetService,
    pub mailer: Arc<RecordingMailer>,
    pub issuer: Arc<TokenIssuer>,
    pub hasher: Arc<PasswordHasher>,
    pub auth_config: AuthConfig,
}

impl TestHarness {
    pub async fn new() -> Self {
        Self::with_auth_config(test_auth_config()).await
    }

    pub async fn with_auth_config(auth_config: AuthConfig) -> Self {
        let db_config = DatabaseConfig {
            url: "sqlite://:memory:".to_string(),
            max_connections: 1,
            min_connections: 1,
            auto_migrate: true,
            ..Default::default()
        };
        let pool = create_pool(&db_config).await.unwrap();

        let accounts = Arc::new(SqlxAccountRepository::new(pool.clone()));
        let audit = Arc::new(AuditLogRepository::new(pool.clone()));
        let hasher = Arc::new(PasswordHasher::new(&auth_config).unwrap());
        let issuer = Arc::new(TokenIssuer::new(&auth_config));
        let mailer = Arc::new(RecordingMailer::default());

        let session = SessionService::new(
            accounts.clone(),
            audit.clone(),
            hasher.clone(),
            issuer.clone(),
        )
        .unwrap();
        let reset = PasswordResetService::new(
            accounts.clone(),
            audit,
            hasher.clone(),
            mailer.clone(),
            auth_config.reset_token_ttl(),
            PUBLIC_BASE_URL.to_string(),
        );

        Self { pool, accounts, session, reset, mailer, issuer, hasher, auth_config }
    }

    /// Create an account with the given credentials.
    pub async fn seed_account(&self, username: &str, password: &str) -> Account {
        let hash = self.hasher.hash(password).unwrap();
        self.accounts
            .create_account(NewAccount {
                id: AccountId::new(),
                username: username.to_string(),
                email: format!("{}@example.com", username),
                password_hash: hash,
                role: Role::User,
            })
            .await
            .unwrap()
    }

    /// Pull the raw reset token out of the last recorded email.
    pub fn last_reset_token(&self) -> String {
        let sent = self.mailer.sent_messages();
        let text = &sent.last().expect("no reset email recorded").text;
        let marker = "/reset-password/";
        let start = text.find(marker).expect("no reset link in email") + marker.len();
        text[start..].trim().to_string()
    }
}
