//! JWT issuance and verification for access and refresh tokens.
//!
//! Access tokens carry identity plus minimal profile claims and expire
//! quickly. Refresh tokens carry identity only, so rotating one never
//! leaks stale profile data. Both embed a `kind` claim so one can never
//! stand in for the other. Verification accepts the primary secret plus
//! any configured retired secrets, which keeps sessions alive across a
//! key rollover.

use jsonwebtoken::{decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

use crate::auth::account::Account;
use crate::config::AuthConfig;
use crate::domain::AccountId;
use crate::errors::{AuthErrorType, Error, Result};

/// Which of the two token families a JWT belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Access,
    Refresh,
}

impl TokenKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenKind::Access => "access",
            TokenKind::Refresh => "refresh",
        }
    }
}

impl Display for TokenKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// JWT claims structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (account identifier)
    pub sub: String,
    pub username: String,
    /// Present on access tokens only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Present on access tokens only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    /// "access" or "refresh"
    pub kind: String,
    /// Issued at (unix seconds)
    pub iat: i64,
    /// Expiration (unix seconds)
    pub exp: i64,
}

impl Claims {
    pub fn account_id(&self) -> AccountId {
        AccountId::from_string(self.sub.clone())
    }
}

/// A freshly issued access/refresh pair.
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

struct KeySet {
    encoding: EncodingKey,
    decoding: Vec<DecodingKey>,
    expiry: chrono::Duration,
}

impl KeySet {
    fn new(secret: &str, previous: &[String], expiry: chrono::Duration) -> Self {
        let mut decoding = vec![DecodingKey::from_secret(secret.as_bytes())];
        decoding.extend(previous.iter().map(|s| DecodingKey::from_secret(s.as_bytes())));
        Self { encoding: EncodingKey::from_secret(secret.as_bytes()), decoding, expiry }
    }
}

/// Signs and verifies access/refresh tokens over process-wide secrets.
pub struct TokenIssuer {
    access: KeySet,
    refresh: KeySet,
    validation: Validation,
}

impl TokenIssuer {
    /// Build an issuer from the authentication configuration.
    pub fn new(config: &AuthConfig) -> Self {
        let mut validation = Validation::default();
        // Expiry is judged strictly by this process's clock.
        validation.leeway = 0;

        Self {
            access: KeySet::new(
                &config.access_token_secret,
                &config.access_token_previous_secrets,
                config.access_token_expiry(),
            ),
            refresh: KeySet::new(
                &config.refresh_token_secret,
                &config.refresh_token_previous_secrets,
                config.refresh_token_expiry(),
            ),
            validation,
        }
    }

    /// Issue a short-lived access token with identity and profile claims.
    pub fn issue_access_token(&self, account: &Account) -> Result<String> {
        let now = chrono::Utc::now();
        let claims = Claims {
            sub: account.id.to_string(),
            username: account.username.clone(),
            email: Some(account.email.clone()),
            role: Some(account.role.to_string()),
            kind: TokenKind::Access.as_str().to_string(),
            iat: now.timestamp(),
            exp: (now + self.access.expiry).timestamp(),
        };

        encode(&Header::default(), &claims, &self.access.encoding)
            .map_err(|err| Error::internal(format!("Failed to sign access token: {}", err)))
    }

    /// Issue a long-lived refresh token carrying identity only.
    pub fn issue_refresh_token(&self, account: &Account) -> Result<String> {
        let now = chrono::Utc::now();
        let claims = Claims {
            sub: account.id.to_string(),
            username: account.username.clone(),
            email: None,
            role: None,
            kind: TokenKind::Refresh.as_str().to_string(),
            iat: now.timestamp(),
            exp: (now + self.refresh.expiry).timestamp(),
        };

        encode(&Header::default(), &claims, &self.refresh.encoding)
            .map_err(|err| Error::internal(format!("Failed to sign refresh token: {}", err)))
    }

    /// Issue a fresh access/refresh pair for an account.
    pub fn issue_pair(&self, account: &Account) -> Result<TokenPair> {
        Ok(TokenPair {
            access_token: self.issue_access_token(account)?,
            refresh_token: self.issue_refresh_token(account)?,
        })
    }

    /// Verify a token of the expected kind and return its claims.
    ///
    /// Fails with `ExpiredToken` when the token was signed by an active key
    /// but is past its expiry, and `MalformedToken` for anything else
    /// (bad signature, wrong structure, wrong kind), so callers can prompt
    /// a refresh for the former and force re-login for the latter.
    pub fn verify(&self, token: &str, expected: TokenKind) -> Result<Claims> {
        let keys = match expected {
            TokenKind::Access => &self.access.decoding,
            TokenKind::Refresh => &self.refresh.decoding,
        };

        let mut saw_expired = false;
        for key in keys {
            match decode::<Claims>(token, key, &self.validation) {
                Ok(data) => {
                    if data.claims.kind != expected.as_str() {
                        return Err(Error::auth(
                            format!("Expected {} token", expected),
                            AuthErrorType::MalformedToken,
                        ));
                    }
                    return Ok(data.claims);
                }
                // ExpiredSignature means the signature checked out under
                // this key; remember it while the remaining keys are tried.
                Err(err) if matches!(err.kind(), ErrorKind::ExpiredSignature) => {
                    saw_expired = true;
                }
                Err(_) => {}
            }
        }

        if saw_expired {
            Err(Error::auth("Token has expired", AuthErrorType::ExpiredToken))
        } else {
            Err(Error::auth("Token is malformed or has an invalid signature", AuthErrorType::MalformedToken))
        }
    }

    /// The configured access token lifetime.
    pub fn access_token_expiry(&self) -> chrono::Duration {
        self.access.expiry
    }

    /// The configured refresh token lifetime.
    pub fn refresh_token_expiry(&self) -> chrono::Duration {
        self.refresh.expiry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::account::Role;
    use chrono::Utc;

    fn test_account() -> Account {
        Account {
            id: AccountId::new(),
            username: "ana".to_string(),
            email: "ana@example.com".to_string(),
            role: Role::User,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn test_config() -> AuthConfig {
        AuthConfig {
            access_token_secret: "access-secret-for-tests-0123456789ab".to_string(),
            refresh_token_secret: "refresh-secret-for-tests-0123456789a".to_string(),
            ..AuthConfig::default()
        }
    }

    #[test]
    fn test_access_token_round_trip() {
        let issuer = TokenIssuer::new(&test_config());
        let account = test_account();

        let token = issuer.issue_access_token(&account).unwrap();
        let claims = issuer.verify(&token, TokenKind::Access).unwrap();

        assert_eq!(claims.sub, account.id.to_string());
        assert_eq!(claims.username, "ana");
        assert_eq!(claims.email.as_deref(), Some("ana@example.com"));
        assert_eq!(claims.role.as_deref(), Some("user"));
        assert_eq!(claims.kind, "access");
    }

    #[test]
    fn test_refresh_token_carries_identity_only() {
        let issuer = TokenIssuer::new(&test_config());
        let account = test_account();

        let token = issuer.issue_refresh_token(&account).unwrap();
        let claims = issuer.verify(&token, TokenKind::Refresh).unwrap();

        assert_eq!(claims.sub, account.id.to_string());
        assert!(claims.email.is_none());
        assert!(claims.role.is_none());
        assert_eq!(claims.kind, "refresh");
    }

    #[test]
    fn test_access_token_rejected_as_refresh() {
        let issuer = TokenIssuer::new(&test_config());
        let token = issuer.issue_access_token(&test_account()).unwrap();

        let err = issuer.verify(&token, TokenKind::Refresh).unwrap_err();
        assert_eq!(err.auth_error_type(), Some(AuthErrorType::MalformedToken));
    }

    #[test]
    fn test_expired_token_reported_as_expired() {
        let config = AuthConfig {
            refresh_token_expiry_seconds: -3600,
            ..test_config()
        };
        let issuer = TokenIssuer::new(&config);
        let token = issuer.issue_refresh_token(&test_account()).unwrap();

        let err = issuer.verify(&token, TokenKind::Refresh).unwrap_err();
        assert_eq!(err.auth_error_type(), Some(AuthErrorType::ExpiredToken));
    }

    #[test]
    fn test_garbage_token_reported_as_malformed() {
        let issuer = TokenIssuer::new(&test_config());
        let err = issuer.verify("definitely.not.a-jwt", TokenKind::Access).unwrap_err();
        assert_eq!(err.auth_error_type(), Some(AuthErrorType::MalformedToken));
    }

    #[test]
    fn test_token_signed_with_unknown_secret_rejected() {
        let issuer = TokenIssuer::new(&test_config());
        let other = TokenIssuer::new(&AuthConfig {
            access_token_secret: "a-completely-different-secret-012345".to_string(),
            refresh_token_secret: "another-completely-different-secret0".to_string(),
            ..AuthConfig::default()
        });

        let token = other.issue_access_token(&test_account()).unwrap();
        let err = issuer.verify(&token, TokenKind::Access).unwrap_err();
        assert_eq!(err.auth_error_type(), Some(AuthErrorType::MalformedToken));
    }

    #[test]
    fn test_retired_secret_still_verifies_after_rollover() {
        let old_config = test_config();
        let old_issuer = TokenIssuer::new(&old_config);
        let token = old_issuer.issue_access_token(&test_account()).unwrap();

        let rolled = AuthConfig {
            access_token_secret: "brand-new-primary-secret-0123456789a".to_string(),
            access_token_previous_secrets: vec![old_config.access_token_secret.clone()],
            ..test_config()
        };
        let new_issuer = TokenIssuer::new(&rolled);

        let claims = new_issuer.verify(&token, TokenKind::Access).unwrap();
        assert_eq!(claims.username, "ana");
    }

    #[test]
    fn test_issued_pair_tokens_are_distinct() {
        let issuer = TokenIssuer::new(&test_config());
        let pair = issuer.issue_pair(&test_account()).unwrap();
        assert_ne!(pair.access_token, pair.refresh_token);
    }
}
