//! # Error Handling
//!
//! Error types for the StreamGate authentication core, built on `thiserror`.
//! Expected failures (bad credentials, stale tokens) are carried as error
//! kinds; panics are reserved for unrecoverable faults.

use std::fmt;

/// Custom result type for StreamGate operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the authentication core
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Validation errors (missing or malformed input)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Authentication and session errors
    #[error("Authentication error: {message}")]
    Auth {
        message: String,
        error_type: AuthErrorType,
    },

    /// Resource not found errors
    #[error("Not found: {0}")]
    NotFound(String),

    /// Database and storage errors
    #[error("Database error: {context}")]
    Database {
        #[source]
        source: sqlx::Error,
        context: String,
    },

    /// Outbound mail delivery errors
    #[error("Mail delivery error: {0}")]
    Mail(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal server errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Authentication error subtypes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthErrorType {
    InvalidCredentials,
    ExpiredToken,
    MalformedToken,
    MissingToken,
    InvalidRefreshToken,
    ResetTokenInvalidOrExpired,
}

impl fmt::Display for AuthErrorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthErrorType::InvalidCredentials => write!(f, "invalid_credentials"),
            AuthErrorType::ExpiredToken => write!(f, "expired_token"),
            AuthErrorType::MalformedToken => write!(f, "malformed_token"),
            AuthErrorType::MissingToken => write!(f, "missing_token"),
            AuthErrorType::InvalidRefreshToken => write!(f, "invalid_refresh_token"),
            AuthErrorType::ResetTokenInvalidOrExpired => write!(f, "reset_token_invalid_or_expired"),
        }
    }
}

impl Error {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation(message.into())
    }

    /// Create an authentication error
    pub fn auth<S: Into<String>>(message: S, error_type: AuthErrorType) -> Self {
        Self::Auth { message: message.into(), error_type }
    }

    /// Create a not found error
    pub fn not_found<S: Into<String>>(message: S) -> Self {
        Self::NotFound(message.into())
    }

    /// Create a mail delivery error
    pub fn mail<S: Into<String>>(message: S) -> Self {
        Self::Mail(message.into())
    }

    /// Create an internal server error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal(message.into())
    }

    /// The auth error subtype, when this is an authentication error.
    pub fn auth_error_type(&self) -> Option<AuthErrorType> {
        match self {
            Error::Auth { error_type, .. } => Some(*error_type),
            _ => None,
        }
    }
}

impl From<sqlx::Error> for Error {
    fn from(error: sqlx::Error) -> Self {
        Self::Database { source: error, context: "Database operation failed".to_string() }
    }
}

impl From<validator::ValidationErrors> for Error {
    fn from(errors: validator::ValidationErrors) -> Self {
        let message = errors
            .field_errors()
            .iter()
            .map(|(field, field_errors)| {
                let messages: Vec<String> = field_errors
                    .iter()
                    .map(|e| {
                        e.message.as_ref().map_or("Invalid value".to_string(), |m| m.to_string())
                    })
                    .collect();
                format!("{}: {}", field, messages.join(", "))
            })
            .collect::<Vec<_>>()
            .join("; ");

        Self::validation(message)
    }
}
