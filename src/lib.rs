//! # StreamGate
//!
//! StreamGate is the authentication and session core of a media-sharing
//! platform backend: password hashing, access/refresh token issuance with
//! rotation, and the one-time password-reset flow, exposed over a REST
//! boundary.
//!
//! ## Architecture
//!
//! The system follows a layered architecture pattern:
//!
//! ```text
//! REST API Layer → Session / Reset Services → Credential Store
//!      ↓                    ↓                       ↓
//! Auth Middleware    Hashing & Tokens       Persistence Layer
//! ```
//!
//! ## Core Components
//!
//! - **REST API Layer**: Axum-based HTTP surface for the auth endpoints
//! - **Session Service**: login, refresh-with-rotation, logout, password
//!   change
//! - **Password Reset Service**: one-time emailed reset tokens
//! - **Persistence Layer**: SQLx with SQLite for accounts and the audit
//!   trail
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use streamgate::{api, config::AppConfig, storage};
//!
//! #[tokio::main]
//! async fn main() -> streamgate::Result<()> {
//!     let config = AppConfig::from_env()?;
//!     let pool = storage::create_pool(&config.database).await?;
//!     let state = api::ApiState::from_config(pool, &config)?;
//!     let router = api::build_router(state, config.server.enable_cors);
//!     let listener = tokio::net::TcpListener::bind(config.server.bind_address()).await?;
//!     axum::serve(listener, router).await?;
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod auth;
pub mod config;
pub mod domain;
pub mod errors;
pub mod mail;
pub mod observability;
pub mod storage;

// Re-export commonly used types and traits
pub use config::AppConfig;
pub use errors::{Error, Result};
pub use observability::init_observability;

/// Application version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name from Cargo.toml
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
