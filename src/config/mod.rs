//! # Configuration Management
//!
//! Process-wide configuration for the StreamGate authentication core.
//! Configuration is loaded once at startup from the environment and passed
//! explicitly into the components that need it, so tests can supply
//! fixtures instead of touching process state.

mod settings;

pub use settings::{
    AppConfig, AuthConfig, DatabaseConfig, ObservabilityConfig, ServerConfig, SmtpConfig,
};
