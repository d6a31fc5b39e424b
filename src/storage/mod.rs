//! # Storage Layer
//!
//! SQLite-backed persistence for accounts and the auth audit trail.

pub mod pool;
pub mod repositories;

pub use pool::{create_pool, DbPool};
