//! Repository implementations over the SQLite pool.

mod account;
mod audit_log;

pub use account::{AccountRepository, SqlxAccountRepository};
pub use audit_log::{AuditEvent, AuditLogRepository};
