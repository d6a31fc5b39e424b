//! Audit trail for authentication events.
//!
//! Events carry JSON metadata; secret material (passwords, tokens) must
//! never be written here.

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use tracing::instrument;

use crate::errors::{Error, Result};
use crate::storage::DbPool;

/// A single auth-related audit event.
#[derive(Debug, Clone)]
pub struct AuditEvent {
    pub event_type: String,
    pub account_id: Option<String>,
    pub metadata: serde_json::Value,
}

impl AuditEvent {
    pub fn new<S: Into<String>>(
        event_type: S,
        account_id: Option<&str>,
        metadata: serde_json::Value,
    ) -> Self {
        Self {
            event_type: event_type.into(),
            account_id: account_id.map(|id| id.to_string()),
            metadata,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct AuditEventRow {
    pub id: String,
    pub event_type: String,
    pub account_id: Option<String>,
    pub metadata: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct AuditLogRepository {
    pool: DbPool,
}

impl AuditLogRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    #[instrument(skip(self, event), fields(event_type = %event.event_type), name = "db_record_auth_event")]
    pub async fn record_auth_event(&self, event: AuditEvent) -> Result<()> {
        let metadata = serde_json::to_string(&event.metadata)
            .map_err(|err| Error::internal(format!("Failed to serialize audit metadata: {}", err)))?;

        sqlx::query(
            r#"
            INSERT INTO audit_events (id, event_type, account_id, metadata, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(uuid::Uuid::new_v4().to_string())
        .bind(&event.event_type)
        .bind(&event.account_id)
        .bind(&metadata)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|err| Error::Database {
            source: err,
            context: "Failed to record audit event".to_string(),
        })?;

        Ok(())
    }

    #[instrument(skip(self), name = "db_list_auth_events")]
    pub async fn list_events_for_account(&self, account_id: &str) -> Result<Vec<AuditEventRow>> {
        sqlx::query_as::<_, AuditEventRow>(
            "SELECT id, event_type, account_id, metadata, created_at FROM audit_events \
             WHERE account_id = $1 ORDER BY created_at",
        )
        .bind(account_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|err| Error::Database {
            source: err,
            context: "Failed to list audit events".to_string(),
        })
    }
}
