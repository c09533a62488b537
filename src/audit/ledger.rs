/// Ledger storage operations
use super::{AuditEvent, EventFilter};
use crate::{
    db::encode_timestamp,
    error::ModResult,
    query::{sql, Collection, Page},
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::SqliteConnection;

const SELECT_EVENT: &str = "SELECT id, action, detail, created_at FROM audit_event";

#[derive(Debug, Clone, Copy, Default)]
pub struct AuditLedger;

impl AuditLedger {
    pub fn new() -> Self {
        Self
    }

    /// Append an event.
    ///
    /// The detail is encoded before anything is written; an encoding failure
    /// is returned as `Serialization` and nothing is inserted.
    pub async fn append<T: Serialize + ?Sized>(
        &self,
        conn: &mut SqliteConnection,
        action: &str,
        detail: &T,
        created_at: DateTime<Utc>,
    ) -> ModResult<AuditEvent> {
        let encoded = serde_json::to_string(detail)?;

        let result = sqlx::query(
            r#"
            INSERT INTO audit_event (action, detail, created_at)
            VALUES (?, ?, ?)
            "#,
        )
        .bind(action)
        .bind(&encoded)
        .bind(encode_timestamp(&created_at))
        .execute(&mut *conn)
        .await?;

        Ok(AuditEvent {
            id: result.last_insert_rowid(),
            action: action.to_string(),
            detail: encoded,
            created_at,
        })
    }
}

#[async_trait]
impl Collection for AuditLedger {
    type Filter = EventFilter;
    type Item = AuditEvent;

    async fn count(&self, conn: &mut SqliteConnection, filter: &EventFilter) -> ModResult<i64> {
        Ok(sql::count(conn, "audit_event", &filter.predicate()).await?)
    }

    async fn list(
        &self,
        conn: &mut SqliteConnection,
        filter: &EventFilter,
        page: Page,
    ) -> ModResult<Vec<AuditEvent>> {
        Ok(sql::list(conn, SELECT_EVENT, &filter.predicate(), page).await?)
    }
}
