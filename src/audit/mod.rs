/// Audit ledger
///
/// Append-only history of moderation actions. Events are never updated or
/// deleted; the schema rejects both.

mod ledger;

pub use ledger::AuditLedger;

use crate::db::decode_timestamp;
use crate::error::ModResult;
use crate::query::{Field, Predicate, TextMatch};
use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row};

/// Action tags written to the ledger
pub mod actions {
    /// Explicit restriction, strike, and strike escalation all share this tag
    pub const RESTRICT_USER: &str = "restrict-user";
    pub const BAN_USER: &str = "ban-user";
}

/// Stored audit event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    pub id: i64,
    pub action: String,
    /// JSON-encoded detail payload
    pub detail: String,
    pub created_at: DateTime<Utc>,
}

impl AuditEvent {
    /// Decode the detail payload
    pub fn detail<T: DeserializeOwned>(&self) -> ModResult<T> {
        Ok(serde_json::from_str(&self.detail)?)
    }
}

impl<'r> FromRow<'r, SqliteRow> for AuditEvent {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(AuditEvent {
            id: row.try_get("id")?,
            action: row.try_get("action")?,
            detail: row.try_get("detail")?,
            created_at: decode_timestamp(&row.try_get::<String, _>("created_at")?)?,
        })
    }
}

/// Detail payload of a moderation event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModerationDetail {
    pub actor_user: String,
    pub target_user: String,
    pub reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evidence: Option<String>,
}

impl ModerationDetail {
    pub fn new(actor: &str, target: &str, reason: &str) -> Self {
        Self {
            actor_user: actor.to_string(),
            target_user: target.to_string(),
            reason: reason.to_string(),
            evidence: None,
        }
    }

    pub fn with_evidence(mut self, evidence: &str) -> Self {
        self.evidence = Some(evidence.to_string());
        self
    }
}

/// Filterable event fields
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventField {
    ActorUser,
    TargetUser,
    Action,
    CreatedAt,
}

impl Field for EventField {
    fn column(self) -> &'static str {
        match self {
            EventField::ActorUser => "json_extract(detail, '$.actor_user')",
            EventField::TargetUser => "json_extract(detail, '$.target_user')",
            EventField::Action => "action",
            EventField::CreatedAt => "created_at",
        }
    }
}

/// Audit trail criteria
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    pub actor_user: Option<TextMatch>,
    pub target_user: Option<TextMatch>,
    pub action: Option<String>,
    pub created_after: Option<DateTime<Utc>>,
    pub created_before: Option<DateTime<Utc>>,
}

impl EventFilter {
    pub fn predicate(&self) -> Predicate<EventField> {
        Predicate::all()
            .text(EventField::ActorUser, self.actor_user.as_ref())
            .text(EventField::TargetUser, self.target_user.as_ref())
            .equals(EventField::Action, self.action.as_deref())
            .after(EventField::CreatedAt, self.created_after)
            .before(EventField::CreatedAt, self.created_before)
    }
}
