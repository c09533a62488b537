/// Account database models
use crate::account::Role;
use crate::db::decode_timestamp;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row};

/// Account record in the database
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: i64,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
    pub attr: String,
}

impl<'r> FromRow<'r, SqliteRow> for Account {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        // Reject anything outside the closed role set at the storage boundary
        let role = row
            .try_get::<String, _>("role")?
            .parse::<Role>()
            .map_err(|e| sqlx::Error::Decode(Box::new(e)))?;

        let created_at = decode_timestamp(&row.try_get::<String, _>("created_at")?)?;
        let last_login = row
            .try_get::<Option<String>, _>("last_login")?
            .map(|s| decode_timestamp(&s))
            .transpose()?;

        Ok(Account {
            id: row.try_get("id")?,
            username: row.try_get("username")?,
            email: row.try_get("email")?,
            password_hash: row.try_get("password_hash")?,
            role,
            created_at,
            last_login,
            attr: row.try_get("attr")?,
        })
    }
}

/// Fields supplied by the registration flow
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub attr: String,
}
