//! Shared fixtures for integration tests
#![allow(dead_code)]

use account_moderation::{
    account::{Account, AccountStore, NewAccount, Role},
    audit::{actions, AuditEvent, AuditLedger, EventFilter, ModerationDetail},
    auth::ActorIdentity,
    db,
    moderation::Clock,
    query::{Collection, Page, TextMatch},
};
use chrono::{DateTime, TimeZone, Utc};
use sqlx::SqlitePool;
use tempfile::TempDir;

/// Clock pinned to one instant
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

pub fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, 18, 12, 0, 0).unwrap()
}

pub async fn setup() -> (TempDir, SqlitePool) {
    let dir = tempfile::tempdir().unwrap();
    let pool = db::create_pool(&dir.path().join("moderation.sqlite"), db::DatabaseOptions::default())
        .await
        .unwrap();
    db::run_migrations(&pool).await.unwrap();
    (dir, pool)
}

pub fn admin() -> ActorIdentity {
    ActorIdentity {
        username: "root".to_string(),
        role: Role::Admin,
    }
}

pub async fn seed_account(pool: &SqlitePool, username: &str, role: Role) -> Account {
    let mut conn = pool.acquire().await.unwrap();
    AccountStore::new()
        .insert(
            &mut conn,
            NewAccount {
                username: username.to_string(),
                email: format!("{}@example.com", username),
                password_hash: "$argon2id$opaque".to_string(),
                role,
                created_at: fixed_now(),
                attr: String::new(),
            },
        )
        .await
        .unwrap()
}

/// Write a strike event directly, as an earlier call would have
pub async fn seed_strike(pool: &SqlitePool, target: &str, at: DateTime<Utc>) -> AuditEvent {
    let mut conn = pool.acquire().await.unwrap();
    let detail = ModerationDetail::new("root", target, "earlier strike").with_evidence("log excerpt");
    AuditLedger::new()
        .append(&mut conn, actions::RESTRICT_USER, &detail, at)
        .await
        .unwrap()
}

pub async fn role_of(pool: &SqlitePool, username: &str) -> Role {
    let mut conn = pool.acquire().await.unwrap();
    AccountStore::new()
        .find_by_username(&mut conn, username)
        .await
        .unwrap()
        .unwrap()
        .role
}

/// Every event targeting `username`, oldest first
pub async fn events_for(pool: &SqlitePool, username: &str) -> Vec<AuditEvent> {
    let mut conn = pool.acquire().await.unwrap();
    let filter = EventFilter {
        target_user: Some(TextMatch::Exact(username.to_string())),
        ..Default::default()
    };
    AuditLedger::new()
        .list(&mut conn, &filter, Page::new(0, 100).unwrap())
        .await
        .unwrap()
}
