/// Moderation service
use super::{attempt_transition, Clock, StrikePolicy, SystemClock, ESCALATION_REASON};
use crate::{
    account::{Account, AccountFilter, AccountStore, Role},
    audit::{actions, AuditEvent, AuditLedger, EventFilter, ModerationDetail},
    auth::ActorIdentity,
    error::{ModError, ModResult},
    query::{Collection, Page, TextMatch},
};
use serde::Serialize;
use sqlx::{Sqlite, SqliteConnection, SqlitePool, Transaction};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Result of an explicit restrict or ban
#[derive(Debug, Clone, Serialize)]
pub struct ModerationOutcome {
    pub account: Account,
    pub event: AuditEvent,
}

/// Result of a strike
#[derive(Debug, Clone, Serialize)]
pub struct StrikeOutcome {
    pub account: Account,
    pub strike: AuditEvent,
    /// Qualifying events seen in the window, capped at the threshold
    pub strikes_in_window: i64,
    /// Automatic restriction event, when the threshold was reached
    pub escalation: Option<AuditEvent>,
}

/// One page of a listing plus the (separately counted) total
#[derive(Debug, Clone, Serialize)]
pub struct Paged<T> {
    pub total: i64,
    pub items: Vec<T>,
}

/// How to find a single account
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountLookup {
    Username(String),
    Email(String),
}

/// Moderation service
#[derive(Clone)]
pub struct ModerationService {
    db: SqlitePool,
    accounts: AccountStore,
    ledger: AuditLedger,
    policy: StrikePolicy,
    clock: Arc<dyn Clock>,
}

impl ModerationService {
    pub fn new(db: SqlitePool, policy: StrikePolicy) -> Self {
        Self {
            db,
            accounts: AccountStore::new(),
            ledger: AuditLedger::new(),
            policy,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn policy(&self) -> StrikePolicy {
        self.policy
    }

    /// Restrict a member account
    pub async fn restrict_user(
        &self,
        actor: &ActorIdentity,
        username: &str,
        reason: &str,
    ) -> ModResult<ModerationOutcome> {
        self.change_role(actor, username, reason, Role::Restricted, actions::RESTRICT_USER)
            .await
    }

    /// Ban a member account
    pub async fn ban_user(
        &self,
        actor: &ActorIdentity,
        username: &str,
        reason: &str,
    ) -> ModResult<ModerationOutcome> {
        self.change_role(actor, username, reason, Role::Banned, actions::BAN_USER)
            .await
    }

    /// Record a strike and restrict the account once the window holds
    /// `threshold` of them.
    ///
    /// Strikes are tagged `restrict-user`, the same tag as explicit
    /// restrictions, and the count is over that tag. The strike written by
    /// this call is part of the count, so the restricting call is the
    /// threshold-th strike, not the one after it.
    pub async fn strike_user(
        &self,
        actor: &ActorIdentity,
        username: &str,
        reason: &str,
        evidence: &str,
    ) -> ModResult<StrikeOutcome> {
        ensure_privileged(actor)?;
        require("username", username)?;
        require("reason", reason)?;
        require("evidence", evidence)?;

        let mut tx = self.begin().await?;

        let account = self.load_target(&mut tx, username).await?;
        let restricted = self.guard(&account, Role::Restricted)?;

        let now = self.clock.now();
        let window_start = now.checked_sub_signed(self.policy.window).ok_or_else(|| {
            ModError::Internal(format!("Strike window {} out of range", self.policy.window))
        })?;
        let detail = ModerationDetail::new(&actor.username, &account.username, reason)
            .with_evidence(evidence);
        let strike = self
            .ledger
            .append(&mut tx, actions::RESTRICT_USER, &detail, now)
            .await?;

        // Only need to know whether the threshold is reached, so read at most that many
        let recent = EventFilter {
            target_user: Some(TextMatch::Exact(account.username.clone())),
            action: Some(actions::RESTRICT_USER.to_string()),
            created_after: Some(window_start),
            ..Default::default()
        };
        let strikes_in_window = self
            .ledger
            .list(&mut tx, &recent, Page::new(0, self.policy.threshold)?)
            .await?
            .len() as i64;

        debug!(
            target_user = %account.username,
            strikes_in_window,
            threshold = self.policy.threshold,
            "Counted recent strikes"
        );

        let (account, escalation) = if strikes_in_window >= self.policy.threshold {
            let account = self.accounts.update_role(&mut tx, &account, restricted).await?;
            let detail = ModerationDetail::new(&actor.username, &account.username, ESCALATION_REASON);
            let event = self
                .ledger
                .append(&mut tx, actions::RESTRICT_USER, &detail, now)
                .await?;
            (account, Some(event))
        } else {
            (account, None)
        };

        tx.commit().await?;

        if escalation.is_some() {
            info!(
                actor_user = %actor.username,
                target_user = %account.username,
                strikes_in_window,
                "Strike limit reached, account restricted"
            );
        } else {
            info!(
                actor_user = %actor.username,
                target_user = %account.username,
                strikes_in_window,
                threshold = self.policy.threshold,
                "Strike recorded"
            );
        }

        Ok(StrikeOutcome {
            account,
            strike,
            strikes_in_window,
            escalation,
        })
    }

    /// Paged account listing
    pub async fn list_accounts(
        &self,
        filter: &AccountFilter,
        page: Page,
    ) -> ModResult<Paged<Account>> {
        let mut conn = self.db.acquire().await?;
        let total = self.accounts.count(&mut conn, filter).await?;
        let items = self.accounts.list(&mut conn, filter, page).await?;

        Ok(Paged { total, items })
    }

    /// Paged audit trail
    pub async fn list_events(
        &self,
        filter: &EventFilter,
        page: Page,
    ) -> ModResult<Paged<AuditEvent>> {
        let mut conn = self.db.acquire().await?;
        let total = self.ledger.count(&mut conn, filter).await?;
        let items = self.ledger.list(&mut conn, filter, page).await?;

        Ok(Paged { total, items })
    }

    /// Single account by username or email
    pub async fn find_account(&self, lookup: &AccountLookup) -> ModResult<Account> {
        let mut conn = self.db.acquire().await?;
        let found = match lookup {
            AccountLookup::Username(username) => {
                self.accounts.find_by_username(&mut conn, username).await?
            }
            AccountLookup::Email(email) => self.accounts.find_by_email(&mut conn, email).await?,
        };

        found.ok_or_else(|| ModError::NotFound("Account not found".to_string()))
    }

    async fn change_role(
        &self,
        actor: &ActorIdentity,
        username: &str,
        reason: &str,
        target: Role,
        action: &str,
    ) -> ModResult<ModerationOutcome> {
        ensure_privileged(actor)?;
        require("username", username)?;
        require("reason", reason)?;

        let mut tx = self.begin().await?;

        let account = self.load_target(&mut tx, username).await?;
        let role = self.guard(&account, target)?;
        let account = self.accounts.update_role(&mut tx, &account, role).await?;

        let detail = ModerationDetail::new(&actor.username, &account.username, reason);
        let event = self
            .ledger
            .append(&mut tx, action, &detail, self.clock.now())
            .await?;

        tx.commit().await?;

        info!(
            action,
            actor_user = %actor.username,
            target_user = %account.username,
            role = %account.role,
            "Account role changed"
        );

        Ok(ModerationOutcome { account, event })
    }

    /// Write transaction taken at BEGIN; concurrent moderation calls wait on
    /// the busy timeout rather than upgrading mid-transaction.
    async fn begin(&self) -> ModResult<Transaction<'static, Sqlite>> {
        Ok(self.db.begin_with("BEGIN IMMEDIATE").await?)
    }

    async fn load_target(&self, conn: &mut SqliteConnection, username: &str) -> ModResult<Account> {
        self.accounts
            .find_by_username(conn, username)
            .await?
            .ok_or_else(|| {
                warn!("Moderation target not found: {}", username);
                ModError::NotFound(format!("User {} does not exist", username))
            })
    }

    fn guard(&self, account: &Account, target: Role) -> ModResult<Role> {
        attempt_transition(account.role, target).map_err(|e| {
            warn!(
                target_user = %account.username,
                current_role = %account.role,
                "Rejected moderation of ineligible account"
            );
            e
        })
    }
}

fn ensure_privileged(actor: &ActorIdentity) -> ModResult<()> {
    if actor.role.is_privileged() {
        Ok(())
    } else {
        Err(ModError::Authorization(format!(
            "{} may not moderate accounts",
            actor.username
        )))
    }
}

fn require(field: &str, value: &str) -> ModResult<()> {
    if value.trim().is_empty() {
        return Err(ModError::Validation(format!("{} is required", field)));
    }
    Ok(())
}
