/// Admin moderation endpoints
use super::extract::{self, ValidatedJson};
use crate::{
    account::{Account, AccountFilter, Role},
    audit::{AuditEvent, EventFilter},
    auth::AdminActor,
    context::AppContext,
    error::{ModError, ModResult},
    moderation::AccountLookup,
    query::{Page, TextMatch},
};
use axum::{
    extract::{rejection::QueryRejection, Query, State},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

const DEFAULT_PAGE_SIZE: i64 = 50;
const MAX_PAGE_SIZE: i64 = 100;

/// Build admin API routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/admin/users", get(list_users))
        .route("/admin/account", get(get_account))
        .route("/admin/user/restrict", post(restrict_user))
        .route("/admin/user/ban", post(ban_user))
        .route("/admin/user/strike", post(strike_user))
        .route("/admin/events", get(list_events))
}

// ============================================================================
// Response shapes
// ============================================================================

#[derive(Debug, Serialize)]
pub struct PageResponse<T> {
    pub total: i64,
    pub items: Vec<T>,
}

#[derive(Debug, Serialize)]
pub struct AccountView {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
    pub attr: String,
}

impl From<Account> for AccountView {
    fn from(account: Account) -> Self {
        Self {
            id: account.id,
            name: account.username,
            email: account.email,
            role: account.role,
            created_at: account.created_at,
            last_login: account.last_login,
            attr: account.attr,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct EventView {
    pub id: i64,
    pub action: String,
    pub detail: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl From<AuditEvent> for EventView {
    fn from(event: AuditEvent) -> Self {
        // Older rows may hold non-JSON text; show it verbatim
        let detail = serde_json::from_str(&event.detail)
            .unwrap_or_else(|_| serde_json::Value::String(event.detail.clone()));
        Self {
            id: event.id,
            action: event.action,
            detail,
            created_at: event.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ModerationResponse {
    pub success: bool,
    pub username: String,
    pub role: Role,
    pub event_id: i64,
}

#[derive(Debug, Serialize)]
pub struct StrikeResponse {
    pub success: bool,
    pub username: String,
    pub role: Role,
    pub strike_event_id: i64,
    pub strikes_in_window: i64,
    pub escalated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub escalation_event_id: Option<i64>,
}

fn page(page: Option<i64>, page_size: Option<i64>) -> ModResult<Page> {
    let size = page_size.unwrap_or(DEFAULT_PAGE_SIZE).min(MAX_PAGE_SIZE);
    Page::from_number(page.unwrap_or(1), size)
}

// ============================================================================
// Account listing
// ============================================================================

#[derive(Debug, Deserialize)]
struct ListUsersQuery {
    username: Option<String>,
    role: Option<String>,
    created_after: Option<String>,
    created_before: Option<String>,
    page: Option<i64>,
    page_size: Option<i64>,
}

/// List accounts, filtered and paginated
async fn list_users(
    State(ctx): State<AppContext>,
    AdminActor(_actor): AdminActor,
    params: Result<Query<ListUsersQuery>, QueryRejection>,
) -> ModResult<Json<PageResponse<AccountView>>> {
    let params = extract::query(params)?;

    let role = extract::non_empty(params.role)
        .map(|r| r.parse::<Role>().map_err(|e| ModError::Validation(e.to_string())))
        .transpose()?;
    let filter = AccountFilter {
        username: extract::non_empty(params.username).map(TextMatch::Pattern),
        role,
        created_after: extract::timestamp("created_after", params.created_after)?,
        created_before: extract::timestamp("created_before", params.created_before)?,
    };

    let paged = ctx
        .moderation
        .list_accounts(&filter, page(params.page, params.page_size)?)
        .await
        .map_err(|e| {
            tracing::error!("Failed to list users: {}", e);
            e
        })?;

    Ok(Json(PageResponse {
        total: paged.total,
        items: paged.items.into_iter().map(AccountView::from).collect(),
    }))
}

#[derive(Debug, Deserialize)]
struct GetAccountQuery {
    username: Option<String>,
    email: Option<String>,
}

/// Look up one account by username or email
async fn get_account(
    State(ctx): State<AppContext>,
    AdminActor(_actor): AdminActor,
    params: Result<Query<GetAccountQuery>, QueryRejection>,
) -> ModResult<Json<AccountView>> {
    let params = extract::query(params)?;

    let lookup = match (extract::non_empty(params.username), extract::non_empty(params.email)) {
        (Some(username), None) => AccountLookup::Username(username),
        (None, Some(email)) => AccountLookup::Email(email),
        _ => {
            return Err(ModError::Validation(
                "Provide exactly one of username or email".to_string(),
            ))
        }
    };

    let account = ctx.moderation.find_account(&lookup).await?;
    Ok(Json(account.into()))
}

// ============================================================================
// Moderation actions
// ============================================================================

#[derive(Debug, Deserialize, Validate)]
struct ModerateRequest {
    #[validate(length(min = 1, message = "username is required"))]
    username: String,
    #[validate(length(min = 1, message = "reason is required"))]
    reason: String,
}

#[derive(Debug, Deserialize, Validate)]
struct StrikeRequest {
    #[validate(length(min = 1, message = "username is required"))]
    username: String,
    #[validate(length(min = 1, message = "reason is required"))]
    reason: String,
    #[validate(length(min = 1, message = "evidence is required"))]
    evidence: String,
}

/// Restrict a member account
async fn restrict_user(
    State(ctx): State<AppContext>,
    AdminActor(actor): AdminActor,
    ValidatedJson(req): ValidatedJson<ModerateRequest>,
) -> ModResult<Json<ModerationResponse>> {
    let outcome = ctx
        .moderation
        .restrict_user(&actor, &req.username, &req.reason)
        .await?;

    Ok(Json(ModerationResponse {
        success: true,
        username: outcome.account.username,
        role: outcome.account.role,
        event_id: outcome.event.id,
    }))
}

/// Ban a member account
async fn ban_user(
    State(ctx): State<AppContext>,
    AdminActor(actor): AdminActor,
    ValidatedJson(req): ValidatedJson<ModerateRequest>,
) -> ModResult<Json<ModerationResponse>> {
    let outcome = ctx
        .moderation
        .ban_user(&actor, &req.username, &req.reason)
        .await?;

    Ok(Json(ModerationResponse {
        success: true,
        username: outcome.account.username,
        role: outcome.account.role,
        event_id: outcome.event.id,
    }))
}

/// Record a strike against a member account
async fn strike_user(
    State(ctx): State<AppContext>,
    AdminActor(actor): AdminActor,
    ValidatedJson(req): ValidatedJson<StrikeRequest>,
) -> ModResult<Json<StrikeResponse>> {
    let outcome = ctx
        .moderation
        .strike_user(&actor, &req.username, &req.reason, &req.evidence)
        .await?;

    Ok(Json(StrikeResponse {
        success: true,
        username: outcome.account.username,
        role: outcome.account.role,
        strike_event_id: outcome.strike.id,
        strikes_in_window: outcome.strikes_in_window,
        escalated: outcome.escalation.is_some(),
        escalation_event_id: outcome.escalation.map(|e| e.id),
    }))
}

// ============================================================================
// Audit trail
// ============================================================================

#[derive(Debug, Deserialize)]
struct ListEventsQuery {
    actor_user: Option<String>,
    target_user: Option<String>,
    action: Option<String>,
    created_after: Option<String>,
    created_before: Option<String>,
    page: Option<i64>,
    page_size: Option<i64>,
}

/// List audit events, filtered and paginated
async fn list_events(
    State(ctx): State<AppContext>,
    AdminActor(_actor): AdminActor,
    params: Result<Query<ListEventsQuery>, QueryRejection>,
) -> ModResult<Json<PageResponse<EventView>>> {
    let params = extract::query(params)?;

    let filter = EventFilter {
        actor_user: extract::non_empty(params.actor_user).map(TextMatch::Pattern),
        target_user: extract::non_empty(params.target_user).map(TextMatch::Pattern),
        action: extract::non_empty(params.action),
        created_after: extract::timestamp("created_after", params.created_after)?,
        created_before: extract::timestamp("created_before", params.created_before)?,
    };

    let paged = ctx
        .moderation
        .list_events(&filter, page(params.page, params.page_size)?)
        .await?;

    Ok(Json(PageResponse {
        total: paged.total,
        items: paged.items.into_iter().map(EventView::from).collect(),
    }))
}
