/// Account store
///
/// Every operation takes the storage session explicitly so callers decide
/// whether it runs on a pooled connection or inside a transaction.
use crate::{
    account::Role,
    db::{
        account::{Account, NewAccount},
        encode_timestamp,
    },
    error::{ModError, ModResult},
    query::{sql, Collection, Field, Page, Predicate, TextMatch},
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;

const SELECT_ACCOUNT: &str = "SELECT id, username, email, password_hash, role, created_at, last_login, attr FROM account";

/// Filterable account fields
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountField {
    Username,
    Role,
    CreatedAt,
}

impl Field for AccountField {
    fn column(self) -> &'static str {
        match self {
            AccountField::Username => "username",
            AccountField::Role => "role",
            AccountField::CreatedAt => "created_at",
        }
    }
}

/// Administrative listing criteria
#[derive(Debug, Clone, Default)]
pub struct AccountFilter {
    pub username: Option<TextMatch>,
    pub role: Option<Role>,
    pub created_after: Option<DateTime<Utc>>,
    pub created_before: Option<DateTime<Utc>>,
}

impl AccountFilter {
    pub fn predicate(&self) -> Predicate<AccountField> {
        Predicate::all()
            .text(AccountField::Username, self.username.as_ref())
            .equals(AccountField::Role, self.role.as_ref().map(Role::as_str))
            .after(AccountField::CreatedAt, self.created_after)
            .before(AccountField::CreatedAt, self.created_before)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AccountStore;

impl AccountStore {
    pub fn new() -> Self {
        Self
    }

    /// Look up an account by exact username
    pub async fn find_by_username(
        &self,
        conn: &mut SqliteConnection,
        username: &str,
    ) -> ModResult<Option<Account>> {
        let account = sqlx::query_as::<_, Account>(&format!("{} WHERE username = ?", SELECT_ACCOUNT))
            .bind(username)
            .fetch_optional(&mut *conn)
            .await?;

        Ok(account)
    }

    /// Look up an account by exact email
    pub async fn find_by_email(
        &self,
        conn: &mut SqliteConnection,
        email: &str,
    ) -> ModResult<Option<Account>> {
        let account = sqlx::query_as::<_, Account>(&format!("{} WHERE email = ?", SELECT_ACCOUNT))
            .bind(email)
            .fetch_optional(&mut *conn)
            .await?;

        Ok(account)
    }

    /// Move `account` to `role`, provided its stored role is still the one
    /// that was read.
    ///
    /// Fails with `IneligibleTarget` when another writer changed the role
    /// first, so a guard decision is never applied to stale state.
    pub async fn update_role(
        &self,
        conn: &mut SqliteConnection,
        account: &Account,
        role: Role,
    ) -> ModResult<Account> {
        let result = sqlx::query("UPDATE account SET role = ? WHERE id = ? AND role = ?")
            .bind(role.as_str())
            .bind(account.id)
            .bind(account.role.as_str())
            .execute(&mut *conn)
            .await?;

        if result.rows_affected() == 0 {
            return Err(ModError::IneligibleTarget(format!(
                "Role of {} changed concurrently",
                account.username
            )));
        }

        Ok(Account {
            role,
            ..account.clone()
        })
    }

    /// Insert an account on behalf of the registration flow
    pub async fn insert(
        &self,
        conn: &mut SqliteConnection,
        account: NewAccount,
    ) -> ModResult<Account> {
        let result = sqlx::query(
            r#"
            INSERT INTO account (username, email, password_hash, role, created_at, attr)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&account.username)
        .bind(&account.email)
        .bind(&account.password_hash)
        .bind(account.role.as_str())
        .bind(encode_timestamp(&account.created_at))
        .bind(&account.attr)
        .execute(&mut *conn)
        .await?;

        Ok(Account {
            id: result.last_insert_rowid(),
            username: account.username,
            email: account.email,
            password_hash: account.password_hash,
            role: account.role,
            created_at: account.created_at,
            last_login: None,
            attr: account.attr,
        })
    }
}

#[async_trait]
impl Collection for AccountStore {
    type Filter = AccountFilter;
    type Item = Account;

    async fn count(&self, conn: &mut SqliteConnection, filter: &AccountFilter) -> ModResult<i64> {
        Ok(sql::count(conn, "account", &filter.predicate()).await?)
    }

    async fn list(
        &self,
        conn: &mut SqliteConnection,
        filter: &AccountFilter,
        page: Page,
    ) -> ModResult<Vec<Account>> {
        Ok(sql::list(conn, SELECT_ACCOUNT, &filter.predicate(), page).await?)
    }
}
