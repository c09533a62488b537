/// Filter/query contract
///
/// Backend-neutral predicates over a collection's fields. Conditions are
/// combined with AND; an empty predicate matches every row. Storage backends
/// translate a [`Predicate`] into their own query language (see [`sql`]).

pub mod sql;

use crate::error::{ModError, ModResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqliteConnection;

/// A filterable field of some collection
pub trait Field: Copy + Send + Sync {
    /// Storage expression that yields this field's value
    fn column(self) -> &'static str;
}

/// How a string criterion is matched
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "mode", content = "value")]
pub enum TextMatch {
    /// Byte-for-byte equality
    Exact(String),
    /// LIKE pattern; `%` and `_` are the caller's wildcards
    Pattern(String),
}

/// A single criterion
#[derive(Debug, Clone, PartialEq)]
pub enum Condition<F> {
    Equals(F, String),
    Like(F, String),
    /// Strictly greater than
    After(F, DateTime<Utc>),
    /// Strictly less than
    Before(F, DateTime<Utc>),
}

/// Conjunction of conditions
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate<F> {
    conditions: Vec<Condition<F>>,
}

impl<F: Field> Predicate<F> {
    /// Predicate that matches everything
    pub fn all() -> Self {
        Self {
            conditions: Vec::new(),
        }
    }

    pub fn and(mut self, condition: Condition<F>) -> Self {
        self.conditions.push(condition);
        self
    }

    pub fn equals(self, field: F, value: Option<&str>) -> Self {
        match value {
            Some(value) => self.and(Condition::Equals(field, value.to_string())),
            None => self,
        }
    }

    pub fn text(self, field: F, value: Option<&TextMatch>) -> Self {
        match value {
            Some(TextMatch::Exact(value)) => self.and(Condition::Equals(field, value.clone())),
            Some(TextMatch::Pattern(pattern)) => self.and(Condition::Like(field, pattern.clone())),
            None => self,
        }
    }

    pub fn after(self, field: F, bound: Option<DateTime<Utc>>) -> Self {
        match bound {
            Some(bound) => self.and(Condition::After(field, bound)),
            None => self,
        }
    }

    pub fn before(self, field: F, bound: Option<DateTime<Utc>>) -> Self {
        match bound {
            Some(bound) => self.and(Condition::Before(field, bound)),
            None => self,
        }
    }

    pub fn conditions(&self) -> &[Condition<F>] {
        &self.conditions
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }
}

/// Offset/limit window over an id-ordered result set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub offset: i64,
    pub limit: i64,
}

impl Page {
    pub fn new(offset: i64, limit: i64) -> ModResult<Self> {
        if offset < 0 {
            return Err(ModError::Validation("Offset cannot be negative".to_string()));
        }
        if limit < 1 {
            return Err(ModError::Validation("Limit must be at least 1".to_string()));
        }
        Ok(Self { offset, limit })
    }

    /// Page from a 1-based page number
    pub fn from_number(page: i64, page_size: i64) -> ModResult<Self> {
        if page < 1 {
            return Err(ModError::Validation("Page numbers start at 1".to_string()));
        }
        let offset = (page - 1)
            .checked_mul(page_size)
            .ok_or_else(|| ModError::Validation("Page out of range".to_string()))?;
        Self::new(offset, page_size)
    }
}

/// Count/list access to one collection.
///
/// `count` and `list` are separate reads; a caller pairing them for a paged
/// response may see a total that disagrees with the page if rows are written
/// in between.
#[async_trait]
pub trait Collection {
    type Filter: Sync;
    type Item: Send;

    async fn count(&self, conn: &mut SqliteConnection, filter: &Self::Filter) -> ModResult<i64>;

    async fn list(
        &self,
        conn: &mut SqliteConnection,
        filter: &Self::Filter,
        page: Page,
    ) -> ModResult<Vec<Self::Item>>;
}
