/// SQLite translation of predicates
use super::{Condition, Field, Page, Predicate};
use crate::db::encode_timestamp;
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, QueryBuilder, Sqlite, SqliteConnection};

/// Append a WHERE clause for `predicate`; values are always bound.
pub fn push_where<F: Field>(builder: &mut QueryBuilder<'_, Sqlite>, predicate: &Predicate<F>) {
    for (i, condition) in predicate.conditions().iter().enumerate() {
        builder.push(if i == 0 { " WHERE " } else { " AND " });
        match condition {
            Condition::Equals(field, value) => {
                builder.push(field.column()).push(" = ").push_bind(value.clone());
            }
            Condition::Like(field, pattern) => {
                builder.push(field.column()).push(" LIKE ").push_bind(pattern.clone());
            }
            Condition::After(field, bound) => {
                builder
                    .push(field.column())
                    .push(" > ")
                    .push_bind(encode_timestamp(bound));
            }
            Condition::Before(field, bound) => {
                builder
                    .push(field.column())
                    .push(" < ")
                    .push_bind(encode_timestamp(bound));
            }
        }
    }
}

/// `SELECT COUNT(*) FROM <table> WHERE …`
pub async fn count<F: Field>(
    conn: &mut SqliteConnection,
    table: &str,
    predicate: &Predicate<F>,
) -> Result<i64, sqlx::Error> {
    let mut builder = QueryBuilder::<Sqlite>::new(format!("SELECT COUNT(*) FROM {}", table));
    push_where(&mut builder, predicate);

    builder.build_query_scalar::<i64>().fetch_one(&mut *conn).await
}

/// `<select> WHERE … ORDER BY id ASC LIMIT … OFFSET …`
pub async fn list<F, T>(
    conn: &mut SqliteConnection,
    select: &str,
    predicate: &Predicate<F>,
    page: Page,
) -> Result<Vec<T>, sqlx::Error>
where
    F: Field,
    T: for<'r> FromRow<'r, SqliteRow> + Send + Unpin,
{
    let mut builder = QueryBuilder::<Sqlite>::new(select);
    push_where(&mut builder, predicate);
    builder
        .push(" ORDER BY id ASC LIMIT ")
        .push_bind(page.limit)
        .push(" OFFSET ")
        .push_bind(page.offset);

    builder.build_query_as::<T>().fetch_all(&mut *conn).await
}
