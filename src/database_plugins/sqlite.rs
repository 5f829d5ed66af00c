// ABOUTME: Durable DAO backend storing entities as JSON documents in SQLite via sqlx
// ABOUTME: One table per collection; filters, sorts and aggregates compile to json_extract SQL
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

//! SQLite document store
//!
//! Each collection is a table `(seq, id, doc)`: `seq` records insertion order,
//! `id` mirrors the document identifier under a unique constraint and `doc` is
//! the entity's JSON text. Filters are translated to `json_extract`
//! expressions; every operand is bound, and field names are validated to
//! `[A-Za-z0-9_.]` before they are inlined into a JSON path.
//!
//! Comparisons carry a `json_type` guard so that values of different classes
//! never compare, matching the volatile backend. Positive predicates lead with
//! the bare `json_extract` comparison so the planner can use the expression
//! indexes; only negated equality needs the null-safe `COALESCE` form.

use std::marker::PhantomData;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteRow,
};
use sqlx::{QueryBuilder, Row, Sqlite};
use tokio::sync::OnceCell;
use tracing::{debug, info};
use uuid::Uuid;

use super::document::{self, Document};
use super::filter::{
    validate_field, Comparison, FieldValue, Filter, Projection, Sort, SortDirection, Update,
    ValueClass,
};
use super::{Dao, FindOptions};
use crate::errors::{AppError, AppResult};
use crate::models::Entity;

/// Shared, lazily connected pool handle
pub type PoolCell = Arc<OnceCell<SqlitePool>>;

/// Map a sqlx failure to a database error with context
fn db_error(context: &str, error: &sqlx::Error) -> AppError {
    AppError::database(format!("{context}: {error}"))
}

/// How long a connection waits on a competing writer before giving up
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Whether the URL names an in-memory database
#[must_use]
pub fn is_memory_url(url: &str) -> bool {
    url.contains(":memory:") || url.contains("mode=memory")
}

/// Open a pool for `url`, creating the database file if needed
///
/// An in-memory database exists per connection, so it is opened with exactly
/// one long-lived connection. File databases run in WAL mode so readers do not
/// block the single writer.
///
/// # Errors
///
/// Returns a configuration error for an unparsable URL or a database error
/// if the connection cannot be established
pub async fn open_pool(url: &str, max_connections: u32) -> AppResult<SqlitePool> {
    let options = SqliteConnectOptions::from_str(url)
        .map_err(|e| AppError::config(format!("Invalid database URL: {e}")))?
        .create_if_missing(true)
        .busy_timeout(BUSY_TIMEOUT);

    let memory = is_memory_url(url);
    let options = if memory {
        options
    } else {
        options.journal_mode(SqliteJournalMode::Wal)
    };

    let pool_options = if memory {
        SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
    } else {
        SqlitePoolOptions::new().max_connections(max_connections.max(1))
    };

    let pool = pool_options
        .connect_with(options)
        .await
        .map_err(|e| db_error("Failed to connect to SQLite", &e))?;
    info!(max_connections, "SQLite document store connected");
    Ok(pool)
}

/// Create the table and declared expression indexes for one collection
///
/// # Errors
///
/// Returns a database error if a DDL statement fails
pub async fn migrate_collection(
    pool: &SqlitePool,
    collection: &str,
    indexed_fields: &[&str],
) -> AppResult<()> {
    validate_field(collection)?;
    sqlx::query(&format!(
        r#"
        CREATE TABLE IF NOT EXISTS "{collection}" (
            seq INTEGER PRIMARY KEY AUTOINCREMENT,
            id TEXT NOT NULL UNIQUE,
            doc TEXT NOT NULL
        )
        "#
    ))
    .execute(pool)
    .await
    .map_err(|e| db_error(&format!("Failed to create {collection} table"), &e))?;

    for field in indexed_fields {
        validate_field(field)?;
        let index_name = format!("idx_{collection}_{}", field.replace('.', "_"));
        sqlx::query(&format!(
            r#"CREATE INDEX IF NOT EXISTS "{index_name}" ON "{collection}" ({})"#,
            extract(field)
        ))
        .execute(pool)
        .await
        .map_err(|e| db_error(&format!("Failed to create index {index_name}"), &e))?;
    }
    debug!(collection, indexes = indexed_fields.len(), "collection migrated");
    Ok(())
}

fn extract(field: &str) -> String {
    format!("json_extract(doc, '$.{field}')")
}

fn type_guard(field: &str, class: ValueClass) -> String {
    match class {
        ValueClass::Numeric => format!(
            "json_type(doc, '$.{field}') IN ('integer', 'real', 'true', 'false')"
        ),
        ValueClass::Text => format!("json_type(doc, '$.{field}') = 'text'"),
    }
}

fn push_value(builder: &mut QueryBuilder<'_, Sqlite>, value: &FieldValue) {
    match value {
        FieldValue::Null => {
            builder.push("NULL");
        }
        FieldValue::Bool(b) => {
            builder.push_bind(i64::from(*b));
        }
        FieldValue::Int(i) => {
            builder.push_bind(*i);
        }
        FieldValue::Float(f) => {
            builder.push_bind(*f);
        }
        FieldValue::Text(s) => {
            builder.push_bind(s.clone());
        }
    }
}

/// Equality usable as an index lookup; may be NULL for a missing field
fn push_equals(builder: &mut QueryBuilder<'_, Sqlite>, field: &str, value: &FieldValue) {
    match value.class() {
        None => {
            builder.push(format!("({} IS NULL)", extract(field)));
        }
        Some(class) => {
            builder.push(format!("({} = ", extract(field)));
            push_value(builder, value);
            builder.push(format!(" AND {})", type_guard(field, class)));
        }
    }
}

/// `1` when the field equals the value, `0` otherwise (never NULL)
fn push_equals_strict(builder: &mut QueryBuilder<'_, Sqlite>, field: &str, value: &FieldValue) {
    builder.push("COALESCE(");
    push_equals(builder, field, value);
    builder.push(", 0)");
}

/// The single non-null class of every value, if there is one
fn shared_class(values: &[FieldValue]) -> Option<ValueClass> {
    let first = values.first()?.class()?;
    values
        .iter()
        .all(|value| value.class() == Some(first))
        .then_some(first)
}

fn push_filter(builder: &mut QueryBuilder<'_, Sqlite>, filter: &Filter) {
    match filter {
        Filter::All => {
            builder.push("1");
        }
        Filter::Eq(field, value) => push_equals(builder, field, value),
        Filter::Ne(field, value) => {
            builder.push("NOT ");
            push_equals_strict(builder, field, value);
        }
        Filter::In(field, values) => {
            if values.is_empty() {
                builder.push("0");
                return;
            }
            if let Some(class) = shared_class(values) {
                builder.push(format!("({} IN (", extract(field)));
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        builder.push(", ");
                    }
                    push_value(builder, value);
                }
                builder.push(format!(") AND {})", type_guard(field, class)));
                return;
            }
            builder.push("(");
            for (i, value) in values.iter().enumerate() {
                if i > 0 {
                    builder.push(" OR ");
                }
                push_equals(builder, field, value);
            }
            builder.push(")");
        }
        Filter::Cmp(field, comparison, value) => push_comparison(builder, field, *comparison, value),
        Filter::And(filters) => {
            if filters.is_empty() {
                builder.push("1");
                return;
            }
            builder.push("(");
            for (i, inner) in filters.iter().enumerate() {
                if i > 0 {
                    builder.push(" AND ");
                }
                push_filter(builder, inner);
            }
            builder.push(")");
        }
    }
}

fn push_comparison(
    builder: &mut QueryBuilder<'_, Sqlite>,
    field: &str,
    comparison: Comparison,
    value: &FieldValue,
) {
    let Some(class) = value.class() else {
        builder.push("0");
        return;
    };
    builder.push(format!("({} {} ", extract(field), comparison.as_sql()));
    push_value(builder, value);
    builder.push(format!(" AND {})", type_guard(field, class)));
}

fn push_order(builder: &mut QueryBuilder<'_, Sqlite>, sort: &Sort) {
    if sort.is_empty() {
        builder.push(" ORDER BY seq");
        return;
    }
    builder.push(" ORDER BY ");
    for (field, direction) in sort.keys() {
        let keyword = match direction {
            SortDirection::Ascending => "ASC",
            SortDirection::Descending => "DESC",
        };
        builder.push(format!("{} {keyword}, ", extract(field)));
    }
    builder.push("id ASC");
}

fn push_page(builder: &mut QueryBuilder<'_, Sqlite>, options: &FindOptions) {
    builder.push(" LIMIT ");
    builder.push_bind(options.limit.map_or(-1, i64::from));
    builder.push(" OFFSET ");
    builder.push_bind(i64::from(options.offset));
}

fn parse_row(row: &SqliteRow) -> AppResult<Document> {
    let raw: String = row
        .try_get("doc")
        .map_err(|e| db_error("Failed to read document column", &e))?;
    match serde_json::from_str(&raw)? {
        serde_json::Value::Object(map) => Ok(map),
        other => Err(AppError::serialization(format!(
            "stored document is not an object: {other}"
        ))),
    }
}

/// Durable collection of `T`
pub struct SqliteDao<T> {
    pool: PoolCell,
    _entity: PhantomData<fn() -> T>,
}

impl<T> Clone for SqliteDao<T> {
    fn clone(&self) -> Self {
        Self {
            pool: Arc::clone(&self.pool),
            _entity: PhantomData,
        }
    }
}

impl<T: Entity> SqliteDao<T> {
    /// Collection bound to a (possibly not yet connected) pool
    #[must_use]
    pub const fn new(pool: PoolCell) -> Self {
        Self {
            pool,
            _entity: PhantomData,
        }
    }

    fn pool(&self) -> AppResult<&SqlitePool> {
        self.pool
            .get()
            .ok_or_else(|| AppError::config("database not connected"))
    }

    fn base_select(columns: &str, filter: &Filter) -> QueryBuilder<'static, Sqlite> {
        let mut builder =
            QueryBuilder::new(format!(r#"SELECT {columns} FROM "{}" WHERE "#, T::COLLECTION));
        push_filter(&mut builder, filter);
        builder
    }

    async fn select(&self, filter: &Filter, options: &FindOptions) -> AppResult<Vec<Document>> {
        filter.validate()?;
        options.sort.validate()?;
        let mut builder = Self::base_select("doc", filter);
        push_order(&mut builder, &options.sort);
        push_page(&mut builder, options);

        let rows = builder
            .build()
            .fetch_all(self.pool()?)
            .await
            .map_err(|e| db_error(&format!("Failed to query {}", T::COLLECTION), &e))?;
        debug!(collection = T::COLLECTION, rows = rows.len(), "sqlite select");
        rows.iter().map(parse_row).collect()
    }

    async fn load(&self, id: Uuid) -> AppResult<Option<Document>> {
        let row = sqlx::query(&format!(
            r#"SELECT doc FROM "{}" WHERE id = $1"#,
            T::COLLECTION
        ))
        .bind(id.to_string())
        .fetch_optional(self.pool()?)
        .await
        .map_err(|e| db_error(&format!("Failed to load {} item", T::COLLECTION), &e))?;
        row.as_ref().map(parse_row).transpose()
    }

    /// Read-modify-write of up to `limit` matches inside one transaction
    ///
    /// The write lock is taken up front; a deferred transaction that reads
    /// first cannot upgrade while another writer holds the lock and fails
    /// with `SQLITE_BUSY` without waiting.
    async fn modify(
        &self,
        filter: &Filter,
        update: &Update,
        upsert: bool,
        limit: Option<u32>,
    ) -> AppResult<u64> {
        filter.validate()?;
        update.validate()?;
        let mut tx = self
            .pool()?
            .begin_with("BEGIN IMMEDIATE")
            .await
            .map_err(|e| db_error("Failed to begin transaction", &e))?;

        let mut builder = Self::base_select("seq, doc", filter);
        push_order(&mut builder, &Sort::none());
        push_page(
            &mut builder,
            &FindOptions {
                sort: Sort::none(),
                offset: 0,
                limit,
            },
        );
        let rows = builder
            .build()
            .fetch_all(&mut *tx)
            .await
            .map_err(|e| db_error(&format!("Failed to query {}", T::COLLECTION), &e))?;

        let mut modified = 0_u64;
        for row in &rows {
            let seq: i64 = row
                .try_get("seq")
                .map_err(|e| db_error("Failed to read sequence column", &e))?;
            let current = parse_row(row)?;
            if let Some(revised) = document::revise::<T>(&current, update)? {
                sqlx::query(&format!(
                    r#"UPDATE "{}" SET doc = $1 WHERE seq = $2"#,
                    T::COLLECTION
                ))
                .bind(serde_json::to_string(&revised)?)
                .bind(seq)
                .execute(&mut *tx)
                .await
                .map_err(|e| db_error(&format!("Failed to update {}", T::COLLECTION), &e))?;
                modified += 1;
            }
        }

        if rows.is_empty() && upsert {
            let inserted = document::upsert_document::<T>(filter, update)?;
            let id = document::document_id(&inserted)
                .ok_or_else(|| AppError::internal("upserted document has no id"))?;
            sqlx::query(&format!(
                r#"INSERT INTO "{}" (id, doc) VALUES ($1, $2)"#,
                T::COLLECTION
            ))
            .bind(id.to_string())
            .bind(serde_json::to_string(&inserted)?)
            .execute(&mut *tx)
            .await
            .map_err(|e| db_error(&format!("Failed to upsert into {}", T::COLLECTION), &e))?;
            modified = 1;
        }

        tx.commit()
            .await
            .map_err(|e| db_error("Failed to commit transaction", &e))?;
        debug!(
            collection = T::COLLECTION,
            matched = rows.len(),
            modified,
            "sqlite update"
        );
        Ok(modified)
    }
}

#[async_trait]
impl<T: Entity> Dao<T> for SqliteDao<T> {
    async fn create(&self, mut item: T) -> AppResult<T> {
        if item.id().is_nil() {
            item.assign_id(Uuid::new_v4());
        }
        let id = item.id();
        let body = serde_json::to_string(&document::to_document(&item)?)?;

        sqlx::query(&format!(
            r#"INSERT INTO "{}" (id, doc) VALUES ($1, $2)"#,
            T::COLLECTION
        ))
        .bind(id.to_string())
        .bind(body)
        .execute(self.pool()?)
        .await
        .map_err(|e| {
            let duplicate = e
                .as_database_error()
                .is_some_and(|db| db.is_unique_violation());
            if duplicate {
                AppError::already_exists(format!("{} item {id}", T::COLLECTION))
            } else {
                db_error(&format!("Failed to insert into {}", T::COLLECTION), &e)
            }
        })?;
        debug!(collection = T::COLLECTION, %id, "sqlite create");

        // Reload so the caller sees exactly what the store holds
        let stored = self
            .load(id)
            .await?
            .ok_or_else(|| AppError::internal(format!("{} item {id} vanished after insert", T::COLLECTION)))?;
        document::from_document(stored)
    }

    async fn find_one(&self, filter: &Filter) -> AppResult<Option<T>> {
        let mut found = self.select(filter, &FindOptions::unbounded().take(1)).await?;
        found.pop().map(document::from_document).transpose()
    }

    async fn find_one_projected(
        &self,
        filter: &Filter,
        projection: &Projection,
    ) -> AppResult<Option<Document>> {
        projection.validate()?;
        let mut found = self.select(filter, &FindOptions::unbounded().take(1)).await?;
        Ok(found.pop().map(|doc| document::project(&doc, projection)))
    }

    async fn find(&self, filter: &Filter, options: &FindOptions) -> AppResult<Vec<T>> {
        self.select(filter, options)
            .await?
            .into_iter()
            .map(document::from_document)
            .collect()
    }

    async fn find_projected(
        &self,
        filter: &Filter,
        projection: &Projection,
        options: &FindOptions,
    ) -> AppResult<Vec<Document>> {
        projection.validate()?;
        Ok(self
            .select(filter, options)
            .await?
            .iter()
            .map(|doc| document::project(doc, projection))
            .collect())
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<T>> {
        self.load(id)
            .await?
            .map(document::from_document)
            .transpose()
    }

    async fn delete(&self, filter: &Filter) -> AppResult<u64> {
        filter.validate()?;
        let mut builder =
            QueryBuilder::<Sqlite>::new(format!(r#"DELETE FROM "{}" WHERE "#, T::COLLECTION));
        push_filter(&mut builder, filter);
        let removed = builder
            .build()
            .execute(self.pool()?)
            .await
            .map_err(|e| db_error(&format!("Failed to delete from {}", T::COLLECTION), &e))?
            .rows_affected();
        debug!(collection = T::COLLECTION, removed, "sqlite delete");
        Ok(removed)
    }

    async fn delete_by_id(&self, id: Uuid) -> AppResult<bool> {
        let removed = sqlx::query(&format!(r#"DELETE FROM "{}" WHERE id = $1"#, T::COLLECTION))
            .bind(id.to_string())
            .execute(self.pool()?)
            .await
            .map_err(|e| db_error(&format!("Failed to delete from {}", T::COLLECTION), &e))?
            .rows_affected();
        Ok(removed == 1)
    }

    async fn update_one(&self, filter: &Filter, update: &Update, upsert: bool) -> AppResult<bool> {
        Ok(self.modify(filter, update, upsert, Some(1)).await? > 0)
    }

    async fn update_many(&self, filter: &Filter, update: &Update, upsert: bool) -> AppResult<u64> {
        self.modify(filter, update, upsert, None).await
    }

    async fn count(&self, filter: &Filter) -> AppResult<u64> {
        filter.validate()?;
        let mut builder = Self::base_select("COUNT(*) AS total", filter);
        let row = builder
            .build()
            .fetch_one(self.pool()?)
            .await
            .map_err(|e| db_error(&format!("Failed to count {}", T::COLLECTION), &e))?;
        let total: i64 = row
            .try_get("total")
            .map_err(|e| db_error("Failed to read count", &e))?;
        Ok(u64::try_from(total).unwrap_or(0))
    }

    async fn average(&self, filter: &Filter, field: &str) -> AppResult<Option<f64>> {
        filter.validate()?;
        validate_field(field)?;
        let column = format!(
            "AVG(CASE WHEN json_type(doc, '$.{field}') IN ('integer', 'real') THEN {} END) AS mean",
            extract(field)
        );
        let mut builder = Self::base_select(&column, filter);
        let row = builder
            .build()
            .fetch_one(self.pool()?)
            .await
            .map_err(|e| db_error(&format!("Failed to average {}", T::COLLECTION), &e))?;
        row.try_get::<Option<f64>, _>("mean")
            .map_err(|e| db_error("Failed to read average", &e))
    }

    async fn clear(&self) -> AppResult<()> {
        sqlx::query(&format!(r#"DELETE FROM "{}""#, T::COLLECTION))
            .execute(self.pool()?)
            .await
            .map_err(|e| db_error(&format!("Failed to clear {}", T::COLLECTION), &e))?;
        debug!(collection = T::COLLECTION, "sqlite clear");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(filter: &Filter) -> String {
        let mut builder = QueryBuilder::<Sqlite>::new("");
        push_filter(&mut builder, filter);
        builder.into_sql()
    }

    #[test]
    fn test_equality_sql_is_guarded_and_bound() {
        let sql = render(&Filter::eq("user", "abc"));
        assert_eq!(
            sql,
            "(json_extract(doc, '$.user') = ? AND json_type(doc, '$.user') = 'text')"
        );
    }

    #[test]
    fn test_null_and_empty_in() {
        assert_eq!(
            render(&Filter::eq("ended_at", FieldValue::Null)),
            "(json_extract(doc, '$.ended_at') IS NULL)"
        );
        assert_eq!(render(&Filter::is_in("id", Vec::<String>::new())), "0");
        assert_eq!(
            render(&Filter::is_in("id", vec!["a", "b"])),
            "(json_extract(doc, '$.id') IN (?, ?) AND json_type(doc, '$.id') = 'text')"
        );
        assert_eq!(render(&Filter::gt("rating", FieldValue::Null)), "0");
    }

    #[test]
    fn test_conjunction_and_negation() {
        let sql = render(&Filter::ne("privacy.attempts", "private").and(Filter::gte("rating", 3)));
        assert!(sql.starts_with("(NOT COALESCE((json_extract(doc, '$.privacy.attempts') = ?"));
        assert!(sql.contains(" AND (json_extract(doc, '$.rating') >= ? AND json_type(doc, '$.rating') IN ('integer', 'real', 'true', 'false'))"));
    }

    #[test]
    fn test_order_clause() {
        let mut builder = QueryBuilder::<Sqlite>::new("");
        push_order(
            &mut builder,
            &Sort::ascending("created_at").then("rating", SortDirection::Descending),
        );
        assert_eq!(
            builder.into_sql(),
            " ORDER BY json_extract(doc, '$.created_at') ASC, json_extract(doc, '$.rating') DESC, id ASC"
        );
    }

    async fn query_plan(filter: &Filter) -> Vec<String> {
        let pool = open_pool("sqlite::memory:", 1).await.unwrap();
        migrate_collection(&pool, "tokens", &["user", "token"])
            .await
            .unwrap();
        let mut builder =
            QueryBuilder::<Sqlite>::new(r#"EXPLAIN QUERY PLAN SELECT doc FROM "tokens" WHERE "#);
        push_filter(&mut builder, filter);
        builder
            .build()
            .fetch_all(&pool)
            .await
            .unwrap()
            .iter()
            .map(|row| row.get::<String, _>("detail"))
            .collect()
    }

    #[tokio::test]
    async fn test_equality_uses_expression_index() {
        let plan = query_plan(
            &Filter::eq("user", Uuid::new_v4().to_string()).and(Filter::eq("token", "abc")),
        )
        .await;
        assert!(
            plan.iter().any(|detail| detail.contains("USING INDEX idx_tokens_")),
            "expected an index search, got {plan:?}"
        );
        assert!(!plan.iter().any(|detail| detail.starts_with("SCAN")), "{plan:?}");
    }

    #[tokio::test]
    async fn test_membership_and_range_use_expression_index() {
        let members = query_plan(&Filter::is_in("token", vec!["a", "b"])).await;
        assert!(
            members.iter().any(|detail| detail.contains("idx_tokens_token")),
            "{members:?}"
        );

        let range = query_plan(&Filter::gte("user", "m")).await;
        assert!(
            range.iter().any(|detail| detail.contains("idx_tokens_user")),
            "{range:?}"
        );
    }

    #[test]
    fn test_memory_url_detection() {
        assert!(is_memory_url("sqlite::memory:"));
        assert!(is_memory_url("sqlite:file:cragbook?mode=memory&cache=shared"));
        assert!(!is_memory_url("sqlite:./data/cragbook.db"));
    }
}
