//! PostgreSQL store
//!
//! Builds SQL with `sqlx::QueryBuilder` and moves rows as `jsonb`:
//! - reads return `to_jsonb(t)` per row
//! - inserts/updates feed JSON through `jsonb_populate_record[set]`, so
//!   column types come from the table definition
//! - filters compare `to_jsonb(column)` with a bound `jsonb` value
//!
//! Column names are checked against an identifier pattern and quoted;
//! table names only ever come from [`Table`].

use std::collections::BTreeSet;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use sqlx::types::Json;
use sqlx::{PgExecutor, PgPool, Postgres, QueryBuilder, Row as _};

use super::schema;
use super::{
    Direction, Filter, Mutation, Procedure, Row, Select, Store, StoreError, StoreErrorKind,
    StoreResult, Table,
};

/// Lowercase SQL identifier
static IDENT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z_][a-z0-9_]{0,62}$").expect("invalid identifier regex"));

/// [`Store`] backed by a sqlx connection pool
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl Store for PgStore {
    fn name(&self) -> &'static str {
        "postgres"
    }

    async fn select(&self, query: &Select) -> StoreResult<Vec<Row>> {
        let builder = build_select(query)?;
        fetch_rows(&self.pool, builder).await
    }

    async fn count(&self, query: &Select) -> StoreResult<u64> {
        let mut builder = build_count(query)?;
        let count: i64 = builder
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await
            .map_err(classify)?;
        Ok(u64::try_from(count).unwrap_or(0))
    }

    async fn execute(&self, mutation: &Mutation) -> StoreResult<Vec<Row>> {
        match build_mutation(mutation)? {
            Some(builder) => fetch_rows(&self.pool, builder).await,
            None => Ok(Vec::new()),
        }
    }

    async fn call(&self, procedure: &Procedure) -> StoreResult<Value> {
        match procedure {
            Procedure::IncrementStat {
                metric_name,
                increment_by,
            } => {
                let row = sqlx::query("SELECT increment_stat($1, $2) AS value")
                    .bind(metric_name)
                    .bind(increment_by)
                    .fetch_one(&self.pool)
                    .await
                    .map_err(classify)?;
                let value: i64 = row.try_get("value").map_err(classify)?;
                Ok(Value::from(value))
            }
        }
    }

    fn supports_transactions(&self) -> bool {
        true
    }

    async fn transact(&self, batch: &[Mutation]) -> StoreResult<Vec<Vec<Row>>> {
        // Build everything first so a malformed mutation never opens a transaction
        let builders = batch
            .iter()
            .map(build_mutation)
            .collect::<StoreResult<Vec<_>>>()?;

        let mut tx = self.pool.begin().await.map_err(classify)?;
        let mut results = Vec::with_capacity(builders.len());
        for builder in builders {
            let rows = match builder {
                Some(builder) => fetch_rows(&mut *tx, builder).await?,
                None => Vec::new(),
            };
            results.push(rows);
        }
        tx.commit().await.map_err(classify)?;

        Ok(results)
    }
}

async fn fetch_rows<'e, E>(executor: E, mut builder: QueryBuilder<'_, Postgres>) -> StoreResult<Vec<Row>>
where
    E: PgExecutor<'e>,
{
    let rows = builder.build().fetch_all(executor).await.map_err(classify)?;
    rows.iter()
        .map(|row| {
            row.try_get::<Json<Row>, _>("data")
                .map(|json| json.0)
                .map_err(classify)
        })
        .collect()
}

fn ident(column: &str) -> StoreResult<String> {
    if IDENT_RE.is_match(column) {
        Ok(format!("\"{column}\""))
    } else {
        Err(StoreError::invalid_input(format!("invalid column name '{column}'")))
    }
}

fn push_filters(builder: &mut QueryBuilder<'_, Postgres>, filters: &[Filter]) -> StoreResult<()> {
    for (i, filter) in filters.iter().enumerate() {
        builder.push(if i == 0 { " WHERE " } else { " AND " });
        let column = ident(filter.column())?;
        match filter {
            Filter::Eq { value, .. } => {
                builder.push(format!("to_jsonb(t.{column}) = "));
                builder.push_bind(Json(value.clone()));
            }
            Filter::In { values, .. } if values.is_empty() => {
                builder.push("FALSE");
            }
            Filter::In { values, .. } => {
                builder.push(format!("to_jsonb(t.{column}) IN ("));
                let mut separated = builder.separated(", ");
                for value in values {
                    separated.push_bind(Json(value.clone()));
                }
                separated.push_unseparated(")");
            }
        }
    }
    Ok(())
}

pub(crate) fn build_select(query: &Select) -> StoreResult<QueryBuilder<'static, Postgres>> {
    let mut builder = QueryBuilder::new(format!(
        "SELECT to_jsonb(t) AS data FROM {} AS t",
        query.table
    ));
    push_filters(&mut builder, &query.filters)?;

    let mut order = Vec::with_capacity(query.order.len() + 2);
    for o in &query.order {
        let direction = match o.direction {
            Direction::Asc => "ASC",
            Direction::Desc => "DESC",
        };
        order.push(format!("t.{} {direction}", ident(&o.column)?));
    }
    for key in schema::schema(query.table).key {
        order.push(format!("t.{} ASC", ident(key)?));
    }
    builder.push(" ORDER BY ");
    builder.push(order.join(", "));

    if let Some(limit) = query.limit {
        builder.push(" LIMIT ");
        builder.push_bind(i64::from(limit));
    }
    Ok(builder)
}

pub(crate) fn build_count(query: &Select) -> StoreResult<QueryBuilder<'static, Postgres>> {
    let mut builder = QueryBuilder::new(format!("SELECT COUNT(*) FROM {} AS t", query.table));
    push_filters(&mut builder, &query.filters)?;
    Ok(builder)
}

/// `None` when the mutation is a no-op (inserting zero rows).
pub(crate) fn build_mutation(mutation: &Mutation) -> StoreResult<Option<QueryBuilder<'static, Postgres>>> {
    match mutation {
        Mutation::Insert { table, rows } => build_insert(*table, rows),
        Mutation::Update {
            table,
            filters,
            values,
        } => build_update(*table, filters, values).map(Some),
        Mutation::Delete { table, filters } => build_delete(*table, filters).map(Some),
    }
}

fn build_insert(table: Table, rows: &[Row]) -> StoreResult<Option<QueryBuilder<'static, Postgres>>> {
    if rows.is_empty() {
        return Ok(None);
    }

    let columns = rows
        .iter()
        .flat_map(|row| row.keys())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(|c| ident(c))
        .collect::<StoreResult<Vec<_>>>()?
        .join(", ");

    let payload = Value::Array(rows.iter().cloned().map(Value::Object).collect());

    let mut builder = QueryBuilder::new(format!(
        "INSERT INTO {table} AS t ({columns}) SELECT {columns} FROM jsonb_populate_recordset(NULL::{table}, "
    ));
    builder.push_bind(Json(payload));
    builder.push(") RETURNING to_jsonb(t) AS data");
    Ok(Some(builder))
}

fn build_update(table: Table, filters: &[Filter], values: &Row) -> StoreResult<QueryBuilder<'static, Postgres>> {
    if filters.is_empty() {
        return Err(StoreError::invalid_input("update without filters"));
    }
    if values.is_empty() {
        return Err(StoreError::invalid_input("update without values"));
    }

    let assignments = values
        .keys()
        .map(|c| ident(c).map(|c| format!("{c} = r.{c}")))
        .collect::<StoreResult<Vec<_>>>()?
        .join(", ");

    let mut builder = QueryBuilder::new(format!("UPDATE {table} AS t SET {assignments} FROM jsonb_populate_record(NULL::{table}, "));
    builder.push_bind(Json(Value::Object(values.clone())));
    builder.push(") AS r");
    push_filters(&mut builder, filters)?;
    builder.push(" RETURNING to_jsonb(t) AS data");
    Ok(builder)
}

fn build_delete(table: Table, filters: &[Filter]) -> StoreResult<QueryBuilder<'static, Postgres>> {
    if filters.is_empty() {
        return Err(StoreError::invalid_input("delete without filters"));
    }

    let mut builder = QueryBuilder::new(format!("DELETE FROM {table} AS t"));
    push_filters(&mut builder, filters)?;
    builder.push(" RETURNING to_jsonb(t) AS data");
    Ok(builder)
}

/// Map a sqlx error onto a store error kind
pub(crate) fn classify(err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db) => {
            let code = db.code().map(|c| c.into_owned());
            let kind = code
                .as_deref()
                .map(kind_for_sqlstate)
                .unwrap_or(StoreErrorKind::Internal);
            let error = StoreError::new(kind, db.message());
            match code {
                Some(code) => error.with_code(code),
                None => error,
            }
        }
        sqlx::Error::PoolTimedOut => {
            StoreError::new(StoreErrorKind::Timeout, "timed out acquiring a pooled connection")
        }
        err @ (sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::Protocol(_)
        | sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed) => StoreError::new(StoreErrorKind::Connection, err.to_string()),
        err @ sqlx::Error::Configuration(_) => {
            StoreError::new(StoreErrorKind::InvalidInput, err.to_string())
        }
        err => StoreError::new(StoreErrorKind::Internal, err.to_string()),
    }
}

/// SQLSTATE classes: https://www.postgresql.org/docs/current/errcodes-appendix.html
fn kind_for_sqlstate(code: &str) -> StoreErrorKind {
    match code {
        "57P01" | "57P02" | "57P03" => StoreErrorKind::Connection,
        "57014" => StoreErrorKind::Timeout,
        "40001" | "40P01" => StoreErrorKind::Unavailable,
        c if c.starts_with("08") => StoreErrorKind::Connection,
        c if c.starts_with("53") => StoreErrorKind::Unavailable,
        c if c.starts_with("23") => StoreErrorKind::Constraint,
        c if c.starts_with("22") || c.starts_with("42") => StoreErrorKind::InvalidInput,
        _ => StoreErrorKind::Internal,
    }
}
