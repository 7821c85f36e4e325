//! Injected client handle
//!
//! [`Folio`] pairs a [`Store`] with a [`RetryPolicy`]. Repositories borrow
//! it and route every store call through [`retry`], one call at a time.
//!
//! An attempt that times out may still have been applied. Calls that are
//! not idempotent are never retried after a timeout, and an insert whose
//! retry hits a duplicate key is resolved by re-reading the rows it wrote.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use folio_core::FolioConfig;

use crate::error::{DbError, DbResult};
use crate::pool;
use crate::repos::{
    AboutRepo, ConnectionRepo, FeedbackRepo, ProjectRepo, ReviewRepo, StatsRepo, TechnologyRepo,
};
use crate::retry::{retry, retry_when, RetryPolicy};
use crate::store::{
    schema, Filter, MemoryStore, Mutation, PgStore, Procedure, Row, Select, Store, StoreError,
    StoreErrorKind, StoreResult, Table,
};

/// Data-access handle shared by all repositories
#[derive(Clone)]
pub struct Folio {
    store: Arc<dyn Store>,
    retry: RetryPolicy,
}

impl std::fmt::Debug for Folio {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Folio")
            .field("store", &self.store.name())
            .field("retry", &self.retry)
            .finish()
    }
}

impl Folio {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            store,
            retry: RetryPolicy::default(),
        }
    }

    /// Handle over a fresh in-memory store
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    /// Connect to PostgreSQL with pool size and retry policy from `config`.
    pub async fn connect(config: &FolioConfig) -> Result<Self, sqlx::Error> {
        let pool = pool::connect(&config.database).await?;
        Ok(Self::new(Arc::new(PgStore::new(pool))).with_retry(RetryPolicy::from(&config.retry)))
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn store(&self) -> &dyn Store {
        self.store.as_ref()
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    pub fn projects(&self) -> ProjectRepo<'_> {
        ProjectRepo::new(self)
    }

    pub fn technologies(&self) -> TechnologyRepo<'_> {
        TechnologyRepo::new(self)
    }

    pub fn connections(&self) -> ConnectionRepo<'_> {
        ConnectionRepo::new(self)
    }

    pub fn feedback(&self) -> FeedbackRepo<'_> {
        FeedbackRepo::new(self)
    }

    pub fn reviews(&self) -> ReviewRepo<'_> {
        ReviewRepo::new(self)
    }

    pub fn stats(&self) -> StatsRepo<'_> {
        StatsRepo::new(self)
    }

    pub fn about(&self) -> AboutRepo<'_> {
        AboutRepo::new(self)
    }

    pub(crate) fn supports_transactions(&self) -> bool {
        self.store.supports_transactions()
    }

    pub(crate) async fn select(&self, op: &str, query: &Select) -> DbResult<Vec<Row>> {
        debug!(op, table = %query.table, "select");
        Ok(retry(&self.retry, op, || self.store.select(query)).await?)
    }

    /// Retried mutation, store error left unwrapped for relationship writes
    pub(crate) async fn execute_raw(&self, op: &str, mutation: &Mutation) -> StoreResult<Vec<Row>> {
        debug!(op, table = %mutation.table(), operation = %mutation.operation(), "execute");
        let mut attempts = 0u32;
        let result = retry(&self.retry, op, || {
            attempts += 1;
            self.store.execute(mutation)
        })
        .await;

        match (result, mutation) {
            (Err(err), Mutation::Insert { table, rows }) if attempts > 1 && err.is_unique_violation() => {
                match self.find_inserted(op, *table, rows).await {
                    Some(found) => {
                        debug!(op, table = %table, "insert already applied by an earlier attempt");
                        Ok(found)
                    }
                    None => Err(err),
                }
            }
            (result, _) => result,
        }
    }

    pub(crate) async fn execute(&self, op: &str, mutation: &Mutation) -> DbResult<Vec<Row>> {
        Ok(self.execute_raw(op, mutation).await?)
    }

    pub(crate) async fn transact(&self, op: &str, batch: &[Mutation]) -> DbResult<Vec<Vec<Row>>> {
        debug!(op, mutations = batch.len(), "transaction");
        let mut attempts = 0u32;
        let result = retry(&self.retry, op, || {
            attempts += 1;
            self.store.transact(batch)
        })
        .await;

        match result {
            Err(err) if attempts > 1 && err.is_unique_violation() => {
                match self.recover_batch(op, batch).await {
                    Some(found) => {
                        debug!(op, "transaction already committed by an earlier attempt");
                        Ok(found)
                    }
                    None => Err(err.into()),
                }
            }
            result => Ok(result?),
        }
    }

    pub(crate) async fn call(&self, op: &str, procedure: &Procedure) -> DbResult<Value> {
        debug!(op, "call");
        if procedure.is_idempotent() {
            return Ok(retry(&self.retry, op, || self.store.call(procedure)).await?);
        }
        // A timed-out call may have been applied; running it again could double it
        let not_timeout = |err: &StoreError| err.is_transient() && err.kind != StoreErrorKind::Timeout;
        Ok(retry_when(&self.retry, op, not_timeout, || self.store.call(procedure)).await?)
    }

    /// Re-read rows an insert would have written, matched on the primary key
    /// or else a unique column set. `None` unless every row is present.
    async fn find_inserted(&self, op: &str, table: Table, rows: &[Row]) -> Option<Vec<Row>> {
        let schema = schema::schema(table);
        let mut found = Vec::with_capacity(rows.len());
        for row in rows {
            let columns = std::iter::once(schema.key)
                .chain(schema.unique.iter().copied())
                .find(|columns| columns.iter().all(|c| row.get(*c).is_some_and(|v| !v.is_null())))?;
            let query = columns
                .iter()
                .fold(Select::from(table), |query, column| {
                    query.filter(Filter::eq(column, row[*column].clone()))
                })
                .limit(1);
            found.push(self.select(op, &query).await.ok()?.into_iter().next()?);
        }
        Some(found)
    }

    /// Results of an insert-only batch that already committed
    async fn recover_batch(&self, op: &str, batch: &[Mutation]) -> Option<Vec<Vec<Row>>> {
        let mut results = Vec::with_capacity(batch.len());
        for mutation in batch {
            let Mutation::Insert { table, rows } = mutation else {
                return None;
            };
            results.push(self.find_inserted(op, *table, rows).await?);
        }
        Some(results)
    }

    pub(crate) async fn fetch_all<T: DeserializeOwned>(
        &self,
        op: &str,
        entity: &'static str,
        query: &Select,
    ) -> DbResult<Vec<T>> {
        self.select(op, query)
            .await?
            .into_iter()
            .map(|row| decode(entity, row))
            .collect()
    }

    /// First matching row; zero rows is `None`, not an error.
    pub(crate) async fn fetch_optional<T: DeserializeOwned>(
        &self,
        op: &str,
        entity: &'static str,
        query: &Select,
    ) -> DbResult<Option<T>> {
        let query = query.clone().limit(1);
        self.select(op, &query)
            .await?
            .into_iter()
            .next()
            .map(|row| decode(entity, row))
            .transpose()
    }

    pub(crate) async fn count(&self, op: &str, query: &Select) -> DbResult<u64> {
        debug!(op, table = %query.table, "count");
        Ok(retry(&self.retry, op, || self.store.count(query)).await?)
    }
}

pub(crate) fn decode<T: DeserializeOwned>(entity: &'static str, row: Row) -> DbResult<T> {
    serde_json::from_value(Value::Object(row)).map_err(|source| DbError::Decode { entity, source })
}

/// Serialize a payload into column values.
pub(crate) fn to_row<T: Serialize>(entity: &'static str, value: &T) -> DbResult<Row> {
    match serde_json::to_value(value) {
        Ok(Value::Object(row)) => Ok(row),
        Ok(other) => Err(DbError::Decode {
            entity,
            source: <serde_json::Error as serde::ser::Error>::custom(format!(
                "expected an object, got {other}"
            )),
        }),
        Err(source) => Err(DbError::Decode { entity, source }),
    }
}

/// Single row from a write that targets one key
pub(crate) fn single<T: DeserializeOwned>(entity: &'static str, rows: Vec<Row>) -> DbResult<Option<T>> {
    rows.into_iter().next().map(|row| decode(entity, row)).transpose()
}
