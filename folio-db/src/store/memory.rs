//! In-memory store
//!
//! Keeps every table as a vector of JSON rows behind one lock. Each
//! mutation (and each batch passed to `transact`) runs against the live
//! tables and restores a snapshot on failure, so writes are all-or-nothing
//! exactly like a single PostgreSQL statement or transaction.
//!
//! Test helpers:
//! - [`MemoryStore::fail_next`] injects store errors for a table/operation
//! - [`MemoryStore::stall_next`] applies a write, then never answers
//! - [`MemoryStore::calls`] counts attempted calls per table/operation
//! - [`MemoryStore::without_transactions`] hides `transact` so callers take
//!   their compensation path

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::schema::{self, ColumnDefault, OnDelete, TableSchema};
use super::{
    Direction, Filter, Mutation, Operation, Procedure, Row, Select, Store, StoreError,
    StoreErrorKind, StoreResult, Table,
};

#[derive(Debug, Clone, Default)]
struct State {
    tables: BTreeMap<Table, Vec<Row>>,
    /// Last generated timestamp in microseconds; new ones are strictly later
    clock: Option<i64>,
}

#[derive(Debug, Clone, Copy)]
enum FaultAction {
    Fail(StoreErrorKind),
    /// Apply the write, then hang
    Stall,
}

#[derive(Debug)]
struct Fault {
    table: Table,
    operation: Operation,
    action: FaultAction,
    remaining: u32,
}

/// In-process [`Store`] enforcing the portfolio schema
pub struct MemoryStore {
    state: RwLock<State>,
    transactional: bool,
    faults: Mutex<Vec<Fault>>,
    calls: Mutex<HashMap<(Table, Operation), u64>>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(State::default()),
            transactional: true,
            faults: Mutex::new(Vec::new()),
            calls: Mutex::new(HashMap::new()),
        }
    }

    /// A store that reports no transaction support.
    pub fn without_transactions() -> Self {
        Self {
            transactional: false,
            ..Self::new()
        }
    }

    /// Make the next `times` calls of `operation` on `table` fail with `kind`.
    pub fn fail_next(&self, table: Table, operation: Operation, kind: StoreErrorKind, times: u32) {
        self.inject(table, operation, FaultAction::Fail(kind), times);
    }

    /// Make the next `times` calls of `operation` on `table` apply their
    /// write and then never respond, like a connection lost after commit.
    pub fn stall_next(&self, table: Table, operation: Operation, times: u32) {
        self.inject(table, operation, FaultAction::Stall, times);
    }

    fn inject(&self, table: Table, operation: Operation, action: FaultAction, times: u32) {
        let mut faults = self.faults.lock().unwrap_or_else(|e| e.into_inner());
        faults.push(Fault {
            table,
            operation,
            action,
            remaining: times,
        });
    }

    /// Attempted calls of `operation` on `table`, failed ones included.
    pub fn calls(&self, table: Table, operation: Operation) -> u64 {
        let calls = self.calls.lock().unwrap_or_else(|e| e.into_inner());
        calls.get(&(table, operation)).copied().unwrap_or(0)
    }

    /// Number of rows currently in `table`.
    pub async fn row_count(&self, table: Table) -> usize {
        let state = self.state.read().await;
        state.tables.get(&table).map(Vec::len).unwrap_or(0)
    }

    /// Count the call and fire a pending fault, if any.
    fn enter(&self, table: Table, operation: Operation) -> StoreResult<()> {
        {
            let mut calls = self.calls.lock().unwrap_or_else(|e| e.into_inner());
            *calls.entry((table, operation)).or_insert(0) += 1;
        }

        let mut faults = self.faults.lock().unwrap_or_else(|e| e.into_inner());
        let failure = faults.iter_mut().find_map(|f| match f.action {
            FaultAction::Fail(kind)
                if f.table == table && f.operation == operation && f.remaining > 0 =>
            {
                f.remaining -= 1;
                Some(kind)
            }
            _ => None,
        });
        faults.retain(|f| f.remaining > 0);

        match failure {
            Some(kind) => Err(StoreError::new(
                kind,
                format!("injected {kind} failure on {operation} {table}"),
            )),
            None => Ok(()),
        }
    }

    fn take_stall(&self, table: Table, operation: Operation) -> bool {
        let mut faults = self.faults.lock().unwrap_or_else(|e| e.into_inner());
        let stalled = faults.iter_mut().any(|f| {
            let hit = matches!(f.action, FaultAction::Stall)
                && f.table == table
                && f.operation == operation
                && f.remaining > 0;
            if hit {
                f.remaining -= 1;
            }
            hit
        });
        faults.retain(|f| f.remaining > 0);
        stalled
    }

    /// Called once the write is in place and the lock released.
    async fn stall_after_apply(&self, targets: impl IntoIterator<Item = (Table, Operation)>) {
        if targets.into_iter().any(|(table, operation)| self.take_stall(table, operation)) {
            std::future::pending::<()>().await;
        }
    }
}

#[async_trait]
impl Store for MemoryStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn select(&self, query: &Select) -> StoreResult<Vec<Row>> {
        self.enter(query.table, Operation::Select)?;
        let state = self.state.read().await;
        select_rows(&state, query)
    }

    async fn count(&self, query: &Select) -> StoreResult<u64> {
        self.enter(query.table, Operation::Select)?;
        let state = self.state.read().await;
        count_rows(&state, query)
    }

    async fn execute(&self, mutation: &Mutation) -> StoreResult<Vec<Row>> {
        let target = (mutation.table(), mutation.operation());
        self.enter(target.0, target.1)?;
        let rows = {
            let mut state = self.state.write().await;
            let snapshot = state.clone();
            apply(&mut state, mutation).inspect_err(|_| *state = snapshot)?
        };
        self.stall_after_apply([target]).await;
        Ok(rows)
    }

    async fn call(&self, procedure: &Procedure) -> StoreResult<Value> {
        match procedure {
            Procedure::IncrementStat {
                metric_name,
                increment_by,
            } => {
                self.enter(Table::PortfolioStats, Operation::Call)?;
                let value = self.increment(metric_name, *increment_by).await;
                self.stall_after_apply([(Table::PortfolioStats, Operation::Call)])
                    .await;
                Ok(Value::from(value))
            }
        }
    }

    fn supports_transactions(&self) -> bool {
        self.transactional
    }

    async fn transact(&self, batch: &[Mutation]) -> StoreResult<Vec<Vec<Row>>> {
        if !self.transactional {
            return Err(StoreError::unsupported("transactions"));
        }
        for mutation in batch {
            self.enter(mutation.table(), mutation.operation())?;
        }

        let results = {
            let mut state = self.state.write().await;
            let snapshot = state.clone();
            let mut results = Vec::with_capacity(batch.len());
            for mutation in batch {
                match apply(&mut state, mutation) {
                    Ok(rows) => results.push(rows),
                    Err(err) => {
                        *state = snapshot;
                        return Err(err);
                    }
                }
            }
            results
        };
        self.stall_after_apply(batch.iter().map(|m| (m.table(), m.operation())))
            .await;
        Ok(results)
    }
}

impl MemoryStore {
    /// Upsert a counter and return its new value
    async fn increment(&self, metric_name: &str, increment_by: i64) -> i64 {
        let mut state = self.state.write().await;
        let now = state.tick();
        let rows = state.tables.entry(Table::PortfolioStats).or_default();
        let existing = rows
            .iter_mut()
            .find(|r| r.get("metric_name").and_then(Value::as_str) == Some(metric_name));

        match existing {
            Some(row) => {
                let current = row.get("metric_value").and_then(Value::as_i64).unwrap_or(0);
                let next = current + increment_by;
                row.insert("metric_value".into(), Value::from(next));
                row.insert("updated_at".into(), Value::String(now));
                next
            }
            None => {
                let mut row = Row::new();
                row.insert("metric_name".into(), Value::String(metric_name.to_string()));
                row.insert("metric_value".into(), Value::from(increment_by));
                row.insert("updated_at".into(), Value::String(now));
                rows.push(row);
                increment_by
            }
        }
    }
}

impl State {
    /// Monotonic timestamp with fixed microsecond precision
    fn tick(&mut self) -> String {
        let now = Utc::now().timestamp_micros();
        let micros = match self.clock {
            Some(last) if now <= last => last + 1,
            _ => now,
        };
        self.clock = Some(micros);
        DateTime::<Utc>::from_timestamp_micros(micros)
            .unwrap_or_default()
            .to_rfc3339_opts(SecondsFormat::Micros, true)
    }

    fn rows(&self, table: Table) -> &[Row] {
        self.tables.get(&table).map(Vec::as_slice).unwrap_or(&[])
    }
}

fn select_rows(state: &State, query: &Select) -> StoreResult<Vec<Row>> {
    let schema = schema::schema(query.table);
    check_filters(schema, &query.filters)?;
    for order in &query.order {
        check_column(schema, &order.column)?;
    }

    let mut rows: Vec<Row> = state
        .rows(query.table)
        .iter()
        .filter(|row| matches_all(row, &query.filters))
        .cloned()
        .collect();

    rows.sort_by(|a, b| {
        for order in &query.order {
            let ord = compare_values(
                a.get(&order.column).unwrap_or(&Value::Null),
                b.get(&order.column).unwrap_or(&Value::Null),
            );
            let ord = match order.direction {
                Direction::Asc => ord,
                Direction::Desc => ord.reverse(),
            };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        compare_keys(schema, a, b)
    });

    if let Some(limit) = query.limit {
        rows.truncate(limit as usize);
    }
    Ok(rows)
}

fn count_rows(state: &State, query: &Select) -> StoreResult<u64> {
    check_filters(schema::schema(query.table), &query.filters)?;
    let count = state
        .rows(query.table)
        .iter()
        .filter(|row| matches_all(row, &query.filters))
        .count();
    Ok(count as u64)
}

fn apply(state: &mut State, mutation: &Mutation) -> StoreResult<Vec<Row>> {
    match mutation {
        Mutation::Insert { table, rows } => insert(state, *table, rows),
        Mutation::Update {
            table,
            filters,
            values,
        } => update(state, *table, filters, values),
        Mutation::Delete { table, filters } => delete(state, *table, filters),
    }
}

fn insert(state: &mut State, table: Table, rows: &[Row]) -> StoreResult<Vec<Row>> {
    let schema = schema::schema(table);
    let mut inserted = Vec::with_capacity(rows.len());

    for row in rows {
        for column in row.keys() {
            check_column(schema, column)?;
        }

        let mut row = row.clone();
        for (column, default) in schema.defaults {
            if !row.contains_key(*column) {
                let value = match default {
                    ColumnDefault::Uuid => Value::String(Uuid::new_v4().to_string()),
                    ColumnDefault::Now => Value::String(state.tick()),
                    ColumnDefault::Bool(b) => Value::Bool(*b),
                    ColumnDefault::Int(n) => Value::from(*n),
                    ColumnDefault::Text(s) => Value::String((*s).to_string()),
                };
                row.insert((*column).to_string(), value);
            }
        }

        check_row(state, schema, &row, None)?;
        state.tables.entry(table).or_default().push(row.clone());
        inserted.push(row);
    }

    Ok(inserted)
}

fn update(state: &mut State, table: Table, filters: &[Filter], values: &Row) -> StoreResult<Vec<Row>> {
    let schema = schema::schema(table);
    if filters.is_empty() {
        return Err(StoreError::invalid_input("update without filters"));
    }
    check_filters(schema, filters)?;
    for column in values.keys() {
        check_column(schema, column)?;
    }

    let positions: Vec<usize> = state
        .rows(table)
        .iter()
        .enumerate()
        .filter(|(_, row)| matches_all(row, filters))
        .map(|(i, _)| i)
        .collect();

    let mut updated = Vec::with_capacity(positions.len());
    for index in positions {
        let mut row = state.rows(table)[index].clone();
        for (column, value) in values {
            row.insert(column.clone(), value.clone());
        }
        check_row(state, schema, &row, Some(index))?;
        if let Some(rows) = state.tables.get_mut(&table) {
            rows[index] = row.clone();
        }
        updated.push(row);
    }

    Ok(updated)
}

fn delete(state: &mut State, table: Table, filters: &[Filter]) -> StoreResult<Vec<Row>> {
    let schema = schema::schema(table);
    if filters.is_empty() {
        return Err(StoreError::invalid_input("delete without filters"));
    }
    check_filters(schema, filters)?;

    let (removed, kept): (Vec<Row>, Vec<Row>) = state
        .rows(table)
        .iter()
        .cloned()
        .partition(|row| matches_all(row, filters));

    if removed.is_empty() {
        return Ok(removed);
    }

    for (owner, fk) in schema::references_to(table) {
        let doomed: Vec<&Value> = removed
            .iter()
            .filter_map(|row| row.get(fk.referenced_column))
            .collect();
        let references = |row: &Row| {
            row.get(fk.column)
                .map(|v| doomed.iter().any(|d| values_equal(v, d)))
                .unwrap_or(false)
        };

        match fk.on_delete {
            OnDelete::Restrict => {
                if state.rows(owner).iter().any(references) {
                    return Err(StoreError::constraint(format!(
                        "update or delete on table \"{table}\" violates foreign key on table \"{owner}\" ({})",
                        fk.column
                    ))
                    .with_code("23503"));
                }
            }
            OnDelete::SetNull => {
                if let Some(rows) = state.tables.get_mut(&owner) {
                    for row in rows.iter_mut().filter(|r| references(r)) {
                        row.insert(fk.column.to_string(), Value::Null);
                    }
                }
            }
        }
    }

    state.tables.insert(table, kept);
    Ok(removed)
}

/// NOT NULL, CHECK, foreign key and uniqueness checks for one row.
/// `skip` is the row's own position when updating in place.
fn check_row(state: &State, schema: &TableSchema, row: &Row, skip: Option<usize>) -> StoreResult<()> {
    let table = schema.table;

    for column in schema.required.iter().chain(schema.key) {
        if row.get(*column).map_or(true, Value::is_null) {
            return Err(StoreError::constraint(format!(
                "null value in column \"{column}\" of relation \"{table}\" violates not-null constraint"
            ))
            .with_code("23502"));
        }
    }

    for (column, allowed) in schema.allowed {
        if let Some(Value::String(value)) = row.get(*column) {
            if !allowed.contains(&value.as_str()) {
                return Err(StoreError::constraint(format!(
                    "new row for relation \"{table}\" violates check constraint on \"{column}\" ('{value}')"
                ))
                .with_code("23514"));
            }
        }
    }

    for fk in schema.foreign_keys {
        let Some(value) = row.get(fk.column).filter(|v| !v.is_null()) else {
            continue;
        };
        let exists = state
            .rows(fk.references)
            .iter()
            .any(|r| r.get(fk.referenced_column).is_some_and(|v| values_equal(v, value)));
        if !exists {
            return Err(StoreError::constraint(format!(
                "insert or update on table \"{table}\" violates foreign key constraint: {}={} not present in \"{}\"",
                fk.column, value, fk.references
            ))
            .with_code("23503"));
        }
    }

    let key_sets = std::iter::once(schema.key).chain(schema.unique.iter().copied());
    for columns in key_sets {
        let clash = state.rows(table).iter().enumerate().any(|(i, other)| {
            Some(i) != skip
                && columns.iter().all(|c| {
                    match (row.get(*c), other.get(*c)) {
                        (Some(a), Some(b)) => !a.is_null() && values_equal(a, b),
                        _ => false,
                    }
                })
        });
        if clash {
            return Err(StoreError::constraint(format!(
                "duplicate key value violates unique constraint on \"{table}\" ({})",
                columns.join(", ")
            ))
            .with_code("23505"));
        }
    }

    Ok(())
}

fn check_column(schema: &TableSchema, column: &str) -> StoreResult<()> {
    if schema.has_column(column) {
        Ok(())
    } else {
        Err(StoreError::invalid_input(format!(
            "column \"{column}\" of relation \"{}\" does not exist",
            schema.table
        ))
        .with_code("42703"))
    }
}

fn check_filters(schema: &TableSchema, filters: &[Filter]) -> StoreResult<()> {
    filters.iter().try_for_each(|f| check_column(schema, f.column()))
}

fn matches_all(row: &Row, filters: &[Filter]) -> bool {
    filters.iter().all(|filter| {
        let Some(actual) = row.get(filter.column()) else {
            return false;
        };
        match filter {
            Filter::Eq { value, .. } => values_equal(actual, value),
            Filter::In { values, .. } => values.iter().any(|v| values_equal(actual, v)),
        }
    })
}

fn compare_keys(schema: &TableSchema, a: &Row, b: &Row) -> Ordering {
    for column in schema.key {
        let ord = compare_values(
            a.get(*column).unwrap_or(&Value::Null),
            b.get(*column).unwrap_or(&Value::Null),
        );
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}

/// SQL-style equality: NULL equals nothing
fn values_equal(a: &Value, b: &Value) -> bool {
    !a.is_null() && !b.is_null() && compare_values(a, b) == Ordering::Equal
}

/// Ordering with PostgreSQL's default NULL placement (NULL sorts last
/// ascending). Strings that both parse as RFC 3339 compare as instants.
fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Null, _) => Ordering::Greater,
        (_, Value::Null) => Ordering::Less,
        (Value::Number(x), Value::Number(y)) => match (x.as_i64(), y.as_i64()) {
            (Some(x), Some(y)) => x.cmp(&y),
            _ => x
                .as_f64()
                .partial_cmp(&y.as_f64())
                .unwrap_or(Ordering::Equal),
        },
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::String(x), Value::String(y)) => {
            match (
                DateTime::parse_from_rfc3339(x),
                DateTime::parse_from_rfc3339(y),
            ) {
                (Ok(x), Ok(y)) => x.cmp(&y),
                _ => x.cmp(y),
            }
        }
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 5,
        Value::Bool(_) => 0,
        Value::Number(_) => 1,
        Value::String(_) => 2,
        Value::Array(_) => 3,
        Value::Object(_) => 4,
    }
}
