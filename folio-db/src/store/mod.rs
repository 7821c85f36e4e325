//! Transport client abstraction
//!
//! A [`Store`] issues row-level select/insert/update/delete requests against
//! named tables plus the one remote procedure the schema defines. Rows
//! travel as JSON objects so repositories can (de)serialize entities with
//! serde, independent of the backend.
//!
//! Backends:
//! - [`postgres::PgStore`]: sqlx connection pool, dynamic SQL over `jsonb`
//! - [`memory::MemoryStore`]: in-process tables for tests and demos

pub mod memory;
pub mod postgres;
pub mod schema;

use std::fmt;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// One row as returned by a store
pub type Row = serde_json::Map<String, Value>;

pub type StoreResult<T> = Result<T, StoreError>;

/// Tables the portfolio schema defines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Table {
    Projects,
    Technologies,
    ProjectTechnologies,
    Connections,
    Reviews,
    Feedback,
    PortfolioStats,
    Profiles,
    Experiences,
    ExperienceTechnologies,
    Education,
    Certifications,
    FunFacts,
}

impl Table {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Projects => "projects",
            Self::Technologies => "technologies",
            Self::ProjectTechnologies => "project_technologies",
            Self::Connections => "connections",
            Self::Reviews => "reviews",
            Self::Feedback => "feedback",
            Self::PortfolioStats => "portfolio_stats",
            Self::Profiles => "profiles",
            Self::Experiences => "experiences",
            Self::ExperienceTechnologies => "experience_technologies",
            Self::Education => "education",
            Self::Certifications => "certifications",
            Self::FunFacts => "fun_facts",
        }
    }

    pub fn all() -> &'static [Self] {
        &[
            Self::Projects,
            Self::Technologies,
            Self::ProjectTechnologies,
            Self::Connections,
            Self::Reviews,
            Self::Feedback,
            Self::PortfolioStats,
            Self::Profiles,
            Self::Experiences,
            Self::ExperienceTechnologies,
            Self::Education,
            Self::Certifications,
            Self::FunFacts,
        ]
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Row predicate
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Eq { column: String, value: Value },
    In { column: String, values: Vec<Value> },
}

impl Filter {
    pub fn eq(column: &str, value: impl Into<Value>) -> Self {
        Self::Eq {
            column: column.to_string(),
            value: value.into(),
        }
    }

    pub fn is_in<I, V>(column: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self::In {
            column: column.to_string(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn column(&self) -> &str {
        match self {
            Self::Eq { column, .. } | Self::In { column, .. } => column,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub column: String,
    pub direction: Direction,
}

/// Read request. Backends break ordering ties on the table key.
#[derive(Debug, Clone, PartialEq)]
pub struct Select {
    pub table: Table,
    pub filters: Vec<Filter>,
    pub order: Vec<Order>,
    pub limit: Option<u32>,
}

impl Select {
    pub fn from(table: Table) -> Self {
        Self {
            table,
            filters: Vec::new(),
            order: Vec::new(),
            limit: None,
        }
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn order_asc(mut self, column: &str) -> Self {
        self.order.push(Order {
            column: column.to_string(),
            direction: Direction::Asc,
        });
        self
    }

    pub fn order_desc(mut self, column: &str) -> Self {
        self.order.push(Order {
            column: column.to_string(),
            direction: Direction::Desc,
        });
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Write request. Update and delete require at least one filter.
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    Insert {
        table: Table,
        rows: Vec<Row>,
    },
    Update {
        table: Table,
        filters: Vec<Filter>,
        values: Row,
    },
    Delete {
        table: Table,
        filters: Vec<Filter>,
    },
}

impl Mutation {
    pub fn table(&self) -> Table {
        match self {
            Self::Insert { table, .. } | Self::Update { table, .. } | Self::Delete { table, .. } => {
                *table
            }
        }
    }

    pub fn operation(&self) -> Operation {
        match self {
            Self::Insert { .. } => Operation::Insert,
            Self::Update { .. } => Operation::Update,
            Self::Delete { .. } => Operation::Delete,
        }
    }
}

/// Store operation kinds, used for logging and fault injection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Select,
    Insert,
    Update,
    Delete,
    Call,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Select => "select",
            Self::Insert => "insert",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Call => "call",
        })
    }
}

/// Remote procedures
#[derive(Debug, Clone, PartialEq)]
pub enum Procedure {
    /// Add `increment_by` to a named counter, creating it at zero if absent.
    /// Returns the new value.
    IncrementStat {
        metric_name: String,
        increment_by: i64,
    },
}

impl Procedure {
    /// Whether running the call twice leaves the same state as running it once
    pub fn is_idempotent(&self) -> bool {
        match self {
            Self::IncrementStat { .. } => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreErrorKind {
    /// Network or connection-level failure
    Connection,
    /// The call did not finish in time
    Timeout,
    /// Store is overloaded, shutting down, or aborted the call (deadlock, serialization)
    Unavailable,
    /// Key, uniqueness, foreign-key, NOT NULL or check violation
    Constraint,
    /// Malformed request (bad column, bad value)
    InvalidInput,
    /// Capability the backend does not offer
    Unsupported,
    Internal,
}

impl StoreErrorKind {
    /// Transient kinds are worth retrying; the rest fail the same way again.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Connection | Self::Timeout | Self::Unavailable)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Connection => "connection",
            Self::Timeout => "timeout",
            Self::Unavailable => "unavailable",
            Self::Constraint => "constraint",
            Self::InvalidInput => "invalid_input",
            Self::Unsupported => "unsupported",
            Self::Internal => "internal",
        }
    }
}

impl fmt::Display for StoreErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured error descriptor returned by a store
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind} error{}: {message}", .code.as_ref().map(|c| format!(" [{c}]")).unwrap_or_default())]
pub struct StoreError {
    pub kind: StoreErrorKind,
    /// Backend-specific code (SQLSTATE for PostgreSQL)
    pub code: Option<String>,
    pub message: String,
}

impl StoreError {
    pub fn new(kind: StoreErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            code: None,
            message: message.into(),
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn constraint(message: impl Into<String>) -> Self {
        Self::new(StoreErrorKind::Constraint, message)
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(StoreErrorKind::InvalidInput, message)
    }

    pub fn unsupported(what: &str) -> Self {
        Self::new(
            StoreErrorKind::Unsupported,
            format!("{what} not supported by this store"),
        )
    }

    pub fn is_transient(&self) -> bool {
        self.kind.is_transient()
    }

    /// Duplicate primary key or unique value (SQLSTATE 23505)
    pub fn is_unique_violation(&self) -> bool {
        self.kind == StoreErrorKind::Constraint && self.code.as_deref() == Some("23505")
    }
}

/// Row-level access to the portfolio tables
#[async_trait]
pub trait Store: Send + Sync {
    /// Short backend name for logs
    fn name(&self) -> &'static str;

    async fn select(&self, query: &Select) -> StoreResult<Vec<Row>>;

    /// Rows matching the query's filters. Order and limit are ignored.
    async fn count(&self, query: &Select) -> StoreResult<u64>;

    /// Apply one mutation, returning the inserted/updated/deleted rows.
    async fn execute(&self, mutation: &Mutation) -> StoreResult<Vec<Row>>;

    async fn call(&self, procedure: &Procedure) -> StoreResult<Value>;

    /// Whether [`Store::transact`] applies batches atomically.
    fn supports_transactions(&self) -> bool {
        false
    }

    /// Apply all mutations or none. Returns each mutation's rows in order.
    async fn transact(&self, batch: &[Mutation]) -> StoreResult<Vec<Vec<Row>>> {
        let _ = batch;
        Err(StoreError::unsupported("transactions"))
    }
}
