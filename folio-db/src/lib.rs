//! Portfolio data access
//!
//! - [`store`]: transport abstraction with PostgreSQL and in-memory backends
//! - [`retry`]: transient-failure retry with per-attempt timeouts
//! - [`repos`]: one repository per entity, including the project↔technology
//!   relationship manager
//!
//! ```ignore
//! let folio = Folio::connect(&FolioConfig::load()?).await?;
//! let featured = folio.projects().list_featured().await?;
//! ```

pub mod client;
pub mod error;
pub mod pool;
pub mod repos;
pub mod retry;
pub mod store;

pub use client::Folio;
pub use error::{DbError, DbResult};
pub use repos::{AboutPage, DashboardSummary};
pub use retry::{retry, retry_when, Backoff, RetryPolicy};
pub use store::{MemoryStore, PgStore, Store, StoreError, StoreErrorKind};
