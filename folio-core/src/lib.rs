//! folio-core: domain model for the portfolio data layer
//!
//! Entities, insert/patch payloads, workflow states and the configuration
//! file shared by the data-access crate and the admin CLI.

pub mod config;
pub mod models;

pub use config::{BackoffKind, DatabaseConfig, FolioConfig, LoggingConfig, RetryConfig};
pub use models::*;
