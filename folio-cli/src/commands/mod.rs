//! Command implementations for folioctl

pub mod about;
pub mod connections;
pub mod feedback;
pub mod projects;
pub mod reviews;
pub mod stats;
pub mod technologies;

use anyhow::Result;
use serde::Serialize;

use folio_db::Folio;

pub use about::run_about;
pub use connections::run_connections;
pub use feedback::run_feedback;
pub use projects::run_projects;
pub use reviews::run_reviews;
pub use stats::{run_stats, run_summary};
pub use technologies::run_technologies;

/// Connected handle plus output mode, shared by every data command
pub struct Session {
    pub folio: Folio,
    pub json: bool,
}

impl Session {
    /// Print `value` as pretty JSON, or as text through `text`.
    pub fn emit<T: Serialize>(&self, value: &T, text: impl FnOnce(&T)) -> Result<()> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(value)?);
        } else {
            text(value);
        }
        Ok(())
    }
}

/// Short local timestamp for tables
pub(crate) fn when(ts: &chrono::DateTime<chrono::Utc>) -> String {
    ts.format("%Y-%m-%d %H:%M").to_string()
}

/// First line of `text`, cut to `max` characters
pub(crate) fn excerpt(text: &str, max: usize) -> String {
    let line = text.lines().next().unwrap_or_default();
    if line.chars().count() > max {
        let cut: String = line.chars().take(max.saturating_sub(1)).collect();
        format!("{cut}…")
    } else {
        line.to_string()
    }
}
