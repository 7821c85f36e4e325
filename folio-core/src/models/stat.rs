//! Named portfolio counters

use serde::{Deserialize, Serialize};

/// Counter bumped on every contact-form submission
pub const TOTAL_CONNECTIONS: &str = "total_connections";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortfolioStat {
    pub metric_name: String,
    pub metric_value: i64,
}
