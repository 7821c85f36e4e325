//! Portfolio counters

use std::collections::BTreeMap;

use folio_core::PortfolioStat;

use crate::client::Folio;
use crate::error::{DbError, DbResult};
use crate::store::{Filter, Procedure, Select, Table};

const ENTITY: &str = "portfolio stat";

/// Stats repository
pub struct StatsRepo<'a> {
    db: &'a Folio,
}

impl<'a> StatsRepo<'a> {
    pub fn new(db: &'a Folio) -> Self {
        Self { db }
    }

    /// Every counter, ordered by name
    pub async fn list(&self) -> DbResult<Vec<PortfolioStat>> {
        let query = Select::from(Table::PortfolioStats).order_asc("metric_name");
        self.db.fetch_all("stats.list", ENTITY, &query).await
    }

    /// Counters as a name → value map
    pub async fn all(&self) -> DbResult<BTreeMap<String, i64>> {
        Ok(self
            .list()
            .await?
            .into_iter()
            .map(|stat| (stat.metric_name, stat.metric_value))
            .collect())
    }

    pub async fn get(&self, metric_name: &str) -> DbResult<Option<i64>> {
        let query = Select::from(Table::PortfolioStats).filter(Filter::eq("metric_name", metric_name));
        let stat: Option<PortfolioStat> = self.db.fetch_optional("stats.get", ENTITY, &query).await?;
        Ok(stat.map(|s| s.metric_value))
    }

    /// Atomically add `increment_by`, creating the counter if needed.
    /// Returns the new value.
    pub async fn increment(&self, metric_name: &str, increment_by: i64) -> DbResult<i64> {
        let procedure = Procedure::IncrementStat {
            metric_name: metric_name.to_string(),
            increment_by,
        };
        let value = self.db.call("stats.increment", &procedure).await?;
        serde_json::from_value(value).map_err(|source| DbError::Decode {
            entity: ENTITY,
            source,
        })
    }
}
