//! Admin dashboard summary

use std::collections::BTreeMap;

use serde::Serialize;

use folio_core::{ConnectionStatus, FeedbackStatus, ReviewStatus};

use crate::client::Folio;
use crate::error::DbResult;
use crate::store::{Filter, Select, Table};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DashboardSummary {
    pub projects: u64,
    pub unread_connections: u64,
    pub pending_reviews: u64,
    pub unread_feedback: u64,
    pub stats: BTreeMap<String, i64>,
}

impl Folio {
    /// Counts for the admin landing page, fetched concurrently.
    pub async fn dashboard(&self) -> DbResult<DashboardSummary> {
        let projects = Select::from(Table::Projects);
        let connections = Select::from(Table::Connections)
            .filter(Filter::eq("status", ConnectionStatus::Unread.as_str()));
        let reviews =
            Select::from(Table::Reviews).filter(Filter::eq("status", ReviewStatus::Pending.as_str()));
        let feedback =
            Select::from(Table::Feedback).filter(Filter::eq("status", FeedbackStatus::Unread.as_str()));
        let stats = self.stats();

        let (projects, unread_connections, pending_reviews, unread_feedback, stats) = tokio::try_join!(
            self.count("dashboard.projects", &projects),
            self.count("dashboard.connections", &connections),
            self.count("dashboard.reviews", &reviews),
            self.count("dashboard.feedback", &feedback),
            stats.all(),
        )?;

        Ok(DashboardSummary {
            projects,
            unread_connections,
            pending_reviews,
            unread_feedback,
            stats,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_core::{ContactForm, NewProject, NewReview};

    #[tokio::test]
    async fn summary_counts_open_items() {
        let folio = Folio::in_memory();
        folio
            .projects()
            .create(NewProject::new("Folio", "Portfolio site"), &[])
            .await
            .unwrap();
        let connection = folio
            .connections()
            .submit(ContactForm {
                name: "A".into(),
                email: "a@x.com".into(),
                subject: "Hi".into(),
                message: "test".into(),
            })
            .await
            .unwrap();
        folio.connections().mark_read(&connection.id).await.unwrap();
        folio
            .reviews()
            .submit(NewReview {
                name: "Grace".into(),
                role: "Engineer".into(),
                company: None,
                content: "Great".into(),
                rating: None,
            })
            .await
            .unwrap();

        let summary = folio.dashboard().await.unwrap();
        assert_eq!(summary.projects, 1);
        assert_eq!(summary.unread_connections, 0);
        assert_eq!(summary.pending_reviews, 1);
        assert_eq!(summary.unread_feedback, 0);
        assert_eq!(summary.stats.get("total_connections"), Some(&1));
    }
}
