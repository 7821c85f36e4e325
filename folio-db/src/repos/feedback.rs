//! Feedback repository

use std::collections::HashMap;

use chrono::Utc;
use serde_json::{json, Value};
use uuid::Uuid;

use folio_core::models::validation;
use folio_core::{Connection, Feedback, FeedbackStatus, FeedbackWithSender, NewFeedback, SenderInfo};

use crate::client::{single, to_row, Folio};
use crate::error::{DbError, DbResult};
use crate::store::{Filter, Mutation, Row, Select, Table};

const ENTITY: &str = "feedback";

const MAX_REPLY_LEN: usize = 10_000;

/// Feedback repository
pub struct FeedbackRepo<'a> {
    db: &'a Folio,
}

impl<'a> FeedbackRepo<'a> {
    pub fn new(db: &'a Folio) -> Self {
        Self { db }
    }

    pub async fn submit(&self, feedback: NewFeedback) -> DbResult<Feedback> {
        feedback.validate()?;

        let id = Uuid::new_v4().to_string();
        let mut row = to_row(ENTITY, &feedback)?;
        row.insert("id".into(), Value::String(id.clone()));
        row.insert("status".into(), json!(FeedbackStatus::Unread));

        let insert = Mutation::Insert {
            table: Table::Feedback,
            rows: vec![row],
        };
        let rows = self.db.execute("feedback.submit", &insert).await?;
        single(ENTITY, rows)?.ok_or_else(|| DbError::not_found(ENTITY, id))
    }

    /// Newest first
    pub async fn list(&self) -> DbResult<Vec<Feedback>> {
        let query = Select::from(Table::Feedback).order_desc("created_at");
        self.db.fetch_all("feedback.list", ENTITY, &query).await
    }

    pub async fn list_by_status(&self, status: FeedbackStatus) -> DbResult<Vec<Feedback>> {
        let query = Select::from(Table::Feedback)
            .filter(Filter::eq("status", status.as_str()))
            .order_desc("created_at");
        self.db.fetch_all("feedback.list_by_status", ENTITY, &query).await
    }

    /// Newest first, each entry with the linked connection's identity.
    ///
    /// Senders are loaded with a single query for the whole list.
    pub async fn list_with_sender(&self) -> DbResult<Vec<FeedbackWithSender>> {
        let feedback = self.list().await?;

        let connection_ids: Vec<&str> = feedback
            .iter()
            .filter_map(|f| f.connection_id.as_deref())
            .collect();
        let senders: HashMap<String, SenderInfo> = if connection_ids.is_empty() {
            HashMap::new()
        } else {
            let query = Select::from(Table::Connections).filter(Filter::is_in("id", connection_ids));
            let connections: Vec<Connection> = self
                .db
                .fetch_all("feedback.senders", "connection", &query)
                .await?;
            connections
                .into_iter()
                .map(|c| {
                    let sender = SenderInfo {
                        name: c.name,
                        email: c.email,
                        subject: c.subject,
                        status: c.status,
                    };
                    (c.id, sender)
                })
                .collect()
        };

        Ok(feedback
            .into_iter()
            .map(|feedback| {
                let sender = feedback
                    .connection_id
                    .as_ref()
                    .and_then(|id| senders.get(id))
                    .cloned();
                FeedbackWithSender { feedback, sender }
            })
            .collect())
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Feedback>> {
        let query = Select::from(Table::Feedback).filter(Filter::eq("id", id));
        self.db.fetch_optional("feedback.get", ENTITY, &query).await
    }

    /// Toggle between `unread` and `read`. `replied` is only reachable via
    /// [`FeedbackRepo::reply`].
    pub async fn set_status(&self, id: &str, status: FeedbackStatus) -> DbResult<Feedback> {
        let current = self
            .get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found(ENTITY, id))?;
        if current.status == status {
            return Ok(current);
        }
        if !current.status.can_set_to(status) {
            return Err(DbError::InvalidTransition {
                resource: ENTITY,
                id: id.to_string(),
                from: current.status.to_string(),
                to: status.to_string(),
            });
        }

        // Conditional on the status we checked so a concurrent reply wins
        let update = Mutation::Update {
            table: Table::Feedback,
            filters: vec![
                Filter::eq("id", id),
                Filter::eq("status", current.status.as_str()),
            ],
            values: status_values(status),
        };
        let rows = self.db.execute("feedback.set_status", &update).await?;
        match single(ENTITY, rows)? {
            Some(feedback) => Ok(feedback),
            None => self
                .get_by_id(id)
                .await?
                .ok_or_else(|| DbError::not_found(ENTITY, id)),
        }
    }

    /// Store a reply and mark the feedback `replied` in one update.
    pub async fn reply(&self, id: &str, message: &str) -> DbResult<Feedback> {
        validation::required_text("reply_message", message, MAX_REPLY_LEN)?;

        let mut values = status_values(FeedbackStatus::Replied);
        values.insert("reply_message".into(), Value::String(message.to_string()));

        let update = Mutation::Update {
            table: Table::Feedback,
            filters: vec![Filter::eq("id", id)],
            values,
        };
        let rows = self.db.execute("feedback.reply", &update).await?;
        single(ENTITY, rows)?.ok_or_else(|| DbError::not_found(ENTITY, id))
    }

    pub async fn delete(&self, id: &str) -> DbResult<()> {
        let delete = Mutation::Delete {
            table: Table::Feedback,
            filters: vec![Filter::eq("id", id)],
        };
        self.db.execute("feedback.delete", &delete).await?;
        Ok(())
    }
}

fn status_values(status: FeedbackStatus) -> Row {
    let mut values = Row::new();
    values.insert("status".into(), json!(status));
    values.insert("updated_at".into(), json!(Utc::now()));
    values
}
