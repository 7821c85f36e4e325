//! Contact-form submissions ("connections")
//!
//! `unread` → `read` on first view, `unread`/`read` → `replied` with a reply
//! message. `replied` is never downgraded.

use chrono::Utc;
use serde_json::{json, Value};
use tracing::warn;
use uuid::Uuid;

use folio_core::models::validation;
use folio_core::{Connection, ConnectionStatus, ContactForm, TOTAL_CONNECTIONS};

use crate::client::{single, to_row, Folio};
use crate::error::{DbError, DbResult};
use crate::store::{Filter, Mutation, Row, Select, Table};

const ENTITY: &str = "connection";

const MAX_REPLY_LEN: usize = 10_000;

/// Connection repository
pub struct ConnectionRepo<'a> {
    db: &'a Folio,
}

impl<'a> ConnectionRepo<'a> {
    pub fn new(db: &'a Folio) -> Self {
        Self { db }
    }

    /// Store a contact-form submission as `unread` and bump the
    /// `total_connections` counter. A failed counter update is logged and
    /// does not fail the submission.
    pub async fn submit(&self, form: ContactForm) -> DbResult<Connection> {
        form.validate()?;

        let id = Uuid::new_v4().to_string();
        let mut row = to_row(ENTITY, &form)?;
        row.insert("id".into(), Value::String(id.clone()));
        row.insert("status".into(), json!(ConnectionStatus::Unread));

        let insert = Mutation::Insert {
            table: Table::Connections,
            rows: vec![row],
        };
        let rows = self.db.execute("connections.submit", &insert).await?;
        let connection: Connection =
            single(ENTITY, rows)?.ok_or_else(|| DbError::not_found(ENTITY, &id))?;

        if let Err(err) = self.db.stats().increment(TOTAL_CONNECTIONS, 1).await {
            warn!(connection_id = %connection.id, error = %err, "failed to update connection counter");
        }

        Ok(connection)
    }

    /// Newest first
    pub async fn list(&self) -> DbResult<Vec<Connection>> {
        let query = Select::from(Table::Connections).order_desc("created_at");
        self.db.fetch_all("connections.list", ENTITY, &query).await
    }

    pub async fn list_by_status(&self, status: ConnectionStatus) -> DbResult<Vec<Connection>> {
        let query = Select::from(Table::Connections)
            .filter(Filter::eq("status", status.as_str()))
            .order_desc("created_at");
        self.db.fetch_all("connections.list_by_status", ENTITY, &query).await
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Connection>> {
        let query = Select::from(Table::Connections).filter(Filter::eq("id", id));
        self.db.fetch_optional("connections.get", ENTITY, &query).await
    }

    /// Mark an unread connection as read. Rows already read or replied are
    /// returned unchanged.
    pub async fn mark_read(&self, id: &str) -> DbResult<Connection> {
        let update = Mutation::Update {
            table: Table::Connections,
            filters: vec![Filter::eq("id", id), entering(ConnectionStatus::Read)],
            values: status_values(ConnectionStatus::Read),
        };
        let rows = self.db.execute("connections.mark_read", &update).await?;
        if let Some(connection) = single(ENTITY, rows)? {
            return Ok(connection);
        }

        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found(ENTITY, id))
    }

    /// Record a reply: message and `replied` status in one update.
    pub async fn reply(&self, id: &str, message: &str) -> DbResult<Connection> {
        validation::required_text("reply_message", message, MAX_REPLY_LEN)?;

        let mut values = status_values(ConnectionStatus::Replied);
        values.insert("reply_message".into(), Value::String(message.to_string()));

        let update = Mutation::Update {
            table: Table::Connections,
            filters: vec![Filter::eq("id", id), entering(ConnectionStatus::Replied)],
            values,
        };
        let rows = self.db.execute("connections.reply", &update).await?;
        if let Some(connection) = single(ENTITY, rows)? {
            return Ok(connection);
        }

        match self.get_by_id(id).await? {
            None => Err(DbError::not_found(ENTITY, id)),
            Some(connection) => Err(DbError::InvalidTransition {
                resource: ENTITY,
                id: id.to_string(),
                from: connection.status.to_string(),
                to: ConnectionStatus::Replied.to_string(),
            }),
        }
    }

    /// Remove the row. Feedback pointing at it keeps existing without a sender.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        let delete = Mutation::Delete {
            table: Table::Connections,
            filters: vec![Filter::eq("id", id)],
        };
        self.db.execute("connections.delete", &delete).await?;
        Ok(())
    }
}

/// Rows whose current status may move to `next`
fn entering(next: ConnectionStatus) -> Filter {
    Filter::is_in("status", ConnectionStatus::sources(next).map(|s| s.as_str()))
}

fn status_values(status: ConnectionStatus) -> Row {
    let mut values = Row::new();
    values.insert("status".into(), json!(status));
    values.insert("updated_at".into(), json!(Utc::now()));
    values
}
