//! Review (testimonial) repository
//!
//! Reviews start `pending`. Moderation moves them to `approved`, which puts
//! them on the public read path, or `rejected`. Neither is reversible.

use serde_json::{json, Value};
use uuid::Uuid;

use folio_core::{NewReview, Review, ReviewStatus};

use crate::client::{single, to_row, Folio};
use crate::error::{DbError, DbResult};
use crate::store::{Filter, Mutation, Row, Select, Table};

const ENTITY: &str = "review";

/// Review repository
pub struct ReviewRepo<'a> {
    db: &'a Folio,
}

impl<'a> ReviewRepo<'a> {
    pub fn new(db: &'a Folio) -> Self {
        Self { db }
    }

    pub async fn submit(&self, review: NewReview) -> DbResult<Review> {
        review.validate()?;

        let id = Uuid::new_v4().to_string();
        let mut row = to_row(ENTITY, &review)?;
        row.insert("id".into(), Value::String(id.clone()));
        row.insert("status".into(), json!(ReviewStatus::Pending));

        let insert = Mutation::Insert {
            table: Table::Reviews,
            rows: vec![row],
        };
        let rows = self.db.execute("reviews.submit", &insert).await?;
        single(ENTITY, rows)?.ok_or_else(|| DbError::not_found(ENTITY, id))
    }

    /// Every review, newest first
    pub async fn list(&self) -> DbResult<Vec<Review>> {
        let query = Select::from(Table::Reviews).order_desc("created_at");
        self.db.fetch_all("reviews.list", ENTITY, &query).await
    }

    pub async fn list_by_status(&self, status: ReviewStatus) -> DbResult<Vec<Review>> {
        let query = Select::from(Table::Reviews)
            .filter(Filter::eq("status", status.as_str()))
            .order_desc("created_at");
        self.db.fetch_all("reviews.list_by_status", ENTITY, &query).await
    }

    /// Moderation queue
    pub async fn list_pending(&self) -> DbResult<Vec<Review>> {
        self.list_by_status(ReviewStatus::Pending).await
    }

    /// Public testimonials
    pub async fn list_approved(&self) -> DbResult<Vec<Review>> {
        self.list_by_status(ReviewStatus::Approved).await
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Review>> {
        let query = Select::from(Table::Reviews).filter(Filter::eq("id", id));
        self.db.fetch_optional("reviews.get", ENTITY, &query).await
    }

    pub async fn approve(&self, id: &str) -> DbResult<Review> {
        self.moderate(id, ReviewStatus::Approved).await
    }

    pub async fn reject(&self, id: &str) -> DbResult<Review> {
        self.moderate(id, ReviewStatus::Rejected).await
    }

    pub async fn delete(&self, id: &str) -> DbResult<()> {
        let delete = Mutation::Delete {
            table: Table::Reviews,
            filters: vec![Filter::eq("id", id)],
        };
        self.db.execute("reviews.delete", &delete).await?;
        Ok(())
    }

    /// Move a pending review to `to`. Repeating the same decision is a no-op.
    async fn moderate(&self, id: &str, to: ReviewStatus) -> DbResult<Review> {
        let mut values = Row::new();
        values.insert("status".into(), json!(to));

        let update = Mutation::Update {
            table: Table::Reviews,
            filters: vec![
                Filter::eq("id", id),
                Filter::is_in("status", ReviewStatus::sources(to).map(|s| s.as_str())),
            ],
            values,
        };
        let rows = self.db.execute("reviews.moderate", &update).await?;
        if let Some(review) = single(ENTITY, rows)? {
            return Ok(review);
        }

        match self.get_by_id(id).await? {
            None => Err(DbError::not_found(ENTITY, id)),
            Some(review) if review.status == to => Ok(review),
            Some(review) => Err(DbError::InvalidTransition {
                resource: ENTITY,
                id: id.to_string(),
                from: review.status.to_string(),
                to: to.to_string(),
            }),
        }
    }
}
