//! Technology repository

use serde_json::Value;
use uuid::Uuid;

use folio_core::{group_by_category, NewTechnology, TechnologiesByCategory, Technology, TechnologyPatch};

use crate::client::{single, to_row, Folio};
use crate::error::{DbError, DbResult};
use crate::store::{schema, Filter, Mutation, Select, Table};

const ENTITY: &str = "technology";

/// Technology repository
pub struct TechnologyRepo<'a> {
    db: &'a Folio,
}

impl<'a> TechnologyRepo<'a> {
    pub fn new(db: &'a Folio) -> Self {
        Self { db }
    }

    /// All technologies by name
    pub async fn list(&self) -> DbResult<Vec<Technology>> {
        let query = Select::from(Table::Technologies).order_asc("name");
        self.db.fetch_all("technologies.list", ENTITY, &query).await
    }

    /// Technologies grouped by category, categories and names ascending.
    /// Uncategorized entries form a trailing "Other" group.
    pub async fn list_by_category(&self) -> DbResult<Vec<TechnologiesByCategory>> {
        let query = Select::from(Table::Technologies)
            .order_asc("category")
            .order_asc("name");
        let technologies = self
            .db
            .fetch_all("technologies.by_category", ENTITY, &query)
            .await?;
        Ok(group_by_category(technologies))
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Technology>> {
        let query = Select::from(Table::Technologies).filter(Filter::eq("id", id));
        self.db.fetch_optional("technologies.get", ENTITY, &query).await
    }

    pub async fn create(&self, technology: NewTechnology) -> DbResult<Technology> {
        technology.validate()?;

        let id = Uuid::new_v4().to_string();
        let mut row = to_row(ENTITY, &technology)?;
        row.insert("id".into(), Value::String(id.clone()));

        let insert = Mutation::Insert {
            table: Table::Technologies,
            rows: vec![row],
        };
        let rows = self.db.execute("technologies.create", &insert).await?;
        single(ENTITY, rows)?.ok_or_else(|| DbError::not_found(ENTITY, id))
    }

    pub async fn update(&self, id: &str, patch: TechnologyPatch) -> DbResult<Technology> {
        patch.validate()?;
        if patch.is_empty() {
            return self
                .get_by_id(id)
                .await?
                .ok_or_else(|| DbError::not_found(ENTITY, id));
        }

        let update = Mutation::Update {
            table: Table::Technologies,
            filters: vec![Filter::eq("id", id)],
            values: to_row(ENTITY, &patch)?,
        };
        let rows = self.db.execute("technologies.update", &update).await?;
        single(ENTITY, rows)?.ok_or_else(|| DbError::not_found(ENTITY, id))
    }

    /// Delete a technology, unlinking it from every project and experience first.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        let mut steps: Vec<Mutation> = schema::references_to(Table::Technologies)
            .map(|(table, fk)| Mutation::Delete {
                table,
                filters: vec![Filter::eq(fk.column, id)],
            })
            .collect();
        steps.push(Mutation::Delete {
            table: Table::Technologies,
            filters: vec![Filter::eq("id", id)],
        });

        if self.db.supports_transactions() {
            self.db.transact("technologies.delete", &steps).await?;
        } else {
            for step in &steps {
                let op = if step.table() == Table::Technologies {
                    "technologies.delete"
                } else {
                    "technologies.unlink"
                };
                self.db.execute(op, step).await?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use serde_json::json;

    use crate::store::{MemoryStore, Store, StoreErrorKind};

    #[tokio::test]
    async fn names_are_unique() {
        let folio = Folio::in_memory();
        let repo = folio.technologies();
        repo.create(NewTechnology::new("Rust")).await.unwrap();

        let err = repo.create(NewTechnology::new("Rust")).await.unwrap_err();
        assert_eq!(err.store_error().map(|e| e.kind), Some(StoreErrorKind::Constraint));
    }

    #[tokio::test]
    async fn groups_sort_by_category_then_name() {
        let folio = Folio::in_memory();
        let repo = folio.technologies();
        for (name, category) in [
            ("Svelte", Some("Frontend")),
            ("Rust", Some("Backend")),
            ("Docker", None),
            ("Axum", Some("Backend")),
        ] {
            let mut tech = NewTechnology::new(name);
            tech.category = category.map(str::to_string);
            repo.create(tech).await.unwrap();
        }

        let groups = repo.list_by_category().await.unwrap();
        let shape: Vec<(&str, Vec<&str>)> = groups
            .iter()
            .map(|g| {
                (
                    g.category.as_str(),
                    g.technologies.iter().map(|t| t.name.as_str()).collect(),
                )
            })
            .collect();
        assert_eq!(
            shape,
            vec![
                ("Backend", vec!["Axum", "Rust"]),
                ("Frontend", vec!["Svelte"]),
                ("Other", vec!["Docker"]),
            ]
        );
    }

    #[tokio::test]
    async fn delete_clears_experience_links() {
        for store in [MemoryStore::new(), MemoryStore::without_transactions()] {
            let store = Arc::new(store);
            let folio = Folio::new(store.clone());
            let tech = folio.technologies().create(NewTechnology::new("Rust")).await.unwrap();
            let experience = json!({
                "id": "e1",
                "company": "Acme",
                "position": "Dev",
                "start_date": "2020-01-01"
            });
            let link = json!({ "experience_id": "e1", "technology_id": tech.id });
            let seeds = [
                (Table::Experiences, experience),
                (Table::ExperienceTechnologies, link),
            ];
            for (table, value) in seeds {
                let row = value.as_object().cloned().unwrap();
                store
                    .execute(&Mutation::Insert { table, rows: vec![row] })
                    .await
                    .unwrap();
            }

            folio.technologies().delete(&tech.id).await.unwrap();

            assert_eq!(store.row_count(Table::ExperienceTechnologies).await, 0);
            assert_eq!(store.row_count(Table::Experiences).await, 1);
            assert!(folio.technologies().get_by_id(&tech.id).await.unwrap().is_none());
        }
    }

    #[tokio::test]
    async fn empty_patch_returns_current_row() {
        let folio = Folio::in_memory();
        let repo = folio.technologies();
        let tech = repo.create(NewTechnology::new("Rust")).await.unwrap();

        let same = repo.update(&tech.id, TechnologyPatch::default()).await.unwrap();
        assert_eq!(same, tech);

        let err = repo.update("missing", TechnologyPatch::default()).await.unwrap_err();
        assert!(err.is_not_found());
    }
}
