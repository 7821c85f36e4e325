//! Project repository and project↔technology relationship manager
//!
//! Links live in `project_technologies`. Writes touching both tables go
//! through one transaction when the store offers them. Otherwise they run
//! step by step with compensation:
//! - create: insert project, insert links; on link failure delete the project
//! - update: snapshot links, delete, insert; on insert failure restore the snapshot
//! - delete: delete links, then the project; a failed link delete keeps the project
//!
//! Lists are enriched with one join-row query and one technology query for
//! the whole page.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, warn};
use uuid::Uuid;

use folio_core::{NewProject, Project, ProjectPatch, ProjectWithTechnologies};

use crate::client::{single, to_row, Folio};
use crate::error::{DbError, DbResult};
use crate::store::{Filter, Mutation, Row, Select, Table};

use super::linked::linked_technologies;

const ENTITY: &str = "project";

/// One row of `project_technologies`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProjectTechnology {
    pub project_id: String,
    pub technology_id: String,
}

/// Project repository
pub struct ProjectRepo<'a> {
    db: &'a Folio,
}

impl<'a> ProjectRepo<'a> {
    pub fn new(db: &'a Folio) -> Self {
        Self { db }
    }

    /// All projects by ascending `sort_order`, with technologies.
    pub async fn list_all(&self) -> DbResult<Vec<ProjectWithTechnologies>> {
        let query = Select::from(Table::Projects).order_asc("sort_order");
        let projects = self.db.fetch_all("projects.list_all", ENTITY, &query).await?;
        self.with_technologies(projects).await
    }

    /// Featured projects by ascending `sort_order`, with technologies.
    pub async fn list_featured(&self) -> DbResult<Vec<ProjectWithTechnologies>> {
        let query = Select::from(Table::Projects)
            .filter(Filter::eq("is_featured", true))
            .order_asc("sort_order");
        let projects = self.db.fetch_all("projects.list_featured", ENTITY, &query).await?;
        self.with_technologies(projects).await
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<ProjectWithTechnologies>> {
        let Some(project) = self.find(id).await? else {
            return Ok(None);
        };
        Ok(self.with_technologies(vec![project]).await?.pop())
    }

    /// Technology ids currently linked to `id`
    pub async fn technology_ids(&self, id: &str) -> DbResult<Vec<String>> {
        Ok(self
            .links(id)
            .await?
            .into_iter()
            .map(|link| link.technology_id)
            .collect())
    }

    /// Create a project linked to `technology_ids`.
    ///
    /// On failure no project row is left behind.
    pub async fn create(
        &self,
        project: NewProject,
        technology_ids: &[String],
    ) -> DbResult<ProjectWithTechnologies> {
        project.validate()?;

        let id = Uuid::new_v4().to_string();
        let mut row = to_row(ENTITY, &project)?;
        row.insert("id".into(), Value::String(id.clone()));
        let links = link_rows(&id, technology_ids)?;

        let insert_project = Mutation::Insert {
            table: Table::Projects,
            rows: vec![row],
        };

        let created: Project = if self.db.supports_transactions() {
            let mut batch = vec![insert_project];
            if !links.is_empty() {
                batch.push(Mutation::Insert {
                    table: Table::ProjectTechnologies,
                    rows: links,
                });
            }
            let mut results = self.db.transact("projects.create", &batch).await?;
            let rows = if results.is_empty() { Vec::new() } else { results.swap_remove(0) };
            single(ENTITY, rows)?.ok_or_else(|| DbError::not_found(ENTITY, &id))?
        } else {
            let rows = self.db.execute("projects.create", &insert_project).await?;
            let created = single(ENTITY, rows)?.ok_or_else(|| DbError::not_found(ENTITY, &id))?;

            if !links.is_empty() {
                let insert_links = Mutation::Insert {
                    table: Table::ProjectTechnologies,
                    rows: links,
                };
                if let Err(source) = self.db.execute_raw("projects.link", &insert_links).await {
                    self.rollback_create(&id).await;
                    return Err(DbError::Link {
                        project_id: id,
                        source,
                    });
                }
            }
            created
        };

        self.with_technologies(vec![created])
            .await?
            .pop()
            .ok_or_else(|| DbError::not_found(ENTITY, id))
    }

    /// Update scalar fields and, when `technology_ids` is given, replace the
    /// full set of links. `Some(&[])` clears all links; `None` leaves them.
    pub async fn update(
        &self,
        id: &str,
        patch: ProjectPatch,
        technology_ids: Option<&[String]>,
    ) -> DbResult<ProjectWithTechnologies> {
        patch.validate()?;

        let values = to_row(ENTITY, &patch)?;
        let links = technology_ids.map(|ids| link_rows(id, ids)).transpose()?;

        if self.db.supports_transactions() {
            self.update_atomic(id, values, links).await?;
        } else {
            self.update_stepwise(id, values, links).await?;
        }

        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found(ENTITY, id))
    }

    /// Delete a project and its links. Deleting a missing project succeeds.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        let delete_links = Mutation::Delete {
            table: Table::ProjectTechnologies,
            filters: vec![Filter::eq("project_id", id)],
        };
        let delete_project = Mutation::Delete {
            table: Table::Projects,
            filters: vec![Filter::eq("id", id)],
        };

        if self.db.supports_transactions() {
            self.db
                .transact("projects.delete", &[delete_links, delete_project])
                .await?;
            return Ok(());
        }

        // Links first: if this fails the project must stay
        self.db
            .execute_raw("projects.unlink", &delete_links)
            .await
            .map_err(|source| DbError::Link {
                project_id: id.to_string(),
                source,
            })?;
        self.db.execute("projects.delete", &delete_project).await?;
        Ok(())
    }

    async fn find(&self, id: &str) -> DbResult<Option<Project>> {
        let query = Select::from(Table::Projects).filter(Filter::eq("id", id));
        self.db.fetch_optional("projects.get", ENTITY, &query).await
    }

    async fn links(&self, id: &str) -> DbResult<Vec<ProjectTechnology>> {
        let query = Select::from(Table::ProjectTechnologies).filter(Filter::eq("project_id", id));
        self.db.fetch_all("projects.links", "project link", &query).await
    }

    async fn update_atomic(&self, id: &str, values: Row, links: Option<Vec<Row>>) -> DbResult<()> {
        if self.find(id).await?.is_none() {
            return Err(DbError::not_found(ENTITY, id));
        }

        let patched = !values.is_empty();
        let mut batch = Vec::new();
        if patched {
            batch.push(Mutation::Update {
                table: Table::Projects,
                filters: vec![Filter::eq("id", id)],
                values,
            });
        }
        if let Some(links) = links {
            batch.push(Mutation::Delete {
                table: Table::ProjectTechnologies,
                filters: vec![Filter::eq("project_id", id)],
            });
            if !links.is_empty() {
                batch.push(Mutation::Insert {
                    table: Table::ProjectTechnologies,
                    rows: links,
                });
            }
        }
        if batch.is_empty() {
            return Ok(());
        }

        let results = self.db.transact("projects.update", &batch).await?;
        // Deleted between the existence check and the transaction
        if patched && results.first().is_some_and(Vec::is_empty) {
            return Err(DbError::not_found(ENTITY, id));
        }
        Ok(())
    }

    async fn update_stepwise(&self, id: &str, values: Row, links: Option<Vec<Row>>) -> DbResult<()> {
        if values.is_empty() {
            if self.find(id).await?.is_none() {
                return Err(DbError::not_found(ENTITY, id));
            }
        } else {
            let update = Mutation::Update {
                table: Table::Projects,
                filters: vec![Filter::eq("id", id)],
                values,
            };
            if self.db.execute("projects.update", &update).await?.is_empty() {
                return Err(DbError::not_found(ENTITY, id));
            }
        }

        match links {
            Some(links) => self.replace_links(id, links).await,
            None => Ok(()),
        }
    }

    /// Destructive replace: delete every link, then insert the new set.
    async fn replace_links(&self, id: &str, links: Vec<Row>) -> DbResult<()> {
        let link_error = |source| DbError::Link {
            project_id: id.to_string(),
            source,
        };

        let previous = self.links(id).await?;
        let delete_links = Mutation::Delete {
            table: Table::ProjectTechnologies,
            filters: vec![Filter::eq("project_id", id)],
        };
        self.db
            .execute_raw("projects.unlink", &delete_links)
            .await
            .map_err(link_error)?;

        if links.is_empty() {
            return Ok(());
        }

        let insert = Mutation::Insert {
            table: Table::ProjectTechnologies,
            rows: links,
        };
        if let Err(source) = self.db.execute_raw("projects.link", &insert).await {
            self.restore_links(id, previous).await;
            return Err(link_error(source));
        }
        Ok(())
    }

    async fn restore_links(&self, id: &str, previous: Vec<ProjectTechnology>) {
        if previous.is_empty() {
            return;
        }
        let rows = match previous
            .iter()
            .map(|link| to_row("project link", link))
            .collect::<DbResult<Vec<_>>>()
        {
            Ok(rows) => rows,
            Err(err) => {
                error!(project_id = %id, error = %err, "could not restore previous technology links");
                return;
            }
        };
        let restore = Mutation::Insert {
            table: Table::ProjectTechnologies,
            rows,
        };
        match self.db.execute_raw("projects.restore_links", &restore).await {
            Ok(_) => warn!(project_id = %id, links = previous.len(), "restored previous technology links"),
            Err(err) => {
                error!(project_id = %id, error = %err, "could not restore previous technology links")
            }
        }
    }

    /// Compensation for a create whose link insert failed.
    async fn rollback_create(&self, id: &str) {
        // A link insert that committed before its response was lost would
        // block the project delete, so clear links first.
        let steps = [
            Mutation::Delete {
                table: Table::ProjectTechnologies,
                filters: vec![Filter::eq("project_id", id)],
            },
            Mutation::Delete {
                table: Table::Projects,
                filters: vec![Filter::eq("id", id)],
            },
        ];
        for step in &steps {
            if let Err(err) = self.db.execute_raw("projects.rollback", step).await {
                error!(
                    project_id = %id,
                    table = %step.table(),
                    error = %err,
                    "rollback after failed link insert did not complete"
                );
                return;
            }
        }
        warn!(project_id = %id, "rolled back project after failed link insert");
    }

    /// Attach technologies with one join-row query and one technology query.
    async fn with_technologies(&self, projects: Vec<Project>) -> DbResult<Vec<ProjectWithTechnologies>> {
        let mut linked = linked_technologies(
            self.db,
            "projects",
            Table::ProjectTechnologies,
            "project_id",
            projects.iter().map(|p| p.id.as_str()),
        )
        .await?;

        Ok(projects
            .into_iter()
            .map(|project| ProjectWithTechnologies {
                technologies: linked.remove(&project.id).unwrap_or_default(),
                project,
            })
            .collect())
    }
}

/// Join rows for `project_id`, duplicates dropped, first occurrence kept.
fn link_rows(project_id: &str, technology_ids: &[String]) -> DbResult<Vec<Row>> {
    let mut seen = HashSet::new();
    technology_ids
        .iter()
        .filter(|id| seen.insert(id.as_str()))
        .map(|technology_id| {
            let link = ProjectTechnology {
                project_id: project_id.to_string(),
                technology_id: technology_id.clone(),
            };
            to_row("project link", &link)
        })
        .collect()
}
