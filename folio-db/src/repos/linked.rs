//! Technology lists for rows linked through a join table
//!
//! Shared by projects (`project_technologies`) and experiences
//! (`experience_technologies`). A page of owners costs one join-row query
//! and one technology query regardless of its size.

use std::collections::{HashMap, HashSet};

use serde_json::Value;

use folio_core::Technology;

use crate::client::Folio;
use crate::error::DbResult;
use crate::store::{Filter, Select, Table};

/// Join table column naming the technology side
const TECHNOLOGY_COLUMN: &str = "technology_id";

/// Technologies linked to each owner id through `join`, sorted by name.
/// Owners without links are absent from the map.
pub(crate) async fn linked_technologies<'a>(
    db: &Folio,
    op: &str,
    join: Table,
    owner_column: &str,
    owner_ids: impl IntoIterator<Item = &'a str>,
) -> DbResult<HashMap<String, Vec<Technology>>> {
    let owner_ids: Vec<&str> = owner_ids.into_iter().collect();
    if owner_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let query = Select::from(join).filter(Filter::is_in(owner_column, owner_ids));
    let links = db.select(&format!("{op}.links"), &query).await?;

    let mut linked: HashMap<&str, HashSet<&str>> = HashMap::new();
    for link in &links {
        let owner = link.get(owner_column).and_then(Value::as_str);
        let technology = link.get(TECHNOLOGY_COLUMN).and_then(Value::as_str);
        if let (Some(owner), Some(technology)) = (owner, technology) {
            linked.entry(owner).or_default().insert(technology);
        }
    }
    if linked.is_empty() {
        return Ok(HashMap::new());
    }

    let ids: HashSet<&str> = linked.values().flatten().copied().collect();
    let query = Select::from(Table::Technologies)
        .filter(Filter::is_in("id", ids))
        .order_asc("name");
    let technologies: Vec<Technology> = db
        .fetch_all(&format!("{op}.technologies"), "technology", &query)
        .await?;

    Ok(linked
        .into_iter()
        .map(|(owner, ids)| {
            let owned = technologies
                .iter()
                .filter(|t| ids.contains(t.id.as_str()))
                .cloned()
                .collect();
            (owner.to_string(), owned)
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use serde_json::json;

    use crate::store::{MemoryStore, Mutation, Operation, Row, Store};

    fn row(value: serde_json::Value) -> Row {
        value.as_object().cloned().expect("object")
    }

    #[tokio::test]
    async fn no_owners_means_no_queries() {
        let store = Arc::new(MemoryStore::new());
        let folio = Folio::new(store.clone());

        let linked = linked_technologies(
            &folio,
            "test",
            Table::ProjectTechnologies,
            "project_id",
            std::iter::empty(),
        )
        .await
        .unwrap();

        assert!(linked.is_empty());
        assert_eq!(store.calls(Table::ProjectTechnologies, Operation::Select), 0);
    }

    #[tokio::test]
    async fn owners_get_sorted_lists() {
        let store = Arc::new(MemoryStore::new());
        let folio = Folio::new(store.clone());
        store
            .execute(&Mutation::Insert {
                table: Table::Technologies,
                rows: vec![
                    row(json!({ "id": "t-rust", "name": "Rust" })),
                    row(json!({ "id": "t-axum", "name": "Axum" })),
                ],
            })
            .await
            .unwrap();
        store
            .execute(&Mutation::Insert {
                table: Table::Experiences,
                rows: vec![
                    row(json!({ "id": "e1", "company": "Acme", "position": "Dev", "start_date": "2020-01-01" })),
                    row(json!({ "id": "e2", "company": "Init", "position": "Dev", "start_date": "2022-01-01" })),
                ],
            })
            .await
            .unwrap();
        store
            .execute(&Mutation::Insert {
                table: Table::ExperienceTechnologies,
                rows: vec![
                    row(json!({ "experience_id": "e1", "technology_id": "t-rust" })),
                    row(json!({ "experience_id": "e1", "technology_id": "t-axum" })),
                ],
            })
            .await
            .unwrap();

        let linked = linked_technologies(
            &folio,
            "test",
            Table::ExperienceTechnologies,
            "experience_id",
            ["e1", "e2"],
        )
        .await
        .unwrap();

        let names: Vec<_> = linked["e1"].iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, ["Axum", "Rust"]);
        assert!(!linked.contains_key("e2"));
        assert_eq!(store.calls(Table::Technologies, Operation::Select), 1);
    }
}
