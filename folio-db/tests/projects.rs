//! Project↔technology relationship tests against the in-memory store,
//! on both the transactional and the compensation path.

use std::sync::Arc;
use std::time::Duration;

use folio_core::{NewProject, NewTechnology, ProjectPatch};
use folio_db::store::{Operation, Table};
use folio_db::{DbError, Folio, MemoryStore, RetryPolicy, StoreErrorKind};

fn setup(transactional: bool) -> (Arc<MemoryStore>, Folio) {
    let store = Arc::new(if transactional {
        MemoryStore::new()
    } else {
        MemoryStore::without_transactions()
    });
    let folio = Folio::new(store.clone()).with_retry(RetryPolicy::default().with_delay(Duration::ZERO));
    (store, folio)
}

async fn technologies(folio: &Folio, names: &[&str]) -> Vec<String> {
    let mut ids = Vec::new();
    for name in names {
        let tech = folio
            .technologies()
            .create(NewTechnology::new(*name))
            .await
            .unwrap();
        ids.push(tech.id);
    }
    ids
}

fn sorted(mut ids: Vec<String>) -> Vec<String> {
    ids.sort();
    ids
}

#[tokio::test]
async fn create_links_technologies() {
    for transactional in [true, false] {
        let (_, folio) = setup(transactional);
        let ids = technologies(&folio, &["Rust", "Axum"]).await;

        let created = folio
            .projects()
            .create(NewProject::new("Folio", "Portfolio site"), &ids)
            .await
            .unwrap();

        // technologies come back sorted by name
        let names: Vec<_> = created.technologies.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["Axum", "Rust"]);

        let fetched = folio.projects().get_by_id(&created.project.id).await.unwrap().unwrap();
        assert_eq!(fetched, created);
    }
}

#[tokio::test]
async fn create_with_unknown_technology_leaves_nothing_behind() {
    for transactional in [true, false] {
        let (store, folio) = setup(transactional);
        let mut ids = technologies(&folio, &["Rust"]).await;
        ids.push("no-such-technology".to_string());

        let err = folio
            .projects()
            .create(NewProject::new("Folio", "Portfolio site"), &ids)
            .await
            .unwrap_err();

        assert_eq!(
            err.store_error().map(|e| e.kind),
            Some(StoreErrorKind::Constraint),
            "transactional={transactional}"
        );
        if !transactional {
            assert!(matches!(err, DbError::Link { .. }));
        }
        assert_eq!(store.row_count(Table::Projects).await, 0);
        assert_eq!(store.row_count(Table::ProjectTechnologies).await, 0);
        assert!(folio.projects().list_all().await.unwrap().is_empty());
    }
}

#[tokio::test]
async fn update_replaces_or_keeps_links() {
    for transactional in [true, false] {
        let (_, folio) = setup(transactional);
        let ids = technologies(&folio, &["Rust", "Axum", "Svelte"]).await;
        let repo = folio.projects();
        let project = repo
            .create(NewProject::new("Folio", "Portfolio site"), &ids[..2])
            .await
            .unwrap();
        let id = project.project.id.as_str();

        // no list given: links untouched
        let patch = ProjectPatch {
            title: Some("Folio v2".into()),
            ..ProjectPatch::default()
        };
        let updated = repo.update(id, patch, None).await.unwrap();
        assert_eq!(updated.project.title, "Folio v2");
        assert_eq!(sorted(repo.technology_ids(id).await.unwrap()), sorted(ids[..2].to_vec()));

        // destructive replace
        let updated = repo
            .update(id, ProjectPatch::default(), Some(&ids[1..]))
            .await
            .unwrap();
        assert_eq!(sorted(updated.technology_ids().into_iter().map(String::from).collect()), sorted(ids[1..].to_vec()));

        // empty list clears everything
        let updated = repo.update(id, ProjectPatch::default(), Some(&[][..])).await.unwrap();
        assert!(updated.technologies.is_empty());
        assert_eq!(updated.project.title, "Folio v2");
    }
}

#[tokio::test]
async fn update_of_missing_project_is_not_found() {
    for transactional in [true, false] {
        let (store, folio) = setup(transactional);
        let ids = technologies(&folio, &["Rust"]).await;

        let err = folio
            .projects()
            .update("missing", ProjectPatch::default(), Some(&ids))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(store.row_count(Table::ProjectTechnologies).await, 0);
    }
}

#[tokio::test]
async fn failed_link_insert_restores_previous_links() {
    let (store, folio) = setup(false);
    let ids = technologies(&folio, &["Rust", "Axum", "Svelte"]).await;
    let repo = folio.projects();
    let project = repo
        .create(NewProject::new("Folio", "Portfolio site"), &ids[..1])
        .await
        .unwrap();
    let id = project.project.id.as_str();

    store.fail_next(Table::ProjectTechnologies, Operation::Insert, StoreErrorKind::Constraint, 1);
    let err = repo
        .update(id, ProjectPatch::default(), Some(&ids[1..]))
        .await
        .unwrap_err();

    assert!(matches!(err, DbError::Link { .. }));
    assert_eq!(repo.technology_ids(id).await.unwrap(), vec![ids[0].clone()]);
}

#[tokio::test]
async fn failed_update_transaction_changes_nothing() {
    let (store, folio) = setup(true);
    let ids = technologies(&folio, &["Rust", "Axum"]).await;
    let repo = folio.projects();
    let project = repo
        .create(NewProject::new("Folio", "Portfolio site"), &ids[..1])
        .await
        .unwrap();
    let id = project.project.id.as_str();

    let patch = ProjectPatch {
        title: Some("Renamed".into()),
        ..ProjectPatch::default()
    };
    let bad = vec![ids[1].clone(), "no-such-technology".to_string()];
    repo.update(id, patch, Some(&bad)).await.unwrap_err();

    let current = repo.get_by_id(id).await.unwrap().unwrap();
    assert_eq!(current.project.title, "Folio");
    assert_eq!(current.technology_ids(), vec![ids[0].as_str()]);
    assert_eq!(store.row_count(Table::ProjectTechnologies).await, 1);
}

#[tokio::test]
async fn delete_removes_links_then_project() {
    for transactional in [true, false] {
        let (store, folio) = setup(transactional);
        let ids = technologies(&folio, &["Rust", "Axum"]).await;
        let repo = folio.projects();
        let project = repo
            .create(NewProject::new("Folio", "Portfolio site"), &ids)
            .await
            .unwrap();

        repo.delete(&project.project.id).await.unwrap();

        assert!(repo.get_by_id(&project.project.id).await.unwrap().is_none());
        assert_eq!(store.row_count(Table::ProjectTechnologies).await, 0);
        // technologies themselves stay
        assert_eq!(store.row_count(Table::Technologies).await, 2);

        // deleting again is fine
        repo.delete(&project.project.id).await.unwrap();
    }
}

#[tokio::test]
async fn failed_unlink_keeps_project() {
    let (store, folio) = setup(false);
    let ids = technologies(&folio, &["Rust"]).await;
    let repo = folio.projects();
    let project = repo
        .create(NewProject::new("Folio", "Portfolio site"), &ids)
        .await
        .unwrap();

    store.fail_next(Table::ProjectTechnologies, Operation::Delete, StoreErrorKind::Internal, 1);
    let err = repo.delete(&project.project.id).await.unwrap_err();

    assert!(matches!(err, DbError::Link { .. }));
    assert_eq!(store.calls(Table::Projects, Operation::Delete), 0);
    let still_there = repo.get_by_id(&project.project.id).await.unwrap().unwrap();
    assert_eq!(still_there.technologies.len(), 1);
}

#[tokio::test]
async fn transient_failures_are_retried_per_call() {
    let (store, folio) = setup(false);
    let ids = technologies(&folio, &["Rust"]).await;

    store.fail_next(Table::Projects, Operation::Insert, StoreErrorKind::Connection, 2);
    store.fail_next(Table::ProjectTechnologies, Operation::Insert, StoreErrorKind::Timeout, 1);

    let created = folio
        .projects()
        .create(NewProject::new("Folio", "Portfolio site"), &ids)
        .await
        .unwrap();

    assert_eq!(created.technologies.len(), 1);
    assert_eq!(store.calls(Table::Projects, Operation::Insert), 3);
    assert_eq!(store.calls(Table::ProjectTechnologies, Operation::Insert), 2);
}

#[tokio::test]
async fn exhausted_retries_surface_the_last_error() {
    let (store, folio) = setup(true);

    store.fail_next(Table::Projects, Operation::Select, StoreErrorKind::Unavailable, 5);
    let err = folio.projects().list_all().await.unwrap_err();

    assert_eq!(err.store_error().map(|e| e.kind), Some(StoreErrorKind::Unavailable));
    assert_eq!(store.calls(Table::Projects, Operation::Select), 3);
}

#[tokio::test]
async fn permanent_failures_are_not_retried() {
    let (store, folio) = setup(true);

    store.fail_next(Table::Projects, Operation::Insert, StoreErrorKind::Constraint, 1);
    folio
        .projects()
        .create(NewProject::new("Folio", "Portfolio site"), &[])
        .await
        .unwrap_err();

    assert_eq!(store.calls(Table::Projects, Operation::Insert), 1);
}

#[tokio::test(start_paused = true)]
async fn create_survives_a_commit_whose_answer_is_lost() {
    for transactional in [true, false] {
        let (store, folio) = setup(transactional);
        let folio = folio.with_retry(
            RetryPolicy::default()
                .with_delay(Duration::ZERO)
                .with_attempt_timeout(Some(Duration::from_millis(50))),
        );
        let ids = technologies(&folio, &["Rust", "Axum"]).await;
        store.stall_next(Table::Projects, Operation::Insert, 1);

        let created = folio
            .projects()
            .create(NewProject::new("Folio", "Portfolio site"), &ids)
            .await
            .unwrap();

        assert_eq!(store.row_count(Table::Projects).await, 1, "transactional={transactional}");
        assert_eq!(store.row_count(Table::ProjectTechnologies).await, 2);
        assert_eq!(created.technologies.len(), 2);
        assert_eq!(store.calls(Table::Projects, Operation::Insert), 2);
    }
}

#[tokio::test(start_paused = true)]
async fn lost_link_answer_does_not_roll_back_the_project() {
    let (store, folio) = setup(false);
    let folio = folio.with_retry(
        RetryPolicy::default()
            .with_delay(Duration::ZERO)
            .with_attempt_timeout(Some(Duration::from_millis(50))),
    );
    let ids = technologies(&folio, &["Rust"]).await;
    store.stall_next(Table::ProjectTechnologies, Operation::Insert, 1);

    let created = folio
        .projects()
        .create(NewProject::new("Folio", "Portfolio site"), &ids)
        .await
        .unwrap();

    assert_eq!(created.technology_ids(), vec![ids[0].as_str()]);
    assert_eq!(store.row_count(Table::Projects).await, 1);
    assert_eq!(store.row_count(Table::ProjectTechnologies).await, 1);
}

#[tokio::test]
async fn lists_follow_sort_order_and_batch_enrichment() {
    let (store, folio) = setup(true);
    let ids = technologies(&folio, &["Rust", "Svelte"]).await;
    let repo = folio.projects();

    for (title, sort_order, featured) in [("C", 3, true), ("A", 1, false), ("B", 2, true)] {
        let mut project = NewProject::new(title, "d");
        project.sort_order = sort_order;
        project.is_featured = featured;
        repo.create(project, &ids).await.unwrap();
    }

    let before = store.calls(Table::ProjectTechnologies, Operation::Select);
    let all = repo.list_all().await.unwrap();
    let titles: Vec<_> = all.iter().map(|p| p.project.title.as_str()).collect();
    assert_eq!(titles, vec!["A", "B", "C"]);
    assert!(all.iter().all(|p| p.technologies.len() == 2));
    // one join-row query for the whole page
    assert_eq!(store.calls(Table::ProjectTechnologies, Operation::Select), before + 1);

    let featured = repo.list_featured().await.unwrap();
    let titles: Vec<_> = featured.iter().map(|p| p.project.title.as_str()).collect();
    assert_eq!(titles, vec!["B", "C"]);
}

#[tokio::test]
async fn deleting_a_technology_unlinks_it() {
    for transactional in [true, false] {
        let (_, folio) = setup(transactional);
        let ids = technologies(&folio, &["Rust", "Axum"]).await;
        let project = folio
            .projects()
            .create(NewProject::new("Folio", "Portfolio site"), &ids)
            .await
            .unwrap();

        folio.technologies().delete(&ids[0]).await.unwrap();

        let project = folio.projects().get_by_id(&project.project.id).await.unwrap().unwrap();
        assert_eq!(project.technology_ids(), vec![ids[1].as_str()]);
        assert!(folio.technologies().get_by_id(&ids[0]).await.unwrap().is_none());
    }
}

#[tokio::test]
async fn invalid_payload_never_reaches_the_store() {
    let (store, folio) = setup(true);
    let err = folio
        .projects()
        .create(NewProject::new("", "d"), &[])
        .await
        .unwrap_err();

    assert!(matches!(err, DbError::Validation(_)));
    assert_eq!(store.calls(Table::Projects, Operation::Insert), 0);
}
