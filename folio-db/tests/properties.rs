use std::sync::Arc;

use folio_core::{NewProject, NewTechnology, ProjectPatch};
use folio_db::store::Table;
use folio_db::{Folio, MemoryStore};
use proptest::prelude::*;

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

/// Links after `update(id, {}, L)` for a project that started with `initial`
async fn replace_links(transactional: bool, initial: Vec<usize>, next: Vec<usize>) -> (Vec<String>, Vec<String>, usize) {
    let store = Arc::new(if transactional {
        MemoryStore::new()
    } else {
        MemoryStore::without_transactions()
    });
    let folio = Folio::new(store.clone());

    let mut ids = Vec::new();
    for i in 0..6 {
        let tech = folio
            .technologies()
            .create(NewTechnology::new(format!("tech-{i}")))
            .await
            .unwrap();
        ids.push(tech.id);
    }
    let pick = |indices: &[usize]| indices.iter().map(|&i| ids[i].clone()).collect::<Vec<_>>();

    let project = folio
        .projects()
        .create(NewProject::new("Folio", "Portfolio site"), &pick(&initial))
        .await
        .unwrap();
    let wanted = pick(&next);
    let updated = folio
        .projects()
        .update(&project.project.id, ProjectPatch::default(), Some(&wanted))
        .await
        .unwrap();

    let mut linked: Vec<String> = updated.technology_ids().into_iter().map(String::from).collect();
    linked.sort();
    let mut expected = wanted;
    expected.sort();
    expected.dedup();
    (linked, expected, store.row_count(Table::ProjectTechnologies).await)
}

proptest! {
    /// Property: after update(id, {}, L) the linked set equals L
    #[test]
    fn prop_update_sets_exact_links(
        initial in prop::collection::vec(0usize..6, 0..6),
        next in prop::collection::vec(0usize..6, 0..8),
        transactional in any::<bool>(),
    ) {
        let (linked, expected, rows) = runtime().block_on(replace_links(transactional, initial, next));
        prop_assert_eq!(rows, expected.len());
        prop_assert_eq!(linked, expected);
    }
}
