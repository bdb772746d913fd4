#[path = "../fixtures/mod.rs"]
mod fixtures;

use gridplan::core::broker::DbBroker;
use gridplan::core::error::GridplanError;
use gridplan::plugins::catalog::{
    self, SubscenarioCatalog, SubscenarioEntry, TEMPORAL_CATEGORY, load_catalog, remove_entry,
    save_entry,
};
use gridplan::plugins::lifecycle;
use std::sync::Arc;
use tempfile::tempdir;

#[test]
fn register_then_lookup_returns_shared_entry() {
    let mut catalog = SubscenarioCatalog::new();
    let registered = catalog
        .register(SubscenarioEntry::new("load_zone", 3, "three zones", "").with_members(["a", "b", "c"]))
        .unwrap();
    let found = catalog.lookup("load_zone", 3).unwrap();
    assert!(Arc::ptr_eq(&registered, &found));
    assert_eq!(found.payload.members.len(), 3);
}

#[test]
fn duplicate_registration_is_rejected() {
    let mut catalog = SubscenarioCatalog::new();
    catalog.register(SubscenarioEntry::new("load", 1, "base", "")).unwrap();
    let err = catalog
        .register(SubscenarioEntry::new("load", 1, "other", ""))
        .unwrap_err();
    assert!(matches!(err, GridplanError::DuplicateEntry(_)));
    // Same id in another category is a different entry.
    assert!(catalog.register(SubscenarioEntry::new("load_zone", 1, "zones", "")).is_ok());
}

#[test]
fn lookup_miss_is_not_found() {
    let catalog = fixtures::catalog();
    assert!(matches!(catalog.lookup("load", 99), Err(GridplanError::NotFound(_))));
    assert!(matches!(catalog.temporal(42), Err(GridplanError::NotFound(_))));
}

#[test]
fn list_is_sorted_and_filterable() {
    let catalog = fixtures::catalog();
    let markets: Vec<i64> = catalog
        .list(Some("market"))
        .iter()
        .map(|e| e.subscenario_id)
        .collect();
    assert_eq!(markets, vec![1, 2]);

    let all = catalog.list(None);
    assert_eq!(all.len(), catalog.len());
    let keys: Vec<(String, i64)> = all.iter().map(|e| e.key()).collect();
    let mut sorted = keys.clone();
    sorted.sort();
    assert_eq!(keys, sorted);
    assert!(catalog.categories().contains(&TEMPORAL_CATEGORY));
}

#[test]
fn remove_refuses_referenced_entries() {
    let mut catalog = fixtures::catalog();
    let err = catalog.remove("load", 1, true).unwrap_err();
    assert!(matches!(err, GridplanError::EntryReferenced(_)));
    assert!(catalog.contains("load", 1));

    catalog.remove("load", 1, false).unwrap();
    assert!(!catalog.contains("load", 1));

    catalog.remove(TEMPORAL_CATEGORY, 1, false).unwrap();
    assert!(catalog.temporal(1).is_err());
}

#[test]
fn persisted_catalog_round_trips() {
    let tmp = tempdir().unwrap();
    let root = tmp.path();
    fixtures::persist_catalog(root);

    let loaded = load_catalog(root).unwrap();
    let expected = fixtures::catalog();
    assert_eq!(loaded.len(), expected.len());
    for entry in expected.list(None) {
        let got = loaded.lookup(&entry.category, entry.subscenario_id).unwrap();
        assert_eq!(*got, *entry);
    }
    assert_eq!(*loaded.temporal(1).unwrap(), fixtures::temporal_data());
}

#[test]
fn persisted_duplicates_are_rejected() {
    let tmp = tempdir().unwrap();
    let root = tmp.path();
    catalog::initialize_catalog_db(root).unwrap();
    let entry = SubscenarioEntry::new("fuel", 1, "gas", "").with_members(["gas"]);
    save_entry(root, "loader", &entry).unwrap();
    let err = save_entry(root, "loader", &entry).unwrap_err();
    assert!(matches!(err, GridplanError::DuplicateEntry(_)));

    let events = DbBroker::new(root).recent_events(10).unwrap();
    let last = events.last().unwrap();
    assert_eq!(last.op, "catalog.register");
    assert_eq!(last.status, "error");
    assert_eq!(last.actor, "loader");
}

#[test]
fn temporal_data_requires_temporal_category_on_disk() {
    let tmp = tempdir().unwrap();
    let root = tmp.path();
    catalog::initialize_catalog_db(root).unwrap();
    let err = catalog::save_temporal(
        root,
        "loader",
        &SubscenarioEntry::new("load", 1, "base", ""),
        &fixtures::temporal_data(),
    )
    .unwrap_err();
    assert!(matches!(err, GridplanError::ValidationError(_)));
}

#[test]
fn remove_entry_checks_persisted_bindings() {
    let tmp = tempdir().unwrap();
    let root = tmp.path();
    fixtures::persist_catalog(root);
    lifecycle::initialize_scenarios_db(root).unwrap();

    let engine = gridplan::plugins::validation::ValidationEngine::new(
        Arc::new(load_catalog(root).unwrap()),
        &Default::default(),
    );
    let (mut resolved, report) = engine.resolve_and_validate(&fixtures::base_request("bound"));
    lifecycle::record_resolution(root, "tester", &mut resolved, &report).unwrap();

    let err = remove_entry(root, "tester", "load", 1).unwrap_err();
    assert!(matches!(err, GridplanError::EntryReferenced(_)));

    // Markets are not bound by the base request.
    remove_entry(root, "tester", "market", 2).unwrap();
    let reloaded = load_catalog(root).unwrap();
    assert!(!reloaded.contains("market", 2));
    assert!(reloaded.contains("load", 1));

    let err = remove_entry(root, "tester", "market", 2).unwrap_err();
    assert!(matches!(err, GridplanError::NotFound(_)));
}
