//! End-to-end import against file-backed local stores.
//!
//! The source graph is the Wikibase JSON under `tests/fixtures/wikidata`,
//! served through `StaticFetcher`; the local side is a store directory in a
//! temp dir, reopened between runs the way separate CLI invocations would.
//!
//! Run with: cargo test --test integration_tests

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::tempdir;
use wbimport_core::{EntityImporter, ImportConfig, ImportServices, MappingStore};
use wbimport_model::{DataValue, Entity, EntityId, Item};
use wbimport_storage::{open_local_stores, LocalStores, StaticFetcher};

const LOCAL_BASE: &str = "https://wiki.example.org/entity/";

fn fixtures() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/wikidata")
}

fn source() -> Arc<StaticFetcher> {
    Arc::new(StaticFetcher::from_dir(fixtures()).expect("fixtures load"))
}

fn config() -> ImportConfig {
    ImportConfig::default().with_concept_base_uri(LOCAL_BASE)
}

fn importer(fetcher: Arc<StaticFetcher>, stores: &LocalStores) -> EntityImporter {
    let services = ImportServices::with_local_store(
        fetcher,
        stores.mappings.clone(),
        stores.entities.clone(),
    );
    EntityImporter::new(services, config()).expect("bootstrap succeeds")
}

fn local(stores: &LocalStores, remote: EntityId) -> EntityId {
    stores
        .mappings
        .local_id(&remote)
        .unwrap()
        .unwrap_or_else(|| panic!("{remote} should be mapped"))
}

fn local_entity(stores: &LocalStores, remote: EntityId) -> Entity {
    stores.entities.get(&local(stores, remote)).expect("local entity exists")
}

fn back_reference_values(stores: &LocalStores, importer: &EntityImporter, remote: EntityId) -> Vec<DataValue> {
    let property = importer.back_reference_property();
    local_entity(stores, remote)
        .statements()
        .by_property(&property)
        .filter_map(|s| s.main_snak.data_value().cloned())
        .collect()
}

// ============================================================================
// Full import
// ============================================================================

#[test]
fn test_import_with_statements_pulls_in_dependencies() {
    let dir = tempdir().unwrap();
    let stores = open_local_stores(dir.path()).unwrap();
    let importer = importer(source(), &stores);

    let report = importer.import_entities(&["Q42".to_string()], true);

    assert!(report.failed.is_empty(), "{:?}", report.failed);
    assert_eq!(report.reconciled, 1);
    assert_eq!(report.unresolved_values, 0);
    for remote in [
        EntityId::item(42),
        EntityId::item(5),
        EntityId::item(11573),
        EntityId::item(17437798),
        EntityId::property(31),
        EntityId::property(2048),
    ] {
        local(&stores, remote);
        assert_eq!(
            back_reference_values(&stores, &importer, remote),
            vec![DataValue::String(remote.to_string())],
            "back-reference of {remote}"
        );
    }

    let adams = local_entity(&stores, EntityId::item(42));
    assert_eq!(adams.fingerprint().label("en"), Some("Douglas Adams"));
    assert_eq!(adams.statements().len(), 3);

    let height = adams
        .statements()
        .by_property(&EntityId::property(2048))
        .next()
        .unwrap();
    let unit = &height.main_snak.data_value().unwrap().as_quantity().unwrap().unit;
    assert_eq!(unit, &format!("{LOCAL_BASE}{}", local(&stores, EntityId::item(11573))));
}

#[test]
fn test_badges_are_localized() {
    let dir = tempdir().unwrap();
    let stores = open_local_stores(dir.path()).unwrap();
    let importer = importer(source(), &stores);

    let report = importer.import_entities(&["Q42".to_string()], false);

    let order: Vec<EntityId> = report.created.iter().map(|c| c.remote).collect();
    assert_eq!(order, vec![EntityId::item(17437798), EntityId::item(42)]);

    let adams = local_entity(&stores, EntityId::item(42));
    let enwiki = &adams.site_links()[0];
    assert_eq!(enwiki.title, "Douglas Adams");
    assert_eq!(enwiki.badges, vec![local(&stores, EntityId::item(17437798))]);
}

// ============================================================================
// Reruns
// ============================================================================

#[test]
fn test_rerun_after_restart_is_idempotent() {
    let dir = tempdir().unwrap();
    let ids = vec!["Q42".to_string()];

    let (back_reference, mapped, statements) = {
        let stores = open_local_stores(dir.path()).unwrap();
        let importer = importer(source(), &stores);
        importer.import_entities(&ids, true);
        (
            importer.back_reference_property(),
            stores.mappings.len(),
            local_entity(&stores, EntityId::item(42)).statements().len(),
        )
    };

    let stores = open_local_stores(dir.path()).unwrap();
    let importer = importer(source(), &stores);
    let report = importer.import_entities(&ids, true);

    assert_eq!(importer.back_reference_property(), back_reference);
    assert!(report.created.is_empty());
    assert_eq!(report.skipped_with_statements, 1);
    assert_eq!(stores.mappings.len(), mapped);
    assert_eq!(local_entity(&stores, EntityId::item(42)).statements().len(), statements);
    assert_eq!(back_reference_values(&stores, &importer, EntityId::item(42)).len(), 1);
}

#[test]
fn test_mapped_ids_are_not_fetched_again() {
    let dir = tempdir().unwrap();
    let ids: Vec<String> = ["Q5", "Q11573", "P31"].iter().map(|s| s.to_string()).collect();
    {
        let stores = open_local_stores(dir.path()).unwrap();
        importer(source(), &stores).import_entities(&ids, false);
    }

    let stores = open_local_stores(dir.path()).unwrap();
    let fetcher = source();
    let entities_before = stores.entities.len();
    let report = importer(fetcher.clone(), &stores).import_entities(&ids, false);

    assert!(fetcher.requests().is_empty());
    assert_eq!(report.already_mapped, 3);
    assert_eq!(stores.entities.len(), entities_before);
}

// ============================================================================
// Batching
// ============================================================================

#[test]
fn test_large_requests_are_batched() {
    let dir = tempdir().unwrap();
    let stores = open_local_stores(dir.path()).unwrap();
    let fetcher = Arc::new((1..=25u64).fold(StaticFetcher::new(), |f, n| {
        f.with(Item {
            id: Some(EntityId::item(n)),
            ..Item::default()
        })
    }));
    let ids: Vec<String> = (1..=25).map(|n| format!("Q{n}")).collect();

    let report = importer(fetcher.clone(), &stores).import_entities(&ids, false);

    let sizes: Vec<usize> = fetcher.requests().iter().map(Vec::len).collect();
    assert_eq!(sizes, vec![10, 10, 5]);
    assert_eq!(fetcher.requests().concat(), ids);
    assert_eq!(report.created.len(), 25);
    assert_eq!(stores.mappings.len(), 26);
}
