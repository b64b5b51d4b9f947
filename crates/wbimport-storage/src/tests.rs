//! Store behaviour, in memory and across reopen.

use super::*;
use tempfile::tempdir;
use wbimport_core::{
    EditContext, EntityFetcher, EntityStore, MappingOutcome, MappingStore, StatementCountLookup,
    StatementsImporter, StoreError,
};
use wbimport_model::{
    DataValue, Entity, EntityId, Fingerprint, Item, Property, Snak, Statement, StatementList,
};

fn ctx(ignore_constraints: bool) -> EditContext {
    EditContext {
        user: "importer".to_string(),
        summary: "test".to_string(),
        ignore_constraints,
    }
}

fn labelled_item(label: &str, description: Option<&str>) -> Entity {
    let mut fingerprint = Fingerprint::default().with_label("en", label);
    if let Some(description) = description {
        fingerprint
            .descriptions
            .insert("en".to_string(), description.to_string());
    }
    Entity::Item(Item {
        fingerprint,
        ..Item::default()
    })
}

fn labelled_property(label: &str) -> Entity {
    Entity::Property(Property {
        fingerprint: Fingerprint::default().with_label("en", label),
        ..Property::new("external-id")
    })
}

fn string_statement(property: u64, value: &str) -> Statement {
    Statement::new(Snak::value(
        EntityId::property(property),
        DataValue::String(value.to_string()),
    ))
}

// ============================================================================
// Mapping log
// ============================================================================

#[test]
fn mappings_survive_reopen() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("mappings.jsonl");

    {
        let store = JsonlMappingStore::open(&path).unwrap();
        assert_eq!(
            store.add_mapping(&EntityId::item(42), &EntityId::item(1)).unwrap(),
            MappingOutcome::Inserted
        );
        store.add_mapping(&EntityId::property(31), &EntityId::property(2)).unwrap();
    }

    let store = JsonlMappingStore::open(&path).unwrap();
    assert_eq!(store.len(), 2);
    assert_eq!(store.local_id(&EntityId::item(42)).unwrap(), Some(EntityId::item(1)));
    assert_eq!(store.local_id(&EntityId::item(5)).unwrap(), None);

    let remotes: Vec<EntityId> = store.records().iter().map(|r| r.remote).collect();
    assert_eq!(remotes, vec![EntityId::item(42), EntityId::property(31)]);
}

#[test]
fn existing_mapping_is_never_overwritten() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("mappings.jsonl");
    let store = JsonlMappingStore::open(&path).unwrap();

    store.add_mapping(&EntityId::item(42), &EntityId::item(1)).unwrap();
    let outcome = store.add_mapping(&EntityId::item(42), &EntityId::item(9)).unwrap();

    assert_eq!(outcome, MappingOutcome::AlreadyMapped(EntityId::item(1)));
    let lines = std::fs::read_to_string(&path).unwrap();
    assert_eq!(lines.lines().count(), 1);
}

#[test]
fn replay_skips_torn_lines_and_keeps_first_record() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("mappings.jsonl");
    std::fs::write(
        &path,
        concat!(
            r#"{"remote":"Q42","local":"Q1","recorded_at":"2024-01-01T00:00:00Z"}"#,
            "\n",
            r#"{"remote":"Q42","local":"Q7","recorded_at":"2024-01-02T00:00:00Z"}"#,
            "\n\n",
            r#"{"remote":"Q5","loc"#,
        ),
    )
    .unwrap();

    let store = JsonlMappingStore::open(&path).unwrap();

    assert_eq!(store.len(), 1);
    assert_eq!(store.local_id(&EntityId::item(42)).unwrap(), Some(EntityId::item(1)));
    let record = store.record(&EntityId::item(42)).unwrap();
    assert_eq!(record.recorded_at.to_rfc3339(), "2024-01-01T00:00:00+00:00");
}

// ============================================================================
// Entity stores
// ============================================================================

#[test]
fn ids_are_allocated_per_kind() {
    let store = MemoryEntityStore::new();

    let first = store.create_entity(labelled_item("a", None), &ctx(false)).unwrap();
    let property = store.create_entity(labelled_property("b"), &ctx(false)).unwrap();
    let second = store.create_entity(labelled_item("c", None), &ctx(false)).unwrap();

    assert_eq!(first, EntityId::item(1));
    assert_eq!(property, EntityId::property(1));
    assert_eq!(second, EntityId::item(2));
    assert_eq!(store.get(&second).unwrap().id(), Some(&second));
}

#[test]
fn entities_with_ids_are_rejected() {
    let store = MemoryEntityStore::new();
    let mut entity = labelled_item("a", None);
    entity.set_id(Some(EntityId::item(42)));

    let result = store.create_entity(entity, &ctx(true));

    assert!(matches!(result, Err(StoreError::Backend(_))));
    assert!(store.is_empty());
}

#[test]
fn property_labels_are_unique() {
    let store = MemoryEntityStore::new();
    let existing = store.create_entity(labelled_property("Wikidata ID"), &ctx(false)).unwrap();

    for ignore in [false, true] {
        let result = store.create_entity(labelled_property("Wikidata ID"), &ctx(ignore));
        match result {
            Err(StoreError::Conflict { existing: named, .. }) => assert_eq!(named, Some(existing)),
            other => panic!("expected conflict, got {other:?}"),
        }
    }
    assert_eq!(store.len(), 1);
}

#[test]
fn item_label_and_description_clash_unless_ignored() {
    let store = MemoryEntityStore::new();
    let existing = store
        .create_entity(labelled_item("Mercury", Some("planet")), &ctx(false))
        .unwrap();

    let clash = store.create_entity(labelled_item("Mercury", Some("planet")), &ctx(false));
    assert!(matches!(clash, Err(StoreError::Conflict { existing: Some(id), .. }) if id == existing));

    store
        .create_entity(labelled_item("Mercury", Some("element")), &ctx(false))
        .unwrap();
    store.create_entity(labelled_item("Mercury", None), &ctx(false)).unwrap();
    store
        .create_entity(labelled_item("Mercury", Some("planet")), &ctx(true))
        .unwrap();
    assert_eq!(store.len(), 4);
}

#[test]
fn attached_statements_are_deduplicated_by_main_snak() {
    let store = MemoryEntityStore::new();
    let id = store.create_entity(labelled_item("a", None), &ctx(false)).unwrap();

    let first = StatementList::from(vec![string_statement(1, "Q42"), string_statement(2, "x")]);
    assert_eq!(store.import_statements(&id, first, &ctx(true)).unwrap(), 2);

    let again = StatementList::from(vec![string_statement(1, "Q42"), string_statement(2, "y")]);
    assert_eq!(store.import_statements(&id, again, &ctx(true)).unwrap(), 1);

    assert_eq!(store.statement_count(&id).unwrap(), 3);
    let entity = store.get(&id).unwrap();
    for statement in entity.statements() {
        let statement_id = statement.id.as_deref().unwrap();
        assert!(statement_id.starts_with("Q1$"), "{statement_id}");
    }
}

#[test]
fn unknown_entities_are_not_found() {
    let store = MemoryEntityStore::new();
    let missing = EntityId::item(7);

    assert!(matches!(store.statement_count(&missing), Err(StoreError::NotFound(id)) if id == missing));
    assert!(matches!(
        store.import_statements(&missing, StatementList::new(), &ctx(true)),
        Err(StoreError::NotFound(_))
    ));
}

#[test]
fn json_store_persists_entities_and_statements() {
    let dir = tempdir().unwrap();
    let id = {
        let store = JsonEntityStore::open(dir.path()).unwrap();
        let id = store
            .create_entity(labelled_item("Douglas Adams", Some("writer")), &ctx(false))
            .unwrap();
        store
            .import_statements(&id, StatementList::from(vec![string_statement(1, "Q42")]), &ctx(true))
            .unwrap();
        id
    };
    assert!(dir.path().join("entities").join("Q1.json").exists());

    let store = JsonEntityStore::open(dir.path()).unwrap();
    let entity = store.get(&id).unwrap();
    assert_eq!(entity.fingerprint().label("en"), Some("Douglas Adams"));
    assert_eq!(store.statement_count(&id).unwrap(), 1);

    let next = store.create_entity(labelled_item("Arthur Dent", None), &ctx(false)).unwrap();
    assert_eq!(next, EntityId::item(2));
}

#[test]
fn failed_statement_write_leaves_the_entity_unchanged() {
    let dir = tempdir().unwrap();
    let store = JsonEntityStore::open(dir.path()).unwrap();
    let id = store
        .create_entity(labelled_item("Douglas Adams", None), &ctx(false))
        .unwrap();

    // A directory in place of the entity file makes the write fail.
    let path = dir.path().join("entities").join(format!("{id}.json"));
    std::fs::remove_file(&path).unwrap();
    std::fs::create_dir(&path).unwrap();

    let statements = StatementList::from(vec![string_statement(1, "Q42")]);
    assert!(store.import_statements(&id, statements.clone(), &ctx(true)).is_err());
    assert_eq!(store.statement_count(&id).unwrap(), 0);

    std::fs::remove_dir(&path).unwrap();
    assert_eq!(store.import_statements(&id, statements, &ctx(true)).unwrap(), 1);
    assert_eq!(store.statement_count(&id).unwrap(), 1);
    assert!(path.is_file());
}

#[test]
fn lost_counters_never_reuse_ids() {
    let dir = tempdir().unwrap();
    {
        let store = JsonEntityStore::open(dir.path()).unwrap();
        store.create_entity(labelled_property("a"), &ctx(false)).unwrap();
        store.create_entity(labelled_property("b"), &ctx(false)).unwrap();
    }
    std::fs::remove_file(dir.path().join("counters.json")).unwrap();

    let store = JsonEntityStore::open(dir.path()).unwrap();
    let next = store.create_entity(labelled_property("c"), &ctx(false)).unwrap();

    assert_eq!(next, EntityId::property(3));
    assert_eq!(store.len(), 3);
}

#[test]
fn local_store_directory_layout() {
    let dir = tempdir().unwrap();
    let stores = open_local_stores(dir.path().join("store")).unwrap();

    let local = stores
        .entities
        .create_entity(labelled_property("Wikidata ID"), &ctx(false))
        .unwrap();
    stores.mappings.add_mapping(&EntityId::property(1_000_000), &local).unwrap();

    let root = dir.path().join("store");
    assert!(root.join("mappings.jsonl").exists());
    assert!(root.join("counters.json").exists());
    assert!(root.join("entities").join("P1.json").exists());
}

// ============================================================================
// Static fetcher
// ============================================================================

#[test]
fn static_fetcher_answers_by_requested_id() {
    let target = Item {
        id: Some(EntityId::item(2)),
        ..Item::default()
    };
    let fetcher = StaticFetcher::new().with(target).with_redirect("Q1", "Q2");

    let ids = vec!["Q1".to_string(), "Q404".to_string(), "Q2".to_string()];
    let fetched = fetcher.fetch_entities(&ids).unwrap();

    let keys: Vec<&str> = fetched.iter().map(|(k, _)| k.as_str()).collect();
    assert_eq!(keys, vec!["Q1", "Q2"]);
    assert_eq!(fetched[0].1.id(), Some(&EntityId::item(2)));
    assert_eq!(fetcher.requests(), vec![ids]);
}

#[test]
fn static_fetcher_loads_a_directory() {
    let dir = tempdir().unwrap();
    std::fs::write(
        dir.path().join("Q42.json"),
        r#"{"type":"item","id":"Q42","labels":{"en":{"language":"en","value":"Douglas Adams"}},"descriptions":[],"aliases":[],"sitelinks":[],"claims":[]}"#,
    )
    .unwrap();
    std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

    let fetcher = StaticFetcher::from_dir(dir.path()).unwrap();

    assert_eq!(fetcher.len(), 1);
    let fetched = fetcher.fetch_entities(&["Q42".to_string()]).unwrap();
    assert_eq!(fetched[0].1.fingerprint().label("en"), Some("Douglas Adams"));
}
