//! Local entity stores.
//!
//! Both stores share one table: sequential id allocation per entity kind,
//! the uniqueness checks a Wikibase repository applies on save, and
//! statement attachment that skips main snaks the entity already has.
//! `JsonEntityStore` writes every change through to disk.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use uuid::Uuid;
use wbimport_core::{EditContext, EntityStore, StatementCountLookup, StatementsImporter, StoreError};
use wbimport_model::json::{entity_to_string, parse_entity};
use wbimport_model::{Entity, EntityId, EntityKind, StatementList};

pub const COUNTERS_FILE: &str = "counters.json";
pub const ENTITIES_DIR: &str = "entities";

/// Last number handed out per entity kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdCounters {
    pub item: u64,
    pub property: u64,
}

impl IdCounters {
    fn slot(&mut self, kind: EntityKind) -> &mut u64 {
        match kind {
            EntityKind::Item => &mut self.item,
            EntityKind::Property => &mut self.property,
        }
    }

    fn allocate(&mut self, kind: EntityKind) -> EntityId {
        let slot = self.slot(kind);
        *slot += 1;
        EntityId::new(kind, *slot)
    }

    /// Never hand out `id` again.
    fn observe(&mut self, id: &EntityId) {
        let slot = self.slot(id.kind());
        *slot = (*slot).max(id.number());
    }
}

// ============================================================================
// Shared table
// ============================================================================

#[derive(Debug, Default)]
struct EntityTable {
    entities: BTreeMap<EntityId, Entity>,
    counters: IdCounters,
}

impl EntityTable {
    fn check_constraints(&self, entity: &Entity, ctx: &EditContext) -> Result<(), StoreError> {
        let fingerprint = entity.fingerprint();
        for (language, label) in &fingerprint.labels {
            let clash = self.entities.values().find(|other| {
                if other.kind() != entity.kind() {
                    return false;
                }
                let theirs = other.fingerprint();
                if theirs.label(language) != Some(label.as_str()) {
                    return false;
                }
                match entity.kind() {
                    EntityKind::Property => true,
                    EntityKind::Item => {
                        !ctx.ignore_constraints
                            && fingerprint.description(language).is_some()
                            && theirs.description(language) == fingerprint.description(language)
                    }
                }
            });

            if let Some(other) = clash {
                let existing = other.id().copied();
                let message = match entity.kind() {
                    EntityKind::Property => format!("property label {label:?} ({language}) is already used"),
                    EntityKind::Item => {
                        format!("item label {label:?} ({language}) and description are already used")
                    }
                };
                return Err(StoreError::Conflict { message, existing });
            }
        }
        Ok(())
    }

    fn create(&mut self, mut entity: Entity, ctx: &EditContext) -> Result<Entity, StoreError> {
        if let Some(id) = entity.id() {
            return Err(StoreError::Backend(format!(
                "new entities must not carry an id, got {id}"
            )));
        }
        self.check_constraints(&entity, ctx)?;

        let id = self.counters.allocate(entity.kind());
        entity.set_id(Some(id));
        self.entities.insert(id, entity.clone());
        Ok(entity)
    }

    fn attach(&mut self, local_id: &EntityId, statements: StatementList) -> Result<usize, StoreError> {
        let entity = self
            .entities
            .get_mut(local_id)
            .ok_or(StoreError::NotFound(*local_id))?;
        Ok(attach_statements(entity, local_id, statements))
    }

    fn statement_count(&self, local_id: &EntityId) -> Result<usize, StoreError> {
        self.entities
            .get(local_id)
            .map(|e| e.statements().len())
            .ok_or(StoreError::NotFound(*local_id))
    }
}

/// Statements get fresh statement ids under the local entity.
fn attach_statements(entity: &mut Entity, local_id: &EntityId, statements: StatementList) -> usize {
    let mut attached = 0;
    for mut statement in statements {
        if entity.statements().contains_main_snak(&statement.main_snak) {
            continue;
        }
        statement.id = Some(format!("{local_id}${}", Uuid::new_v4().to_string().to_uppercase()));
        entity.statements_mut().push(statement);
        attached += 1;
    }
    attached
}

// ============================================================================
// In-memory store
// ============================================================================

#[derive(Default)]
pub struct MemoryEntityStore {
    table: RwLock<EntityTable>,
}

impl MemoryEntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &EntityId) -> Option<Entity> {
        self.table.read().entities.get(id).cloned()
    }

    pub fn ids(&self) -> Vec<EntityId> {
        self.table.read().entities.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.table.read().entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.read().entities.is_empty()
    }
}

impl EntityStore for MemoryEntityStore {
    fn create_entity(&self, entity: Entity, ctx: &EditContext) -> Result<EntityId, StoreError> {
        let created = self.table.write().create(entity, ctx)?;
        let id = *created.id().ok_or_else(|| StoreError::Backend("created entity has no id".to_string()))?;
        debug!(local_id = %id, user = %ctx.user, "entity created");
        Ok(id)
    }
}

impl StatementsImporter for MemoryEntityStore {
    fn import_statements(
        &self,
        local_id: &EntityId,
        statements: StatementList,
        _ctx: &EditContext,
    ) -> Result<usize, StoreError> {
        self.table.write().attach(local_id, statements)
    }
}

impl StatementCountLookup for MemoryEntityStore {
    fn statement_count(&self, local_id: &EntityId) -> Result<usize, StoreError> {
        self.table.read().statement_count(local_id)
    }
}

// ============================================================================
// File-backed store
// ============================================================================

pub struct JsonEntityStore {
    dir: PathBuf,
    table: RwLock<EntityTable>,
}

impl JsonEntityStore {
    /// Load every entity file under `dir/entities`. Counters are raised to
    /// cover every loaded id, so a lost counters file never causes reuse.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let dir = dir.as_ref().to_path_buf();
        let entities_dir = dir.join(ENTITIES_DIR);
        std::fs::create_dir_all(&entities_dir)?;

        let counters_path = dir.join(COUNTERS_FILE);
        let mut table = EntityTable::default();
        if counters_path.exists() {
            let contents = std::fs::read_to_string(&counters_path)?;
            table.counters = serde_json::from_str(&contents)
                .map_err(|err| crate::backend_error(counters_path.display(), err))?;
        }

        for entry in std::fs::read_dir(&entities_dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let contents = std::fs::read_to_string(&path)?;
            let entity = parse_entity(&contents).map_err(|err| crate::backend_error(path.display(), err))?;
            let id = *entity
                .id()
                .ok_or_else(|| crate::backend_error(path.display(), "stored entity has no id"))?;
            table.counters.observe(&id);
            table.entities.insert(id, entity);
        }

        info!(dir = %dir.display(), entities = table.entities.len(), "entity store opened");
        Ok(Self {
            dir,
            table: RwLock::new(table),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn get(&self, id: &EntityId) -> Option<Entity> {
        self.table.read().entities.get(id).cloned()
    }

    pub fn ids(&self) -> Vec<EntityId> {
        self.table.read().entities.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.table.read().entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.read().entities.is_empty()
    }

    fn entity_path(&self, id: &EntityId) -> PathBuf {
        self.dir.join(ENTITIES_DIR).join(format!("{id}.json"))
    }

    fn write_entity(&self, entity: &Entity) -> Result<(), StoreError> {
        let id = entity
            .id()
            .ok_or_else(|| StoreError::Backend("cannot persist an entity without id".to_string()))?;
        let json = entity_to_string(entity).map_err(|err| crate::backend_error(id, err))?;
        std::fs::write(self.entity_path(id), json)?;
        Ok(())
    }

    fn write_counters(&self, counters: &IdCounters) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(counters)
            .map_err(|err| crate::backend_error(COUNTERS_FILE, err))?;
        std::fs::write(self.dir.join(COUNTERS_FILE), json)?;
        Ok(())
    }
}

impl EntityStore for JsonEntityStore {
    fn create_entity(&self, entity: Entity, ctx: &EditContext) -> Result<EntityId, StoreError> {
        let mut table = self.table.write();
        let created = table.create(entity, ctx)?;
        let id = *created.id().ok_or_else(|| StoreError::Backend("created entity has no id".to_string()))?;

        let persisted = self
            .write_entity(&created)
            .and_then(|()| self.write_counters(&table.counters));
        if let Err(err) = persisted {
            table.entities.remove(&id);
            return Err(err);
        }

        debug!(local_id = %id, user = %ctx.user, "entity created");
        Ok(id)
    }
}

impl StatementsImporter for JsonEntityStore {
    fn import_statements(
        &self,
        local_id: &EntityId,
        statements: StatementList,
        _ctx: &EditContext,
    ) -> Result<usize, StoreError> {
        let mut table = self.table.write();
        let mut updated = table
            .entities
            .get(local_id)
            .cloned()
            .ok_or(StoreError::NotFound(*local_id))?;

        let attached = attach_statements(&mut updated, local_id, statements);
        if attached > 0 {
            self.write_entity(&updated)?;
            table.entities.insert(*local_id, updated);
        }
        Ok(attached)
    }
}

impl StatementCountLookup for JsonEntityStore {
    fn statement_count(&self, local_id: &EntityId) -> Result<usize, StoreError> {
        self.table.read().statement_count(local_id)
    }
}
