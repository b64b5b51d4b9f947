//! Collaborator interfaces the importer drives.
//!
//! Fetching remote entities, persisting local ones and keeping the
//! remote -> local id mapping all live behind these traits. Concrete
//! implementations are in `wbimport-storage` and the CLI.

use crate::error::{FetchError, StoreError};
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::warn;
use wbimport_model::{Entity, EntityId, SiteLink, StatementList};

/// Entities returned for a fetch, keyed by the id that was requested.
/// Ids that do not exist remotely are simply absent.
pub type FetchedEntities = Vec<(String, Entity)>;

pub trait EntityFetcher {
    /// `Ok(vec![])` means the source answered but had nothing for these ids.
    fn fetch_entities(&self, ids: &[String]) -> Result<FetchedEntities, FetchError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MappingOutcome {
    Inserted,
    /// The remote id was mapped already; the existing local id is returned
    /// and nothing was written.
    AlreadyMapped(EntityId),
}

/// Append-only remote -> local id relation.
pub trait MappingStore {
    fn local_id(&self, remote: &EntityId) -> Result<Option<EntityId>, StoreError>;

    /// Compare-and-insert: never overwrites an existing mapping.
    fn add_mapping(&self, remote: &EntityId, local: &EntityId)
        -> Result<MappingOutcome, StoreError>;
}

/// Who is editing and how, passed explicitly with every write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditContext {
    pub user: String,
    pub summary: String,
    /// Skip local uniqueness constraints (label/description clashes).
    pub ignore_constraints: bool,
}

pub trait EntityStore {
    /// Persist a new entity (its id must be unset) and return the id the
    /// local graph assigned.
    fn create_entity(&self, entity: Entity, ctx: &EditContext) -> Result<EntityId, StoreError>;
}

pub trait StatementsImporter {
    /// Attach `statements` to the local entity. Statements whose main snak
    /// is already present on the entity are not attached again. Returns
    /// the number actually attached.
    fn import_statements(
        &self,
        local_id: &EntityId,
        statements: StatementList,
        ctx: &EditContext,
    ) -> Result<usize, StoreError>;
}

pub trait StatementCountLookup {
    fn statement_count(&self, local_id: &EntityId) -> Result<usize, StoreError>;
}

pub trait BadgeUpdater {
    /// Map every badge to its local equivalent.
    fn replace_badges(&self, site_links: Vec<SiteLink>) -> Vec<SiteLink>;
}

/// Badge updater backed by the mapping store. Badges without a local
/// mapping are dropped from the site link.
pub struct MappedBadgeUpdater {
    mappings: Arc<dyn MappingStore>,
}

impl MappedBadgeUpdater {
    pub fn new(mappings: Arc<dyn MappingStore>) -> Self {
        Self { mappings }
    }
}

impl BadgeUpdater for MappedBadgeUpdater {
    fn replace_badges(&self, site_links: Vec<SiteLink>) -> Vec<SiteLink> {
        site_links
            .into_iter()
            .map(|mut link| {
                link.badges = link
                    .badges
                    .iter()
                    .filter_map(|badge| match self.mappings.local_id(badge) {
                        Ok(Some(local)) => Some(local),
                        Ok(None) => {
                            warn!(badge = %badge, site = %link.site, "dropping badge without local mapping");
                            None
                        }
                        Err(err) => {
                            warn!(badge = %badge, error = %err, "badge mapping lookup failed");
                            None
                        }
                    })
                    .collect();
                link
            })
            .collect()
    }
}

/// In-memory mapping table, handy for dry runs.
#[derive(Default)]
pub struct MemoryMappings {
    entries: RwLock<std::collections::HashMap<EntityId, EntityId>>,
}

impl MemoryMappings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl MappingStore for MemoryMappings {
    fn local_id(&self, remote: &EntityId) -> Result<Option<EntityId>, StoreError> {
        Ok(self.entries.read().get(remote).copied())
    }

    fn add_mapping(
        &self,
        remote: &EntityId,
        local: &EntityId,
    ) -> Result<MappingOutcome, StoreError> {
        let mut entries = self.entries.write();
        if let Some(existing) = entries.get(remote) {
            return Ok(MappingOutcome::AlreadyMapped(*existing));
        }
        entries.insert(*remote, *local);
        Ok(MappingOutcome::Inserted)
    }
}
