//! Dependencies of an entity's statements.
//!
//! Every snak contributes its property. Entity-valued snaks contribute the
//! referenced entity; quantities whose unit is a source-graph entity URI
//! contribute the unit entity, resolved through a single-id fetch so that
//! redirected units come back under their current id. The redirect itself
//! is kept alongside, since statements still name the unit by its old id.

use crate::ports::EntityFetcher;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::{debug, warn};
use wbimport_model::{DataValue, Entity, EntityId, Snak};

/// Deduplicated set of remote ids an entity depends on.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReferenceSet {
    ids: BTreeSet<EntityId>,
    redirects: BTreeMap<EntityId, EntityId>,
}

impl ReferenceSet {
    pub fn insert(&mut self, id: EntityId) -> bool {
        self.ids.insert(id)
    }

    pub fn contains(&self, id: &EntityId) -> bool {
        self.ids.contains(id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &EntityId> {
        self.ids.iter()
    }

    /// Serialized ids, ready to be fed back into an import.
    pub fn serializations(&self) -> Vec<String> {
        self.ids.iter().map(EntityId::to_string).collect()
    }

    /// Redirect sources seen while resolving units, with the id each one
    /// resolved to. Only the target is part of the set.
    pub fn redirects(&self) -> impl Iterator<Item = (&EntityId, &EntityId)> {
        self.redirects.iter()
    }
}

/// Id suffix of `unit` if it is an entity URI under `base_uri`.
pub fn unit_entity_suffix<'a>(unit: &'a str, base_uri: &str) -> Option<&'a str> {
    unit.strip_prefix(base_uri).filter(|suffix| !suffix.is_empty())
}

pub struct ReferenceExtractor<'a> {
    fetcher: &'a dyn EntityFetcher,
    source_base_uri: &'a str,
}

impl<'a> ReferenceExtractor<'a> {
    pub fn new(fetcher: &'a dyn EntityFetcher, source_base_uri: &'a str) -> Self {
        Self {
            fetcher,
            source_base_uri,
        }
    }

    pub fn referenced_entities(&self, entity: &Entity) -> ReferenceSet {
        let mut refs = ReferenceSet::default();
        let mut units: HashMap<&str, Option<EntityId>> = HashMap::new();
        for snak in entity.statements().all_snaks() {
            refs.insert(*snak.property());
            let Snak::Value { value, .. } = snak else {
                continue;
            };
            match value {
                DataValue::EntityId(id) => {
                    refs.insert(*id);
                }
                DataValue::Quantity(quantity) => {
                    let unit = quantity.unit.as_str();
                    let resolved = match units.get(unit) {
                        Some(cached) => *cached,
                        None => {
                            let resolved = self.resolve_unit(unit, &mut refs);
                            units.insert(unit, resolved);
                            resolved
                        }
                    };
                    if let Some(id) = resolved {
                        refs.insert(id);
                    }
                }
                DataValue::String(_)
                | DataValue::MonolingualText { .. }
                | DataValue::Time(_)
                | DataValue::Other { .. } => {}
            }
        }
        refs
    }

    fn resolve_unit(&self, unit: &str, refs: &mut ReferenceSet) -> Option<EntityId> {
        let suffix = unit_entity_suffix(unit, self.source_base_uri)?;
        let unit_id = match EntityId::parse(suffix) {
            Ok(id) => id,
            Err(err) => {
                warn!(unit, error = %err, "skipping unit: malformed id");
                return None;
            }
        };
        let fetched = match self.fetcher.fetch_entities(&[unit_id.to_string()]) {
            Ok(fetched) => fetched,
            Err(err) => {
                warn!(unit, error = %err, "skipping unit: fetch failed");
                return None;
            }
        };
        let Some((requested, entity)) = fetched.into_iter().next() else {
            warn!(unit, "skipping unit: not found in source graph");
            return None;
        };
        match entity.id() {
            Some(id) => {
                if *id != unit_id {
                    debug!(unit, requested = %requested, resolved = %id, "unit resolved through redirect");
                    refs.redirects.insert(unit_id, *id);
                }
                Some(*id)
            }
            None => Some(unit_id),
        }
    }
}
