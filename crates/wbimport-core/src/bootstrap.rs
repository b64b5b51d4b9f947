//! One-time setup of the back-reference property.
//!
//! The property is recorded in the mapping store under a reserved sentinel
//! id, so later runs find it without creating it again.

use crate::config::BackReferenceConfig;
use crate::error::StoreError;
use crate::ports::{EditContext, EntityStore, MappingOutcome, MappingStore};
use tracing::{error, info};
use wbimport_model::{Entity, EntityId, Fingerprint, Property};

#[derive(Debug)]
pub enum BootstrapOutcome {
    Created(EntityId),
    AlreadyExists(EntityId),
    Failed(StoreError),
}

impl BootstrapOutcome {
    pub fn local_id(&self) -> Option<EntityId> {
        match self {
            BootstrapOutcome::Created(id) | BootstrapOutcome::AlreadyExists(id) => Some(*id),
            BootstrapOutcome::Failed(_) => None,
        }
    }
}

pub fn create_or_get_existing(
    config: &BackReferenceConfig,
    store: &dyn EntityStore,
    mappings: &dyn MappingStore,
    ctx: &EditContext,
) -> BootstrapOutcome {
    match mappings.local_id(&config.sentinel) {
        Ok(Some(local)) => {
            info!(property = %local, "back-reference property already mapped");
            return BootstrapOutcome::AlreadyExists(local);
        }
        Ok(None) => {}
        Err(err) => return BootstrapOutcome::Failed(err),
    }

    let property = Property {
        fingerprint: Fingerprint::default().with_label(&config.language, &config.label),
        ..Property::new(&config.datatype)
    };

    match store.create_entity(Entity::Property(property), ctx) {
        Ok(local) => match mappings.add_mapping(&config.sentinel, &local) {
            Ok(MappingOutcome::Inserted) => {
                info!(property = %local, label = %config.label, "created back-reference property");
                BootstrapOutcome::Created(local)
            }
            Ok(MappingOutcome::AlreadyMapped(existing)) => BootstrapOutcome::AlreadyExists(existing),
            Err(err) => BootstrapOutcome::Failed(err),
        },
        Err(StoreError::Conflict {
            existing: Some(existing),
            message,
        }) => {
            info!(property = %existing, %message, "back-reference property already exists");
            match mappings.add_mapping(&config.sentinel, &existing) {
                Ok(MappingOutcome::Inserted) => BootstrapOutcome::AlreadyExists(existing),
                Ok(MappingOutcome::AlreadyMapped(mapped)) => BootstrapOutcome::AlreadyExists(mapped),
                Err(err) => BootstrapOutcome::Failed(err),
            }
        }
        Err(err) => {
            error!(error = %err, "failed to create back-reference property");
            BootstrapOutcome::Failed(err)
        }
    }
}
