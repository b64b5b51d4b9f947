use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use wbimport_model::EntityId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CreatedEntity {
    pub remote: EntityId,
    pub local: EntityId,
}

/// Outcome of one top-level import call, nested imports included.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    /// Batches sent to the fetcher.
    pub batches: usize,
    pub created: Vec<CreatedEntity>,
    pub already_mapped: usize,
    /// Ids whose creation, mapping or statement attachment failed.
    pub failed: Vec<String>,
    pub invalid_ids: Vec<String>,
    pub fetch_failures: usize,
    /// Entities whose statements were rewritten and handed over.
    pub reconciled: usize,
    pub statements_attached: usize,
    pub skipped_with_statements: usize,
    /// Fetched entities that ended up without a local mapping.
    pub unreconciled: usize,
    pub unresolved_values: usize,
    /// Redirected ids mapped onto the local copy of their target.
    pub redirects_mapped: usize,
    /// Ids skipped because an enclosing import was already handling them.
    pub cycle_skips: usize,
    pub cancelled: bool,
}

impl ImportReport {
    pub fn local_id_of(&self, remote: &EntityId) -> Option<EntityId> {
        self.created
            .iter()
            .find(|c| &c.remote == remote)
            .map(|c| c.local)
    }
}

/// Cooperative cancellation shared with whoever drives the import.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Raw flag, for signal handlers that set it directly.
    pub fn flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.0)
    }
}
