//! Entity import between Wikibase graphs.
//!
//! ```text
//!   ids ──► EntityImporter ──► EntityFetcher (remote graph)
//!              │    ▲
//!              │    └── ReferenceExtractor / badge_ids (dependencies)
//!              ├──► EntityStore + MappingStore     (local copies, remote -> local ids)
//!              └──► Rewriter ──► StatementsImporter (localized statements)
//! ```
//!
//! The importer deduplicates against the mapping store, pulls in every
//! entity a statement depends on before localizing it, and stamps each
//! imported entity with a back-reference statement holding its remote id.

pub mod badges;
pub mod bootstrap;
pub mod config;
pub mod error;
pub mod importer;
pub mod ports;
pub mod references;
pub mod report;
pub mod rewrite;


pub use bootstrap::{create_or_get_existing, BootstrapOutcome};
pub use config::{BackReferenceConfig, ImportConfig};
pub use error::{FetchError, ImportError, StoreError};
pub use importer::{EntityImporter, ImportServices};
pub use ports::{
    BadgeUpdater, EditContext, EntityFetcher, EntityStore, FetchedEntities, MappedBadgeUpdater,
    MappingOutcome, MappingStore, MemoryMappings, StatementCountLookup, StatementsImporter,
};
pub use references::{ReferenceExtractor, ReferenceSet};
pub use report::{CancellationToken, CreatedEntity, ImportReport};
pub use rewrite::{Rewriter, Rewritten, Unresolved};
