//! Local side of an import: where mappings and entity copies live.
//!
//! ```text
//!   <store-dir>/
//!   ├── mappings.jsonl      remote -> local ids, one JSON record per line
//!   ├── counters.json       last local id handed out per entity kind
//!   └── entities/
//!       ├── Q1.json         Wikibase JSON, one file per local entity
//!       └── P1.json
//! ```
//!
//! Memory-only variants of both stores back dry runs, and
//! [`StaticFetcher`] stands in for a remote graph when offline.

pub mod entities;
pub mod fetcher;
pub mod mappings;

#[cfg(test)]
mod tests;

pub use entities::{IdCounters, JsonEntityStore, MemoryEntityStore};
pub use fetcher::StaticFetcher;
pub use mappings::{JsonlMappingStore, MappingRecord};

use std::path::{Path, PathBuf};
use std::sync::Arc;
use wbimport_core::StoreError;

pub const MAPPINGS_FILE: &str = "mappings.jsonl";

/// Both file-backed stores of one store directory.
pub struct LocalStores {
    pub dir: PathBuf,
    pub mappings: Arc<JsonlMappingStore>,
    pub entities: Arc<JsonEntityStore>,
}

/// Open (or initialize) the store directory at `dir`.
pub fn open_local_stores(dir: impl AsRef<Path>) -> Result<LocalStores, StoreError> {
    let dir = dir.as_ref();
    std::fs::create_dir_all(dir)?;
    let mappings = JsonlMappingStore::open(dir.join(MAPPINGS_FILE))?;
    let entities = JsonEntityStore::open(dir)?;
    Ok(LocalStores {
        dir: dir.to_path_buf(),
        mappings: Arc::new(mappings),
        entities: Arc::new(entities),
    })
}

pub(crate) fn backend_error(context: impl std::fmt::Display, err: impl std::fmt::Display) -> StoreError {
    StoreError::Backend(format!("{context}: {err}"))
}
