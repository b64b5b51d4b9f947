//! A fixed remote graph, for offline runs and tests.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;
use wbimport_core::{EntityFetcher, FetchError, FetchedEntities};
use wbimport_model::json::parse_entity;
use wbimport_model::Entity;

#[derive(Default)]
pub struct StaticFetcher {
    entities: HashMap<String, Entity>,
    redirects: HashMap<String, String>,
    requests: Mutex<Vec<Vec<String>>>,
}

impl StaticFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every `*.json` file in `dir`, each holding one entity in Wikibase JSON.
    pub fn from_dir(dir: impl AsRef<Path>) -> Result<Self, FetchError> {
        let dir = dir.as_ref();
        let read_error = |err: std::io::Error| FetchError::Transport(format!("{}: {err}", dir.display()));
        let mut fetcher = Self::new();

        for entry in std::fs::read_dir(dir).map_err(read_error)? {
            let path = entry.map_err(read_error)?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let contents = std::fs::read_to_string(&path).map_err(read_error)?;
            let entity = parse_entity(&contents)
                .map_err(|err| FetchError::Decode(format!("{}: {err}", path.display())))?;
            fetcher.insert(entity);
        }
        debug!(dir = %dir.display(), entities = fetcher.entities.len(), "loaded static source graph");
        Ok(fetcher)
    }

    pub fn with(mut self, entity: impl Into<Entity>) -> Self {
        self.insert(entity.into());
        self
    }

    /// Requests for `from` answer with the entity stored under `to`.
    pub fn with_redirect(mut self, from: &str, to: &str) -> Self {
        self.redirects.insert(from.to_string(), to.to_string());
        self
    }

    /// Entities without an id cannot be looked up and are ignored.
    pub fn insert(&mut self, entity: Entity) {
        if let Some(id) = entity.id() {
            self.entities.insert(id.to_string(), entity);
        }
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Every id list passed to `fetch_entities`, in call order.
    pub fn requests(&self) -> Vec<Vec<String>> {
        self.requests.lock().clone()
    }
}

impl EntityFetcher for StaticFetcher {
    fn fetch_entities(&self, ids: &[String]) -> Result<FetchedEntities, FetchError> {
        self.requests.lock().push(ids.to_vec());
        Ok(ids
            .iter()
            .filter_map(|id| {
                let target = self.redirects.get(id).unwrap_or(id);
                self.entities.get(target).map(|entity| (id.clone(), entity.clone()))
            })
            .collect())
    }
}
