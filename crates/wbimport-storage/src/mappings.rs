//! Append-only mapping log.
//!
//! Every accepted mapping is appended as one JSON line and synced before
//! the in-memory table is updated. Opening the log replays it; the first
//! record for a remote id wins, matching compare-and-insert at write time.

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use wbimport_core::{MappingOutcome, MappingStore, StoreError};
use wbimport_model::EntityId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingRecord {
    pub remote: EntityId,
    pub local: EntityId,
    pub recorded_at: DateTime<Utc>,
}

pub struct JsonlMappingStore {
    path: PathBuf,
    file: Mutex<File>,
    entries: RwLock<HashMap<EntityId, MappingRecord>>,
}

impl JsonlMappingStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&path)?;

        let entries = Self::replay(&path)?;
        debug!(path = %path.display(), mappings = entries.len(), "mapping log opened");

        Ok(Self {
            path,
            file: Mutex::new(file),
            entries: RwLock::new(entries),
        })
    }

    fn replay(path: &Path) -> Result<HashMap<EntityId, MappingRecord>, StoreError> {
        let reader = BufReader::new(File::open(path)?);
        let mut entries = HashMap::new();

        for (index, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            // A torn final write leaves a partial line behind.
            let record: MappingRecord = match serde_json::from_str(&line) {
                Ok(record) => record,
                Err(err) => {
                    warn!(path = %path.display(), line = index + 1, error = %err, "skipping unreadable mapping record");
                    continue;
                }
            };
            entries.entry(record.remote).or_insert(record);
        }
        Ok(entries)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn record(&self, remote: &EntityId) -> Option<MappingRecord> {
        self.entries.read().get(remote).cloned()
    }

    /// All mappings, ordered by remote id.
    pub fn records(&self) -> Vec<MappingRecord> {
        let mut records: Vec<MappingRecord> = self.entries.read().values().cloned().collect();
        records.sort_by_key(|r| r.remote);
        records
    }

    fn append(&self, record: &MappingRecord) -> Result<(), StoreError> {
        let mut line = serde_json::to_string(record)
            .map_err(|err| crate::backend_error("encoding mapping record", err))?;
        line.push('\n');

        let mut file = self.file.lock();
        file.write_all(line.as_bytes())?;
        file.sync_data()?;
        Ok(())
    }
}

impl MappingStore for JsonlMappingStore {
    fn local_id(&self, remote: &EntityId) -> Result<Option<EntityId>, StoreError> {
        Ok(self.entries.read().get(remote).map(|r| r.local))
    }

    fn add_mapping(
        &self,
        remote: &EntityId,
        local: &EntityId,
    ) -> Result<MappingOutcome, StoreError> {
        let mut entries = self.entries.write();
        if let Some(existing) = entries.get(remote) {
            return Ok(MappingOutcome::AlreadyMapped(existing.local));
        }

        let record = MappingRecord {
            remote: *remote,
            local: *local,
            recorded_at: Utc::now(),
        };
        self.append(&record)?;
        entries.insert(*remote, record);
        Ok(MappingOutcome::Inserted)
    }
}
