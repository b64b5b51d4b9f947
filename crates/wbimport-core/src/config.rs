//! Importer configuration.

use crate::ports::EditContext;
use serde::{Deserialize, Serialize};
use wbimport_model::EntityId;

pub const DEFAULT_BATCH_SIZE: usize = 10;
pub const DEFAULT_SOURCE_CONCEPT_BASE_URI: &str = "http://www.wikidata.org/entity/";
pub const DEFAULT_STATEMENT_THRESHOLD: usize = 2;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportConfig {
    /// Number of requested ids fetched per round trip.
    pub batch_size: usize,
    /// Prefix of entity URIs in the source graph, used to spot quantity units.
    pub source_concept_base_uri: String,
    /// Prefix of entity URIs in the local graph; rewritten units use it.
    pub concept_base_uri: String,
    /// Entities whose local copy already has at least this many statements
    /// are considered fully imported.
    pub statement_threshold: usize,
    /// Also remap entity-valued data and snak properties to local ids.
    /// Off by default: only quantity units are rewritten.
    pub rewrite_entity_values: bool,
    pub import_user: String,
    pub edit_summary: String,
    pub back_reference: BackReferenceConfig,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            source_concept_base_uri: DEFAULT_SOURCE_CONCEPT_BASE_URI.to_string(),
            concept_base_uri: "http://localhost/entity/".to_string(),
            statement_threshold: DEFAULT_STATEMENT_THRESHOLD,
            rewrite_entity_values: false,
            import_user: "importer".to_string(),
            edit_summary: "Import entity".to_string(),
            back_reference: BackReferenceConfig::default(),
        }
    }
}

impl ImportConfig {
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn with_concept_base_uri(mut self, uri: impl Into<String>) -> Self {
        self.concept_base_uri = uri.into();
        self
    }

    pub fn with_entity_value_rewriting(mut self, enabled: bool) -> Self {
        self.rewrite_entity_values = enabled;
        self
    }

    pub(crate) fn edit_context(&self, ignore_constraints: bool) -> EditContext {
        EditContext {
            user: self.import_user.clone(),
            summary: self.edit_summary.clone(),
            ignore_constraints,
        }
    }
}

/// The local property stamping every imported entity with its remote id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackReferenceConfig {
    /// Reserved id under which the property is recorded in the mapping
    /// store. It never exists in the source graph.
    pub sentinel: EntityId,
    pub label: String,
    pub language: String,
    pub datatype: String,
}

impl Default for BackReferenceConfig {
    fn default() -> Self {
        Self {
            sentinel: EntityId::property(1_000_000),
            label: "Wikidata ID".to_string(),
            language: "en".to_string(),
            datatype: "external-id".to_string(),
        }
    }
}
