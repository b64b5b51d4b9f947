//! Runtime settings: built-in defaults, then an optional JSON file, then
//! command-line flags.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use wbimport_core::ImportConfig;

pub const DEFAULT_API_URL: &str = "https://www.wikidata.org/w/api.php";
pub const DEFAULT_STORE_DIR: &str = "wbimport-store";
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// `api.php` endpoint of the source Wikibase.
    pub api_url: String,
    pub user_agent: String,
    /// Per-request timeout, which bounds each batch fetch.
    pub timeout_secs: u64,
    pub store_dir: PathBuf,
    pub import: ImportConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            user_agent: format!("wbimport/{}", env!("CARGO_PKG_VERSION")),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            store_dir: PathBuf::from(DEFAULT_STORE_DIR),
            import: ImportConfig::default(),
        }
    }
}

impl Settings {
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("invalid config {}", path.display()))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Flag values that win over the config file when given.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub api_url: Option<String>,
    pub store_dir: Option<PathBuf>,
    pub batch_size: Option<usize>,
    pub concept_base_uri: Option<String>,
    pub rewrite_entity_values: bool,
}

impl Overrides {
    pub fn apply(self, mut settings: Settings) -> Settings {
        if let Some(api_url) = self.api_url {
            settings.api_url = api_url;
        }
        if let Some(store_dir) = self.store_dir {
            settings.store_dir = store_dir;
        }
        if let Some(batch_size) = self.batch_size {
            settings.import = settings.import.with_batch_size(batch_size);
        }
        if let Some(uri) = self.concept_base_uri {
            settings.import = settings.import.with_concept_base_uri(uri);
        }
        if self.rewrite_entity_values {
            settings.import = settings.import.with_entity_value_rewriting(true);
        }
        settings
    }
}
