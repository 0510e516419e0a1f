//! Engine configuration loaded from YAML
//!
//! ```yaml
//! db_path: /var/lib/plait/plait.db
//! max_enrichment_rounds: 10
//! node_merge: merge_properties   # or: replace
//! auto_provenance: false
//! log_level: info
//! ```

use crate::adapter::DEFAULT_MAX_ROUNDS;
use crate::graph::NodeMergePolicy;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors loading or validating configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Engine and pipeline settings. Every field has a default.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// SQLite database file; in-memory only when unset
    pub db_path: Option<PathBuf>,
    /// Enrichment loop safety valve
    pub max_enrichment_rounds: usize,
    /// How node upserts combine with stored nodes
    pub node_merge: NodeMergePolicy,
    /// Record an ingest_record node per adapter commit
    pub auto_provenance: bool,
    /// tracing filter level for the binary
    pub log_level: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            db_path: None,
            max_enrichment_rounds: DEFAULT_MAX_ROUNDS,
            node_merge: NodeMergePolicy::default(),
            auto_provenance: false,
            log_level: "info".to_string(),
        }
    }
}

impl EngineConfig {
    /// Read and validate a YAML config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&text)
    }

    /// Parse and validate YAML text. An empty document yields the defaults.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = if yaml.trim().is_empty() {
            Self::default()
        } else {
            serde_yaml::from_str(yaml)?
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_enrichment_rounds < 1 {
            return Err(ConfigError::Invalid(
                "max_enrichment_rounds must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
