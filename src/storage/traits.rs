//! Storage trait definitions

use crate::graph::{Contributions, Context, ContextId, Edge};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Date parsing error: {0}")]
    DateParse(String),

    #[error("Store lock poisoned")]
    LockPoisoned,
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Persisted shape of one edge
///
/// Contributions are stored in full so a reload reconstructs the
/// normalization inputs exactly; `raw_weight` is informational only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeRecord {
    pub source_id: String,
    pub target_id: String,
    pub relationship_type: String,
    pub contributions: Contributions,
    pub raw_weight: f64,
}

impl From<&Edge> for EdgeRecord {
    fn from(edge: &Edge) -> Self {
        Self {
            source_id: edge.source.to_string(),
            target_id: edge.target.to_string(),
            relationship_type: edge.relationship.clone(),
            contributions: edge.contributions.clone(),
            raw_weight: edge.raw_weight,
        }
    }
}

/// Trait for graph storage backends
///
/// Implementations must be thread-safe (Send + Sync). Saves are
/// incremental upserts by id, and every save bumps a per-context version
/// counter that engines poll for cache coherence.
pub trait GraphStore: Send + Sync {
    /// Upsert a context and all of its nodes and edges in one transaction.
    ///
    /// Returns the context's new version.
    fn save_context(&self, context: &Context) -> StorageResult<u64>;

    /// Load a context by ID
    fn load_context(&self, id: &ContextId) -> StorageResult<Option<Context>>;

    /// Delete a context and all its nodes/edges
    fn delete_context(&self, id: &ContextId) -> StorageResult<bool>;

    /// List all context IDs
    fn list_contexts(&self) -> StorageResult<Vec<ContextId>>;

    /// Current version of a context, or `None` if it is not stored
    fn context_version(&self, id: &ContextId) -> StorageResult<Option<u64>>;
}

/// Extension trait for opening stores from paths
pub trait OpenStore: GraphStore + Sized {
    /// Open or create a store at the given path
    fn open(path: impl AsRef<Path>) -> StorageResult<Self>;

    /// Create an in-memory store (useful for testing)
    fn open_in_memory() -> StorageResult<Self>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::NodeId;

    #[test]
    fn edge_record_uses_camel_case_keys() {
        let edge = Edge::new(NodeId::from("A"), NodeId::from("B"), "tagged_with").with_contribution("X", 5.0);
        let json = serde_json::to_value(EdgeRecord::from(&edge)).unwrap();
        assert_eq!(json["sourceId"], "A");
        assert_eq!(json["targetId"], "B");
        assert_eq!(json["relationshipType"], "tagged_with");
        assert_eq!(json["contributions"]["X"], 5.0);
        assert!(json.get("rawWeight").is_some());
    }
}
