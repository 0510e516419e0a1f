//! The shared commit path for adapters and enrichments
//!
//! Every producer's emission reaches the engine through here, so primary
//! and enrichment commits follow identical validation and event rules.

use super::error::AdapterError;
use crate::graph::{ContextId, Emission, GraphEvent, PlaitEngine};
use tracing::warn;

/// Commit one producer's emission, mapping engine failures into the
/// adapter error taxonomy. Empty emissions commit nothing.
pub fn commit_emission(
    engine: &PlaitEngine,
    context_id: &ContextId,
    producer_id: &str,
    emission: Emission,
) -> Result<Vec<GraphEvent>, AdapterError> {
    if emission.is_empty() {
        return Ok(Vec::new());
    }
    engine
        .commit(context_id, producer_id, emission)
        .map_err(|e| {
            let err = AdapterError::from_commit(producer_id, e);
            warn!(context_id = %context_id, producer_id, error = %err, "emission not committed");
            err
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{EdgeUpsert, Node};
    use crate::storage::testing::FailingStore;
    use crate::storage::GraphStore;
    use std::sync::Arc;

    #[test]
    fn invalid_emission_maps_to_validation_failed() {
        let engine = PlaitEngine::new();
        let id = engine.create_context("test").unwrap();
        let err = commit_emission(
            &engine,
            &id,
            "X",
            Emission::new().with_edge(EdgeUpsert::new("A", "B", "r", 1.0)),
        )
        .unwrap_err();
        assert!(matches!(err, AdapterError::ValidationFailed { ref producer_id, .. } if producer_id == "X"));
    }

    #[test]
    fn empty_emission_is_a_noop() {
        let engine = PlaitEngine::new();
        let id = engine.create_context("test").unwrap();
        assert!(commit_emission(&engine, &id, "X", Emission::new()).unwrap().is_empty());
    }

    #[test]
    fn missing_context_is_reported() {
        let engine = PlaitEngine::new();
        let err = commit_emission(
            &engine,
            &ContextId::from("nope"),
            "X",
            Emission::new().with_node(Node::new("A", "concept")),
        )
        .unwrap_err();
        assert!(matches!(err, AdapterError::ContextNotFound(_)));
    }

    #[test]
    fn failed_save_maps_to_internal_commit_failure() {
        let store = Arc::new(FailingStore::new());
        let engine = PlaitEngine::with_store(store.clone());
        let id = engine.create_context("test").unwrap();
        store.fail_saves(true);

        let err = commit_emission(
            &engine,
            &id,
            "X",
            Emission::new().with_node(Node::new("A", "concept")),
        )
        .unwrap_err();

        assert!(matches!(err, AdapterError::InternalCommitFailure { ref producer_id, .. } if producer_id == "X"));
        assert!(err.is_producer_local());
        assert_eq!(engine.get_context(&id).unwrap().node_count(), 0);
        assert_eq!(store.context_version(&id).unwrap(), Some(1));
    }
}
