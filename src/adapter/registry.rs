//! Adapter registry: routes an input kind to the adapters that consume it

use super::traits::Adapter;
use std::sync::Arc;

/// Explicit set of registered adapters.
///
/// Built once at startup and handed to the ingest pipeline; several
/// adapters may share an input kind, in which case all of them run.
#[derive(Default, Clone)]
pub struct AdapterRegistry {
    adapters: Vec<Arc<dyn Adapter>>,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an adapter. Adapters with an id already present are ignored.
    pub fn register(&mut self, adapter: Arc<dyn Adapter>) -> bool {
        if self.adapters.iter().any(|a| a.id() == adapter.id()) {
            return false;
        }
        self.adapters.push(adapter);
        true
    }

    /// Builder form of `register`
    pub fn with(mut self, adapter: Arc<dyn Adapter>) -> Self {
        self.register(adapter);
        self
    }

    /// Adapters consuming `input_kind`, in registration order
    pub fn matching(&self, input_kind: &str) -> Vec<Arc<dyn Adapter>> {
        self.adapters
            .iter()
            .filter(|a| a.input_kind() == input_kind)
            .cloned()
            .collect()
    }

    /// Distinct input kinds with at least one adapter
    pub fn input_kinds(&self) -> Vec<&str> {
        let mut kinds: Vec<&str> = self.adapters.iter().map(|a| a.input_kind()).collect();
        kinds.sort_unstable();
        kinds.dedup();
        kinds
    }

    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }
}

impl std::fmt::Debug for AdapterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let ids: Vec<&str> = self.adapters.iter().map(|a| a.id()).collect();
        f.debug_struct("AdapterRegistry").field("adapters", &ids).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::error::AdapterError;
    use crate::adapter::types::{AdapterInput, Processed};
    use async_trait::async_trait;

    struct Stub {
        id: &'static str,
        kind: &'static str,
    }

    #[async_trait]
    impl Adapter for Stub {
        fn id(&self) -> &str {
            self.id
        }
        fn input_kind(&self) -> &str {
            self.kind
        }
        async fn process(&self, _input: &AdapterInput) -> Result<Processed, AdapterError> {
            Ok(Processed::skipped("stub"))
        }
    }

    #[test]
    fn matching_fans_out_by_kind() {
        let registry = AdapterRegistry::new()
            .with(Arc::new(Stub { id: "a", kind: "text" }))
            .with(Arc::new(Stub { id: "b", kind: "text" }))
            .with(Arc::new(Stub { id: "c", kind: "edge_list" }));

        let ids: Vec<String> = registry.matching("text").iter().map(|a| a.id().to_string()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert!(registry.matching("image").is_empty());
        assert_eq!(registry.input_kinds(), vec!["edge_list", "text"]);
    }

    #[test]
    fn duplicate_ids_are_ignored() {
        let mut registry = AdapterRegistry::new();
        assert!(registry.register(Arc::new(Stub { id: "a", kind: "text" })));
        assert!(!registry.register(Arc::new(Stub { id: "a", kind: "other" })));
        assert_eq!(registry.len(), 1);
    }
}
