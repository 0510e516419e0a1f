//! PlaitEngine: in-memory context cache backed by an optional store

use super::context::{Context, ContextId};
use super::edge::EdgeId;
use super::emission::{EdgeUpsert, Emission};
use super::events::GraphEvent;
use super::node::NodeMergePolicy;
use crate::storage::{GraphStore, StorageError};
use dashmap::DashMap;
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

/// Errors that can occur in engine operations
#[derive(Debug, Error)]
pub enum PlaitError {
    #[error("Context not found: {0}")]
    ContextNotFound(String),

    #[error("A context named '{0}' already exists")]
    DuplicateContextName(String),

    #[error("Emission from '{producer_id}' rejected: {reason}")]
    InvalidEmission { producer_id: String, reason: String },

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("{0}")]
    Other(String),
}

/// Result type for engine operations
pub type PlaitResult<T> = Result<T, PlaitError>;

/// Outcome of retracting a producer from a context
#[derive(Debug, Clone, Default)]
pub struct RetractionResult {
    /// Edges that carried the producer's contribution
    pub edges_affected: usize,
    /// Events raised by the retraction
    pub events: Vec<GraphEvent>,
}

/// The main engine
///
/// Owns every cached context. When a store is configured, each mutation is
/// persisted as one save, and cached contexts are revalidated against the
/// store's per-context version counter before they are trusted.
pub struct PlaitEngine {
    /// All contexts managed by this engine (in-memory cache)
    contexts: DashMap<ContextId, Context>,
    /// Optional persistent storage backend
    store: Option<Arc<dyn GraphStore>>,
    /// Last store version observed per context
    versions: DashMap<ContextId, u64>,
    /// How node upserts merge into existing nodes
    merge_policy: NodeMergePolicy,
}

impl std::fmt::Debug for PlaitEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaitEngine")
            .field("contexts", &self.contexts.len())
            .field("has_store", &self.store.is_some())
            .field("merge_policy", &self.merge_policy)
            .finish()
    }
}

impl Default for PlaitEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl PlaitEngine {
    /// Create a new in-memory engine (no persistence)
    pub fn new() -> Self {
        Self {
            contexts: DashMap::new(),
            store: None,
            versions: DashMap::new(),
            merge_policy: NodeMergePolicy::default(),
        }
    }

    /// Create an engine with persistent storage
    pub fn with_store(store: Arc<dyn GraphStore>) -> Self {
        Self {
            store: Some(store),
            ..Self::new()
        }
    }

    /// Set the node merge policy (builder pattern)
    pub fn with_merge_policy(mut self, policy: NodeMergePolicy) -> Self {
        self.merge_policy = policy;
        self
    }

    /// The configured node merge policy
    pub fn merge_policy(&self) -> NodeMergePolicy {
        self.merge_policy
    }

    /// Check if engine has persistent storage configured
    pub fn has_store(&self) -> bool {
        self.store.is_some()
    }

    /// Load all contexts from storage into memory
    ///
    /// Returns the number of contexts loaded.
    pub fn load_all(&self) -> PlaitResult<usize> {
        let Some(ref store) = self.store else {
            return Ok(0);
        };

        let mut loaded = 0;
        for id in store.list_contexts()? {
            if self.reload(store.as_ref(), &id)? {
                loaded += 1;
            }
        }
        Ok(loaded)
    }

    // === Cache coherence ===

    /// Make sure the cached copy of `id` matches the store.
    ///
    /// Reads the store's version counter for the context; reloads only when
    /// it differs from the last version this engine observed. A context that
    /// vanished from the store is evicted. Returns `true` if a reload happened.
    pub fn ensure_fresh(&self, id: &ContextId) -> PlaitResult<bool> {
        let Some(ref store) = self.store else {
            return Ok(false);
        };

        let current = store.context_version(id)?;
        let last = self.versions.get(id).map(|v| *v);
        debug!(context_id = %id, ?current, ?last, "polled context version");

        match current {
            None => {
                if self.contexts.remove(id).is_some() {
                    info!(context_id = %id, "context deleted from store, evicting");
                }
                self.versions.remove(id);
                Ok(false)
            }
            Some(v) if Some(v) == last && self.contexts.contains_key(id) => Ok(false),
            Some(_) => {
                let reloaded = self.reload(store.as_ref(), id)?;
                if reloaded && last.is_some() {
                    info!(context_id = %id, "context changed in store, reloaded");
                }
                Ok(reloaded)
            }
        }
    }

    /// Poll every context in the store; reload changed ones and evict
    /// contexts that no longer exist.
    ///
    /// Returns the number of contexts reloaded.
    pub fn reload_if_changed(&self) -> PlaitResult<usize> {
        let Some(ref store) = self.store else {
            return Ok(0);
        };

        let stored: HashSet<ContextId> = store.list_contexts()?.into_iter().collect();
        let mut reloaded = 0;
        for id in &stored {
            if self.ensure_fresh(id)? {
                reloaded += 1;
            }
        }

        self.contexts.retain(|id, _| stored.contains(id));
        self.versions.retain(|id, _| stored.contains(id));
        Ok(reloaded)
    }

    fn reload(&self, store: &dyn GraphStore, id: &ContextId) -> PlaitResult<bool> {
        // Read the version first: if a writer lands in between, the next
        // poll sees a newer version and reloads again.
        let version = store.context_version(id)?;
        let Some(context) = store.load_context(id)? else {
            return Ok(false);
        };
        self.contexts.insert(id.clone(), context);
        if let Some(v) = version {
            self.versions.insert(id.clone(), v);
        }
        Ok(true)
    }

    /// Record the version returned by our own save.
    ///
    /// Only a version exactly one past the last observed one proves nobody
    /// else wrote in between; anything else forces a reload on next poll.
    fn record_saved_version(&self, id: &ContextId, saved: u64) {
        let last = self.versions.get(id).map(|v| *v);
        let contiguous = match last {
            Some(l) => saved == l + 1,
            None => saved == 1,
        };
        if contiguous {
            self.versions.insert(id.clone(), saved);
        } else {
            debug!(context_id = %id, saved, ?last, "interleaved writer detected, reload on next poll");
            self.versions.remove(id);
        }
    }

    // === Context management ===

    /// Create an empty context. Names are unique.
    pub fn create_context(&self, name: &str) -> PlaitResult<ContextId> {
        self.upsert_context(Context::new(name))
    }

    /// Insert or replace a context, persisting it if storage is configured
    pub fn upsert_context(&self, context: Context) -> PlaitResult<ContextId> {
        self.reload_if_changed()?;
        let clash = self
            .contexts
            .iter()
            .any(|c| c.name == context.name && c.id != context.id);
        if clash {
            return Err(PlaitError::DuplicateContextName(context.name));
        }

        let id = context.id.clone();
        if let Some(ref store) = self.store {
            let version = store.save_context(&context)?;
            self.record_saved_version(&id, version);
        }
        self.contexts.insert(id.clone(), context);
        Ok(id)
    }

    /// Get a snapshot of a context by ID
    pub fn get_context(&self, id: &ContextId) -> Option<Context> {
        self.contexts.get(id).map(|r| r.clone())
    }

    /// Get a fresh snapshot of a context, polling the store first
    pub fn snapshot(&self, id: &ContextId) -> PlaitResult<Context> {
        self.ensure_fresh(id)?;
        self.get_context(id)
            .ok_or_else(|| PlaitError::ContextNotFound(id.to_string()))
    }

    /// Remove a context from memory and storage
    pub fn remove_context(&self, id: &ContextId) -> PlaitResult<Option<Context>> {
        if let Some(ref store) = self.store {
            store.delete_context(id)?;
        }
        self.versions.remove(id);
        Ok(self.contexts.remove(id).map(|(_, ctx)| ctx))
    }

    /// List all context IDs, sorted
    pub fn list_contexts(&self) -> Vec<ContextId> {
        let mut ids: Vec<ContextId> = self.contexts.iter().map(|r| r.key().clone()).collect();
        ids.sort();
        ids
    }

    /// Get the number of contexts
    pub fn context_count(&self) -> usize {
        self.contexts.len()
    }

    /// Check if a context exists
    pub fn has_context(&self, id: &ContextId) -> bool {
        self.contexts.contains_key(id)
    }

    /// Find a context by id, falling back to name
    pub fn resolve(&self, name_or_id: &str) -> PlaitResult<ContextId> {
        let id = ContextId::from(name_or_id);
        if self.has_context(&id) {
            return Ok(id);
        }
        self.contexts
            .iter()
            .find(|c| c.name == name_or_id)
            .map(|c| c.id.clone())
            .ok_or_else(|| PlaitError::ContextNotFound(name_or_id.to_string()))
    }

    /// Resolve a name or id against the store as well as the cache.
    ///
    /// A context another engine created is not cached yet, so a miss polls
    /// the store once and retries. The returned context is fresh.
    pub fn resolve_fresh(&self, name_or_id: &str) -> PlaitResult<ContextId> {
        self.ensure_fresh(&ContextId::from(name_or_id))?;
        let id = match self.resolve(name_or_id) {
            Err(PlaitError::ContextNotFound(_)) if self.has_store() => {
                self.reload_if_changed()?;
                self.resolve(name_or_id)?
            }
            other => other?,
        };
        self.ensure_fresh(&id)?;
        Ok(id)
    }

    // === Mutation ===

    /// Run a mutation against one context as a single unit.
    ///
    /// The cached context is revalidated first. If the closure fails, or the
    /// store rejects the save, the context is restored to its prior state.
    /// Nothing is persisted when the closure left the context unchanged.
    pub fn transact<R>(
        &self,
        id: &ContextId,
        f: impl FnOnce(&mut Context) -> PlaitResult<R>,
    ) -> PlaitResult<R> {
        self.ensure_fresh(id)?;

        let mut context = self
            .contexts
            .get_mut(id)
            .ok_or_else(|| PlaitError::ContextNotFound(id.to_string()))?;

        let before = context.clone();
        let result = match f(&mut context) {
            Ok(r) => r,
            Err(e) => {
                *context = before;
                return Err(e);
            }
        };

        if context.revision() == before.revision() {
            return Ok(result);
        }

        if let Some(ref store) = self.store {
            match store.save_context(&context) {
                Ok(version) => self.record_saved_version(id, version),
                Err(e) => {
                    *context = before;
                    return Err(e.into());
                }
            }
        }
        Ok(result)
    }

    /// Commit one producer's emission atomically
    pub fn commit(
        &self,
        id: &ContextId,
        producer_id: &str,
        emission: Emission,
    ) -> PlaitResult<Vec<GraphEvent>> {
        let policy = self.merge_policy;
        let events = self.transact(id, |ctx| ctx.commit(producer_id, emission, policy))?;
        debug!(context_id = %id, producer_id, events = events.len(), "committed emission");
        Ok(events)
    }

    /// Set one producer's contribution on one edge
    pub fn upsert_edge_contribution(
        &self,
        id: &ContextId,
        producer_id: &str,
        upsert: EdgeUpsert,
    ) -> PlaitResult<Vec<GraphEvent>> {
        let policy = self.merge_policy;
        self.transact(id, |ctx| ctx.upsert_edge_contribution(producer_id, upsert, policy))
    }

    /// Remove a producer's contributions from every edge in a context
    pub fn retract_contributions(
        &self,
        id: &ContextId,
        producer_id: &str,
    ) -> PlaitResult<RetractionResult> {
        let result = self.transact(id, |ctx| {
            let (edges_affected, events) = ctx.retract_contributions(producer_id);
            Ok(RetractionResult { edges_affected, events })
        })?;
        debug!(context_id = %id, producer_id, edges_affected = result.edges_affected, "retracted contributions");
        Ok(result)
    }

    /// Remove one producer's contribution from one edge
    pub fn retract_contribution(
        &self,
        id: &ContextId,
        edge_id: &EdgeId,
        producer_id: &str,
    ) -> PlaitResult<Vec<GraphEvent>> {
        self.transact(id, |ctx| Ok(ctx.retract_contribution(edge_id, producer_id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Contributions, EdgeUpsert, Node, NodeId};
    use crate::storage::testing::FailingStore;
    use crate::storage::{OpenStore, SqliteStore};

    fn seeded_engine() -> (PlaitEngine, ContextId) {
        let engine = PlaitEngine::new();
        let id = engine.create_context("test").unwrap();
        engine
            .commit(
                &id,
                "setup",
                Emission::new().with_node(Node::new("A", "concept")).with_node(Node::new("B", "concept")),
            )
            .unwrap();
        (engine, id)
    }

    #[test]
    fn create_context_rejects_duplicate_names() {
        let engine = PlaitEngine::new();
        engine.create_context("research").unwrap();
        let err = engine.create_context("research").unwrap_err();
        assert!(matches!(err, PlaitError::DuplicateContextName(_)));
        assert_eq!(engine.context_count(), 1);
    }

    #[test]
    fn resolve_accepts_name_or_id() {
        let engine = PlaitEngine::new();
        let id = engine.create_context("research").unwrap();
        assert_eq!(engine.resolve("research").unwrap(), id);
        assert_eq!(engine.resolve(id.as_str()).unwrap(), id);
        assert!(matches!(engine.resolve("nope"), Err(PlaitError::ContextNotFound(_))));
    }

    #[test]
    fn commit_to_missing_context_fails() {
        let engine = PlaitEngine::new();
        let err = engine
            .commit(&ContextId::from("missing"), "X", Emission::new())
            .unwrap_err();
        assert!(matches!(err, PlaitError::ContextNotFound(_)));
    }

    #[test]
    fn rejected_emission_leaves_cache_untouched() {
        let (engine, id) = seeded_engine();
        let result = engine.commit(
            &id,
            "X",
            Emission::new()
                .with_edge(EdgeUpsert::new("A", "B", "r", 1.0))
                .with_edge(EdgeUpsert::new("A", "B", "", 1.0)),
        );
        assert!(matches!(result, Err(PlaitError::InvalidEmission { .. })));
        assert_eq!(engine.get_context(&id).unwrap().edge_count(), 0);
    }

    #[test]
    fn retraction_reports_affected_edges() {
        let (engine, id) = seeded_engine();
        engine
            .upsert_edge_contribution(&id, "X", EdgeUpsert::new("A", "B", "r", 5.0))
            .unwrap();

        let result = engine.retract_contributions(&id, "X").unwrap();
        assert_eq!(result.edges_affected, 1);
        assert_eq!(engine.get_context(&id).unwrap().edge_count(), 0);

        let again = engine.retract_contributions(&id, "X").unwrap();
        assert_eq!(again.edges_affected, 0);
    }

    #[test]
    fn persisted_engine_tracks_its_own_versions() {
        let store = Arc::new(SqliteStore::open_in_memory().unwrap());
        let engine = PlaitEngine::with_store(store.clone());
        let id = engine.create_context("test").unwrap();
        engine
            .commit(&id, "X", Emission::new().with_node(Node::new("A", "concept")))
            .unwrap();

        assert_eq!(store.context_version(&id).unwrap(), Some(2));
        assert!(!engine.ensure_fresh(&id).unwrap(), "own writes never force a reload");
    }

    #[test]
    fn noop_commit_does_not_bump_store_version() {
        let store = Arc::new(SqliteStore::open_in_memory().unwrap());
        let engine = PlaitEngine::with_store(store.clone());
        let id = engine.create_context("test").unwrap();
        let emission = Emission::new().with_node(Node::new("A", "concept"));
        engine.commit(&id, "X", emission.clone()).unwrap();
        let version = store.context_version(&id).unwrap();

        let events = engine.commit(&id, "X", emission).unwrap();
        assert!(events.is_empty());
        assert_eq!(store.context_version(&id).unwrap(), version);
    }

    #[test]
    fn failed_save_leaves_cache_and_store_untouched() {
        let store = Arc::new(FailingStore::new());
        let engine = PlaitEngine::with_store(store.clone());
        let id = engine.create_context("test").unwrap();
        engine
            .commit(
                &id,
                "X",
                Emission::new()
                    .with_node(Node::new("A", "concept"))
                    .with_node(Node::new("B", "concept"))
                    .with_edge(EdgeUpsert::new("A", "B", "r", 2.0)),
            )
            .unwrap();
        let before = engine.get_context(&id).unwrap();
        let version = store.context_version(&id).unwrap();

        store.fail_saves(true);
        let result = engine.commit(
            &id,
            "X",
            Emission::new()
                .with_node(Node::new("C", "concept"))
                .with_edge(EdgeUpsert::new("A", "C", "r", 8.0)),
        );
        assert!(matches!(result, Err(PlaitError::Storage(_))));

        let after = engine.get_context(&id).unwrap();
        assert_eq!(after.revision(), before.revision());
        assert_eq!(after.node_count(), 2);
        let snapshot = |ctx: &Context| -> Vec<(EdgeId, Contributions, f64)> {
            ctx.edges()
                .map(|e| (e.id.clone(), e.contributions.clone(), e.raw_weight))
                .collect()
        };
        assert_eq!(snapshot(&after), snapshot(&before));
        assert!(after.get_node(&NodeId::from("C")).is_none());
        assert_eq!(store.context_version(&id).unwrap(), version);

        // The same emission lands once the store recovers
        store.fail_saves(false);
        engine
            .commit(&id, "X", Emission::new().with_node(Node::new("C", "concept")))
            .unwrap();
        assert_eq!(engine.get_context(&id).unwrap().node_count(), 3);
    }

    #[test]
    fn extreme_contributions_persist() {
        let store = Arc::new(SqliteStore::open_in_memory().unwrap());
        let engine = PlaitEngine::with_store(store.clone());
        let id = engine.create_context("test").unwrap();
        let emission = Emission::new()
            .with_node(Node::new("A", "concept"))
            .with_node(Node::new("B", "concept"))
            .with_node(Node::new("C", "concept"))
            .with_edge(EdgeUpsert::new("A", "B", "r", -1.0e308))
            .with_edge(EdgeUpsert::new("A", "C", "r", 1.0e308));
        engine.commit(&id, "X", emission).unwrap();

        // An unrelated producer's commit leaves X's settled weights alone
        let events = engine
            .commit(
                &id,
                "Y",
                Emission::new().with_edge(EdgeUpsert::new("B", "C", "r", 1.0)),
            )
            .unwrap();
        assert!(!events
            .iter()
            .any(|e| matches!(e, GraphEvent::WeightsChanged { .. })));

        let reloaded = store.load_context(&id).unwrap().unwrap();
        let ac = reloaded
            .find_edge(&NodeId::from("A"), "r", &NodeId::from("C"))
            .unwrap();
        assert_eq!(ac.raw_weight, 1.0);
    }
}
