//! Transport-independent API layer.
//!
//! `PlaitApi` is the single entry point for consumer-facing operations.
//! Front ends (the CLI, embedding applications) call `PlaitApi` methods;
//! they never reach into `IngestPipeline` or `PlaitEngine` directly.
//!
//! Every read revalidates the target context against the store first, so
//! writes made by another engine sharing the database are visible.

use std::any::Any;
use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use crate::adapter::{
    AdapterError, BackgroundScheduler, CoOccurrenceEnrichment, EdgeListAdapter, EnrichmentRegistry,
    IngestOutcome, IngestPipeline,
};
use crate::config::EngineConfig;
use crate::graph::{
    Context, ContextId, EdgeId, GraphEvent, NodeId, PlaitEngine, PlaitResult, RetractionResult,
};
use crate::query::{
    self, CompositeQuery, CompositeResult, EvidenceTrailResult, FindQuery, QueryResult, StepQuery,
    StepResult,
};
use crate::storage::{EdgeRecord, OpenStore, SqliteStore};

/// Producer id of the built-in edge-list adapter
pub const EDGE_LIST_PRODUCER: &str = "edge-list";

/// Summary of one context
#[derive(Debug, Clone, Serialize)]
pub struct ContextInfo {
    pub id: ContextId,
    pub name: String,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub node_count: usize,
    pub edge_count: usize,
    /// Producers with at least one contribution, sorted
    pub producers: Vec<String>,
}

impl From<&Context> for ContextInfo {
    fn from(ctx: &Context) -> Self {
        Self {
            id: ctx.id.clone(),
            name: ctx.name.clone(),
            description: ctx.description.clone(),
            tags: ctx.metadata.tags.clone(),
            node_count: ctx.node_count(),
            edge_count: ctx.edge_count(),
            producers: ctx.producers(),
        }
    }
}

/// Single entry point for all consumer-facing operations.
#[derive(Clone)]
pub struct PlaitApi {
    engine: Arc<PlaitEngine>,
    pipeline: Arc<IngestPipeline>,
}

impl PlaitApi {
    /// Create a new API instance.
    pub fn new(engine: Arc<PlaitEngine>, pipeline: Arc<IngestPipeline>) -> Self {
        Self { engine, pipeline }
    }

    /// Build the standard stack from configuration.
    ///
    /// Opens the SQLite store when `db_path` is set and loads every stored
    /// context. Registers the edge-list adapter and the co-occurrence
    /// enrichment.
    pub fn from_config(config: &EngineConfig) -> PlaitResult<Self> {
        let engine = match config.db_path {
            Some(ref path) => {
                let store = SqliteStore::open(path)?;
                let engine = PlaitEngine::with_store(Arc::new(store));
                let loaded = engine.load_all()?;
                info!(path = %path.display(), contexts = loaded, "opened store");
                engine
            }
            None => PlaitEngine::new(),
        }
        .with_merge_policy(config.node_merge);
        let engine = Arc::new(engine);

        let enrichments = EnrichmentRegistry::new(vec![Arc::new(CoOccurrenceEnrichment::new())])
            .with_max_rounds(config.max_enrichment_rounds);
        let mut pipeline = IngestPipeline::new(engine.clone())
            .with_enrichments(Arc::new(enrichments))
            .with_auto_provenance(config.auto_provenance);
        pipeline.register_adapter(Arc::new(EdgeListAdapter::new(EDGE_LIST_PRODUCER)));

        Ok(Self::new(engine, Arc::new(pipeline)))
    }

    pub fn engine(&self) -> &Arc<PlaitEngine> {
        &self.engine
    }

    pub fn pipeline(&self) -> &Arc<IngestPipeline> {
        &self.pipeline
    }

    /// A scheduler whose background stages complete through this pipeline
    pub fn scheduler(&self) -> BackgroundScheduler {
        BackgroundScheduler::new(self.pipeline.clone())
    }

    // --- Write ---

    /// The single write endpoint.
    pub async fn ingest(
        &self,
        context: &str,
        input_kind: &str,
        data: Box<dyn Any + Send + Sync>,
    ) -> Result<IngestOutcome, AdapterError> {
        let ctx_id = self.resolve(context)?;
        self.pipeline.ingest(ctx_id.as_str(), input_kind, data).await
    }

    /// Remove every contribution `producer_id` made in a context.
    pub fn retract_contributions(&self, context: &str, producer_id: &str) -> PlaitResult<RetractionResult> {
        let ctx_id = self.resolve(context)?;
        self.engine.retract_contributions(&ctx_id, producer_id)
    }

    /// Remove `producer_id`'s contribution from one edge.
    pub fn retract_contribution(
        &self,
        context: &str,
        source: &str,
        relationship: &str,
        target: &str,
        producer_id: &str,
    ) -> PlaitResult<Vec<GraphEvent>> {
        let ctx_id = self.resolve(context)?;
        let edge_id = EdgeId::derive(&NodeId::from(source), relationship, &NodeId::from(target));
        self.engine.retract_contribution(&ctx_id, &edge_id, producer_id)
    }

    // --- Graph reads ---

    /// Run a typed multi-hop traversal.
    pub fn step(&self, context: &str, query: &StepQuery) -> PlaitResult<StepResult> {
        Ok(query.execute(&self.fresh_context(context)?))
    }

    /// Run several traversal branches against one snapshot.
    pub fn composite(&self, context: &str, query: &CompositeQuery) -> PlaitResult<CompositeResult> {
        Ok(query.execute(&self.fresh_context(context)?))
    }

    /// Query the evidence trail for a concept.
    pub fn evidence_trail(&self, context: &str, node_id: &str) -> PlaitResult<EvidenceTrailResult> {
        Ok(query::evidence_trail(node_id, &self.fresh_context(context)?))
    }

    /// Find nodes matching a query.
    pub fn find_nodes(&self, context: &str, query: &FindQuery) -> PlaitResult<QueryResult> {
        Ok(query.execute(&self.fresh_context(context)?))
    }

    /// Every edge of a context in its persisted shape.
    pub fn export_edges(&self, context: &str) -> PlaitResult<Vec<EdgeRecord>> {
        let ctx = self.fresh_context(context)?;
        Ok(ctx.edges().map(EdgeRecord::from).collect())
    }

    // --- Context management ---

    /// Create a context. Names are unique.
    pub fn context_create(&self, name: &str) -> PlaitResult<ContextId> {
        self.engine.create_context(name)
    }

    /// Get detailed info about a context by name or id.
    pub fn context_info(&self, context: &str) -> PlaitResult<ContextInfo> {
        Ok(ContextInfo::from(&self.fresh_context(context)?))
    }

    /// Delete a context from memory and the store.
    pub fn context_delete(&self, context: &str) -> PlaitResult<()> {
        let ctx_id = self.resolve(context)?;
        self.engine.remove_context(&ctx_id)?;
        Ok(())
    }

    /// List all contexts with metadata, sorted by name.
    pub fn context_list(&self) -> PlaitResult<Vec<ContextInfo>> {
        self.engine.reload_if_changed()?;
        let mut infos: Vec<ContextInfo> = self
            .engine
            .list_contexts()
            .iter()
            .filter_map(|id| self.engine.get_context(id))
            .map(|ctx| ContextInfo::from(&ctx))
            .collect();
        infos.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(infos)
    }

    // --- Internals ---

    fn resolve(&self, context: &str) -> PlaitResult<ContextId> {
        self.engine.resolve_fresh(context)
    }

    fn fresh_context(&self, context: &str) -> PlaitResult<Context> {
        let ctx_id = self.resolve(context)?;
        self.engine.snapshot(&ctx_id)
    }
}

impl std::fmt::Debug for PlaitApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaitApi")
            .field("engine", &self.engine)
            .field("pipeline", &self.pipeline)
            .finish()
    }
}
