//! Unified ingest pipeline
//!
//! Single write endpoint: `ingest(context_id, input_kind, data)`.
//!
//! Pipeline steps:
//! 1. Route to matching adapter(s) by input_kind
//! 2. Each adapter processes the input and its emission is committed
//! 3. Enrichment loop runs once (globally) until quiescence
//! 4. Each adapter transforms all accumulated events → outbound events
//! 5. Return merged outbound events

use super::commit::commit_emission;
use super::enrichment::EnrichmentRegistry;
use super::enrichment_loop::run_enrichment_loop;
use super::error::AdapterError;
use super::provenance::{ingest_record_emission, nodes_added_by, AUTO_PROVENANCE_ID};
use super::registry::AdapterRegistry;
use super::traits::Adapter;
use super::types::{AdapterInput, OutboundEvent, Processed};
use crate::graph::{ContextId, GraphEvent, PlaitEngine};
use chrono::Utc;
use std::any::Any;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// What one `ingest` call did
#[derive(Debug, Default)]
pub struct IngestOutcome {
    /// Merged outbound events from every adapter that ran
    pub outbound: Vec<OutboundEvent>,
    /// Raw graph events: primary commits, provenance, then enrichment rounds
    pub events: Vec<GraphEvent>,
    /// Adapters that signalled `Skipped`, with their reasons
    pub skipped: Vec<(String, String)>,
    /// Adapters whose emission was rejected or failed to commit
    pub failures: Vec<(String, AdapterError)>,
    /// Enrichment rounds that committed something
    pub rounds: usize,
    /// False when the enrichment round cap was hit
    pub quiesced: bool,
}

/// The unified ingest pipeline.
///
/// All producer-driven graph writes go through this pipeline. Consumers call
/// `ingest()` with domain data; the pipeline routes to adapters, commits
/// their emissions, runs enrichments, and returns domain-meaningful
/// outbound events.
pub struct IngestPipeline {
    engine: Arc<PlaitEngine>,
    adapters: AdapterRegistry,
    enrichments: Arc<EnrichmentRegistry>,
    auto_provenance: bool,
}

impl IngestPipeline {
    /// Create a pipeline with no adapters or enrichments.
    pub fn new(engine: Arc<PlaitEngine>) -> Self {
        Self {
            engine,
            adapters: AdapterRegistry::new(),
            enrichments: Arc::new(EnrichmentRegistry::empty()),
            auto_provenance: false,
        }
    }

    /// Register an adapter.
    pub fn register_adapter(&mut self, adapter: Arc<dyn Adapter>) {
        self.adapters.register(adapter);
    }

    /// Replace the adapter registry.
    pub fn with_adapters(mut self, adapters: AdapterRegistry) -> Self {
        self.adapters = adapters;
        self
    }

    /// Set the enrichment registry.
    pub fn with_enrichments(mut self, registry: Arc<EnrichmentRegistry>) -> Self {
        self.enrichments = registry;
        self
    }

    /// Record an `ingest_record` node for every adapter commit.
    pub fn with_auto_provenance(mut self, enabled: bool) -> Self {
        self.auto_provenance = enabled;
        self
    }

    pub fn engine(&self) -> &Arc<PlaitEngine> {
        &self.engine
    }

    pub fn adapters(&self) -> &AdapterRegistry {
        &self.adapters
    }

    pub fn enrichments(&self) -> &EnrichmentRegistry {
        &self.enrichments
    }

    /// The single write endpoint.
    ///
    /// Fails with `ContextNotFound` or `NoMatchingAdapter` before anything is
    /// committed. A failing adapter never blocks its siblings; its error is
    /// reported in `IngestOutcome::failures`. The call only fails as a whole
    /// when every matching adapter failed.
    pub async fn ingest(
        &self,
        context_id: &str,
        input_kind: &str,
        data: Box<dyn Any + Send + Sync>,
    ) -> Result<IngestOutcome, AdapterError> {
        let ctx_id = self.engine.resolve_fresh(context_id)?;

        let matching = self.adapters.matching(input_kind);
        if matching.is_empty() {
            return Err(AdapterError::NoMatchingAdapter(input_kind.to_string()));
        }

        let input = AdapterInput::from_boxed(input_kind, data, ctx_id.as_str());
        let mut outcome = IngestOutcome {
            quiesced: true,
            ..IngestOutcome::default()
        };
        let mut succeeded: Vec<&Arc<dyn Adapter>> = Vec::new();

        for adapter in &matching {
            let producer_id = adapter.id();
            let emission = match adapter.process(&input).await {
                Ok(Processed::Emitted(emission)) => emission,
                Ok(Processed::Skipped { reason }) => {
                    info!(context_id = %ctx_id, producer_id, %reason, "adapter skipped");
                    outcome.skipped.push((producer_id.to_string(), reason));
                    continue;
                }
                Err(e) => {
                    warn!(context_id = %ctx_id, producer_id, error = %e, "adapter failed");
                    outcome.failures.push((producer_id.to_string(), e));
                    continue;
                }
            };

            match commit_emission(&self.engine, &ctx_id, producer_id, emission) {
                Ok(events) => {
                    if self.auto_provenance {
                        let provenance = self.record_provenance(&ctx_id, producer_id, &events)?;
                        outcome.events.extend(events);
                        outcome.events.extend(provenance);
                    } else {
                        outcome.events.extend(events);
                    }
                    succeeded.push(adapter);
                }
                Err(e) if e.is_producer_local() => {
                    outcome.failures.push((producer_id.to_string(), e));
                }
                Err(e) => return Err(e),
            }
        }

        if succeeded.is_empty() && outcome.skipped.is_empty() {
            if let Some((_, err)) = outcome.failures.into_iter().next() {
                return Err(err);
            }
            return Err(AdapterError::Internal("no adapter produced a result".to_string()));
        }

        if !self.enrichments.is_empty() && !outcome.events.is_empty() {
            let looped = run_enrichment_loop(&self.engine, &ctx_id, &self.enrichments, &outcome.events)?;
            outcome.rounds = looped.rounds;
            outcome.quiesced = looped.quiesced;
            outcome.events.extend(looped.events);
        }

        let snapshot = self.engine.snapshot(&ctx_id)?;
        for adapter in &succeeded {
            outcome
                .outbound
                .extend(adapter.transform_events(&outcome.events, &snapshot));
        }

        debug!(
            context_id = %ctx_id,
            input_kind,
            adapters = succeeded.len(),
            events = outcome.events.len(),
            rounds = outcome.rounds,
            "ingest complete"
        );
        Ok(outcome)
    }

    /// Commit the auto-provenance record for one adapter's events.
    fn record_provenance(
        &self,
        ctx_id: &ContextId,
        adapter_id: &str,
        events: &[GraphEvent],
    ) -> Result<Vec<GraphEvent>, AdapterError> {
        let produced = nodes_added_by(events, adapter_id);
        if produced.is_empty() {
            return Ok(Vec::new());
        }
        let snapshot = self.engine.snapshot(ctx_id)?;
        match ingest_record_emission(adapter_id, &snapshot, &produced, Utc::now()) {
            Some(emission) => match commit_emission(&self.engine, ctx_id, AUTO_PROVENANCE_ID, emission) {
                Ok(events) => Ok(events),
                Err(e) if e.is_producer_local() => Ok(Vec::new()),
                Err(e) => Err(e),
            },
            None => Ok(Vec::new()),
        }
    }
}

impl std::fmt::Debug for IngestPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IngestPipeline")
            .field("adapters", &self.adapters)
            .field("enrichments", &self.enrichments)
            .field("auto_provenance", &self.auto_provenance)
            .finish()
    }
}
