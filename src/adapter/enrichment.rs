//! Enrichment trait and registry
//!
//! Enrichments are reactive producers: they read the graph and the previous
//! round's events and propose derived evidence. They bridge within the
//! graph, unlike adapters, which bridge from a consumer's domain into it.

use crate::graph::{Context, Emission, GraphEvent};
use std::sync::Arc;

/// A reactive component that responds to graph events with additional changes.
///
/// Enrichments run in the enrichment loop after each ingest. They receive
/// the previous round's events and an immutable snapshot, returning
/// `Some(Emission)` if they have work to do, or `None` if quiescent.
///
/// Enrichments must be idempotent against unchanged snapshot state: given
/// the same input twice, return `None` the second time. The loop's round
/// cap is only a safety valve.
pub trait Enrichment: Send + Sync {
    /// Stable identifier, used as producer id and for deduplication.
    fn id(&self) -> &str;

    /// React to graph events and optionally produce additional changes.
    ///
    /// - `events`: events from the previous round only
    /// - `context`: snapshot taken at the start of the round
    fn enrich(&self, events: &[GraphEvent], context: &Context) -> Option<Emission>;
}

/// Default maximum enrichment loop rounds (safety valve).
pub const DEFAULT_MAX_ROUNDS: usize = 10;

/// Registry of enrichments for the enrichment loop.
///
/// Enrichments are deduplicated by `id()`: if two integrations register the
/// same enrichment, it runs once per round. Registration order is the
/// order in which their emissions are committed within a round.
pub struct EnrichmentRegistry {
    enrichments: Vec<Arc<dyn Enrichment>>,
    max_rounds: usize,
}

impl EnrichmentRegistry {
    /// Create a registry with the given enrichments, deduplicated by id.
    pub fn new(enrichments: Vec<Arc<dyn Enrichment>>) -> Self {
        let mut registry = Self::empty();
        for enrichment in enrichments {
            registry.register(enrichment);
        }
        registry
    }

    /// Create an empty registry (no enrichments).
    pub fn empty() -> Self {
        Self {
            enrichments: Vec::new(),
            max_rounds: DEFAULT_MAX_ROUNDS,
        }
    }

    /// Register an enrichment. Returns false if its id is already present.
    pub fn register(&mut self, enrichment: Arc<dyn Enrichment>) -> bool {
        if self.enrichments.iter().any(|e| e.id() == enrichment.id()) {
            return false;
        }
        self.enrichments.push(enrichment);
        true
    }

    /// Set the maximum number of enrichment loop rounds (at least one).
    pub fn with_max_rounds(mut self, max: usize) -> Self {
        self.max_rounds = max.max(1);
        self
    }

    /// Access the registered enrichments, in registration order.
    pub fn enrichments(&self) -> &[Arc<dyn Enrichment>] {
        &self.enrichments
    }

    /// Registered enrichment ids, in registration order.
    pub fn ids(&self) -> Vec<&str> {
        self.enrichments.iter().map(|e| e.id()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.enrichments.is_empty()
    }

    /// Maximum rounds before the safety valve stops the loop.
    pub fn max_rounds(&self) -> usize {
        self.max_rounds
    }
}

impl Default for EnrichmentRegistry {
    fn default() -> Self {
        Self::empty()
    }
}

impl std::fmt::Debug for EnrichmentRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnrichmentRegistry")
            .field("enrichments", &self.ids())
            .field("max_rounds", &self.max_rounds)
            .finish()
    }
}
