//! CoOccurrenceEnrichment: co-occurrence detection
//!
//! Detects nodes that share source nodes via a configured relationship and
//! emits symmetric edge pairs with a configured output relationship. The
//! contribution on each pair is the raw number of shared sources; the
//! ledger normalizes it against this enrichment's other pairs.
//!
//! Default: `tagged_with` → `may_be_related`.
//!
//! Idempotent: a pair is only emitted when its recorded contribution differs
//! from the current count, so the enrichment loop reaches quiescence.

use crate::adapter::enrichment::Enrichment;
use crate::graph::{Context, EdgeUpsert, Emission, GraphEvent, NodeId};
use std::collections::{BTreeMap, BTreeSet};

/// Enrichment that links targets sharing a source node.
pub struct CoOccurrenceEnrichment {
    source_relationship: String,
    output_relationship: String,
    id: String,
}

impl CoOccurrenceEnrichment {
    pub fn new() -> Self {
        Self::with_relationships("tagged_with", "may_be_related")
    }

    pub fn with_relationships(source_relationship: &str, output_relationship: &str) -> Self {
        Self {
            id: format!("co_occurrence:{}:{}", source_relationship, output_relationship),
            source_relationship: source_relationship.to_string(),
            output_relationship: output_relationship.to_string(),
        }
    }
}

impl Default for CoOccurrenceEnrichment {
    fn default() -> Self {
        Self::new()
    }
}

impl Enrichment for CoOccurrenceEnrichment {
    fn id(&self) -> &str {
        &self.id
    }

    fn enrich(&self, events: &[GraphEvent], context: &Context) -> Option<Emission> {
        if !has_structural_events(events) {
            return None;
        }

        let mut emission = Emission::new();
        for ((a, b), count) in cooccurrence_pairs(context, &self.source_relationship) {
            let value = count as f64;
            for (source, target) in [(&a, &b), (&b, &a)] {
                let current = context
                    .find_edge(source, &self.output_relationship, target)
                    .and_then(|e| e.contribution(&self.id));
                if current.map(f64::to_bits) != Some(value.to_bits()) {
                    emission = emission.with_edge(EdgeUpsert::new(
                        source.clone(),
                        target.clone(),
                        self.output_relationship.as_str(),
                        value,
                    ));
                }
            }
        }

        if emission.is_empty() {
            None
        } else {
            Some(emission)
        }
    }
}

/// Check if events include structural changes that could affect co-occurrence.
fn has_structural_events(events: &[GraphEvent]) -> bool {
    events.iter().any(|e| {
        matches!(
            e,
            GraphEvent::NodesAdded { .. }
                | GraphEvent::EdgesAdded { .. }
                | GraphEvent::EdgesRemoved { .. }
                | GraphEvent::NodesRemoved { .. }
        )
    })
}

/// Build a reverse index (source → targets) and count shared sources for
/// each target pair. Pairs are canonical (smaller id first).
fn cooccurrence_pairs(context: &Context, source_relationship: &str) -> BTreeMap<(NodeId, NodeId), usize> {
    let mut source_to_targets: BTreeMap<&NodeId, BTreeSet<&NodeId>> = BTreeMap::new();
    for edge in context.edges() {
        if edge.relationship == source_relationship {
            source_to_targets.entry(&edge.source).or_default().insert(&edge.target);
        }
    }

    let mut pair_counts: BTreeMap<(NodeId, NodeId), usize> = BTreeMap::new();
    for targets in source_to_targets.values() {
        let targets: Vec<&NodeId> = targets.iter().copied().collect();
        for i in 0..targets.len() {
            for j in (i + 1)..targets.len() {
                // BTreeSet iteration is ordered, so targets[i] < targets[j]
                *pair_counts
                    .entry((targets[i].clone(), targets[j].clone()))
                    .or_insert(0) += 1;
            }
        }
    }
    pair_counts
}
