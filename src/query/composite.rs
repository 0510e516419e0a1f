//! Composite queries: several independent StepQuery branches, one result
//!
//! A composite is read-side composition only. Each branch runs its own
//! chain from its own origin; results stay grouped by branch name.

use super::step::{StepQuery, StepResult};
use super::types::Direction;
use crate::graph::{Context, Edge, Node, NodeId};
use serde::Serialize;

/// Named StepQuery branches executed against one snapshot
#[derive(Debug, Clone, Default)]
pub struct CompositeQuery {
    branches: Vec<(String, StepQuery)>,
}

/// Per-branch results, in the order branches were added
#[derive(Debug, Clone, Serialize)]
pub struct CompositeResult {
    pub branches: Vec<(String, StepResult)>,
}

impl CompositeQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn branch(mut self, name: impl Into<String>, query: StepQuery) -> Self {
        self.branches.push((name.into(), query));
        self
    }

    pub fn execute(&self, context: &Context) -> CompositeResult {
        CompositeResult {
            branches: self
                .branches
                .iter()
                .map(|(name, query)| (name.clone(), query.execute(context)))
                .collect(),
        }
    }
}

impl CompositeResult {
    pub fn get(&self, name: &str) -> Option<&StepResult> {
        self.branches.iter().find(|(n, _)| n == name).map(|(_, r)| r)
    }

    /// Nodes a branch reached at one step; empty for unknown branches
    pub fn nodes(&self, name: &str, step: usize) -> Vec<Node> {
        self.get(name).map(|r| r.at_step(step).to_vec()).unwrap_or_default()
    }

    /// Every edge traversed by every branch
    pub fn edges(&self) -> Vec<Edge> {
        self.branches
            .iter()
            .flat_map(|(_, r)| r.all_edges().into_iter().cloned())
            .collect()
    }
}

// --- Evidence trail: composite query over two StepQuery branches ---

/// Result of an evidence trail query for a concept.
#[derive(Debug, Clone, Serialize)]
pub struct EvidenceTrailResult {
    /// The concept node ID queried.
    pub concept: NodeId,
    /// Marks that reference the concept (via `references` edges).
    pub marks: Vec<Node>,
    /// Fragments tagged with the concept (via `tagged_with` edges).
    pub fragments: Vec<Node>,
    /// Chains containing the discovered marks (via `contains` edges).
    pub chains: Vec<Node>,
    /// All edges traversed across both branches.
    pub edges: Vec<Edge>,
}

/// Query the evidence trail for a concept: marks, fragments, and chains.
///
/// Composes two StepQuery branches:
/// - concept ← references ← contains (marks, then chains)
/// - concept ← tagged_with (fragments)
pub fn evidence_trail(concept_id: impl Into<NodeId>, context: &Context) -> EvidenceTrailResult {
    let concept = concept_id.into();

    let result = CompositeQuery::new()
        .branch(
            "marks",
            StepQuery::from(concept.clone())
                .step(Direction::Incoming, "references")
                .step(Direction::Incoming, "contains"),
        )
        .branch(
            "fragments",
            StepQuery::from(concept.clone()).step(Direction::Incoming, "tagged_with"),
        )
        .execute(context);

    EvidenceTrailResult {
        marks: result.nodes("marks", 0),
        chains: result.nodes("marks", 1),
        fragments: result.nodes("fragments", 0),
        edges: result.edges(),
        concept,
    }
}
