//! Typed multi-hop traversal query.
//!
//! `StepQuery` is a sequential chain where each step specifies its own
//! relationship filter and direction. Each step operates on the previous
//! step's frontier, the nodes discovered by the prior step.

use std::collections::{HashMap, HashSet};

use crate::graph::{Context, Edge, Node, NodeId};
use serde::Serialize;

use super::types::{Direction, StepLevel};

/// A single traversal step: direction + relationship filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub direction: Direction,
    pub relationship: String,
}

/// Builder for typed multi-hop traversals.
#[derive(Debug, Clone)]
pub struct StepQuery {
    origin: NodeId,
    steps: Vec<Step>,
    min_weight: Option<f64>,
}

/// Result of a StepQuery execution.
#[derive(Debug, Clone, Serialize)]
pub struct StepResult {
    /// Origin node ID.
    pub origin: NodeId,
    /// What each step reached. `steps[0]` is the first step, etc.
    pub steps: Vec<StepLevel>,
}

impl StepQuery {
    /// Start a new query from the given origin node.
    pub fn from(origin_id: impl Into<NodeId>) -> Self {
        Self {
            origin: origin_id.into(),
            steps: Vec::new(),
            min_weight: None,
        }
    }

    /// Add a traversal step: follow edges with the given direction and relationship.
    pub fn step(mut self, direction: Direction, relationship: impl Into<String>) -> Self {
        self.steps.push(Step {
            direction,
            relationship: relationship.into(),
        });
        self
    }

    /// Skip edges whose raw weight is below `threshold`, at every step
    pub fn min_weight(mut self, threshold: f64) -> Self {
        self.min_weight = Some(threshold);
        self
    }

    pub fn origin(&self) -> &NodeId {
        &self.origin
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Execute the query against a context.
    ///
    /// A step that matches nothing leaves an empty frontier, so every later
    /// step is empty too. Unknown origins behave the same way.
    pub fn execute(&self, context: &Context) -> StepResult {
        let index = RelationshipIndex::build(context, self.min_weight);
        let mut frontier: Vec<&NodeId> = match context.get_node(&self.origin) {
            Some(node) => vec![&node.id],
            None => Vec::new(),
        };

        let mut levels = Vec::with_capacity(self.steps.len());
        for step in &self.steps {
            let mut level = StepLevel::default();
            let mut reached: HashSet<&NodeId> = HashSet::new();
            let mut next: Vec<&NodeId> = Vec::new();

            for &from in &frontier {
                for &edge in index.lookup(from, step) {
                    let far = match step.direction {
                        Direction::Outgoing => &edge.target,
                        Direction::Incoming => &edge.source,
                    };
                    let Some(node) = context.get_node(far) else {
                        continue;
                    };
                    if reached.insert(&node.id) {
                        next.push(&node.id);
                        level.nodes.push(node.clone());
                    }
                    level.edges.push(edge.clone());
                }
            }

            frontier = next;
            levels.push(level);
        }

        StepResult {
            origin: self.origin.clone(),
            steps: levels,
        }
    }
}

impl StepResult {
    /// Get nodes discovered at a specific step (0-indexed).
    pub fn at_step(&self, step: usize) -> &[Node] {
        self.steps.get(step).map(|l| l.nodes.as_slice()).unwrap_or(&[])
    }

    /// Get edges followed at a specific step (0-indexed).
    pub fn edges_at(&self, step: usize) -> &[Edge] {
        self.steps.get(step).map(|l| l.edges.as_slice()).unwrap_or(&[])
    }

    /// Get all discovered nodes across all steps.
    pub fn all_nodes(&self) -> Vec<&Node> {
        self.steps.iter().flat_map(|l| l.nodes.iter()).collect()
    }

    /// Get all edges traversed across all steps.
    pub fn all_edges(&self) -> Vec<&Edge> {
        self.steps.iter().flat_map(|l| l.edges.iter()).collect()
    }

    /// Nodes reached by the last step
    pub fn final_frontier(&self) -> &[Node] {
        self.steps.last().map(|l| l.nodes.as_slice()).unwrap_or(&[])
    }
}

/// Edges grouped by endpoint, then relationship; one map per direction
struct RelationshipIndex<'a> {
    by_source: EdgeMap<'a>,
    by_target: EdgeMap<'a>,
}

type EdgeMap<'a> = HashMap<&'a NodeId, HashMap<&'a str, Vec<&'a Edge>>>;

impl<'a> RelationshipIndex<'a> {
    fn build(context: &'a Context, min_weight: Option<f64>) -> Self {
        let mut by_source: EdgeMap<'a> = HashMap::new();
        let mut by_target: EdgeMap<'a> = HashMap::new();

        let floor = min_weight.unwrap_or(f64::NEG_INFINITY);
        for edge in context.edges().filter(|e| e.raw_weight >= floor) {
            let rel = edge.relationship.as_str();
            by_source.entry(&edge.source).or_default().entry(rel).or_default().push(edge);
            by_target.entry(&edge.target).or_default().entry(rel).or_default().push(edge);
        }

        Self { by_source, by_target }
    }

    fn lookup(&self, node: &NodeId, step: &Step) -> &[&'a Edge] {
        let map = match step.direction {
            Direction::Outgoing => &self.by_source,
            Direction::Incoming => &self.by_target,
        };
        map.get(node)
            .and_then(|by_rel| by_rel.get(step.relationship.as_str()))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{dimension, EdgeUpsert, Emission, NodeMergePolicy};

    fn node(id: &str, node_type: &str, dim: &str) -> Node {
        Node::new(id, node_type).in_dimension(dim)
    }

    fn build(nodes: Vec<Node>, edges: &[(&str, &str, &str)]) -> Context {
        let mut ctx = Context::new("test");
        let mut emission = Emission::new();
        for n in nodes {
            emission = emission.with_node(n);
        }
        for (source, relationship, target) in edges {
            emission = emission.with_edge(EdgeUpsert::new(*source, *target, *relationship, 1.0));
        }
        ctx.commit("fixture", emission, NodeMergePolicy::default()).unwrap();
        ctx
    }

    fn test_context() -> Context {
        build(
            vec![
                node("concept:travel", "concept", dimension::SEMANTIC),
                node("mark:1", "mark", dimension::PROVENANCE),
                node("mark:2", "mark", dimension::PROVENANCE),
                node("chain:research", "chain", dimension::PROVENANCE),
                node("fragment:abc", "fragment", dimension::STRUCTURE),
            ],
            &[
                ("mark:1", "references", "concept:travel"),
                ("mark:2", "references", "concept:travel"),
                ("chain:research", "contains", "mark:1"),
                ("fragment:abc", "tagged_with", "concept:travel"),
            ],
        )
    }

    fn ids(nodes: &[Node]) -> Vec<&str> {
        let mut ids: Vec<&str> = nodes.iter().map(|n| n.id.as_str()).collect();
        ids.sort_unstable();
        ids
    }

    // === Scenario: single step follows relationship and direction ===

    #[test]
    fn single_step_incoming_references() {
        let ctx = test_context();

        let result = StepQuery::from("concept:travel")
            .step(Direction::Incoming, "references")
            .execute(&ctx);

        assert_eq!(ids(result.at_step(0)), vec!["mark:1", "mark:2"]);
        assert_eq!(result.edges_at(0).len(), 2);
    }

    #[test]
    fn step_filters_by_relationship() {
        let ctx = test_context();

        let result = StepQuery::from("concept:travel")
            .step(Direction::Incoming, "references")
            .execute(&ctx);

        assert!(!ids(result.at_step(0)).contains(&"fragment:abc"));
    }

    #[test]
    fn outgoing_direction() {
        let ctx = test_context();

        let result = StepQuery::from("chain:research")
            .step(Direction::Outgoing, "contains")
            .execute(&ctx);

        assert_eq!(ids(result.at_step(0)), vec!["mark:1"]);
        // Direction is exact: the incoming view of the same edge finds nothing
        let reverse = StepQuery::from("chain:research")
            .step(Direction::Incoming, "contains")
            .execute(&ctx);
        assert!(reverse.at_step(0).is_empty());
    }

    // === Scenario: multi-step chains through frontiers ===

    #[test]
    fn multi_step_chains_through_frontiers() {
        let ctx = test_context();

        let result = StepQuery::from("concept:travel")
            .step(Direction::Incoming, "references")
            .step(Direction::Incoming, "contains")
            .execute(&ctx);

        assert_eq!(result.steps.len(), 2);
        assert_eq!(ids(result.at_step(0)), vec!["mark:1", "mark:2"]);
        assert_eq!(ids(result.at_step(1)), vec!["chain:research"]);
        assert_eq!(result.edges_at(1).len(), 1);
        assert_eq!(result.all_edges().len(), 3);
    }

    #[test]
    fn second_step_starts_from_first_frontier_not_origin() {
        let ctx = test_context();

        // The origin has an incoming tagged_with edge, but step 1 starts from
        // the marks, which have none.
        let result = StepQuery::from("concept:travel")
            .step(Direction::Incoming, "references")
            .step(Direction::Incoming, "tagged_with")
            .execute(&ctx);

        assert!(result.at_step(1).is_empty());
    }

    // === Scenario: no matching edges yields an empty frontier ===

    #[test]
    fn empty_frontier_propagates() {
        let ctx = test_context();

        let result = StepQuery::from("concept:travel")
            .step(Direction::Outgoing, "references")
            .step(Direction::Incoming, "contains")
            .execute(&ctx);

        assert_eq!(result.steps.len(), 2);
        assert!(result.steps.iter().all(StepLevel::is_empty));
        assert!(result.final_frontier().is_empty());
    }

    #[test]
    fn unknown_origin_is_empty_not_error() {
        let ctx = test_context();
        let result = StepQuery::from("nowhere")
            .step(Direction::Outgoing, "references")
            .execute(&ctx);
        assert!(result.at_step(0).is_empty());
    }

    #[test]
    fn min_weight_drops_weak_edges() {
        let mut ctx = test_context();
        // "fixture" contributed 1.0 everywhere; a second producer ranks the marks
        let ranking = Emission::new()
            .with_edge(EdgeUpsert::new("mark:1", "concept:travel", "references", 10.0))
            .with_edge(EdgeUpsert::new("mark:2", "concept:travel", "references", 0.0));
        ctx.commit("ranker", ranking, NodeMergePolicy::default()).unwrap();

        let all = StepQuery::from("concept:travel")
            .step(Direction::Incoming, "references")
            .execute(&ctx);
        assert_eq!(ids(all.at_step(0)), vec!["mark:1", "mark:2"]);

        let strong = StepQuery::from("concept:travel")
            .step(Direction::Incoming, "references")
            .min_weight(1.5)
            .execute(&ctx);
        assert_eq!(ids(strong.at_step(0)), vec!["mark:1"]);
    }

    #[test]
    fn direction_parses_short_and_long_forms() {
        assert_eq!("out".parse::<Direction>(), Ok(Direction::Outgoing));
        assert_eq!("incoming".parse::<Direction>(), Ok(Direction::Incoming));
        assert!("sideways".parse::<Direction>().is_err());
    }
}
