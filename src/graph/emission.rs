//! Emission: one producer's atomic batch of proposed changes

use super::edge::EdgeId;
use super::node::{Node, NodeId, Properties, PropertyValue};

/// A proposed edge contribution.
///
/// The producer id is not part of the proposal; the commit path binds the
/// value to whichever producer submitted the emission.
#[derive(Debug, Clone)]
pub struct EdgeUpsert {
    pub source: NodeId,
    pub target: NodeId,
    pub relationship: String,
    /// This producer's contribution value for the edge
    pub value: f64,
    /// Merged into the edge's properties
    pub properties: Properties,
}

impl EdgeUpsert {
    pub fn new(
        source: impl Into<NodeId>,
        target: impl Into<NodeId>,
        relationship: impl Into<String>,
        value: f64,
    ) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            relationship: relationship.into(),
            value,
            properties: Properties::new(),
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Id of the logical edge this proposal targets
    pub fn edge_id(&self) -> EdgeId {
        EdgeId::derive(&self.source, &self.relationship, &self.target)
    }
}

/// A bundle of node upserts, edge upserts and removals.
///
/// Validated as a whole and committed all-or-nothing. Applied in a fixed
/// order: node upserts, edge upserts, edge removals, node removals.
#[derive(Debug, Clone, Default)]
pub struct Emission {
    pub nodes: Vec<Node>,
    pub edges: Vec<EdgeUpsert>,
    pub edge_removals: Vec<EdgeId>,
    pub node_removals: Vec<NodeId>,
}

impl Emission {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_node(mut self, node: Node) -> Self {
        self.nodes.push(node);
        self
    }

    pub fn with_edge(mut self, edge: EdgeUpsert) -> Self {
        self.edges.push(edge);
        self
    }

    /// Remove the edge `source -[relationship]-> target` outright
    pub fn with_edge_removal(
        mut self,
        source: impl Into<NodeId>,
        relationship: &str,
        target: impl Into<NodeId>,
    ) -> Self {
        self.edge_removals
            .push(EdgeId::derive(&source.into(), relationship, &target.into()));
        self
    }

    /// Remove a node; incident edges cascade
    pub fn with_node_removal(mut self, node_id: impl Into<NodeId>) -> Self {
        self.node_removals.push(node_id.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
            && self.edges.is_empty()
            && self.edge_removals.is_empty()
            && self.node_removals.is_empty()
    }
}
