//! EdgeListAdapter: a generic producer for explicit nodes and weighted edges
//!
//! Input kind `edge_list`. The payload is an [`EdgeListInput`], either passed
//! directly or as a JSON string. Every edge value becomes this adapter's
//! contribution on that edge.

use super::error::AdapterError;
use super::traits::Adapter;
use super::types::{AdapterInput, OutboundEvent, Processed};
use crate::graph::{dimension, Context, EdgeUpsert, Emission, GraphEvent, Node, Properties};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Input kind consumed by [`EdgeListAdapter`]
pub const EDGE_LIST_KIND: &str = "edge_list";

/// A node to upsert
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeSpec {
    pub id: String,
    #[serde(rename = "type", default = "default_node_type")]
    pub node_type: String,
    #[serde(default)]
    pub dimension: Option<String>,
    #[serde(default)]
    pub properties: Properties,
}

fn default_node_type() -> String {
    "concept".to_string()
}

impl NodeSpec {
    pub fn new(id: impl Into<String>, node_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            node_type: node_type.into(),
            dimension: None,
            properties: Properties::new(),
        }
    }
}

/// A weighted edge to contribute
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeSpec {
    pub source: String,
    pub target: String,
    pub relationship: String,
    pub value: f64,
}

impl EdgeSpec {
    pub fn new(
        source: impl Into<String>,
        target: impl Into<String>,
        relationship: impl Into<String>,
        value: f64,
    ) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            relationship: relationship.into(),
            value,
        }
    }
}

/// Payload for the `edge_list` input kind
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EdgeListInput {
    #[serde(default)]
    pub nodes: Vec<NodeSpec>,
    #[serde(default)]
    pub edges: Vec<EdgeSpec>,
}

impl EdgeListInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_node(mut self, node: NodeSpec) -> Self {
        self.nodes.push(node);
        self
    }

    pub fn with_edge(mut self, edge: EdgeSpec) -> Self {
        self.edges.push(edge);
        self
    }

    /// Parse the JSON form of the payload
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// Adapter turning an [`EdgeListInput`] into one emission.
pub struct EdgeListAdapter {
    id: String,
}

impl EdgeListAdapter {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }

    fn validate(&self, input: &EdgeListInput) -> Result<(), AdapterError> {
        let fail = |reason: String| AdapterError::ValidationFailed {
            producer_id: self.id.clone(),
            reason,
        };
        if let Some(node) = input.nodes.iter().find(|n| n.id.is_empty()) {
            return Err(fail(format!("node of type '{}' has an empty id", node.node_type)));
        }
        for edge in &input.edges {
            if !edge.value.is_finite() {
                return Err(fail(format!(
                    "edge {} -[{}]-> {} has non-finite value {}",
                    edge.source, edge.relationship, edge.target, edge.value
                )));
            }
        }
        Ok(())
    }

    fn to_emission(input: &EdgeListInput) -> Emission {
        let mut emission = Emission::new();
        for spec in &input.nodes {
            let mut node = Node::new(spec.id.as_str(), spec.node_type.as_str())
                .in_dimension(spec.dimension.as_deref().unwrap_or(dimension::DEFAULT));
            node.properties = spec.properties.clone();
            emission = emission.with_node(node);
        }
        for spec in &input.edges {
            emission = emission.with_edge(EdgeUpsert::new(
                spec.source.as_str(),
                spec.target.as_str(),
                spec.relationship.as_str(),
                spec.value,
            ));
        }
        emission
    }
}

#[async_trait]
impl Adapter for EdgeListAdapter {
    fn id(&self) -> &str {
        &self.id
    }

    fn input_kind(&self) -> &str {
        EDGE_LIST_KIND
    }

    async fn process(&self, input: &AdapterInput) -> Result<Processed, AdapterError> {
        let parsed;
        let payload = if let Some(list) = input.downcast_data::<EdgeListInput>() {
            list
        } else if let Some(json) = input.downcast_data::<String>() {
            parsed = EdgeListInput::from_json(json).map_err(|e| AdapterError::ValidationFailed {
                producer_id: self.id.clone(),
                reason: format!("malformed edge list: {}", e),
            })?;
            &parsed
        } else {
            return Err(AdapterError::InvalidInput);
        };

        self.validate(payload)?;
        Ok(Processed::Emitted(Self::to_emission(payload)))
    }

    fn transform_events(&self, events: &[GraphEvent], _context: &Context) -> Vec<OutboundEvent> {
        events
            .iter()
            .filter_map(|event| match event {
                GraphEvent::NodesAdded { node_ids, producer_id, .. } => Some(OutboundEvent::new(
                    "nodes_added",
                    format!("{} node(s) from {}", node_ids.len(), producer_id),
                )),
                GraphEvent::EdgesAdded { edge_ids, producer_id, .. } => Some(OutboundEvent::new(
                    "edges_added",
                    format!("{} edge(s) from {}", edge_ids.len(), producer_id),
                )),
                GraphEvent::WeightsChanged { edge_ids, .. } => Some(OutboundEvent::new(
                    "weights_changed",
                    format!("{} edge weight(s) changed", edge_ids.len()),
                )),
                GraphEvent::EdgesRemoved { edge_ids, reason, .. } => Some(OutboundEvent::new(
                    "edges_removed",
                    format!("{} edge(s) removed ({:?})", edge_ids.len(), reason),
                )),
                _ => None,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn emitted(processed: Processed) -> Emission {
        match processed {
            Processed::Emitted(e) => e,
            Processed::Skipped { reason } => panic!("unexpected skip: {}", reason),
        }
    }

    #[tokio::test]
    async fn typed_payload_becomes_emission() {
        let adapter = EdgeListAdapter::new("X");
        let payload = EdgeListInput::new()
            .with_node(NodeSpec::new("A", "concept"))
            .with_node(NodeSpec::new("B", "concept"))
            .with_edge(EdgeSpec::new("A", "B", "related_to", 5.0));

        let emission = emitted(adapter.process(&AdapterInput::new(EDGE_LIST_KIND, payload, "ctx")).await.unwrap());

        assert_eq!(emission.nodes.len(), 2);
        assert_eq!(emission.edges.len(), 1);
        assert_eq!(emission.edges[0].value, 5.0);
    }

    #[tokio::test]
    async fn json_payload_is_parsed() {
        let adapter = EdgeListAdapter::new("X");
        let json = r#"{
            "nodes": [{"id": "A", "type": "concept", "dimension": "semantic"}, {"id": "B"}],
            "edges": [{"source": "A", "target": "B", "relationship": "related_to", "value": 2.5}]
        }"#
        .to_string();

        let emission = emitted(adapter.process(&AdapterInput::new(EDGE_LIST_KIND, json, "ctx")).await.unwrap());

        assert_eq!(emission.nodes[0].dimension, dimension::SEMANTIC);
        assert_eq!(emission.nodes[1].node_type, "concept");
        assert_eq!(emission.nodes[1].dimension, dimension::DEFAULT);
        assert_eq!(emission.edges[0].relationship, "related_to");
    }

    #[tokio::test]
    async fn non_finite_values_fail_validation() {
        let adapter = EdgeListAdapter::new("X");
        let payload = EdgeListInput::new().with_edge(EdgeSpec::new("A", "B", "r", f64::NAN));

        let err = adapter
            .process(&AdapterInput::new(EDGE_LIST_KIND, payload, "ctx"))
            .await
            .unwrap_err();
        assert!(matches!(err, AdapterError::ValidationFailed { .. }));
    }

    #[tokio::test]
    async fn wrong_payload_type_is_invalid_input() {
        let adapter = EdgeListAdapter::new("X");
        let err = adapter.process(&AdapterInput::new(EDGE_LIST_KIND, 42u32, "ctx")).await.unwrap_err();
        assert!(matches!(err, AdapterError::InvalidInput));
    }
}
