//! Context: an isolated, named graph partition and its commit path

use super::edge::{Edge, EdgeId};
use super::emission::{EdgeUpsert, Emission};
use super::engine::{PlaitError, PlaitResult};
use super::events::{GraphEvent, RemovalReason};
use super::ledger;
use super::node::{Node, NodeId, NodeMergePolicy};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

/// Unique identifier for a context
///
/// Serializes as a plain string (UUID or semantic ID like "ctx:workspace-name")
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContextId(String);

impl ContextId {
    /// Create a new random ContextId (UUID-based)
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create a ContextId from a string (semantic ID)
    pub fn from_string(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the inner string value
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ContextId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ContextId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ContextId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for ContextId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Metadata about a context
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContextMetadata {
    /// When the context was created
    pub created_at: Option<DateTime<Utc>>,
    /// When the context was last updated
    pub updated_at: Option<DateTime<Utc>>,
    /// Tags for categorization
    #[serde(default)]
    pub tags: Vec<String>,
}

/// How one edge contribution write landed
#[derive(Debug, Clone, PartialEq)]
enum ContributionChange {
    /// The edge did not exist and was created
    Created(EdgeId),
    /// The producer's value was set or replaced
    Replaced,
    /// The value was bit-identical to the stored one
    Unchanged,
}

/// A named, isolated graph partition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Context {
    /// Unique identifier
    pub id: ContextId,
    /// Human-readable name, unique across contexts
    pub name: String,
    /// Optional description
    pub description: Option<String>,
    /// Nodes in this context
    pub nodes: HashMap<NodeId, Node>,
    /// Edges in this context
    pub edges: Vec<Edge>,
    /// Context metadata
    pub metadata: ContextMetadata,
    /// In-memory change counter; bumped by every mutation
    #[serde(skip)]
    revision: u64,
}

impl Context {
    /// Create a new context with the given name
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_id(ContextId::new(), name)
    }

    /// Create a new context with a specific ID and name
    pub fn with_id(id: ContextId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            description: None,
            nodes: HashMap::new(),
            edges: Vec::new(),
            metadata: ContextMetadata {
                created_at: Some(Utc::now()),
                ..Default::default()
            },
            revision: 0,
        }
    }

    /// Rebuild a context from stored parts, recomputing raw weights
    pub fn from_parts(
        id: ContextId,
        name: String,
        description: Option<String>,
        nodes: HashMap<NodeId, Node>,
        mut edges: Vec<Edge>,
        metadata: ContextMetadata,
    ) -> Self {
        // Stored raw weights are a cache; contributions are the truth.
        ledger::recompute_raw_weights(&mut edges);
        Self {
            id,
            name,
            description,
            nodes,
            edges,
            metadata,
            revision: 0,
        }
    }

    /// Set the description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Add a tag
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.metadata.tags.push(tag.into());
        self
    }

    /// Get a node by ID
    pub fn get_node(&self, id: &NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    /// Get an edge by ID
    pub fn get_edge(&self, id: &EdgeId) -> Option<&Edge> {
        self.edges.iter().find(|e| &e.id == id)
    }

    /// Get the edge `source -[relationship]-> target`
    pub fn find_edge(&self, source: &NodeId, relationship: &str, target: &NodeId) -> Option<&Edge> {
        self.get_edge(&EdgeId::derive(source, relationship, target))
    }

    /// Get all nodes
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// Get all edges
    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.iter()
    }

    /// Edges leaving `node`
    pub fn outgoing<'a>(&'a self, node: &'a NodeId) -> impl Iterator<Item = &'a Edge> + 'a {
        self.edges.iter().filter(move |e| &e.source == node)
    }

    /// Edges arriving at `node`
    pub fn incoming<'a>(&'a self, node: &'a NodeId) -> impl Iterator<Item = &'a Edge> + 'a {
        self.edges.iter().filter(move |e| &e.target == node)
    }

    /// Get the number of nodes
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Get the number of edges
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Producers with at least one contribution in this context
    pub fn producers(&self) -> Vec<String> {
        ledger::producer_ranges(self.edges.iter()).into_keys().collect()
    }

    /// In-memory change counter, used to skip persisting no-op transactions
    pub(crate) fn revision(&self) -> u64 {
        self.revision
    }

    /// Recompute raw weights for every edge.
    ///
    /// Returns the ids of edges whose raw weight changed.
    pub fn recompute_raw_weights(&mut self) -> Vec<EdgeId> {
        ledger::recompute_raw_weights(&mut self.edges)
    }

    /// Set one producer's contribution on one edge and recompute weights.
    pub fn upsert_edge_contribution(
        &mut self,
        producer_id: &str,
        upsert: EdgeUpsert,
        policy: NodeMergePolicy,
    ) -> PlaitResult<Vec<GraphEvent>> {
        self.commit(producer_id, Emission::new().with_edge(upsert), policy)
    }

    /// Apply an emission all-or-nothing.
    ///
    /// The whole emission is validated before anything is touched, so a
    /// rejected emission leaves the context unchanged.
    pub fn commit(
        &mut self,
        producer_id: &str,
        emission: Emission,
        policy: NodeMergePolicy,
    ) -> PlaitResult<Vec<GraphEvent>> {
        self.validate(producer_id, &emission)?;

        let now = Utc::now();
        let mut nodes_added: Vec<NodeId> = Vec::new();
        for mut node in emission.nodes {
            let id = node.id.clone();
            let changed = match self.nodes.get_mut(&id) {
                Some(existing) => existing.merge_from(node, policy),
                None => {
                    node.metadata.created_at.get_or_insert(now);
                    self.nodes.insert(id.clone(), node);
                    true
                }
            };
            if changed && !nodes_added.contains(&id) {
                nodes_added.push(id);
            }
        }

        let mut edges_added: Vec<EdgeId> = Vec::new();
        let mut weights_dirty = false;
        for upsert in emission.edges {
            match self.apply_contribution(producer_id, upsert) {
                ContributionChange::Created(id) => {
                    edges_added.push(id);
                    weights_dirty = true;
                }
                ContributionChange::Replaced => weights_dirty = true,
                ContributionChange::Unchanged => {}
            }
        }

        let mut removed_direct: Vec<EdgeId> = Vec::new();
        for edge_id in &emission.edge_removals {
            if let Some(pos) = self.edges.iter().position(|e| &e.id == edge_id) {
                removed_direct.push(self.edges.remove(pos).id);
            }
        }

        let mut removed_cascade: Vec<EdgeId> = Vec::new();
        let mut nodes_removed: Vec<NodeId> = Vec::new();
        for node_id in &emission.node_removals {
            if self.nodes.remove(node_id).is_none() {
                continue;
            }
            self.edges.retain(|e| {
                if e.touches(node_id) {
                    removed_cascade.push(e.id.clone());
                    false
                } else {
                    true
                }
            });
            nodes_removed.push(node_id.clone());
        }

        let mut weights_changed = Vec::new();
        if weights_dirty || !removed_direct.is_empty() || !removed_cascade.is_empty() {
            let added: HashSet<&EdgeId> = edges_added.iter().collect();
            weights_changed = self
                .recompute_raw_weights()
                .into_iter()
                .filter(|id| !added.contains(id))
                .collect();
        }

        let mut events = Vec::new();
        let producer_id = producer_id.to_string();
        let context_id = self.id.to_string();
        if !nodes_added.is_empty() {
            events.push(GraphEvent::NodesAdded {
                node_ids: nodes_added,
                producer_id: producer_id.clone(),
                context_id: context_id.clone(),
            });
        }
        if !edges_added.is_empty() {
            events.push(GraphEvent::EdgesAdded {
                edge_ids: edges_added,
                producer_id: producer_id.clone(),
                context_id: context_id.clone(),
            });
        }
        if !weights_changed.is_empty() {
            events.push(GraphEvent::WeightsChanged {
                edge_ids: weights_changed,
                producer_id: producer_id.clone(),
                context_id: context_id.clone(),
            });
        }
        for (edge_ids, reason) in [
            (removed_direct, RemovalReason::Direct),
            (removed_cascade, RemovalReason::Cascade),
        ] {
            if !edge_ids.is_empty() {
                events.push(GraphEvent::EdgesRemoved {
                    edge_ids,
                    producer_id: producer_id.clone(),
                    context_id: context_id.clone(),
                    reason,
                });
            }
        }
        if !nodes_removed.is_empty() {
            events.push(GraphEvent::NodesRemoved {
                node_ids: nodes_removed,
                producer_id,
                context_id,
            });
        }

        if !events.is_empty() {
            self.touch();
        }
        Ok(events)
    }

    /// Remove a producer's contribution slot from every edge.
    ///
    /// Edges left with no contributions are pruned. Returns the number of
    /// edges that carried the producer's contribution, plus events. An
    /// unknown producer is a no-op reporting zero.
    pub fn retract_contributions(&mut self, producer_id: &str) -> (usize, Vec<GraphEvent>) {
        let mut affected: Vec<EdgeId> = Vec::new();
        for edge in self.edges.iter_mut() {
            if edge.contributions.remove(producer_id).is_some() {
                affected.push(edge.id.clone());
            }
        }
        if affected.is_empty() {
            return (0, Vec::new());
        }
        let edges_affected = affected.len();
        (edges_affected, self.finish_retraction(producer_id, edges_affected))
    }

    /// Remove one producer's contribution from one edge.
    ///
    /// Returns no events if the edge or the contribution does not exist.
    pub fn retract_contribution(&mut self, edge_id: &EdgeId, producer_id: &str) -> Vec<GraphEvent> {
        let removed = self
            .edges
            .iter_mut()
            .find(|e| &e.id == edge_id)
            .and_then(|e| e.contributions.remove(producer_id));
        if removed.is_none() {
            return Vec::new();
        }
        self.finish_retraction(producer_id, 1)
    }

    /// Prune unsupported edges, recompute weights and report
    fn finish_retraction(&mut self, producer_id: &str, edges_affected: usize) -> Vec<GraphEvent> {
        let mut pruned: Vec<EdgeId> = Vec::new();
        self.edges.retain(|e| {
            if e.is_unsupported() {
                pruned.push(e.id.clone());
                false
            } else {
                true
            }
        });
        let weights_changed = self.recompute_raw_weights();
        self.touch();

        let context_id = self.id.to_string();
        let mut events = Vec::new();
        if !weights_changed.is_empty() {
            events.push(GraphEvent::WeightsChanged {
                edge_ids: weights_changed,
                producer_id: producer_id.to_string(),
                context_id: context_id.clone(),
            });
        }
        if !pruned.is_empty() {
            events.push(GraphEvent::EdgesRemoved {
                edge_ids: pruned,
                producer_id: producer_id.to_string(),
                context_id: context_id.clone(),
                reason: RemovalReason::Pruned,
            });
        }
        events.push(GraphEvent::ContributionsRetracted {
            producer_id: producer_id.to_string(),
            context_id,
            edges_affected,
        });
        events
    }

    /// Reject the emission if any part of it is malformed
    fn validate(&self, producer_id: &str, emission: &Emission) -> PlaitResult<()> {
        let reject = |reason: String| PlaitError::InvalidEmission {
            producer_id: producer_id.to_string(),
            reason,
        };

        if producer_id.trim().is_empty() {
            return Err(reject("producer id is empty".to_string()));
        }
        for node in &emission.nodes {
            if node.id.as_str().is_empty() {
                return Err(reject("node with empty id".to_string()));
            }
        }

        let incoming: HashSet<&NodeId> = emission.nodes.iter().map(|n| &n.id).collect();
        let known = |id: &NodeId| self.nodes.contains_key(id) || incoming.contains(id);
        for edge in &emission.edges {
            if edge.relationship.is_empty() {
                return Err(reject(format!(
                    "edge {} -> {} has an empty relationship",
                    edge.source, edge.target
                )));
            }
            if !edge.value.is_finite() {
                return Err(reject(format!(
                    "edge {} -[{}]-> {} has non-finite value {}",
                    edge.source, edge.relationship, edge.target, edge.value
                )));
            }
            for endpoint in [&edge.source, &edge.target] {
                if !known(endpoint) {
                    return Err(reject(format!(
                        "edge {} -[{}]-> {} references unknown node {}",
                        edge.source, edge.relationship, edge.target, endpoint
                    )));
                }
            }
        }
        Ok(())
    }

    /// Write one contribution. Latest value replaces; identical is a no-op.
    fn apply_contribution(&mut self, producer_id: &str, upsert: EdgeUpsert) -> ContributionChange {
        let id = upsert.edge_id();
        if let Some(edge) = self.edges.iter_mut().find(|e| e.id == id) {
            edge.properties.extend(upsert.properties);
            return match edge.contributions.get(producer_id) {
                Some(prev) if prev.to_bits() == upsert.value.to_bits() => ContributionChange::Unchanged,
                _ => {
                    edge.contributions.insert(producer_id.to_string(), upsert.value);
                    ContributionChange::Replaced
                }
            };
        }

        let mut edge = Edge::new(upsert.source, upsert.target, upsert.relationship)
            .with_contribution(producer_id, upsert.value);
        edge.properties = upsert.properties;
        self.edges.push(edge);
        ContributionChange::Created(id)
    }

    /// Update the last modified timestamp
    fn touch(&mut self) {
        self.revision += 1;
        self.metadata.updated_at = Some(Utc::now());
    }
}
