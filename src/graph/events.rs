//! Graph events fired when changes are committed
//!
//! One event per mutation kind. Events are produced only by the commit path
//! and never mutated afterwards.

use super::{EdgeId, NodeId};
use serde::{Deserialize, Serialize};

/// Why edges left the graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemovalReason {
    /// Removed explicitly by an emission
    Direct,
    /// An endpoint node was removed
    Cascade,
    /// The last contribution was retracted
    Pruned,
}

/// A graph event fired when a change is committed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GraphEvent {
    /// Nodes were added, or an upsert changed them
    NodesAdded {
        node_ids: Vec<NodeId>,
        producer_id: String,
        context_id: String,
    },
    /// Edges were added
    EdgesAdded {
        edge_ids: Vec<EdgeId>,
        producer_id: String,
        context_id: String,
    },
    /// Nodes were removed
    NodesRemoved {
        node_ids: Vec<NodeId>,
        producer_id: String,
        context_id: String,
    },
    /// Edges were removed
    EdgesRemoved {
        edge_ids: Vec<EdgeId>,
        producer_id: String,
        context_id: String,
        reason: RemovalReason,
    },
    /// Raw weights of pre-existing edges numerically changed
    WeightsChanged {
        edge_ids: Vec<EdgeId>,
        producer_id: String,
        context_id: String,
    },
    /// A producer's contribution slots were removed
    ContributionsRetracted {
        producer_id: String,
        context_id: String,
        edges_affected: usize,
    },
}

impl GraphEvent {
    /// The producer whose change raised this event
    pub fn producer_id(&self) -> &str {
        match self {
            Self::NodesAdded { producer_id, .. }
            | Self::EdgesAdded { producer_id, .. }
            | Self::NodesRemoved { producer_id, .. }
            | Self::EdgesRemoved { producer_id, .. }
            | Self::WeightsChanged { producer_id, .. }
            | Self::ContributionsRetracted { producer_id, .. } => producer_id,
        }
    }

    /// The context the change happened in
    pub fn context_id(&self) -> &str {
        match self {
            Self::NodesAdded { context_id, .. }
            | Self::EdgesAdded { context_id, .. }
            | Self::NodesRemoved { context_id, .. }
            | Self::EdgesRemoved { context_id, .. }
            | Self::WeightsChanged { context_id, .. }
            | Self::ContributionsRetracted { context_id, .. } => context_id,
        }
    }

    /// Short name of the event kind, for logs and outbound payloads
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NodesAdded { .. } => "nodes_added",
            Self::EdgesAdded { .. } => "edges_added",
            Self::NodesRemoved { .. } => "nodes_removed",
            Self::EdgesRemoved { .. } => "edges_removed",
            Self::WeightsChanged { .. } => "weights_changed",
            Self::ContributionsRetracted { .. } => "contributions_retracted",
        }
    }
}
