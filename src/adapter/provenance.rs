//! Auto-provenance: record which adapter produced which nodes
//!
//! For every adapter that added nodes during an ingest, a provenance-dimension
//! `ingest_record` node is created with a `produced_by` edge from each of those
//! nodes to the record, so origin is traversable through the graph itself.

use crate::graph::{dimension, Context, EdgeUpsert, Emission, GraphEvent, Node, NodeId};
use chrono::{DateTime, Utc};

/// Producer id for auto-provenance commits
pub const AUTO_PROVENANCE_ID: &str = "plait:auto-provenance";

/// Node type of the per-ingest record
pub const INGEST_RECORD_TYPE: &str = "ingest_record";

/// Relationship from a produced node to its ingest record
pub const PRODUCED_BY: &str = "produced_by";

/// Nodes `adapter_id` added, according to `events`, in first-seen order
pub fn nodes_added_by(events: &[GraphEvent], adapter_id: &str) -> Vec<NodeId> {
    let mut ids: Vec<NodeId> = Vec::new();
    for event in events {
        if let GraphEvent::NodesAdded {
            node_ids,
            producer_id,
            ..
        } = event
        {
            if producer_id == adapter_id {
                for id in node_ids {
                    if !ids.contains(id) {
                        ids.push(id.clone());
                    }
                }
            }
        }
    }
    ids
}

/// Build the provenance emission for one adapter's ingest.
///
/// Returns `None` when the adapter added no nodes that still exist.
pub fn ingest_record_emission(
    adapter_id: &str,
    context: &Context,
    produced: &[NodeId],
    timestamp: DateTime<Utc>,
) -> Option<Emission> {
    let present: Vec<&NodeId> = produced.iter().filter(|id| context.get_node(id).is_some()).collect();
    if present.is_empty() {
        return None;
    }

    let record_id = NodeId::new();
    let record = Node::new(record_id.clone(), INGEST_RECORD_TYPE)
        .in_dimension(dimension::PROVENANCE)
        .with_property("adapter_id", adapter_id)
        .with_property("context_id", context.id.as_str())
        .with_property("timestamp", timestamp.to_rfc3339())
        .with_property("node_count", present.len() as i64);

    let mut emission = Emission::new().with_node(record);
    for node_id in present {
        emission = emission.with_edge(EdgeUpsert::new(node_id.clone(), record_id.clone(), PRODUCED_BY, 1.0));
    }
    Some(emission)
}
