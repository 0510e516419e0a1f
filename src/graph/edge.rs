//! Edge representation with per-producer contributions

use super::node::{NodeId, Properties};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use uuid::Uuid;

/// Namespace for edge ids (UUID v5 over source, relationship, target).
const EDGE_NAMESPACE: Uuid = Uuid::from_u128(0x2f8b_91c0_53de_4b16_a7e4_0c9d_3f61_e285);

/// Unique identifier for an edge
///
/// Always derived from `(source, relationship, target)`, so two processes
/// that observe the same logical edge agree on its id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EdgeId(String);

impl EdgeId {
    /// Derive the id of the logical edge `source -[relationship]-> target`
    pub fn derive(source: &NodeId, relationship: &str, target: &NodeId) -> Self {
        let key = format!(
            "{}\u{1f}{}\u{1f}{}",
            source.as_str(),
            relationship,
            target.as_str()
        );
        Self(Uuid::new_v5(&EDGE_NAMESPACE, key.as_bytes()).to_string())
    }

    /// Wrap a stored id
    pub fn from_string(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the inner string value
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for EdgeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Producer identifier → that producer's latest contribution value
pub type Contributions = BTreeMap<String, f64>;

/// A directed edge in the contribution graph
///
/// `raw_weight` is derived state: it is always the per-producer scale
/// normalization of `contributions` within the owning context and is
/// recomputed, never trusted, after a reload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Edge {
    /// Derived identifier
    pub id: EdgeId,
    /// Source node
    pub source: NodeId,
    /// Target node
    pub target: NodeId,
    /// Type of relationship (e.g., "tagged_with", "may_be_related")
    pub relationship: String,
    /// Latest contribution per producer
    pub contributions: Contributions,
    /// Sum of normalized contributions
    pub raw_weight: f64,
    /// When the edge was created
    pub created_at: DateTime<Utc>,
    /// Additional properties
    pub properties: Properties,
}

impl Edge {
    /// Create an edge with no contributions yet
    pub fn new(source: NodeId, target: NodeId, relationship: impl Into<String>) -> Self {
        let relationship = relationship.into();
        Self {
            id: EdgeId::derive(&source, &relationship, &target),
            source,
            target,
            relationship,
            contributions: BTreeMap::new(),
            raw_weight: 0.0,
            created_at: Utc::now(),
            properties: HashMap::new(),
        }
    }

    /// Set a contribution (builder pattern)
    pub fn with_contribution(mut self, producer_id: impl Into<String>, value: f64) -> Self {
        self.contributions.insert(producer_id.into(), value);
        self
    }

    /// A producer's current contribution, if any
    pub fn contribution(&self, producer_id: &str) -> Option<f64> {
        self.contributions.get(producer_id).copied()
    }

    /// True when no producer supports this edge any more
    pub fn is_unsupported(&self) -> bool {
        self.contributions.is_empty()
    }

    /// True when either endpoint is `node`
    pub fn touches(&self, node: &NodeId) -> bool {
        &self.source == node || &self.target == node
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edge_id_is_derived_from_triple() {
        let a = NodeId::from("A");
        let b = NodeId::from("B");
        let e1 = Edge::new(a.clone(), b.clone(), "tagged_with");
        let e2 = Edge::new(a.clone(), b.clone(), "tagged_with");
        let reversed = Edge::new(b.clone(), a.clone(), "tagged_with");
        let other_rel = Edge::new(a, b, "references");

        assert_eq!(e1.id, e2.id);
        assert_ne!(e1.id, reversed.id);
        assert_ne!(e1.id, other_rel.id);
    }

    #[test]
    fn new_edge_is_unsupported_until_contributed() {
        let e = Edge::new(NodeId::from("A"), NodeId::from("B"), "r");
        assert!(e.is_unsupported());
        let e = e.with_contribution("x", 2.0);
        assert_eq!(e.contribution("x"), Some(2.0));
        assert!(!e.is_unsupported());
    }
}
