//! Node representation in the contribution graph

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Namespace for content-derived node ids (UUID v5).
const NODE_NAMESPACE: Uuid = Uuid::from_u128(0x6d1c_4a52_9b0e_4f7a_8c3d_51e2_a9f0_7b14);

/// Well-known dimension tags.
///
/// Dimensions are an open classification: any string is a valid dimension.
/// These constants name the ones the built-in producers use.
pub mod dimension {
    pub const DEFAULT: &str = "default";
    pub const STRUCTURE: &str = "structure";
    pub const SEMANTIC: &str = "semantic";
    pub const PROVENANCE: &str = "provenance";
    pub const RELATIONAL: &str = "relational";
    pub const TEMPORAL: &str = "temporal";
}

/// Unique identifier for a node within its context
///
/// Serializes as a plain string (UUID or semantic ID like "concept:travel")
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    /// Create a new random NodeId (UUID-based)
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create a NodeId from a string (semantic ID)
    pub fn from_string(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Derive a stable id from semantic content.
    ///
    /// The same parts always yield the same id, so re-processing the same
    /// input upserts the node instead of duplicating it.
    pub fn derive<I, S>(parts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut key = String::new();
        for (i, part) in parts.into_iter().enumerate() {
            if i > 0 {
                key.push('\u{1f}');
            }
            key.push_str(part.as_ref());
        }
        Self(Uuid::new_v5(&NODE_NAMESPACE, key.as_bytes()).to_string())
    }

    /// Get the inner string value
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for NodeId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for NodeId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Typed property values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    String(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Array(Vec<PropertyValue>),
    Object(HashMap<String, PropertyValue>),
}

impl From<&str> for PropertyValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<i64> for PropertyValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for PropertyValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<bool> for PropertyValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

/// Properties collection
pub type Properties = HashMap<String, PropertyValue>;

/// Node metadata
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeMetadata {
    /// When the node was first committed
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
    /// When the node was last changed by an upsert
    pub modified_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// How an upsert of an existing node combines with the stored node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeMergePolicy {
    /// Type and dimension are overwritten; property keys are unioned and the
    /// incoming value wins per key.
    #[default]
    MergeProperties,
    /// The incoming node replaces the stored one wholesale.
    Replace,
}

/// A node in the contribution graph
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    /// Identifier, unique within the owning context
    pub id: NodeId,
    /// Type of node (e.g., "concept", "fragment", "ingest_record")
    pub node_type: String,
    /// Open classification tag (e.g., "structure", "semantic", "provenance")
    #[serde(default = "default_dimension")]
    pub dimension: String,
    /// Domain-specific properties
    pub properties: Properties,
    /// Node metadata
    #[serde(default)]
    pub metadata: NodeMetadata,
}

fn default_dimension() -> String {
    dimension::DEFAULT.to_string()
}

impl Node {
    /// Create a node in the default dimension
    pub fn new(id: impl Into<NodeId>, node_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            node_type: node_type.into(),
            dimension: default_dimension(),
            properties: HashMap::new(),
            metadata: NodeMetadata::default(),
        }
    }

    /// Set the dimension (builder pattern)
    pub fn in_dimension(mut self, dim: impl Into<String>) -> Self {
        self.dimension = dim.into();
        self
    }

    /// Add a property to the node
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// True when type, dimension and properties match (metadata is ignored).
    pub fn same_content(&self, other: &Node) -> bool {
        self.node_type == other.node_type
            && self.dimension == other.dimension
            && self.properties == other.properties
    }

    /// Fold an incoming upsert into this node under the given policy.
    ///
    /// Returns true if anything observable changed.
    pub(crate) fn merge_from(&mut self, incoming: Node, policy: NodeMergePolicy) -> bool {
        let mut merged = match policy {
            NodeMergePolicy::Replace => incoming,
            NodeMergePolicy::MergeProperties => {
                let mut properties = self.properties.clone();
                properties.extend(incoming.properties);
                Node {
                    id: incoming.id,
                    node_type: incoming.node_type,
                    dimension: incoming.dimension,
                    properties,
                    metadata: self.metadata.clone(),
                }
            }
        };

        if merged.same_content(self) {
            return false;
        }

        merged.metadata.created_at = self.metadata.created_at;
        merged.metadata.modified_at = Some(chrono::Utc::now());
        *self = merged;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derived_ids_are_stable_and_part_sensitive() {
        let a = NodeId::derive(["concept", "travel"]);
        let b = NodeId::derive(["concept", "travel"]);
        let c = NodeId::derive(["concepttravel"]);
        assert_eq!(a, b);
        assert_ne!(a, c, "part boundaries must matter");
    }

    #[test]
    fn merge_properties_unions_keys_incoming_wins() {
        let mut stored = Node::new("n", "concept")
            .with_property("label", "old")
            .with_property("source", "a.md");
        let incoming = Node::new("n", "concept").with_property("label", "new");

        assert!(stored.merge_from(incoming, NodeMergePolicy::MergeProperties));
        assert_eq!(stored.properties.get("label"), Some(&PropertyValue::from("new")));
        assert_eq!(stored.properties.get("source"), Some(&PropertyValue::from("a.md")));
        assert!(stored.metadata.modified_at.is_some());
    }

    #[test]
    fn replace_drops_missing_keys() {
        let mut stored = Node::new("n", "concept").with_property("source", "a.md");
        let incoming = Node::new("n", "concept").with_property("label", "x");

        assert!(stored.merge_from(incoming, NodeMergePolicy::Replace));
        assert!(stored.properties.get("source").is_none());
    }

    #[test]
    fn identical_upsert_reports_no_change() {
        let mut stored = Node::new("n", "concept").with_property("label", "x");
        let incoming = stored.clone();
        assert!(!stored.merge_from(incoming, NodeMergePolicy::MergeProperties));
        assert!(stored.metadata.modified_at.is_none());
    }
}
