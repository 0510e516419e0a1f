//! Query types and result structures

use crate::graph::{Edge, Node};
use serde::Serialize;
use std::str::FromStr;

/// Direction for edge traversal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Follow outgoing edges (source -> target)
    #[default]
    Outgoing,
    /// Follow incoming edges (target <- source)
    Incoming,
}

impl FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "out" | "outgoing" => Ok(Self::Outgoing),
            "in" | "incoming" => Ok(Self::Incoming),
            other => Err(format!("unknown direction '{}' (expected 'in' or 'out')", other)),
        }
    }
}

/// Result of a find query
#[derive(Debug, Clone, Serialize)]
pub struct QueryResult {
    /// Nodes matching the query
    pub nodes: Vec<Node>,
    /// Total count (may differ from nodes.len() if limit applied)
    pub total_count: usize,
}

impl QueryResult {
    pub fn empty() -> Self {
        Self {
            nodes: Vec::new(),
            total_count: 0,
        }
    }

    pub fn from_nodes(nodes: Vec<Node>) -> Self {
        let total_count = nodes.len();
        Self { nodes, total_count }
    }
}

/// What one traversal step reached
#[derive(Debug, Clone, Default, Serialize)]
pub struct StepLevel {
    /// Nodes reached by this step; the next step's frontier
    pub nodes: Vec<Node>,
    /// Edges this step followed
    pub edges: Vec<Edge>,
}

impl StepLevel {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
