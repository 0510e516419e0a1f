//! Node lookup by type, dimension, properties and supporting producer

use super::types::QueryResult;
use crate::graph::{Context, Node, NodeId, PropertyValue};
use std::collections::HashSet;

/// One condition a node must satisfy
#[derive(Debug, Clone, PartialEq)]
pub enum NodeFilter {
    NodeType(String),
    Dimension(String),
    HasProperty(String),
    PropertyEquals(String, PropertyValue),
    /// Node touches at least one edge carrying this producer's contribution
    SupportedBy(String),
}

/// Conjunction of filters plus pagination.
///
/// Matches are ordered by node id so that `offset` pages are stable
/// across calls against an unchanged context.
#[derive(Debug, Clone, Default)]
pub struct FindQuery {
    filters: Vec<NodeFilter>,
    limit: Option<usize>,
    offset: usize,
}

impl FindQuery {
    /// An empty query matches every node
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, filter: NodeFilter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn with_node_type(self, node_type: impl Into<String>) -> Self {
        self.filter(NodeFilter::NodeType(node_type.into()))
    }

    pub fn with_dimension(self, dimension: impl Into<String>) -> Self {
        self.filter(NodeFilter::Dimension(dimension.into()))
    }

    pub fn with_property(self, key: impl Into<String>) -> Self {
        self.filter(NodeFilter::HasProperty(key.into()))
    }

    pub fn with_property_value(self, key: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.filter(NodeFilter::PropertyEquals(key.into(), value.into()))
    }

    pub fn supported_by(self, producer_id: impl Into<String>) -> Self {
        self.filter(NodeFilter::SupportedBy(producer_id.into()))
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    pub fn filters(&self) -> &[NodeFilter] {
        &self.filters
    }

    pub fn execute(&self, context: &Context) -> QueryResult {
        let supported = self.supported_nodes(context);
        let mut matched: Vec<&Node> = context
            .nodes()
            .filter(|node| self.filters.iter().all(|f| passes(f, node, &supported)))
            .collect();
        matched.sort_by(|a, b| a.id.cmp(&b.id));

        let total_count = matched.len();
        let nodes = matched
            .into_iter()
            .skip(self.offset)
            .take(self.limit.unwrap_or(usize::MAX))
            .cloned()
            .collect();

        QueryResult { nodes, total_count }
    }

    /// Endpoints of edges supported by every `SupportedBy` producer named
    fn supported_nodes<'a>(&self, context: &'a Context) -> Option<HashSet<&'a NodeId>> {
        let producers: Vec<&str> = self
            .filters
            .iter()
            .filter_map(|f| match f {
                NodeFilter::SupportedBy(p) => Some(p.as_str()),
                _ => None,
            })
            .collect();
        if producers.is_empty() {
            return None;
        }

        let mut endpoints: Option<HashSet<&NodeId>> = None;
        for producer in producers {
            let touched: HashSet<&NodeId> = context
                .edges()
                .filter(|e| e.contribution(producer).is_some())
                .flat_map(|e| [&e.source, &e.target])
                .collect();
            endpoints = Some(match endpoints {
                Some(prior) => prior.intersection(&touched).copied().collect(),
                None => touched,
            });
        }
        endpoints
    }
}

fn passes(filter: &NodeFilter, node: &Node, supported: &Option<HashSet<&NodeId>>) -> bool {
    match filter {
        NodeFilter::NodeType(t) => &node.node_type == t,
        NodeFilter::Dimension(d) => &node.dimension == d,
        NodeFilter::HasProperty(key) => node.properties.contains_key(key),
        NodeFilter::PropertyEquals(key, value) => node.properties.get(key) == Some(value),
        NodeFilter::SupportedBy(_) => supported.as_ref().is_some_and(|s| s.contains(&node.id)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{dimension, EdgeUpsert, Emission, NodeMergePolicy};

    fn fixture() -> Context {
        let mut ctx = Context::new("test");
        let emission = Emission::new()
            .with_node(
                Node::new("fn:a", "function")
                    .in_dimension(dimension::STRUCTURE)
                    .with_property("language", "rust"),
            )
            .with_node(
                Node::new("fn:b", "function")
                    .in_dimension(dimension::STRUCTURE)
                    .with_property("language", "python"),
            )
            .with_node(Node::new("class:c", "class").in_dimension(dimension::STRUCTURE))
            .with_node(Node::new("concept:d", "concept").in_dimension(dimension::SEMANTIC))
            .with_edge(EdgeUpsert::new("fn:a", "class:c", "calls", 1.0));
        ctx.commit("parser", emission, NodeMergePolicy::default()).unwrap();
        ctx.commit(
            "linker",
            Emission::new().with_edge(EdgeUpsert::new("fn:b", "class:c", "calls", 2.0)),
            NodeMergePolicy::default(),
        )
        .unwrap();
        ctx
    }

    fn ids(result: &QueryResult) -> Vec<&str> {
        result.nodes.iter().map(|n| n.id.as_str()).collect()
    }

    #[test]
    fn empty_query_matches_everything() {
        let result = FindQuery::new().execute(&fixture());
        assert_eq!(result.total_count, 4);
        assert_eq!(ids(&result), vec!["class:c", "concept:d", "fn:a", "fn:b"]);
    }

    #[test]
    fn filters_are_conjunctive() {
        let ctx = fixture();
        let functions = FindQuery::new().with_node_type("function").execute(&ctx);
        assert_eq!(functions.total_count, 2);

        let rust = FindQuery::new()
            .with_node_type("function")
            .with_property_value("language", "rust")
            .execute(&ctx);
        assert_eq!(ids(&rust), vec!["fn:a"]);

        let none = FindQuery::new()
            .with_dimension(dimension::SEMANTIC)
            .with_property("language")
            .execute(&ctx);
        assert_eq!(none.total_count, 0);
    }

    #[test]
    fn supported_by_follows_contributions() {
        let ctx = fixture();
        let parser = FindQuery::new().supported_by("parser").execute(&ctx);
        assert_eq!(ids(&parser), vec!["class:c", "fn:a"]);

        let both = FindQuery::new()
            .supported_by("parser")
            .supported_by("linker")
            .execute(&ctx);
        assert_eq!(ids(&both), vec!["class:c"]);

        let unknown = FindQuery::new().supported_by("nobody").execute(&ctx);
        assert!(unknown.nodes.is_empty());
    }

    #[test]
    fn pagination_keeps_total_count() {
        let ctx = fixture();
        let page = FindQuery::new().offset(1).limit(2).execute(&ctx);
        assert_eq!(ids(&page), vec!["concept:d", "fn:a"]);
        assert_eq!(page.total_count, 4);

        let past_end = FindQuery::new().offset(10).execute(&ctx);
        assert!(past_end.nodes.is_empty());
        assert_eq!(past_end.total_count, 4);
    }
}
