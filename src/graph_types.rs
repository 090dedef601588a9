//! Graph document types and an in-memory graph
//!
//! `GraphDocument` is the JSON shape the CLI reads and writes. `MemoryGraph`
//! wraps a document and implements [`LayoutGraph`] so it can be laid out
//! directly.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::graph::LayoutGraph;

/// A node in a graph document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    /// Unique identifier for the node
    pub id: String,

    /// Optional human-readable label
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    /// Horizontal position, if already placed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,

    /// Vertical position, if already placed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,

    /// Whether the node keeps its position during layout
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub pinned: bool,
}

impl GraphNode {
    /// A node with no position yet
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: None,
            x: None,
            y: None,
            pinned: false,
        }
    }

    /// Place the node at a position
    pub fn at(mut self, x: f64, y: f64) -> Self {
        self.x = Some(x);
        self.y = Some(y);
        self
    }
}

/// An edge connecting two nodes by id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphEdge {
    /// Source node ID
    pub source: String,

    /// Target node ID
    pub target: String,
}

impl GraphEdge {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
        }
    }
}

/// Complete graph document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphDocument {
    /// All nodes in the graph
    pub nodes: Vec<GraphNode>,

    /// All edges in the graph
    #[serde(default)]
    pub edges: Vec<GraphEdge>,
}

/// In-memory graph backed by a document
#[derive(Debug, Clone, Default)]
pub struct MemoryGraph {
    nodes: Vec<GraphNode>,
    edges: Vec<GraphEdge>,
    index: HashMap<String, usize>,
    degrees: Vec<usize>,
}

impl MemoryGraph {
    /// Empty graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a graph from a document. Duplicate node ids keep the first
    /// occurrence.
    pub fn from_document(document: GraphDocument) -> Self {
        let mut graph = Self::new();
        for node in document.nodes {
            if graph.index.contains_key(&node.id) {
                warn!(id = %node.id, "duplicate node id ignored");
                continue;
            }
            graph.push_node(node);
        }
        for edge in document.edges {
            graph.add_edge(edge.source, edge.target);
        }
        graph
    }

    /// Snapshot the graph, positions included, as a document
    pub fn to_document(&self) -> GraphDocument {
        GraphDocument {
            nodes: self.nodes.clone(),
            edges: self.edges.clone(),
        }
    }

    fn push_node(&mut self, node: GraphNode) {
        // Edges may name a node before it exists
        let degree = self
            .edges
            .iter()
            .flat_map(|e| [&e.source, &e.target])
            .filter(|endpoint| **endpoint == node.id)
            .count();

        self.index.insert(node.id.clone(), self.nodes.len());
        self.nodes.push(node);
        self.degrees.push(degree);
    }

    /// Add a node; returns `false` if the id already exists
    pub fn add_node(&mut self, node: GraphNode) -> bool {
        if self.index.contains_key(&node.id) {
            return false;
        }
        self.push_node(node);
        true
    }

    /// Add an edge. Endpoints that are not nodes yet are counted once they
    /// are added.
    pub fn add_edge(&mut self, source: impl Into<String>, target: impl Into<String>) {
        let edge = GraphEdge::new(source, target);
        for endpoint in [&edge.source, &edge.target] {
            if let Some(&i) = self.index.get(endpoint) {
                self.degrees[i] += 1;
            }
        }
        self.edges.push(edge);
    }

    /// Remove a node together with every edge touching it
    pub fn remove_node(&mut self, id: &str) -> Option<GraphNode> {
        let position = *self.index.get(id)?;
        let node = self.nodes.remove(position);

        let document = GraphDocument {
            nodes: std::mem::take(&mut self.nodes),
            edges: std::mem::take(&mut self.edges)
                .into_iter()
                .filter(|e| e.source != id && e.target != id)
                .collect(),
        };
        *self = Self::from_document(document);
        Some(node)
    }

    /// Pin or release a node
    pub fn set_pinned(&mut self, id: &str, pinned: bool) {
        if let Some(node) = self.node_mut(id) {
            node.pinned = pinned;
        }
    }

    /// Look up a node by id
    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.index.get(id).map(|&i| &self.nodes[i])
    }

    fn node_mut(&mut self, id: &str) -> Option<&mut GraphNode> {
        self.index.get(id).map(|&i| &mut self.nodes[i])
    }

    /// Number of nodes
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of edges
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }
}

impl LayoutGraph for MemoryGraph {
    type NodeId = String;

    fn nodes(&self) -> impl Iterator<Item = String> + '_ {
        self.nodes.iter().map(|n| n.id.clone())
    }

    fn position(&self, id: &String) -> Option<(f64, f64)> {
        let node = self.node(id)?;
        Some((node.x?, node.y?))
    }

    fn set_position(&mut self, id: &String, x: f64, y: f64) {
        if let Some(node) = self.node_mut(id) {
            node.x = Some(x);
            node.y = Some(y);
        }
    }

    fn degree(&self, id: &String) -> usize {
        self.index.get(id).map_or(0, |&i| self.degrees[i])
    }

    fn edges(&self) -> impl Iterator<Item = (String, String)> + '_ {
        self.edges
            .iter()
            .map(|e| (e.source.clone(), e.target.clone()))
    }

    fn is_pinned(&self, id: &String) -> bool {
        self.node(id).is_some_and(|n| n.pinned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle() -> MemoryGraph {
        MemoryGraph::from_document(GraphDocument {
            nodes: vec![
                GraphNode::new("a").at(0.0, 0.0),
                GraphNode::new("b"),
                GraphNode::new("c"),
            ],
            edges: vec![
                GraphEdge::new("a", "b"),
                GraphEdge::new("b", "c"),
                GraphEdge::new("c", "a"),
            ],
        })
    }

    #[test]
    fn degrees_count_endpoints() {
        let mut graph = triangle();
        assert_eq!(graph.degree(&"a".to_string()), 2);

        graph.add_edge("a", "a");
        assert_eq!(graph.degree(&"a".to_string()), 4);
        assert_eq!(graph.degree(&"missing".to_string()), 0);
    }

    #[test]
    fn dangling_edges_are_kept_without_degree() {
        let mut graph = triangle();
        graph.add_edge("a", "ghost");

        assert_eq!(graph.edge_count(), 4);
        assert_eq!(graph.degree(&"a".to_string()), 3);
    }

    #[test]
    fn edges_added_before_their_nodes_count_toward_degree() {
        let mut graph = MemoryGraph::new();
        graph.add_edge("a", "b");
        graph.add_edge("b", "c");
        graph.add_edge("b", "b");
        graph.add_node(GraphNode::new("a"));
        graph.add_node(GraphNode::new("b"));

        assert_eq!(graph.degree(&"a".to_string()), 1);
        assert_eq!(graph.degree(&"b".to_string()), 4);

        graph.add_node(GraphNode::new("c"));
        assert_eq!(graph.degree(&"c".to_string()), 1);
        assert_eq!(graph.degree(&"b".to_string()), 4);
    }

    #[test]
    fn positions_roundtrip_through_the_trait() {
        let mut graph = triangle();
        assert_eq!(graph.position(&"a".to_string()), Some((0.0, 0.0)));
        assert_eq!(graph.position(&"b".to_string()), None);

        graph.set_position(&"b".to_string(), 3.0, -4.0);
        assert_eq!(graph.position(&"b".to_string()), Some((3.0, -4.0)));

        let doc = graph.to_document();
        assert_eq!(doc.nodes[1].x, Some(3.0));
    }

    #[test]
    fn duplicate_ids_keep_first() {
        let graph = MemoryGraph::from_document(GraphDocument {
            nodes: vec![GraphNode::new("a").at(1.0, 1.0), GraphNode::new("a").at(9.0, 9.0)],
            edges: vec![],
        });
        assert_eq!(graph.node_count(), 1);
        assert_eq!(graph.position(&"a".to_string()), Some((1.0, 1.0)));
    }

    #[test]
    fn removing_a_node_drops_its_edges() {
        let mut graph = triangle();
        let removed = graph.remove_node("b").unwrap();

        assert_eq!(removed.id, "b");
        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.edge_count(), 1);
        assert_eq!(graph.degree(&"a".to_string()), 1);
        assert!(graph.remove_node("b").is_none());
    }

    #[test]
    fn pinning_is_reported() {
        let mut graph = triangle();
        assert!(!graph.is_pinned(&"a".to_string()));
        graph.set_pinned("a", true);
        assert!(graph.is_pinned(&"a".to_string()));
    }

    #[test]
    fn document_parses_minimal_json() {
        let json = r#"{
            "nodes": [{"id": "a", "x": 1.5, "y": 2.5}, {"id": "b", "pinned": true}],
            "edges": [{"source": "a", "target": "b"}]
        }"#;
        let doc: GraphDocument = serde_json::from_str(json).unwrap();
        assert_eq!(doc.nodes[0].x, Some(1.5));
        assert!(doc.nodes[1].pinned);
        assert_eq!(doc.edges.len(), 1);

        let out = serde_json::to_string(&GraphDocument {
            nodes: vec![GraphNode::new("z")],
            edges: vec![],
        })
        .unwrap();
        assert_eq!(out, r#"{"nodes":[{"id":"z"}],"edges":[]}"#);
    }
}
