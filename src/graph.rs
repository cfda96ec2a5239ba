use std::collections::HashMap;

use petgraph::{
    stable_graph::{EdgeIndex, NodeIndex, StableGraph},
    visit::{EdgeRef, IntoEdgeReferences},
    Direction,
};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{Edge, Node};

/// Serializable copy of the whole live graph.
///
/// This is what gets persisted after every mutation and what layout
/// computations consume, so they never borrow the live graph across an await.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphSnapshot {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

/// Wrapper around [`petgraph::stable_graph::StableGraph`] addressing nodes and
/// edges by their string ids.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "GraphSnapshot", into = "GraphSnapshot")]
pub struct Graph {
    g: StableGraph<Node, Edge>,

    nodes_by_id: HashMap<String, NodeIndex>,
    edges_by_id: HashMap<String, EdgeIndex>,
}

impl From<GraphSnapshot> for Graph {
    fn from(s: GraphSnapshot) -> Self {
        Self::from_parts(s.nodes, s.edges)
    }
}

impl From<Graph> for GraphSnapshot {
    fn from(g: Graph) -> Self {
        g.snapshot()
    }
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a graph from loose parts. Edges pointing at unknown nodes and
    /// duplicate ids are dropped with a warning.
    pub fn from_parts(
        nodes: impl IntoIterator<Item = Node>,
        edges: impl IntoIterator<Item = Edge>,
    ) -> Self {
        let mut g = Self::new();
        for n in nodes {
            g.add_node(n);
        }
        for e in edges {
            if g.add_edge(e.clone()).is_none() {
                warn!(edge = e.id(), "dropping edge with unknown endpoints");
            }
        }
        g
    }

    pub fn g(&self) -> &StableGraph<Node, Edge> {
        &self.g
    }

    /// Adds node to the graph. If a node with the same id already exists the
    /// new one is ignored and the index of the existing node is returned.
    pub fn add_node(&mut self, node: Node) -> NodeIndex {
        if let Some(idx) = self.nodes_by_id.get(node.id()) {
            warn!(node = node.id(), "node id already present");
            return *idx;
        }

        let id = node.id().to_string();
        let idx = self.g.add_node(node);
        self.nodes_by_id.insert(id, idx);
        idx
    }

    /// Adds edge between its source and target nodes. Returns `None` if one
    /// of them does not exist or the edge id is taken.
    pub fn add_edge(&mut self, edge: Edge) -> Option<EdgeIndex> {
        if self.edges_by_id.contains_key(edge.id()) {
            return None;
        }
        let start = *self.nodes_by_id.get(edge.source())?;
        let end = *self.nodes_by_id.get(edge.target())?;

        let id = edge.id().to_string();
        let idx = self.g.add_edge(start, end, edge);
        self.edges_by_id.insert(id, idx);
        Some(idx)
    }

    /// Removes node by id together with all its edges.
    pub fn remove_node(&mut self, id: &str) -> Option<Node> {
        let idx = self.nodes_by_id.remove(id)?;

        let incident = self
            .g
            .edges_directed(idx, Direction::Outgoing)
            .chain(self.g.edges_directed(idx, Direction::Incoming))
            .map(|e| e.weight().id().to_string())
            .collect::<Vec<_>>();
        for e in &incident {
            self.edges_by_id.remove(e);
        }

        self.g.remove_node(idx)
    }

    pub fn remove_edge(&mut self, id: &str) -> Option<Edge> {
        let idx = self.edges_by_id.remove(id)?;
        self.g.remove_edge(idx)
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes_by_id.get(id).and_then(|idx| self.g.node_weight(*idx))
    }

    pub fn node_mut(&mut self, id: &str) -> Option<&mut Node> {
        let idx = *self.nodes_by_id.get(id)?;
        self.g.node_weight_mut(idx)
    }

    pub fn edge(&self, id: &str) -> Option<&Edge> {
        self.edges_by_id.get(id).and_then(|idx| self.g.edge_weight(*idx))
    }

    pub fn contains_node(&self, id: &str) -> bool {
        self.nodes_by_id.contains_key(id)
    }

    /// Returns iterator over all edges going from `source` to `target`.
    pub fn edges_connecting<'a>(
        &'a self,
        source: &str,
        target: &str,
    ) -> impl Iterator<Item = &'a Edge> {
        let ends = self
            .nodes_by_id
            .get(source)
            .zip(self.nodes_by_id.get(target))
            .map(|(a, b)| (*a, *b));
        ends.into_iter()
            .flat_map(move |(a, b)| self.g.edges_connecting(a, b).map(|e| e.weight()))
    }

    /// Provides iterator over all nodes in insertion order.
    pub fn nodes_iter(&self) -> impl Iterator<Item = &Node> {
        self.g.node_weights()
    }

    /// Provides iterator over all edges in insertion order.
    pub fn edges_iter(&self) -> impl Iterator<Item = &Edge> {
        self.g.edge_references().map(|e| e.weight())
    }

    pub fn node_count(&self) -> usize {
        self.g.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.g.edge_count()
    }

    pub fn is_empty(&self) -> bool {
        self.g.node_count() == 0
    }

    pub fn snapshot(&self) -> GraphSnapshot {
        GraphSnapshot {
            nodes: self.nodes_iter().cloned().collect(),
            edges: self.edges_iter().cloned().collect(),
        }
    }
}
