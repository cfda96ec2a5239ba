mod edge;
mod node;

pub use self::edge::{Edge, EDGE_TYPE};
pub use self::node::{Node, NodeData, NodeKind};

/// Generates a fresh process-unique identifier for nodes and edges.
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
