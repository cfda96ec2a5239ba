use std::collections::HashMap;

use egui::Pos2;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{graph::GraphSnapshot, Edge, Node};

/// Which computation produces node positions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum LayoutStrategy {
    /// In-process layered layout.
    #[default]
    Layered,
    /// Graph description from the worker, positions from the graph drawing engine.
    GraphEngine,
}

/// Input of a layout computation: a copy of the graph and the ticket the
/// editor issued for it.
#[derive(Debug, Clone)]
pub struct LayoutRequest {
    pub ticket: u64,
    pub snapshot: GraphSnapshot,
}

/// Node centers keyed by node id.
#[derive(Debug, Clone, Default)]
pub struct LayoutResult {
    pub ticket: u64,
    pub positions: HashMap<String, Pos2>,
}

/// Layout computed synchronously from nodes and edges.
pub trait Layout {
    /// Computes node centers keyed by node id. Must not depend on the current
    /// node locations.
    fn positions(&self, nodes: &[Node], edges: &[Edge]) -> HashMap<String, Pos2>;
}

/// Writes positions onto `nodes`. Nodes without a position keep their
/// location; that is reported, never treated as an error. Returns the number
/// of updated nodes.
pub fn apply_positions(nodes: &mut [Node], positions: &HashMap<String, Pos2>) -> usize {
    let mut applied = 0;
    for n in nodes {
        if let Some(pos) = positions.get(n.id()) {
            n.set_location(*pos);
            applied += 1;
        } else {
            warn!(node = n.id(), "node not found in layout result");
        }
    }
    applied
}
