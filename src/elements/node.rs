use egui::Pos2;
use serde::{Deserialize, Serialize};

use super::new_id;

/// The two node kinds of a Petri net.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Place,
    Transition,
}

impl NodeKind {
    /// Kind a node must have to be connected with a node of this kind.
    pub fn opposite(self) -> Self {
        match self {
            NodeKind::Place => NodeKind::Transition,
            NodeKind::Transition => NodeKind::Place,
        }
    }
}

/// Free-form per-node payload.
///
/// Transitions use `label`, places use `initial_tokens`. Both stay optional so
/// that an absent value survives a round trip as absent rather than as a default.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_tokens: Option<u64>,
}

/// Node of the live editor graph.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Node {
    id: String,
    kind: NodeKind,
    #[serde(default)]
    data: NodeData,
    #[serde(default = "origin")]
    location: Pos2,
}

fn origin() -> Pos2 {
    Pos2::ZERO
}

impl Node {
    /// Creates a node with a freshly generated id at the origin.
    pub fn new(kind: NodeKind, data: NodeData) -> Self {
        Self::with_id(new_id(), kind, data)
    }

    /// Creates a node keeping the provided id. Used when the id already exists
    /// in some other representation, e.g. the canonical model.
    pub fn with_id(id: impl Into<String>, kind: NodeKind, data: NodeData) -> Self {
        Self {
            id: id.into(),
            kind,
            data,
            location: Pos2::ZERO,
        }
    }

    pub fn place(initial_tokens: Option<u64>) -> Self {
        Self::new(
            NodeKind::Place,
            NodeData {
                label: None,
                initial_tokens,
            },
        )
    }

    pub fn transition(label: Option<String>) -> Self {
        Self::new(
            NodeKind::Transition,
            NodeData {
                label,
                initial_tokens: None,
            },
        )
    }

    pub fn at(mut self, location: Pos2) -> Self {
        self.location = location;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn data(&self) -> &NodeData {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut NodeData {
        &mut self.data
    }

    pub fn label(&self) -> Option<&str> {
        self.data.label.as_deref()
    }

    pub fn initial_tokens(&self) -> Option<u64> {
        self.data.initial_tokens
    }

    pub fn location(&self) -> Pos2 {
        self.location
    }

    pub fn set_location(&mut self, location: Pos2) {
        self.location = location;
    }

    pub fn is_place(&self) -> bool {
        self.kind == NodeKind::Place
    }

    pub fn is_transition(&self) -> bool {
        self.kind == NodeKind::Transition
    }
}
