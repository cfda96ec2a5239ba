use thiserror::Error;

use crate::worker::WorkerStatus;

/// Live graph could not be turned into a canonical model or the other way round.
#[derive(Error, Debug)]
pub enum ModelError {
    /// Both endpoints of an edge have the same kind.
    #[error("edge {edge} connects two nodes of the same kind")]
    SameKindArc { edge: String },

    /// Edge references a node that is not part of the graph.
    #[error("edge {edge} references unknown node {node}")]
    DanglingEdge { edge: String, node: String },

    /// Same id is used by a place and a transition.
    #[error("id {id} is used by both a place and a transition")]
    DuplicateId { id: String },

    /// Arc endpoints do not match the places and transitions of the net.
    #[error("arc {from} -> {to} does not match the net's places and transitions")]
    InvalidArc { from: String, to: String },

    #[error("invalid canonical model json: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors of the computation worker.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WorkerError {
    /// Call made while the worker was not initialized.
    #[error("worker is not available (status: {0})")]
    Unavailable(WorkerStatus),

    /// Hosted engine raised or returned malformed output.
    #[error("engine failure: {0}")]
    Engine(String),

    /// Worker thread is gone.
    #[error("worker disconnected")]
    Disconnected,
}

/// Errors of layout computations.
#[derive(Error, Debug)]
pub enum LayoutError {
    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Worker(#[from] WorkerError),

    #[error("graph drawing failed: {0}")]
    Drawing(String),

    #[error("graph drawing io: {0}")]
    Io(#[from] std::io::Error),

    #[error("layout task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Errors of the composed editor flows.
#[derive(Error, Debug)]
pub enum ActionError {
    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Worker(#[from] WorkerError),

    #[error(transparent)]
    Layout(#[from] LayoutError),
}
