mod actions;
mod editor;
mod elements;
mod error;
mod graph;
mod settings;
mod storage;

pub mod bridge;
pub mod layouts;
pub mod model;
pub mod worker;

pub use self::actions::NetActions;
pub use self::editor::{Connection, EditorState};
pub use self::elements::{new_id, Edge, Node, NodeData, NodeKind, EDGE_TYPE};
pub use self::error::{ActionError, LayoutError, ModelError, WorkerError};
pub use self::graph::{Graph, GraphSnapshot};
pub use self::settings::{EditorSettings, GraphEngineSettings, LayeredSettings, Orientation};
pub use self::storage::{FileStore, MemoryStore, StateStore};
