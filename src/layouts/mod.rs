pub mod graph_engine;
pub mod layered;

mod layout;
mod orchestrator;

pub use layout::{apply_positions, Layout, LayoutRequest, LayoutResult, LayoutStrategy};
pub use orchestrator::LayoutOrchestrator;
