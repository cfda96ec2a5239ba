//! Isolated computation worker hosting the format conversion and discovery
//! engine.

mod bridge;
mod engine;
mod status;

pub use self::bridge::WorkerBridge;
pub use self::engine::{Engine, EngineError};
pub use self::status::WorkerStatus;
