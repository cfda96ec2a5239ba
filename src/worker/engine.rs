use thiserror::Error;

/// Failure reported by the hosted engine. The message is passed through untouched.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct EngineError(pub String);

impl From<String> for EngineError {
    fn from(msg: String) -> Self {
        Self(msg)
    }
}

impl From<&str> for EngineError {
    fn from(msg: &str) -> Self {
        Self(msg.to_string())
    }
}

/// Compiled engine hosted by the worker.
///
/// Every payload is opaque to the worker: canonical models travel as JSON text,
/// event logs as raw bytes, exchange formats (PNML) as text. The engine is
/// constructed on the worker thread and never leaves it, so it does not need to
/// be `Send`.
pub trait Engine {
    /// Called exactly once before any other method.
    fn init(&mut self) -> Result<(), EngineError>;

    /// Discovers a net from an event log, returns the canonical model as JSON.
    fn discover_from_event_log(
        &mut self,
        log: &[u8],
        is_compressed: bool,
    ) -> Result<String, EngineError>;

    /// Converts a canonical model into a graph description (DOT).
    fn to_graph_description(&mut self, net_json: &str) -> Result<String, EngineError>;

    /// Parses an exchange format document into a canonical model.
    fn import_format(&mut self, text: &str) -> Result<String, EngineError>;

    /// Writes a canonical model as an exchange format document.
    fn export_format(&mut self, net_json: &str) -> Result<String, EngineError>;
}
