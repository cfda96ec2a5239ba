use std::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle of the computation worker.
///
/// `Uninitialized -> Initializing -> Ready`, or `Initializing -> Error`.
/// While calls are in flight a ready worker reports `Busy`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerStatus {
    #[default]
    Uninitialized,
    Initializing,
    Ready,
    Busy,
    Error,
}

impl WorkerStatus {
    /// Whether calls are accepted.
    pub fn is_available(self) -> bool {
        matches!(self, WorkerStatus::Ready | WorkerStatus::Busy)
    }

    /// Whether initialization is over, successfully or not.
    pub fn is_settled(self) -> bool {
        matches!(
            self,
            WorkerStatus::Ready | WorkerStatus::Busy | WorkerStatus::Error
        )
    }
}

impl fmt::Display for WorkerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            WorkerStatus::Uninitialized => "uninitialized",
            WorkerStatus::Initializing => "initializing",
            WorkerStatus::Ready => "ready",
            WorkerStatus::Busy => "busy",
            WorkerStatus::Error => "error",
        };
        f.write_str(s)
    }
}
