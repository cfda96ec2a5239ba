use serde::{Deserialize, Serialize};

use super::{new_id, NodeKind};

/// Visual tag shared by every edge of the editor.
pub const EDGE_TYPE: &str = "custom";

/// Directed edge of the live editor graph. Endpoints are node ids.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    id: String,
    source: String,
    target: String,
    /// Handle tags are only used while an interactive connection is made.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    source_handle: Option<NodeKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    target_handle: Option<NodeKind>,
}

impl Edge {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self::with_id(new_id(), source, target)
    }

    pub fn with_id(
        id: impl Into<String>,
        source: impl Into<String>,
        target: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            target: target.into(),
            source_handle: None,
            target_handle: None,
        }
    }

    pub fn with_handles(mut self, source: Option<NodeKind>, target: Option<NodeKind>) -> Self {
        self.source_handle = source;
        self.target_handle = target;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn endpoints(&self) -> (&str, &str) {
        (self.source.as_str(), self.target.as_str())
    }

    pub fn source_handle(&self) -> Option<NodeKind> {
        self.source_handle
    }

    pub fn target_handle(&self) -> Option<NodeKind> {
        self.target_handle
    }

    pub fn edge_type(&self) -> &'static str {
        EDGE_TYPE
    }
}
