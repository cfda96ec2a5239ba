use egui::Vec2;
use serde::{Deserialize, Serialize};

/// Primary direction along which layers of the layered layout grow.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum Orientation {
    /// Layers grow to the right.
    #[default]
    LeftRight,
    /// Layers grow downward.
    TopDown,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayeredSettings {
    pub orientation: Orientation,

    /// Gap between two consecutive layers.
    pub layer_spacing: f32,

    /// Gap between two nodes of the same layer.
    pub node_spacing: f32,

    /// Extra gap kept between a node and an edge passing through its layer.
    pub edge_node_spacing: f32,

    /// Bounding box used for transitions.
    pub transition_size: Vec2,

    /// Bounding box used for places.
    pub place_size: Vec2,

    /// Number of barycenter sweeps used to reduce crossings.
    pub sweeps: usize,
}

impl Default for LayeredSettings {
    fn default() -> Self {
        Self {
            orientation: Orientation::LeftRight,
            layer_spacing: 100.,
            node_spacing: 50.,
            edge_node_spacing: 50.,
            transition_size: Vec2::new(130., 64.),
            place_size: Vec2::new(66., 66.),
            sweeps: 4,
        }
    }
}

impl LayeredSettings {
    pub fn with_orientation(mut self, orientation: Orientation) -> Self {
        self.orientation = orientation;
        self
    }

    pub fn with_layer_spacing(mut self, spacing: f32) -> Self {
        self.layer_spacing = spacing;
        self
    }

    pub fn with_node_spacing(mut self, spacing: f32) -> Self {
        self.node_spacing = spacing;
        self
    }

    pub fn with_sweeps(mut self, sweeps: usize) -> Self {
        self.sweeps = sweeps;
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphEngineSettings {
    /// Multiplier applied to engine coordinates, which use a tight unit spacing.
    pub scale: f32,

    /// Graphviz executable used for positions and image rendering.
    pub dot_command: String,
}

impl Default for GraphEngineSettings {
    fn default() -> Self {
        Self {
            scale: 2.,
            dot_command: "dot".to_string(),
        }
    }
}

impl GraphEngineSettings {
    pub fn with_scale(mut self, scale: f32) -> Self {
        self.scale = scale;
        self
    }

    pub fn with_dot_command(mut self, cmd: impl Into<String>) -> Self {
        self.dot_command = cmd.into();
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EditorSettings {
    /// Key under which the live graph is persisted.
    pub storage_key: String,

    /// Label of the transition in the starter graph.
    pub starter_label: String,

    /// Label given to transitions added from the toolbar.
    pub new_transition_label: String,

    /// Label given to transitions created by dropping a connection on the pane.
    pub dropped_transition_label: String,
}

impl Default for EditorSettings {
    fn default() -> Self {
        Self {
            storage_key: "pn-editor".to_string(),
            starter_label: "Place Order".to_string(),
            new_transition_label: "New".to_string(),
            dropped_transition_label: "New Node".to_string(),
        }
    }
}

impl EditorSettings {
    pub fn with_storage_key(mut self, key: impl Into<String>) -> Self {
        self.storage_key = key.into();
        self
    }
}
