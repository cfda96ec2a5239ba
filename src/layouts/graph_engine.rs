mod graphviz;

pub use graphviz::{parse_json_positions, GraphDrawing, GraphvizCommand, ImageFormat};
