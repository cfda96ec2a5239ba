use std::{collections::HashMap, process::Stdio};

use async_trait::async_trait;
use egui::Pos2;
use serde::Deserialize;
use tokio::{io::AsyncWriteExt, process::Command};
use tracing::{debug, warn};

use crate::{error::LayoutError, settings::GraphEngineSettings};

/// Output format of a rendered image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImageFormat {
    #[default]
    Svg,
    Png,
}

impl ImageFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ImageFormat::Svg => "svg",
            ImageFormat::Png => "png",
        }
    }
}

/// Engine that turns a graph description (DOT) into node positions or images.
#[async_trait]
pub trait GraphDrawing: Send + Sync {
    /// Positions keyed by the node names used in the description.
    async fn positions(&self, description: &str) -> Result<HashMap<String, Pos2>, LayoutError>;

    /// Renders the description. The bytes are opaque to the caller.
    async fn render(&self, description: &str, format: ImageFormat)
        -> Result<Vec<u8>, LayoutError>;
}

/// Runs the Graphviz `dot` executable.
#[derive(Debug, Clone)]
pub struct GraphvizCommand {
    program: String,
}

impl Default for GraphvizCommand {
    fn default() -> Self {
        Self::from_settings(&GraphEngineSettings::default())
    }
}

impl GraphvizCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Uses the executable configured in `settings`.
    pub fn from_settings(settings: &GraphEngineSettings) -> Self {
        Self::new(settings.dot_command.clone())
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    async fn run(&self, description: &str, output_format: &str) -> Result<Vec<u8>, LayoutError> {
        debug!(program = %self.program, output_format, "running graphviz");

        let mut child = Command::new(&self.program)
            .arg(format!("-T{output_format}"))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| LayoutError::Drawing("graphviz stdin unavailable".to_string()))?;
        let input = description.as_bytes().to_vec();
        let write = async move {
            stdin.write_all(&input).await?;
            stdin.shutdown().await
        };

        let (written, output) = tokio::join!(write, child.wait_with_output());
        let output = output?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            warn!(status = %output.status, %stderr, "graphviz failed");
            return Err(LayoutError::Drawing(if stderr.is_empty() {
                output.status.to_string()
            } else {
                stderr
            }));
        }
        written?;

        Ok(output.stdout)
    }
}

#[async_trait]
impl GraphDrawing for GraphvizCommand {
    async fn positions(&self, description: &str) -> Result<HashMap<String, Pos2>, LayoutError> {
        let out = self.run(description, "json").await?;
        let text = String::from_utf8_lossy(&out);
        parse_json_positions(&text)
    }

    async fn render(
        &self,
        description: &str,
        format: ImageFormat,
    ) -> Result<Vec<u8>, LayoutError> {
        self.run(description, format.extension()).await
    }
}

#[derive(Deserialize)]
struct JsonGraph {
    #[serde(default)]
    objects: Vec<JsonObject>,
}

#[derive(Deserialize)]
struct JsonObject {
    name: String,
    pos: Option<String>,
}

/// Extracts node positions from Graphviz `-Tjson` output.
///
/// Objects without a position (clusters, subgraphs) or with a position that is
/// not `"x,y"` are skipped.
pub fn parse_json_positions(text: &str) -> Result<HashMap<String, Pos2>, LayoutError> {
    let graph: JsonGraph = serde_json::from_str(text)
        .map_err(|e| LayoutError::Drawing(format!("unreadable graphviz json: {e}")))?;

    Ok(graph
        .objects
        .into_iter()
        .filter_map(|o| {
            let pos = parse_point(o.pos.as_deref()?);
            if pos.is_none() {
                debug!(name = %o.name, "skipping object without usable position");
            }
            Some((o.name, pos?))
        })
        .collect())
}

fn parse_point(s: &str) -> Option<Pos2> {
    let (x, y) = s.split_once(',')?;
    Some(Pos2::new(x.trim().parse().ok()?, y.trim().parse().ok()?))
}
