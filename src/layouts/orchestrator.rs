use std::{collections::HashMap, sync::Arc};

use egui::Pos2;
use instant::Instant;
use tracing::{debug, warn};

use super::{
    graph_engine::GraphDrawing, layered::Layered, Layout, LayoutRequest, LayoutResult,
    LayoutStrategy,
};
use crate::{
    bridge::to_canonical,
    error::LayoutError,
    graph::GraphSnapshot,
    settings::{GraphEngineSettings, LayeredSettings},
    worker::{WorkerBridge, WorkerStatus},
};

/// Dispatches layout requests to the selected strategy.
///
/// The layered strategy is always available. The graph engine strategy needs
/// a worker and a drawing engine; see [`LayoutOrchestrator::with_graph_engine`].
#[derive(Clone)]
pub struct LayoutOrchestrator {
    layered: Layered,
    engine_settings: GraphEngineSettings,
    worker: Option<Arc<WorkerBridge>>,
    drawing: Option<Arc<dyn GraphDrawing>>,
}

impl Default for LayoutOrchestrator {
    fn default() -> Self {
        Self::new(LayeredSettings::default())
    }
}

impl std::fmt::Debug for LayoutOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LayoutOrchestrator")
            .field("layered", &self.layered)
            .field("engine_settings", &self.engine_settings)
            .field("worker", &self.worker)
            .field("drawing", &self.drawing.is_some())
            .finish()
    }
}

impl LayoutOrchestrator {
    pub fn new(settings: LayeredSettings) -> Self {
        Self {
            layered: Layered::new(settings),
            engine_settings: GraphEngineSettings::default(),
            worker: None,
            drawing: None,
        }
    }

    pub fn with_graph_engine(
        mut self,
        worker: Arc<WorkerBridge>,
        drawing: Arc<dyn GraphDrawing>,
        settings: GraphEngineSettings,
    ) -> Self {
        self.worker = Some(worker);
        self.drawing = Some(drawing);
        self.engine_settings = settings;
        self
    }

    pub fn layered(&self) -> &Layered {
        &self.layered
    }

    /// Computes positions for the snapshot in `request`. The result carries
    /// the request's ticket.
    pub async fn layout(
        &self,
        request: LayoutRequest,
        strategy: LayoutStrategy,
    ) -> Result<LayoutResult, LayoutError> {
        let LayoutRequest { ticket, snapshot } = request;
        let start = Instant::now();

        let positions = match (strategy, self.graph_engine()) {
            (LayoutStrategy::Layered, _) => self.run_layered(snapshot).await?,
            (LayoutStrategy::GraphEngine, Some((worker, drawing))) => {
                let status = worker.status();
                if status == WorkerStatus::Error {
                    warn!("worker failed, falling back to layered layout");
                    self.run_layered(snapshot).await?
                } else {
                    self.run_graph_engine(&snapshot, worker, drawing).await?
                }
            }
            (LayoutStrategy::GraphEngine, None) => {
                warn!("no graph engine configured, falling back to layered layout");
                self.run_layered(snapshot).await?
            }
        };

        debug!(
            ticket,
            ?strategy,
            nodes = positions.len(),
            elapsed_ms = start.elapsed().as_millis(),
            "layout computed"
        );
        Ok(LayoutResult { ticket, positions })
    }

    fn graph_engine(&self) -> Option<(&WorkerBridge, &dyn GraphDrawing)> {
        Some((self.worker.as_deref()?, self.drawing.as_deref()?))
    }

    async fn run_layered(
        &self,
        snapshot: GraphSnapshot,
    ) -> Result<HashMap<String, Pos2>, LayoutError> {
        let layered = self.layered.clone();
        let positions = tokio::task::spawn_blocking(move || {
            layered.positions(&snapshot.nodes, &snapshot.edges)
        })
        .await?;
        Ok(positions)
    }

    async fn run_graph_engine(
        &self,
        snapshot: &GraphSnapshot,
        worker: &WorkerBridge,
        drawing: &dyn GraphDrawing,
    ) -> Result<HashMap<String, Pos2>, LayoutError> {
        let net = to_canonical(&snapshot.nodes, &snapshot.edges)?;
        let description = worker.to_graph_description(net.to_json()?).await?;
        let raw = drawing.positions(&description).await?;

        let scale = self.engine_settings.scale;
        Ok(snapshot
            .nodes
            .iter()
            .filter_map(|n| {
                let p = raw.get(n.id())?;
                Some((n.id().to_string(), Pos2::new(p.x * scale, p.y * scale)))
            })
            .collect())
    }
}
