//! Editor flows that need the worker: discovery, exchange format import and
//! export, image export and layout.
//!
//! None of them borrows the [`EditorState`](crate::EditorState). Inputs are
//! snapshots or payloads, outputs are handed back to the editor with
//! `replace` or `apply_layout`, so editing goes on while a flow is pending.

use std::sync::Arc;

use tracing::{debug, info};

use crate::{
    bridge::{from_canonical, to_canonical},
    error::ActionError,
    graph::GraphSnapshot,
    layouts::{
        apply_positions,
        graph_engine::{GraphDrawing, GraphvizCommand, ImageFormat},
        Layout, LayoutOrchestrator, LayoutRequest, LayoutResult, LayoutStrategy,
    },
    model::PetriNet,
    settings::{GraphEngineSettings, LayeredSettings},
    worker::WorkerBridge,
    Edge, Node,
};

/// Suffix of event log files handed to the engine compressed.
const COMPRESSED_SUFFIX: &str = ".gz";

pub struct NetActions {
    worker: Arc<WorkerBridge>,
    drawing: Arc<dyn GraphDrawing>,
    layouts: LayoutOrchestrator,
}

impl std::fmt::Debug for NetActions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NetActions")
            .field("worker", &self.worker)
            .field("layouts", &self.layouts)
            .finish_non_exhaustive()
    }
}

impl NetActions {
    pub fn new(
        worker: Arc<WorkerBridge>,
        drawing: Arc<dyn GraphDrawing>,
        layered: LayeredSettings,
        engine: GraphEngineSettings,
    ) -> Self {
        let layouts = LayoutOrchestrator::new(layered).with_graph_engine(
            worker.clone(),
            drawing.clone(),
            engine,
        );
        Self {
            worker,
            drawing,
            layouts,
        }
    }

    /// Draws with the Graphviz executable named in `engine`.
    pub fn with_graphviz(
        worker: Arc<WorkerBridge>,
        layered: LayeredSettings,
        engine: GraphEngineSettings,
    ) -> Self {
        let drawing = Arc::new(GraphvizCommand::from_settings(&engine));
        Self::new(worker, drawing, layered, engine)
    }

    pub fn worker(&self) -> &WorkerBridge {
        &self.worker
    }

    pub fn layouts(&self) -> &LayoutOrchestrator {
        &self.layouts
    }

    /// Discovers a net from an event log. Logs whose file name ends with
    /// `.gz` are passed as compressed. Returns laid out nodes and edges ready
    /// for [`EditorState::replace`](crate::EditorState::replace).
    pub async fn discover(
        &self,
        log: Vec<u8>,
        file_name: &str,
    ) -> Result<(Vec<Node>, Vec<Edge>), ActionError> {
        let is_compressed = file_name.ends_with(COMPRESSED_SUFFIX);
        info!(file_name, bytes = log.len(), is_compressed, "discovering net");

        let json = self.worker.discover_from_event_log(log, is_compressed).await?;
        self.load_net(&json)
    }

    /// Imports an exchange format (PNML) document.
    pub async fn import_pnml(&self, text: String) -> Result<(Vec<Node>, Vec<Edge>), ActionError> {
        let json = self.worker.import_format(text).await?;
        self.load_net(&json)
    }

    /// Exports a graph as an exchange format (PNML) document.
    pub async fn export_pnml(&self, snapshot: &GraphSnapshot) -> Result<String, ActionError> {
        let json = to_canonical(&snapshot.nodes, &snapshot.edges)?.to_json()?;
        Ok(self.worker.export_format(json).await?)
    }

    /// Renders a graph. The returned bytes are opaque.
    pub async fn export_image(
        &self,
        snapshot: &GraphSnapshot,
        format: ImageFormat,
    ) -> Result<Vec<u8>, ActionError> {
        let json = to_canonical(&snapshot.nodes, &snapshot.edges)?.to_json()?;
        let description = self.worker.to_graph_description(json).await?;
        Ok(self.drawing.render(&description, format).await?)
    }

    /// Computes positions for a request issued by
    /// [`EditorState::layout_request`](crate::EditorState::layout_request).
    pub async fn layout(
        &self,
        request: LayoutRequest,
        strategy: LayoutStrategy,
    ) -> Result<LayoutResult, ActionError> {
        Ok(self.layouts.layout(request, strategy).await?)
    }

    fn load_net(&self, json: &str) -> Result<(Vec<Node>, Vec<Edge>), ActionError> {
        let net = PetriNet::from_json(json)?;
        net.validate()?;

        let (mut nodes, edges) = from_canonical(&net);
        let positions = self.layouts.layered().positions(&nodes, &edges);
        apply_positions(&mut nodes, &positions);

        debug!(nodes = nodes.len(), edges = edges.len(), "loaded net");
        Ok((nodes, edges))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use async_trait::async_trait;
    use egui::Pos2;

    use super::*;
    use crate::{
        error::{LayoutError, ModelError, WorkerError},
        settings::EditorSettings,
        storage::MemoryStore,
        EditorState,
        worker::{Engine, EngineError},
    };

    const NET: &str = r#"{
        "places": { "p1": { "id": "p1" }, "p2": { "id": "p2" } },
        "transitions": { "t1": { "id": "t1", "label": "Ship" } },
        "arcs": [
            { "from_to": { "type": "PlaceTransition", "nodes": ["p1", "t1"] }, "weight": 1 },
            { "from_to": { "type": "TransitionPlace", "nodes": ["t1", "p2"] }, "weight": 1 }
        ],
        "initial_marking": { "p1": 1 }
    }"#;

    /// Answers discovery only for compressed logs; everything else echoes.
    struct Canned;

    impl Engine for Canned {
        fn init(&mut self) -> Result<(), EngineError> {
            Ok(())
        }

        fn discover_from_event_log(
            &mut self,
            _: &[u8],
            is_compressed: bool,
        ) -> Result<String, EngineError> {
            if is_compressed {
                Ok(NET.to_string())
            } else {
                Err("expected a compressed log".into())
            }
        }

        fn to_graph_description(&mut self, net_json: &str) -> Result<String, EngineError> {
            Ok(format!("digraph {{ /* {} */ }}", net_json.len()))
        }

        fn import_format(&mut self, text: &str) -> Result<String, EngineError> {
            Ok(text.to_string())
        }

        fn export_format(&mut self, net_json: &str) -> Result<String, EngineError> {
            Ok(format!("<pnml>{net_json}</pnml>"))
        }
    }

    struct Recorder;

    #[async_trait]
    impl GraphDrawing for Recorder {
        async fn positions(&self, _: &str) -> Result<HashMap<String, Pos2>, LayoutError> {
            Ok(HashMap::new())
        }

        async fn render(
            &self,
            description: &str,
            format: ImageFormat,
        ) -> Result<Vec<u8>, LayoutError> {
            Ok(format!("{}:{description}", format.extension()).into_bytes())
        }
    }

    async fn setup() -> (NetActions, EditorState) {
        let worker = Arc::new(WorkerBridge::new(|| Canned));
        worker.start().await.unwrap();
        let actions = NetActions::new(
            worker,
            Arc::new(Recorder),
            LayeredSettings::default(),
            GraphEngineSettings::default(),
        );
        let editor = EditorState::load(Arc::new(MemoryStore::new()), EditorSettings::default());
        (actions, editor)
    }

    #[tokio::test]
    async fn discovered_net_comes_back_laid_out() {
        let (actions, mut editor) = setup().await;
        let (nodes, edges) = actions
            .discover(vec![0x1f, 0x8b], "log.xes.gz")
            .await
            .unwrap();
        editor.replace(nodes, edges);

        let g = editor.graph();
        assert_eq!(g.node_count(), 3);
        assert_eq!(g.edge_count(), 2);
        assert_eq!(g.node("p1").unwrap().initial_tokens(), Some(1));
        assert_eq!(g.node("t1").unwrap().label(), Some("Ship"));
        assert!(g.node("p1").unwrap().location().x < g.node("t1").unwrap().location().x);
        assert!(g.node("t1").unwrap().location().x < g.node("p2").unwrap().location().x);
    }

    #[tokio::test]
    async fn plain_logs_are_not_compressed() {
        let (actions, editor) = setup().await;
        let err = actions
            .discover(b"<log/>".to_vec(), "log.xes")
            .await
            .unwrap_err();
        assert!(matches!(err, ActionError::Worker(WorkerError::Engine(_))));
        assert_eq!(editor.graph().node_count(), 2);
    }

    #[tokio::test]
    async fn import_rejects_inconsistent_arcs() {
        let (actions, _) = setup().await;
        let bad = NET.replace(r#"["t1", "p2"]"#, r#"["t1", "p9"]"#);
        let err = actions.import_pnml(bad).await.unwrap_err();
        assert!(matches!(
            err,
            ActionError::Model(ModelError::InvalidArc { .. })
        ));
    }

    #[tokio::test]
    async fn export_goes_through_the_worker() {
        let (actions, mut editor) = setup().await;
        let (nodes, edges) = actions.import_pnml(NET.to_string()).await.unwrap();
        editor.replace(nodes, edges);

        let pnml = actions.export_pnml(&editor.snapshot()).await.unwrap();
        assert!(pnml.starts_with("<pnml>"));
        let inner = pnml.trim_start_matches("<pnml>").trim_end_matches("</pnml>");
        assert_eq!(
            PetriNet::from_json(inner).unwrap(),
            PetriNet::from_json(NET).unwrap()
        );

        let png = actions
            .export_image(&editor.snapshot(), ImageFormat::Png)
            .await
            .unwrap();
        assert!(png.starts_with(b"png:digraph"));
    }

    #[tokio::test]
    async fn layout_moves_nodes() {
        let (actions, mut editor) = setup().await;
        let result = actions
            .layout(editor.layout_request(), LayoutStrategy::Layered)
            .await
            .unwrap();
        assert_eq!(editor.apply_layout(&result), 2);
    }

    #[tokio::test]
    async fn edits_made_while_a_layout_is_pending_survive() {
        let (actions, mut editor) = setup().await;
        let request = editor.layout_request();
        let pending = actions.layout(request, LayoutStrategy::Layered);

        let added = editor.add_place(Pos2::new(-500., -500.));
        let result = pending.await.unwrap();
        assert!(!result.positions.contains_key(&added));

        assert_eq!(editor.apply_layout(&result), 2);
        assert_eq!(editor.graph().node_count(), 3);
        assert_eq!(
            editor.graph().node(&added).unwrap().location(),
            Pos2::new(-500., -500.)
        );
    }

    #[tokio::test]
    async fn edits_made_while_discovery_is_pending_are_replaced() {
        let (actions, mut editor) = setup().await;
        let pending = actions.discover(vec![0x1f, 0x8b], "log.xes.gz");

        let added = editor.add_transition(Pos2::ZERO);
        assert!(editor.graph().contains_node(&added));

        let (nodes, edges) = pending.await.unwrap();
        editor.replace(nodes, edges);
        assert!(!editor.graph().contains_node(&added));
        assert_eq!(editor.graph().node_count(), 3);
    }

    #[tokio::test]
    async fn graphviz_program_comes_from_engine_settings() {
        let worker = Arc::new(WorkerBridge::new(|| Canned));
        worker.start().await.unwrap();
        let actions = NetActions::with_graphviz(
            worker,
            LayeredSettings::default(),
            GraphEngineSettings::default().with_dot_command("definitely-not-a-graphviz-binary"),
        );
        let editor = EditorState::load(Arc::new(MemoryStore::new()), EditorSettings::default());

        let err = actions
            .export_image(&editor.snapshot(), ImageFormat::Svg)
            .await
            .unwrap_err();
        assert!(matches!(err, ActionError::Layout(LayoutError::Io(_))));
    }
}
