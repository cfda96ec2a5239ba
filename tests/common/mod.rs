#![allow(dead_code)]

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Once,
    },
    time::Duration,
};

use async_trait::async_trait;
use egui::Pos2;
use petri_graphs::{
    layouts::graph_engine::{GraphDrawing, ImageFormat},
    model::PetriNet,
    worker::{Engine, EngineError},
    LayoutError,
};

/// Installs a fmt subscriber once per test binary. `RUST_LOG` selects what is
/// shown; output goes through the test harness capture.
pub fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

fn wait_for(gate: &AtomicBool) {
    while !gate.load(Ordering::SeqCst) {
        std::thread::sleep(Duration::from_millis(1));
    }
}

/// Engine speaking canonical json everywhere: the graph description is the
/// json itself, import and export are the identity.
pub struct JsonEngine {
    pub fail_init: bool,
    pub gate: Option<Arc<AtomicBool>>,
    pub init_gate: Option<Arc<AtomicBool>>,
}

impl JsonEngine {
    pub fn ok() -> Self {
        Self {
            fail_init: false,
            gate: None,
            init_gate: None,
        }
    }

    pub fn failing() -> Self {
        Self {
            fail_init: true,
            gate: None,
            init_gate: None,
        }
    }

    /// Blocks every graph description until `gate` is set.
    pub fn gated(gate: Arc<AtomicBool>) -> Self {
        Self {
            fail_init: false,
            gate: Some(gate),
            init_gate: None,
        }
    }

    /// Stays in initialization until `gate` is set.
    pub fn slow_init(gate: Arc<AtomicBool>) -> Self {
        Self {
            fail_init: false,
            gate: None,
            init_gate: Some(gate),
        }
    }
}

impl Engine for JsonEngine {
    fn init(&mut self) -> Result<(), EngineError> {
        if let Some(gate) = &self.init_gate {
            wait_for(gate);
        }
        if self.fail_init {
            return Err("engine module failed to load".into());
        }
        Ok(())
    }

    fn discover_from_event_log(&mut self, log: &[u8], _: bool) -> Result<String, EngineError> {
        String::from_utf8(log.to_vec()).map_err(|e| EngineError(e.to_string()))
    }

    fn to_graph_description(&mut self, net_json: &str) -> Result<String, EngineError> {
        if let Some(gate) = &self.gate {
            wait_for(gate);
        }
        Ok(net_json.to_string())
    }

    fn import_format(&mut self, text: &str) -> Result<String, EngineError> {
        Ok(text.to_string())
    }

    fn export_format(&mut self, net_json: &str) -> Result<String, EngineError> {
        Ok(net_json.to_string())
    }
}

/// Lays transitions on one row and places on another, in id order.
pub struct RowDrawing;

#[async_trait]
impl GraphDrawing for RowDrawing {
    async fn positions(&self, description: &str) -> Result<HashMap<String, Pos2>, LayoutError> {
        let net = PetriNet::from_json(description)?;
        let places = net
            .places
            .keys()
            .enumerate()
            .map(|(i, id)| (id.clone(), Pos2::new(i as f32 * 10., 0.)));
        let transitions = net
            .transitions
            .keys()
            .enumerate()
            .map(|(i, id)| (id.clone(), Pos2::new(i as f32 * 10., 50.)));
        Ok(places.chain(transitions).collect())
    }

    async fn render(&self, description: &str, format: ImageFormat) -> Result<Vec<u8>, LayoutError> {
        Ok(format!("{}\n{description}", format.extension()).into_bytes())
    }
}
