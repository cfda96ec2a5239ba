//! Live editor state: the graph being edited, its persistence and the layout
//! tickets handed out for it.

use std::sync::Arc;

use egui::Pos2;
use tracing::{debug, info, warn};

use crate::{
    graph::{Graph, GraphSnapshot},
    layouts::{apply_positions, LayoutRequest, LayoutResult},
    settings::EditorSettings,
    storage::StateStore,
    Edge, Node, NodeKind,
};

/// Connection gesture between two existing nodes.
///
/// `source_handle` is the kind of the handle the gesture started from, if the
/// UI knows it. When that kind differs from the kind of `source`, the gesture
/// was drawn backwards and the edge is created in the other direction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Connection {
    pub source: String,
    pub target: String,
    pub source_handle: Option<NodeKind>,
    pub target_handle: Option<NodeKind>,
}

impl Connection {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
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
}

/// Single owner of the live graph.
///
/// Every mutation is persisted right away to the [`StateStore`]. Failing
/// writes are logged and otherwise ignored.
pub struct EditorState {
    graph: Graph,
    store: Arc<dyn StateStore>,
    settings: EditorSettings,

    next_ticket: u64,
    applied_ticket: Option<u64>,
}

impl std::fmt::Debug for EditorState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EditorState")
            .field("graph", &self.graph)
            .field("settings", &self.settings)
            .field("next_ticket", &self.next_ticket)
            .field("applied_ticket", &self.applied_ticket)
            .finish_non_exhaustive()
    }
}

impl EditorState {
    /// Restores the graph stored under the configured key. Absent or
    /// unreadable payloads give the starter graph.
    pub fn load(store: Arc<dyn StateStore>, settings: EditorSettings) -> Self {
        let graph = match store.load(&settings.storage_key) {
            Some(payload) => match serde_json::from_str::<GraphSnapshot>(&payload) {
                Ok(snapshot) => {
                    debug!(
                        nodes = snapshot.nodes.len(),
                        edges = snapshot.edges.len(),
                        "restored editor state"
                    );
                    Graph::from(snapshot)
                }
                Err(e) => {
                    warn!(error = %e, "stored editor state is corrupt, starting over");
                    starter_graph(&settings)
                }
            },
            None => {
                info!("no stored editor state, starting with the starter graph");
                starter_graph(&settings)
            }
        };

        let state = Self {
            graph,
            store,
            settings,
            next_ticket: 0,
            applied_ticket: None,
        };
        state.persist();
        state
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn settings(&self) -> &EditorSettings {
        &self.settings
    }

    pub fn snapshot(&self) -> GraphSnapshot {
        self.graph.snapshot()
    }

    /// Connects two existing nodes. Returns the id of the new edge, or `None`
    /// if an endpoint is unknown or both endpoints have the same kind.
    pub fn connect(&mut self, c: &Connection) -> Option<String> {
        let source_kind = self.graph.node(&c.source)?.kind();
        let target_kind = self.graph.node(&c.target)?.kind();
        if source_kind == target_kind {
            debug!(source = %c.source, target = %c.target, "ignoring same kind connection");
            return None;
        }

        let (source, target) = match c.source_handle {
            Some(handle) if handle != source_kind => (&c.target, &c.source),
            _ => (&c.source, &c.target),
        };
        let edge = Edge::new(source.as_str(), target.as_str())
            .with_handles(c.source_handle, c.target_handle);
        let id = edge.id().to_string();
        self.graph.add_edge(edge)?;
        self.persist();
        Some(id)
    }

    /// Connection dropped on empty space: creates a node of the opposite kind
    /// at `location` and an edge from `from` to it. Returns the new node id.
    pub fn connect_to_new_node(&mut self, from: &str, location: Pos2) -> Option<String> {
        let kind = self.graph.node(from)?.kind().opposite();
        let node = match kind {
            NodeKind::Place => Node::place(None),
            NodeKind::Transition => {
                Node::transition(Some(self.settings.dropped_transition_label.clone()))
            }
        }
        .at(location);

        let id = node.id().to_string();
        self.graph.add_node(node);
        self.graph.add_edge(Edge::new(from, id.as_str()));
        self.persist();
        Some(id)
    }

    pub fn add_place(&mut self, location: Pos2) -> String {
        self.add(Node::place(None).at(location))
    }

    pub fn add_transition(&mut self, location: Pos2) -> String {
        let label = self.settings.new_transition_label.clone();
        self.add(Node::transition(Some(label)).at(location))
    }

    fn add(&mut self, node: Node) -> String {
        let id = node.id().to_string();
        self.graph.add_node(node);
        self.persist();
        id
    }

    /// Removes node with all incident edges.
    pub fn remove_node(&mut self, id: &str) -> Option<Node> {
        let removed = self.graph.remove_node(id)?;
        self.persist();
        Some(removed)
    }

    pub fn disconnect(&mut self, edge_id: &str) -> Option<Edge> {
        let removed = self.graph.remove_edge(edge_id)?;
        self.persist();
        Some(removed)
    }

    /// Throws away the edited graph and starts over from the starter graph.
    pub fn reset(&mut self) {
        self.graph = starter_graph(&self.settings);
        self.persist();
    }

    /// Flips a place between no tokens and one token. Returns the new count,
    /// `None` if `place` is not a place.
    pub fn toggle_tokens(&mut self, place: &str) -> Option<u64> {
        let node = self.graph.node_mut(place).filter(|n| n.is_place())?;
        let data = node.data_mut();
        data.initial_tokens = match data.initial_tokens {
            Some(n) if n > 0 => None,
            _ => Some(1),
        };
        let tokens = data.initial_tokens.unwrap_or(0);
        self.persist();
        Some(tokens)
    }

    /// Sets initial tokens of a place; zero clears them.
    pub fn set_initial_tokens(&mut self, place: &str, tokens: u64) -> bool {
        let Some(node) = self.graph.node_mut(place).filter(|n| n.is_place()) else {
            return false;
        };
        node.data_mut().initial_tokens = (tokens > 0).then_some(tokens);
        self.persist();
        true
    }

    /// Sets the label of a transition. Places carry no label.
    pub fn set_label(&mut self, transition: &str, label: Option<String>) -> bool {
        let Some(node) = self.graph.node_mut(transition).filter(|n| n.is_transition()) else {
            return false;
        };
        node.data_mut().label = label;
        self.persist();
        true
    }

    pub fn move_node(&mut self, id: &str, location: Pos2) -> bool {
        let Some(node) = self.graph.node_mut(id) else {
            return false;
        };
        node.set_location(location);
        self.persist();
        true
    }

    /// Replaces the whole graph, e.g. after an import.
    pub fn replace(&mut self, nodes: Vec<Node>, edges: Vec<Edge>) {
        self.graph = Graph::from_parts(nodes, edges);
        self.persist();
    }

    /// Issues a new ticket and snapshots the graph for a layout computation.
    pub fn layout_request(&mut self) -> LayoutRequest {
        self.next_ticket += 1;
        LayoutRequest {
            ticket: self.next_ticket,
            snapshot: self.graph.snapshot(),
        }
    }

    /// Writes the positions of `result` onto the graph. Results older than the
    /// last applied one are discarded. Positions of nodes removed meanwhile
    /// are ignored. Returns the number of moved nodes.
    pub fn apply_layout(&mut self, result: &LayoutResult) -> usize {
        if self.applied_ticket.is_some_and(|t| result.ticket < t) {
            debug!(
                ticket = result.ticket,
                applied = ?self.applied_ticket,
                "discarding superseded layout"
            );
            return 0;
        }
        self.applied_ticket = Some(result.ticket);

        let mut snapshot = self.graph.snapshot();
        let moved = apply_positions(&mut snapshot.nodes, &result.positions);
        for n in snapshot.nodes {
            if let Some(live) = self.graph.node_mut(n.id()) {
                live.set_location(n.location());
            }
        }
        self.persist();
        moved
    }

    fn persist(&self) {
        let payload = match serde_json::to_string(&self.graph) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(error = %e, "failed to serialize editor state");
                return;
            }
        };
        if let Err(e) = self.store.store(&self.settings.storage_key, &payload) {
            warn!(error = %e, key = %self.settings.storage_key, "failed to persist editor state");
        }
    }
}

/// One place with an arc into one transition.
fn starter_graph(settings: &EditorSettings) -> Graph {
    let place = Node::place(None).at(Pos2::ZERO);
    let transition =
        Node::transition(Some(settings.starter_label.clone())).at(Pos2::new(150., 0.));
    let edge = Edge::new(place.id(), transition.id());
    Graph::from_parts([place, transition], [edge])
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::storage::MemoryStore;

    fn editor() -> (EditorState, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let state = EditorState::load(store.clone(), EditorSettings::default());
        (state, store)
    }

    fn stored(store: &MemoryStore) -> GraphSnapshot {
        serde_json::from_str(&store.load("pn-editor").unwrap()).unwrap()
    }

    #[test]
    fn starter_graph_on_empty_store() {
        let (state, store) = editor();
        let g = state.graph();
        assert_eq!(g.node_count(), 2);
        assert_eq!(g.edge_count(), 1);

        let place = g.nodes_iter().find(|n| n.is_place()).unwrap();
        let transition = g.nodes_iter().find(|n| n.is_transition()).unwrap();
        assert_eq!(place.location(), Pos2::ZERO);
        assert_eq!(transition.location(), Pos2::new(150., 0.));
        assert_eq!(transition.label(), Some("Place Order"));
        assert_eq!(g.edges_connecting(place.id(), transition.id()).count(), 1);

        assert_eq!(stored(&store), state.snapshot());
    }

    #[test]
    fn corrupt_payload_gives_starter_graph() {
        let store = Arc::new(MemoryStore::with_value("pn-editor", "{not json"));
        let state = EditorState::load(store, EditorSettings::default());
        assert_eq!(state.graph().node_count(), 2);
    }

    #[test]
    fn connect_enforces_alternation() {
        let (mut state, _) = editor();
        let p1 = state.add_place(Pos2::ZERO);
        let p2 = state.add_place(Pos2::ZERO);
        let t = state.add_transition(Pos2::ZERO);

        assert!(state.connect(&Connection::new(&p1, &p2)).is_none());
        assert!(state.connect(&Connection::new(&p1, "missing")).is_none());

        let e = state.connect(&Connection::new(&p1, &t)).unwrap();
        let edge = state.graph().edge(&e).unwrap();
        assert_eq!(edge.endpoints(), (p1.as_str(), t.as_str()));
    }

    #[test]
    fn handle_of_other_kind_swaps_direction() {
        let (mut state, _) = editor();
        let p = state.add_place(Pos2::ZERO);
        let t = state.add_transition(Pos2::ZERO);

        let c = Connection::new(&p, &t).with_handles(Some(NodeKind::Transition), None);
        let e = state.connect(&c).unwrap();
        assert_eq!(
            state.graph().edge(&e).unwrap().endpoints(),
            (t.as_str(), p.as_str())
        );

        let c = Connection::new(&p, &t).with_handles(Some(NodeKind::Place), None);
        let e = state.connect(&c).unwrap();
        assert_eq!(
            state.graph().edge(&e).unwrap().endpoints(),
            (p.as_str(), t.as_str())
        );
    }

    #[test]
    fn dropping_connection_creates_opposite_node() {
        let (mut state, _) = editor();
        let p = state.add_place(Pos2::ZERO);
        let id = state
            .connect_to_new_node(&p, Pos2::new(40., 10.))
            .unwrap();

        let n = state.graph().node(&id).unwrap();
        assert!(n.is_transition());
        assert_eq!(n.label(), Some("New Node"));
        assert_eq!(n.location(), Pos2::new(40., 10.));
        assert_eq!(state.graph().edges_connecting(&p, &id).count(), 1);

        assert!(state.connect_to_new_node("missing", Pos2::ZERO).is_none());
    }

    #[test]
    fn toggle_tokens_flips_between_none_and_one() {
        let (mut state, _) = editor();
        let p = state.add_place(Pos2::ZERO);
        let t = state.add_transition(Pos2::ZERO);

        assert_eq!(state.toggle_tokens(&p), Some(1));
        assert_eq!(state.graph().node(&p).unwrap().initial_tokens(), Some(1));
        assert_eq!(state.toggle_tokens(&p), Some(0));
        assert_eq!(state.graph().node(&p).unwrap().initial_tokens(), None);
        assert_eq!(state.toggle_tokens(&t), None);

        assert!(state.set_initial_tokens(&p, 5));
        assert_eq!(state.toggle_tokens(&p), Some(0));
        assert!(!state.set_initial_tokens(&t, 5));
    }

    #[test]
    fn every_mutation_is_persisted() {
        let (mut state, store) = editor();
        let t = state.add_transition(Pos2::new(3., 4.));
        assert!(state.set_label(&t, Some("Pay".to_string())));
        assert!(state.move_node(&t, Pos2::new(9., 9.)));
        let persisted = stored(&store);
        let n = persisted.nodes.iter().find(|n| n.id() == t).unwrap();
        assert_eq!(n.label(), Some("Pay"));
        assert_eq!(n.location(), Pos2::new(9., 9.));

        state.remove_node(&t).unwrap();
        assert!(stored(&store).nodes.iter().all(|n| n.id() != t));

        state.reset();
        assert_eq!(stored(&store), state.snapshot());

        let reloaded = EditorState::load(store, EditorSettings::default());
        assert_eq!(reloaded.snapshot(), state.snapshot());
    }

    #[test]
    fn reset_restores_starter_graph() {
        let (mut state, _) = editor();
        state.add_place(Pos2::new(7., 7.));
        state.add_transition(Pos2::new(9., 9.));
        state.reset();

        let g = state.graph();
        assert_eq!(g.node_count(), 2);
        assert_eq!(g.edge_count(), 1);
        let place = g.nodes_iter().find(|n| n.is_place()).unwrap();
        let transition = g.nodes_iter().find(|n| n.is_transition()).unwrap();
        assert_eq!(place.location(), Pos2::ZERO);
        assert_eq!(transition.location(), Pos2::new(150., 0.));
        assert_eq!(transition.label(), Some("Place Order"));
        assert_eq!(g.edges_connecting(place.id(), transition.id()).count(), 1);
    }

    #[test]
    fn places_take_no_label() {
        let (mut state, _) = editor();
        let p = state.add_place(Pos2::ZERO);
        assert!(!state.set_label(&p, Some("Stock".to_string())));
        assert_eq!(state.graph().node(&p).unwrap().label(), None);
        assert!(!state.set_label("missing", None));
    }

    #[test]
    fn removing_node_drops_its_edges() {
        let (mut state, _) = editor();
        let place = state
            .graph()
            .nodes_iter()
            .find(|n| n.is_place())
            .unwrap()
            .id()
            .to_string();
        state.remove_node(&place).unwrap();
        assert_eq!(state.graph().edge_count(), 0);
        assert!(state.disconnect("whatever").is_none());
    }

    #[test]
    fn superseded_layouts_are_discarded() {
        let (mut state, _) = editor();
        let first = state.layout_request();
        let second = state.layout_request();
        assert!(second.ticket > first.ticket);

        let place = first.snapshot.nodes[0].id().to_string();
        let at = |x: f32| LayoutResult {
            ticket: 0,
            positions: HashMap::from([(place.clone(), Pos2::new(x, 0.))]),
        };

        let newer = LayoutResult {
            ticket: second.ticket,
            ..at(10.)
        };
        let older = LayoutResult {
            ticket: first.ticket,
            ..at(20.)
        };
        assert_eq!(state.apply_layout(&newer), 1);
        assert_eq!(state.apply_layout(&older), 0);
        assert_eq!(state.graph().node(&place).unwrap().location().x, 10.);
    }

    #[test]
    fn same_ticket_is_applied_again() {
        let (mut state, _) = editor();
        let req = state.layout_request();
        let place = req.snapshot.nodes[0].id().to_string();
        let at = |x: f32| LayoutResult {
            ticket: req.ticket,
            positions: HashMap::from([(place.clone(), Pos2::new(x, 0.))]),
        };

        assert_eq!(state.apply_layout(&at(10.)), 1);
        assert_eq!(state.apply_layout(&at(30.)), 1);
        assert_eq!(state.graph().node(&place).unwrap().location().x, 30.);
    }

    #[test]
    fn applying_layout_keeps_topology() {
        let (mut state, _) = editor();
        let t = state.add_transition(Pos2::ZERO);
        let p = state.add_place(Pos2::ZERO);
        state.connect(&Connection::new(&t, &p)).unwrap();
        let before = state.snapshot();

        let req = state.layout_request();
        let positions = req
            .snapshot
            .nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (n.id().to_string(), Pos2::new(i as f32 * 100., 5.)))
            .collect();
        state.apply_layout(&LayoutResult {
            ticket: req.ticket,
            positions,
        });

        let after = state.snapshot();
        assert_eq!(after.edges, before.edges);
        assert_eq!(after.nodes.len(), before.nodes.len());
        for (a, b) in after.nodes.iter().zip(&before.nodes) {
            assert_eq!(a.id(), b.id());
            assert_eq!(a.kind(), b.kind());
            assert_eq!(a.data(), b.data());
        }
        assert!(after.nodes.iter().all(|n| n.location().y == 5.));
    }

    #[test]
    fn positions_of_removed_nodes_are_ignored() {
        let (mut state, _) = editor();
        let req = state.layout_request();
        let gone = req.snapshot.nodes[0].id().to_string();
        let kept = req.snapshot.nodes[1].id().to_string();
        state.remove_node(&gone);

        let res = LayoutResult {
            ticket: req.ticket,
            positions: HashMap::from([
                (gone, Pos2::new(1., 1.)),
                (kept.clone(), Pos2::new(2., 2.)),
            ]),
        };
        assert_eq!(state.apply_layout(&res), 1);
        assert_eq!(state.graph().node(&kept).unwrap().location(), Pos2::new(2., 2.));
    }
}
