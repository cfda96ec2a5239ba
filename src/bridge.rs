//! Translation between the live editor graph and the canonical [`PetriNet`].
//!
//! Both directions are pure: no I/O, no cached model.

use std::collections::{BTreeMap, HashMap};

use crate::{
    error::ModelError,
    model::{Arc, ArcType, PetriNet, Place, Transition},
    Edge, Graph, Node, NodeData, NodeKind,
};

/// Builds the canonical model of a live graph.
///
/// Arc direction comes from the kind tag of the source node. Edges between
/// two nodes of the same kind, or touching a node that is not in `nodes`,
/// reject the whole conversion.
pub fn to_canonical<'a>(
    nodes: impl IntoIterator<Item = &'a Node>,
    edges: impl IntoIterator<Item = &'a Edge>,
) -> Result<PetriNet, ModelError> {
    let mut pn = PetriNet::default();
    let mut kinds: HashMap<&str, NodeKind> = HashMap::new();
    let mut marking = BTreeMap::new();

    for node in nodes {
        kinds.insert(node.id(), node.kind());
        match node.kind() {
            NodeKind::Transition => {
                pn.transitions.insert(
                    node.id().to_string(),
                    Transition {
                        id: node.id().to_string(),
                        label: node.label().map(ToString::to_string),
                    },
                );
            }
            NodeKind::Place => {
                pn.places.insert(
                    node.id().to_string(),
                    Place {
                        id: node.id().to_string(),
                    },
                );
                if let Some(tokens) = node.initial_tokens().filter(|t| *t > 0) {
                    marking.insert(node.id().to_string(), tokens);
                }
            }
        }
    }

    for edge in edges {
        let kind_of = |id: &str| {
            kinds
                .get(id)
                .copied()
                .ok_or_else(|| ModelError::DanglingEdge {
                    edge: edge.id().to_string(),
                    node: id.to_string(),
                })
        };
        let source_kind = kind_of(edge.source())?;
        let target_kind = kind_of(edge.target())?;
        if source_kind == target_kind {
            return Err(ModelError::SameKindArc {
                edge: edge.id().to_string(),
            });
        }

        let (from, to) = (edge.source().to_string(), edge.target().to_string());
        let from_to = match source_kind {
            NodeKind::Transition => ArcType::TransitionPlace(from, to),
            NodeKind::Place => ArcType::PlaceTransition(from, to),
        };
        pn.arcs.push(Arc::new(from_to));
    }

    if !marking.is_empty() {
        pn.initial_marking = Some(marking);
    }

    Ok(pn)
}

/// Shortcut for [`to_canonical`] over a whole [`Graph`].
pub fn graph_to_canonical(g: &Graph) -> Result<PetriNet, ModelError> {
    to_canonical(g.nodes_iter(), g.edges_iter())
}

/// Builds live nodes and edges from a canonical model.
///
/// Transitions come first, then places. Every node is placed at the origin;
/// positions are a layout concern. Edge ids are freshly generated.
pub fn from_canonical(pn: &PetriNet) -> (Vec<Node>, Vec<Edge>) {
    let transitions = pn.transitions.values().map(|t| {
        Node::with_id(
            &t.id,
            NodeKind::Transition,
            NodeData {
                label: t.label.clone(),
                initial_tokens: None,
            },
        )
    });
    let places = pn.places.values().map(|p| {
        Node::with_id(
            &p.id,
            NodeKind::Place,
            NodeData {
                label: None,
                initial_tokens: pn.initial_tokens(&p.id),
            },
        )
    });
    let nodes = transitions.chain(places).collect();

    let edges = pn
        .arcs
        .iter()
        .map(|a| {
            let (from, to) = a.endpoints();
            Edge::new(from, to)
        })
        .collect();

    (nodes, edges)
}
