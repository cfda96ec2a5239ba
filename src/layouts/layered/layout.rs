use std::collections::{HashMap, HashSet, VecDeque};

use egui::{Pos2, Vec2};
use petgraph::{
    graph::{DiGraph, NodeIndex},
    visit::{depth_first_search, DfsEvent},
};

use crate::{
    layouts::Layout,
    settings::{LayeredSettings, Orientation},
    Edge, Node, NodeKind,
};

/// Layered (Sugiyama style) layout.
///
/// Runs in four passes: back edges found by a depth first search are reversed,
/// layers are assigned by longest path, edges spanning several layers get
/// zero-sized dummy vertices and barycenter sweeps reduce crossings. Finally
/// every layer is stacked and centered on the secondary axis.
///
/// Ties keep the order in which nodes were given, so the result only depends on
/// the input order and topology.
#[derive(Debug, Clone, Default)]
pub struct Layered {
    settings: LayeredSettings,
}

impl Layered {
    pub fn new(settings: LayeredSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &LayeredSettings {
        &self.settings
    }

    fn size_of(&self, n: &Node) -> Vec2 {
        match n.kind() {
            NodeKind::Transition => self.settings.transition_size,
            NodeKind::Place => self.settings.place_size,
        }
    }
}

impl Layout for Layered {
    fn positions(&self, nodes: &[Node], edges: &[Edge]) -> HashMap<String, Pos2> {
        if nodes.is_empty() {
            return HashMap::new();
        }

        let index: HashMap<&str, usize> = nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (n.id(), i))
            .collect();
        let links: Vec<(usize, usize)> = edges
            .iter()
            .filter_map(|e| Some((*index.get(e.source())?, *index.get(e.target())?)))
            .filter(|(u, v)| u != v)
            .collect();

        let dag = break_cycles(nodes.len(), &links);
        let layer = assign_layers(nodes.len(), &dag);

        let sizes = nodes.iter().map(|n| self.size_of(n)).collect();
        let mut lg = LayerGraph::new(sizes, layer, &dag);
        lg.reduce_crossings(self.settings.sweeps);

        lg.coordinates(&self.settings)
            .into_iter()
            .take(nodes.len())
            .enumerate()
            .map(|(i, pos)| (nodes[i].id().to_string(), pos))
            .collect()
    }
}

/// Reverses every back edge of a depth first search started from the vertices
/// in order. The result is acyclic.
fn break_cycles(n: usize, links: &[(usize, usize)]) -> Vec<(usize, usize)> {
    let mut g: DiGraph<(), ()> = DiGraph::with_capacity(n, links.len());
    for _ in 0..n {
        g.add_node(());
    }
    for (u, v) in links {
        g.add_edge(NodeIndex::new(*u), NodeIndex::new(*v), ());
    }

    let mut back = HashSet::new();
    depth_first_search(&g, g.node_indices(), |event| {
        if let DfsEvent::BackEdge(u, v) = event {
            back.insert((u.index(), v.index()));
        }
    });

    links
        .iter()
        .map(|&(u, v)| if back.contains(&(u, v)) { (v, u) } else { (u, v) })
        .collect()
}

/// Longest path layering over an acyclic edge list.
fn assign_layers(n: usize, dag: &[(usize, usize)]) -> Vec<usize> {
    let mut indegree = vec![0usize; n];
    let mut succ = vec![Vec::new(); n];
    for &(u, v) in dag {
        indegree[v] += 1;
        succ[u].push(v);
    }

    let mut layer = vec![0usize; n];
    let mut queue: VecDeque<usize> = (0..n).filter(|v| indegree[*v] == 0).collect();
    while let Some(u) = queue.pop_front() {
        for &v in &succ[u] {
            layer[v] = layer[v].max(layer[u] + 1);
            indegree[v] -= 1;
            if indegree[v] == 0 {
                queue.push_back(v);
            }
        }
    }
    layer
}

/// Proper layered graph: every edge joins two consecutive layers.
/// Vertices `0..real` are the input nodes, the rest are dummies.
struct LayerGraph {
    real: usize,
    sizes: Vec<Vec2>,
    up: Vec<Vec<usize>>,
    down: Vec<Vec<usize>>,
    rows: Vec<Vec<usize>>,
    pos: Vec<usize>,
}

impl LayerGraph {
    fn new(mut sizes: Vec<Vec2>, mut layer: Vec<usize>, dag: &[(usize, usize)]) -> Self {
        let real = sizes.len();
        let mut up = vec![Vec::new(); real];
        let mut down = vec![Vec::new(); real];

        for &(u, v) in dag {
            let mut prev = u;
            for l in layer[u] + 1..layer[v] {
                let d = sizes.len();
                sizes.push(Vec2::ZERO);
                layer.push(l);
                up.push(vec![prev]);
                down.push(Vec::new());
                down[prev].push(d);
                prev = d;
            }
            down[prev].push(v);
            up[v].push(prev);
        }

        let depth = layer.iter().max().map_or(0, |m| m + 1);
        let mut rows = vec![Vec::new(); depth];
        for (v, l) in layer.iter().enumerate() {
            rows[*l].push(v);
        }
        let mut pos = vec![0; sizes.len()];
        for row in &rows {
            for (i, v) in row.iter().enumerate() {
                pos[*v] = i;
            }
        }

        Self {
            real,
            sizes,
            up,
            down,
            rows,
            pos,
        }
    }

    /// Alternating down and up barycenter sweeps, keeping the best ordering seen.
    fn reduce_crossings(&mut self, sweeps: usize) {
        let mut best = self.rows.clone();
        let mut best_crossings = self.crossings();

        for _ in 0..sweeps {
            if best_crossings == 0 {
                break;
            }
            for row in self.rows.iter_mut().skip(1) {
                reorder(row, &mut self.pos, &self.up);
            }
            for row in self.rows.iter_mut().rev().skip(1) {
                reorder(row, &mut self.pos, &self.down);
            }

            let c = self.crossings();
            if c < best_crossings {
                best_crossings = c;
                best.clone_from(&self.rows);
            }
        }

        self.rows = best;
        for row in &self.rows {
            for (i, v) in row.iter().enumerate() {
                self.pos[*v] = i;
            }
        }
    }

    fn crossings(&self) -> usize {
        let mut total = 0;
        for row in &self.rows {
            let segments: Vec<(usize, usize)> = row
                .iter()
                .flat_map(|&u| self.down[u].iter().map(move |&v| (u, v)))
                .map(|(u, v)| (self.pos[u], self.pos[v]))
                .collect();
            for (i, a) in segments.iter().enumerate() {
                for b in &segments[i + 1..] {
                    if (a.0 < b.0 && a.1 > b.1) || (a.0 > b.0 && a.1 < b.1) {
                        total += 1;
                    }
                }
            }
        }
        total
    }

    /// Centers of all vertices, dummies included.
    fn coordinates(&self, settings: &LayeredSettings) -> Vec<Pos2> {
        let (primary, secondary): (fn(Vec2) -> f32, fn(Vec2) -> f32) = match settings.orientation
        {
            Orientation::LeftRight => (|s: Vec2| s.x, |s: Vec2| s.y),
            Orientation::TopDown => (|s: Vec2| s.y, |s: Vec2| s.x),
        };

        let mut centers = vec![Pos2::ZERO; self.sizes.len()];
        let mut offset = 0.;
        for row in &self.rows {
            let depth = row
                .iter()
                .map(|v| primary(self.sizes[*v]))
                .fold(0., f32::max);

            let gap = |a: usize, b: usize| {
                if a < self.real && b < self.real {
                    settings.node_spacing
                } else {
                    settings.edge_node_spacing
                }
            };
            let extent = row.iter().map(|v| secondary(self.sizes[*v])).sum::<f32>()
                + row.windows(2).map(|w| gap(w[0], w[1])).sum::<f32>();

            let mut cursor = -extent / 2.;
            for (i, &v) in row.iter().enumerate() {
                if i > 0 {
                    cursor += gap(row[i - 1], v);
                }
                let breadth = secondary(self.sizes[v]);
                let along = offset + depth / 2.;
                let across = cursor + breadth / 2.;
                cursor += breadth;

                centers[v] = match settings.orientation {
                    Orientation::LeftRight => Pos2::new(along, across),
                    Orientation::TopDown => Pos2::new(across, along),
                };
            }

            offset += depth + settings.layer_spacing;
        }
        centers
    }
}

/// Sorts `row` by the barycenter of each vertex's neighbours in the adjacent
/// layer. Vertices without neighbours keep their current index as key.
fn reorder(row: &mut Vec<usize>, pos: &mut [usize], neighbours: &[Vec<usize>]) {
    let mut keyed: Vec<(f32, usize)> = row
        .iter()
        .map(|&v| {
            let ns = &neighbours[v];
            let key = if ns.is_empty() {
                pos[v] as f32
            } else {
                ns.iter().map(|n| pos[*n] as f32).sum::<f32>() / ns.len() as f32
            };
            (key, v)
        })
        .collect();
    keyed.sort_by(|a, b| a.0.total_cmp(&b.0));

    *row = keyed.into_iter().map(|(_, v)| v).collect();
    for (i, v) in row.iter().enumerate() {
        pos[*v] = i;
    }
}
