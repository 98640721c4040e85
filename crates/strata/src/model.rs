//! Internal hierarchy model.
//!
//! Built fresh for every hierarchy of a layout pass: one [`HierarchyNode`] per laid-out vertex and
//! one [`HierarchyEdge`] per group of parallel host edges. Stages mutate it in place, in the order
//! given by [`Stage`].

use crate::facade::HostFacade;
use crate::graphlib::Point;
use crate::host::LayoutHost;
use rustc_hash::{FxHashMap, FxHashSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EdgeId(pub usize);

/// An entry of a rank: a node, or the placeholder of an edge crossing that rank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cell {
    Node(NodeId),
    Edge(EdgeId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    Built,
    CyclesRemoved,
    Ranked,
    Ordered,
    Placed,
}

#[derive(Debug, Clone)]
pub struct HierarchyNode {
    pub vertex: String,
    pub connects_as_source: Vec<EdgeId>,
    pub connects_as_target: Vec<EdgeId>,
    /// Host size, zero when the vertex had no bounds.
    pub host_width: f64,
    pub host_height: f64,
    /// Rank from layering. Roots sit on the highest rank, sinks on rank 0.
    pub rank: usize,
    /// Position inside the rank (crossing reduction).
    pub order: usize,
    /// Size along the rank and across it, after orientation (placement).
    pub width: f64,
    pub height: f64,
    /// In-rank coordinate being relaxed (placement).
    pub work_x: f64,
    /// Best in-rank coordinate found so far (placement).
    pub x: f64,
    pub y: f64,
    up: Vec<Cell>,
    down: Vec<Cell>,
}

impl HierarchyNode {
    fn new(vertex: String, size: Option<(f64, f64)>) -> Self {
        let (host_width, host_height) = size.unwrap_or((0.0, 0.0));
        Self {
            vertex,
            connects_as_source: Vec::new(),
            connects_as_target: Vec::new(),
            host_width,
            host_height,
            rank: 0,
            order: 0,
            width: 0.0,
            height: 0.0,
            work_x: 0.0,
            x: 0.0,
            y: 0.0,
            up: Vec::new(),
            down: Vec::new(),
        }
    }
}

/// A host edge wrapped by a [`HierarchyEdge`].
#[derive(Debug, Clone, PartialEq)]
pub struct WrappedEdge {
    pub id: String,
    /// Visible source vertex as the host sees it.
    pub source_vertex: String,
    /// Relative position of the port the edge leaves from, when it uses one.
    pub source_port: Option<Point>,
    pub target_port: Option<Point>,
}

#[derive(Debug, Clone)]
pub struct HierarchyEdge {
    pub edges: Vec<WrappedEdge>,
    pub source: NodeId,
    pub target: NodeId,
    /// Set while the edge points against the host direction of its group.
    pub reversed: bool,
    pub min_rank: usize,
    pub max_rank: usize,
    /// Per intermediate rank, indexed by `rank - min_rank - 1`.
    pub order: Vec<usize>,
    pub work_x: Vec<f64>,
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    /// Room taken by the group of parallel edges on every rank it crosses.
    pub width: f64,
    up: Vec<Cell>,
    down: Vec<Cell>,
}

impl HierarchyEdge {
    pub fn invert(&mut self) {
        std::mem::swap(&mut self.source, &mut self.target);
        self.reversed = !self.reversed;
    }

    /// Number of intermediate ranks, i.e. placeholders.
    pub fn dummy_count(&self) -> usize {
        self.max_rank.saturating_sub(self.min_rank).saturating_sub(1)
    }

    fn slot(&self, rank: usize) -> Option<usize> {
        (rank > self.min_rank && rank < self.max_rank).then(|| rank - self.min_rank - 1)
    }

    /// Source vertex of the group in host terms, undoing cycle-removal inversion.
    pub fn host_source(&self) -> NodeId {
        if self.reversed { self.target } else { self.source }
    }

    pub(crate) fn reset_ranks(&mut self, min_rank: usize, max_rank: usize) {
        let dummies = max_rank.saturating_sub(min_rank).saturating_sub(1);
        self.min_rank = min_rank;
        self.max_rank = max_rank;
        self.order = vec![0; dummies];
        self.work_x = vec![0.0; dummies];
        self.x = vec![0.0; dummies];
        self.y = vec![0.0; dummies];
    }
}

#[derive(Debug, Clone)]
pub struct HierarchyModel {
    pub nodes: Vec<HierarchyNode>,
    pub edges: Vec<HierarchyEdge>,
    /// Roots the stages start from. Every root is a node of this model.
    pub roots: Vec<NodeId>,
    /// Rank lists, index 0 holds the sinks.
    pub ranks: Vec<Vec<Cell>>,
    pub max_rank: usize,
    /// Vertices whose bounds were missing; laid out with zero size.
    pub missing_bounds: Vec<String>,
    vertex_index: FxHashMap<String, NodeId>,
    stage: Stage,
}

impl HierarchyModel {
    /// Builds the model for `vertices`.
    ///
    /// Parallel edges between two vertices collapse into one hierarchy edge, oriented the way at
    /// least half of them point; on a tie the direction met first wins. Loops and edges leaving
    /// the vertex set are dropped. Roots outside `vertices` are ignored.
    pub fn build<H: LayoutHost + ?Sized>(
        facade: &HostFacade<'_, H>,
        vertices: &[String],
        roots: &[String],
    ) -> Self {
        let host = facade.host();
        let mut model = Self {
            nodes: Vec::with_capacity(vertices.len()),
            edges: Vec::new(),
            roots: Vec::new(),
            ranks: Vec::new(),
            max_rank: 0,
            missing_bounds: Vec::new(),
            vertex_index: FxHashMap::default(),
            stage: Stage::Built,
        };

        for vertex in vertices {
            if model.vertex_index.contains_key(vertex) {
                continue;
            }
            let size = host.vertex_bounds(vertex).map(|g| (g.width, g.height));
            if size.is_none() {
                model.missing_bounds.push(vertex.clone());
            }
            let id = NodeId(model.nodes.len());
            model.nodes.push(HierarchyNode::new(vertex.clone(), size));
            model.vertex_index.insert(vertex.clone(), id);
        }

        let mut grouped: FxHashMap<String, EdgeId> = FxHashMap::default();
        let mut skipped: FxHashSet<String> = FxHashSet::default();
        for i in 0..model.nodes.len() {
            let vertex = model.nodes[i].vertex.clone();
            for edge in facade.edges(&vertex) {
                if facade.visible_terminal(&edge, true).is_none() {
                    skipped.insert(edge);
                    continue;
                }
                let Some(other) = facade.visible_terminal(&edge, false) else {
                    skipped.insert(edge);
                    continue;
                };
                if other == vertex {
                    continue;
                }
                let Some(&target) = model.vertex_index.get(&other) else {
                    skipped.insert(edge);
                    continue;
                };

                let undirected = facade.edges_between(&vertex, &other, false);
                let directed = facade.edges_between(&vertex, &other, true);
                let Some(first) = undirected.first() else {
                    continue;
                };
                if grouped.contains_key(first) || directed.len() * 2 < undirected.len() {
                    continue;
                }

                let id = EdgeId(model.edges.len());
                let wrapped = undirected
                    .iter()
                    .map(|e| {
                        grouped.insert(e.clone(), id);
                        wrap_edge(facade, e)
                    })
                    .collect();
                model.edges.push(HierarchyEdge {
                    edges: wrapped,
                    source: NodeId(i),
                    target,
                    reversed: false,
                    min_rank: 0,
                    max_rank: 0,
                    order: Vec::new(),
                    work_x: Vec::new(),
                    x: Vec::new(),
                    y: Vec::new(),
                    width: 0.0,
                    up: Vec::new(),
                    down: Vec::new(),
                });
                model.nodes[i].connects_as_source.push(id);
                model.nodes[target.0].connects_as_target.push(id);
            }
        }

        if !skipped.is_empty() {
            tracing::debug!(
                count = skipped.len(),
                "skipped edges without both terminals in the hierarchy"
            );
        }

        for root in roots {
            if let Some(&id) = model.vertex_index.get(root) {
                if !model.roots.contains(&id) {
                    model.roots.push(id);
                }
            }
        }

        model
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub(crate) fn advance(&mut self, from: Stage, to: Stage) {
        debug_assert_eq!(self.stage, from, "layout stage run out of order");
        self.stage = to;
    }

    pub fn node_id(&self, vertex: &str) -> Option<NodeId> {
        self.vertex_index.get(vertex).copied()
    }

    pub fn node(&self, id: NodeId) -> &HierarchyNode {
        &self.nodes[id.0]
    }

    pub fn edge(&self, id: EdgeId) -> &HierarchyEdge {
        &self.edges[id.0]
    }

    /// Layer of a vertex counted from the roots (roots are layer 0).
    pub fn layer_of(&self, vertex: &str) -> Option<usize> {
        let id = self.node_id(vertex)?;
        Some(self.max_rank.saturating_sub(self.nodes[id.0].rank))
    }

    /// Host edges wrapped by the model, in creation order.
    pub fn wrapped_edges(&self) -> impl Iterator<Item = &str> {
        self.edges
            .iter()
            .flat_map(|e| e.edges.iter().map(|w| w.id.as_str()))
    }

    /// Recomputes which cells sit one rank above and one rank below every cell.
    ///
    /// Must run whenever ranks change; the neighbour queries read from it.
    pub(crate) fn build_adjacency(&mut self) {
        for n in 0..self.nodes.len() {
            let rank = self.nodes[n].rank;
            let up = self.nodes[n]
                .connects_as_target
                .iter()
                .filter_map(|&e| {
                    let edge = &self.edges[e.0];
                    if edge.max_rank == rank + 1 {
                        Some(Cell::Node(edge.source))
                    } else if edge.max_rank > rank + 1 {
                        Some(Cell::Edge(e))
                    } else {
                        None
                    }
                })
                .collect();
            let down = self.nodes[n]
                .connects_as_source
                .iter()
                .filter_map(|&e| {
                    let edge = &self.edges[e.0];
                    if edge.min_rank + 1 == rank {
                        Some(Cell::Node(edge.target))
                    } else if edge.min_rank + 1 < rank {
                        Some(Cell::Edge(e))
                    } else {
                        None
                    }
                })
                .collect();
            self.nodes[n].up = up;
            self.nodes[n].down = down;
        }

        for (i, edge) in self.edges.iter_mut().enumerate() {
            let dummies = edge.dummy_count();
            let this = Cell::Edge(EdgeId(i));
            let (source, target) = (edge.source, edge.target);
            edge.up = (0..dummies)
                .map(|k| if k + 1 == dummies { Cell::Node(source) } else { this })
                .collect();
            edge.down = (0..dummies)
                .map(|k| if k == 0 { Cell::Node(target) } else { this })
                .collect();
        }
    }

    /// Cells on `rank + 1` connected to `cell` at `rank`.
    pub fn next_layer_cells(&self, cell: Cell, rank: usize) -> &[Cell] {
        match cell {
            Cell::Node(n) => &self.nodes[n.0].up,
            Cell::Edge(e) => {
                let edge = &self.edges[e.0];
                edge.slot(rank)
                    .and_then(|i| edge.up.get(i))
                    .map(std::slice::from_ref)
                    .unwrap_or(&[])
            }
        }
    }

    /// Cells on `rank - 1` connected to `cell` at `rank`.
    pub fn previous_layer_cells(&self, cell: Cell, rank: usize) -> &[Cell] {
        match cell {
            Cell::Node(n) => &self.nodes[n.0].down,
            Cell::Edge(e) => {
                let edge = &self.edges[e.0];
                edge.slot(rank)
                    .and_then(|i| edge.down.get(i))
                    .map(std::slice::from_ref)
                    .unwrap_or(&[])
            }
        }
    }

    pub fn order(&self, cell: Cell, rank: usize) -> usize {
        match cell {
            Cell::Node(n) => self.nodes[n.0].order,
            Cell::Edge(e) => {
                let edge = &self.edges[e.0];
                edge.slot(rank)
                    .and_then(|i| edge.order.get(i).copied())
                    .unwrap_or_default()
            }
        }
    }

    pub fn set_order(&mut self, cell: Cell, rank: usize, value: usize) {
        match cell {
            Cell::Node(n) => self.nodes[n.0].order = value,
            Cell::Edge(e) => {
                let edge = &mut self.edges[e.0];
                if let Some(i) = edge.slot(rank) {
                    edge.order[i] = value;
                }
            }
        }
    }

    pub fn work_x(&self, cell: Cell, rank: usize) -> f64 {
        match cell {
            Cell::Node(n) => self.nodes[n.0].work_x,
            Cell::Edge(e) => {
                let edge = &self.edges[e.0];
                edge.slot(rank)
                    .and_then(|i| edge.work_x.get(i).copied())
                    .unwrap_or_default()
            }
        }
    }

    pub fn set_work_x(&mut self, cell: Cell, rank: usize, value: f64) {
        match cell {
            Cell::Node(n) => self.nodes[n.0].work_x = value,
            Cell::Edge(e) => {
                let edge = &mut self.edges[e.0];
                if let Some(i) = edge.slot(rank) {
                    edge.work_x[i] = value;
                }
            }
        }
    }

    pub fn x(&self, cell: Cell, rank: usize) -> f64 {
        match cell {
            Cell::Node(n) => self.nodes[n.0].x,
            Cell::Edge(e) => {
                let edge = &self.edges[e.0];
                edge.slot(rank)
                    .and_then(|i| edge.x.get(i).copied())
                    .unwrap_or_default()
            }
        }
    }

    pub fn set_x(&mut self, cell: Cell, rank: usize, value: f64) {
        match cell {
            Cell::Node(n) => self.nodes[n.0].x = value,
            Cell::Edge(e) => {
                let edge = &mut self.edges[e.0];
                if let Some(i) = edge.slot(rank) {
                    edge.x[i] = value;
                }
            }
        }
    }

    pub fn set_y(&mut self, cell: Cell, rank: usize, value: f64) {
        match cell {
            Cell::Node(n) => self.nodes[n.0].y = value,
            Cell::Edge(e) => {
                let edge = &mut self.edges[e.0];
                if let Some(i) = edge.slot(rank) {
                    edge.y[i] = value;
                }
            }
        }
    }

    pub fn width(&self, cell: Cell) -> f64 {
        match cell {
            Cell::Node(n) => self.nodes[n.0].width,
            Cell::Edge(e) => self.edges[e.0].width,
        }
    }

    pub fn height(&self, cell: Cell) -> f64 {
        match cell {
            Cell::Node(n) => self.nodes[n.0].height,
            Cell::Edge(_) => 0.0,
        }
    }

    pub fn is_vertex(&self, cell: Cell) -> bool {
        matches!(cell, Cell::Node(_))
    }
}

fn wrap_edge<H: LayoutHost + ?Sized>(facade: &HostFacade<'_, H>, edge: &str) -> WrappedEdge {
    let host = facade.host();
    let source_vertex = facade.visible_terminal(edge, true).unwrap_or_default();
    let port_of = |source: bool| {
        let visible = facade.visible_terminal(edge, source)?;
        let terminal = host.terminal(edge, source)?;
        if host.is_port(terminal) && host.parent(terminal) == Some(visible.as_str()) {
            host.port_position(terminal)
        } else {
            None
        }
    };
    WrappedEdge {
        id: edge.to_string(),
        source_vertex,
        source_port: port_of(true),
        target_port: port_of(false),
    }
}
