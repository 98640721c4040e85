//! Graph container APIs used by `strata`.
//!
//! The container keeps insertion order for vertices, edges and children so that layouts driven
//! from it are deterministic.

use rustc_hash::FxBuildHasher;
use std::cell::RefCell;

type HashMap<K, V> = hashbrown::HashMap<K, V, FxBuildHasher>;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Vertex geometry. For ports (`relative == true`) `x`/`y` are fractions of the parent size.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Geometry {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub relative: bool,
}

impl Geometry {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
            relative: false,
        }
    }

    pub fn sized(width: f64, height: f64) -> Self {
        Self::new(0.0, 0.0, width, height)
    }

    pub fn relative(x: f64, y: f64) -> Self {
        Self {
            x,
            y,
            width: 0.0,
            height: 0.0,
            relative: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Vertex {
    pub geometry: Option<Geometry>,
    pub visible: bool,
    pub collapsed: bool,
}

impl Default for Vertex {
    fn default() -> Self {
        Self {
            geometry: None,
            visible: true,
            collapsed: false,
        }
    }
}

impl Vertex {
    pub fn sized(width: f64, height: f64) -> Self {
        Self {
            geometry: Some(Geometry::sized(width, height)),
            ..Default::default()
        }
    }

    pub fn port(x: f64, y: f64) -> Self {
        Self {
            geometry: Some(Geometry::relative(x, y)),
            ..Default::default()
        }
    }

    pub fn is_port(&self) -> bool {
        self.geometry.is_some_and(|g| g.relative)
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Edge {
    pub source: Option<String>,
    pub target: Option<String>,
    pub points: Vec<Point>,
    pub label_offset: Option<Point>,
    /// Set once a layout has taken over routing of this edge.
    pub layout_managed: bool,
}

impl Edge {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: Some(source.into()),
            target: Some(target.into()),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone)]
struct CellEntry<T> {
    id: String,
    label: T,
}

#[derive(Debug, Clone)]
struct IncidenceCache {
    generation: u64,
    by_vertex: Vec<Vec<usize>>,
}

#[derive(Debug, Default)]
pub struct Graph {
    vertices: Vec<CellEntry<Vertex>>,
    vertex_index: HashMap<String, usize>,

    edges: Vec<CellEntry<Edge>>,
    edge_index: HashMap<String, usize>,

    parent: HashMap<String, String>,
    children: HashMap<String, Vec<String>>,

    // Layout passes ask for the edges of every vertex (and of its ports) several times; scanning
    // `self.edges` for each query is O(E). The cache is rebuilt lazily after any topology change.
    incidence_gen: u64,
    incidence_cache: RefCell<Option<IncidenceCache>>,
}

impl Graph {
    /// Id of the implicit container holding every top-level vertex.
    pub const ROOT: &'static str = "";

    pub fn new() -> Self {
        Self::default()
    }

    fn invalidate_incidence(&mut self) {
        self.incidence_gen = self.incidence_gen.wrapping_add(1);
        *self.incidence_cache.get_mut() = None;
    }

    fn ensure_incidence(&self) -> std::cell::RefMut<'_, IncidenceCache> {
        let generation = self.incidence_gen;
        let mut cache = self.incidence_cache.borrow_mut();
        let stale = cache
            .as_ref()
            .map(|c| c.generation != generation)
            .unwrap_or(true);
        if stale {
            let mut by_vertex: Vec<Vec<usize>> = vec![Vec::new(); self.vertices.len()];
            for (edge_idx, e) in self.edges.iter().enumerate() {
                let source = e.label.source.as_deref().and_then(|s| self.vertex_index.get(s));
                let target = e.label.target.as_deref().and_then(|t| self.vertex_index.get(t));
                if let Some(&v) = source {
                    by_vertex[v].push(edge_idx);
                }
                if let Some(&w) = target {
                    if source != Some(&w) {
                        by_vertex[w].push(edge_idx);
                    }
                }
            }
            *cache = Some(IncidenceCache {
                generation,
                by_vertex,
            });
        }
        std::cell::RefMut::map(cache, |c| {
            c.get_or_insert_with(|| IncidenceCache {
                generation,
                by_vertex: Vec::new(),
            })
        })
    }

    pub fn has_vertex(&self, id: &str) -> bool {
        self.vertex_index.contains_key(id)
    }

    pub fn set_vertex(&mut self, id: impl Into<String>, vertex: Vertex) -> &mut Self {
        let id = id.into();
        if let Some(&idx) = self.vertex_index.get(&id) {
            self.vertices[idx].label = vertex;
            return self;
        }
        self.invalidate_incidence();
        let idx = self.vertices.len();
        self.vertices.push(CellEntry {
            id: id.clone(),
            label: vertex,
        });
        self.vertex_index.insert(id, idx);
        self
    }

    pub fn add_vertex(&mut self, id: impl Into<String>, width: f64, height: f64) -> &mut Self {
        self.set_vertex(id, Vertex::sized(width, height))
    }

    /// Adds a port at the relative position (`x`, `y`) of `parent`.
    pub fn add_port(
        &mut self,
        id: impl Into<String>,
        parent: impl Into<String>,
        x: f64,
        y: f64,
    ) -> &mut Self {
        let id = id.into();
        self.set_vertex(id.clone(), Vertex::port(x, y));
        self.set_parent(id, parent)
    }

    pub fn vertex(&self, id: &str) -> Option<&Vertex> {
        self.vertex_index.get(id).map(|&idx| &self.vertices[idx].label)
    }

    pub fn vertex_mut(&mut self, id: &str) -> Option<&mut Vertex> {
        self.vertex_index
            .get(id)
            .copied()
            .map(move |idx| &mut self.vertices[idx].label)
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn vertices(&self) -> impl Iterator<Item = &str> {
        self.vertices.iter().map(|v| v.id.as_str())
    }

    pub fn has_edge(&self, id: &str) -> bool {
        self.edge_index.contains_key(id)
    }

    pub fn set_edge(&mut self, id: impl Into<String>, edge: Edge) -> &mut Self {
        let id = id.into();
        self.invalidate_incidence();
        if let Some(&idx) = self.edge_index.get(&id) {
            self.edges[idx].label = edge;
            return self;
        }
        let idx = self.edges.len();
        self.edges.push(CellEntry {
            id: id.clone(),
            label: edge,
        });
        self.edge_index.insert(id, idx);
        self
    }

    pub fn connect(
        &mut self,
        id: impl Into<String>,
        source: impl Into<String>,
        target: impl Into<String>,
    ) -> &mut Self {
        self.set_edge(id, Edge::new(source, target))
    }

    pub fn edge(&self, id: &str) -> Option<&Edge> {
        self.edge_index.get(id).map(|&idx| &self.edges[idx].label)
    }

    pub fn edge_mut(&mut self, id: &str) -> Option<&mut Edge> {
        self.edge_index
            .get(id)
            .copied()
            .map(move |idx| &mut self.edges[idx].label)
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn edges(&self) -> impl Iterator<Item = &str> {
        self.edges.iter().map(|e| e.id.as_str())
    }

    /// Edges with `vertex` as source or target, in insertion order. Loops are listed once.
    pub fn connected_edges(&self, vertex: &str) -> Vec<&str> {
        let Some(&idx) = self.vertex_index.get(vertex) else {
            return Vec::new();
        };
        let cache = self.ensure_incidence();
        cache
            .by_vertex
            .get(idx)
            .map(|edges| {
                edges
                    .iter()
                    .map(|&e| self.edges[e].id.as_str())
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default()
    }

    pub fn set_parent(&mut self, child: impl Into<String>, parent: impl Into<String>) -> &mut Self {
        let child = child.into();
        let parent = parent.into();
        if child == parent || child == Self::ROOT {
            return self;
        }
        if let Some(prev) = self.parent.remove(&child) {
            if let Some(ch) = self.children.get_mut(&prev) {
                ch.retain(|c| c != &child);
            }
        }
        if parent == Self::ROOT {
            return self;
        }
        self.parent.insert(child.clone(), parent.clone());
        let entry = self.children.entry(parent).or_default();
        if !entry.iter().any(|c| c == &child) {
            entry.push(child);
        }
        self
    }

    /// Parent of `child`. Top-level vertices report [`Graph::ROOT`]; the root has no parent.
    pub fn parent(&self, child: &str) -> Option<&str> {
        if let Some(parent) = self.parent.get(child) {
            return Some(parent.as_str());
        }
        self.has_vertex(child).then_some(Self::ROOT)
    }

    /// Children of `parent`; [`Graph::ROOT`] yields the top-level vertices.
    pub fn children(&self, parent: &str) -> Vec<&str> {
        if parent == Self::ROOT {
            return self
                .vertices
                .iter()
                .filter(|v| !self.parent.contains_key(&v.id))
                .map(|v| v.id.as_str())
                .collect();
        }
        self.children
            .get(parent)
            .map(|v| v.iter().map(|s| s.as_str()).collect::<Vec<_>>())
            .unwrap_or_default()
    }

    /// Moves the top-left corner of `vertex`, keeping its size.
    pub fn set_location(&mut self, vertex: &str, x: f64, y: f64) -> bool {
        let Some(v) = self.vertex_mut(vertex) else {
            return false;
        };
        let geometry = v.geometry.get_or_insert_with(Geometry::default);
        geometry.x = x;
        geometry.y = y;
        true
    }
}
