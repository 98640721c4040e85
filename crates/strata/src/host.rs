//! The contract between the layout engine and the diagram that owns the cells.
//!
//! Cells are addressed by string id. The engine only reads through `&self` while it builds and
//! runs a pass, and writes results back through the `set_*`/`reset_*` methods once placement is
//! complete.

use crate::graphlib::{Geometry, Graph, Point};

pub trait LayoutHost {
    /// Whether `cell` names anything the host knows: a container, a vertex or an edge.
    fn contains(&self, cell: &str) -> bool;

    fn is_vertex(&self, cell: &str) -> bool;

    fn is_visible(&self, cell: &str) -> bool;

    fn is_collapsed(&self, cell: &str) -> bool;

    fn is_port(&self, cell: &str) -> bool;

    /// Containing cell; `None` only for the top-most container.
    fn parent(&self, cell: &str) -> Option<&str>;

    fn children(&self, parent: &str) -> Vec<&str>;

    /// Edges that have `cell` itself as a terminal.
    fn connected_edges(&self, cell: &str) -> Vec<&str>;

    fn terminal(&self, edge: &str, source: bool) -> Option<&str>;

    /// Current geometry of a vertex, `None` when the vertex has no bounds.
    fn vertex_bounds(&self, vertex: &str) -> Option<Geometry>;

    /// Relative attachment point of a port on its parent, as fractions of the parent size.
    fn port_position(&self, port: &str) -> Option<Point> {
        self.vertex_bounds(port)
            .filter(|g| g.relative)
            .map(|g| Point::new(g.x, g.y))
    }

    /// Moves the top-left corner of `vertex`.
    fn set_vertex_location(&mut self, vertex: &str, x: f64, y: f64);

    /// Replaces the waypoints between the edge terminals.
    fn set_edge_points(&mut self, edge: &str, points: Vec<Point>);

    /// Clears the waypoints left over from earlier routing.
    fn reset_edge(&mut self, _edge: &str) {}

    /// Stops the host from applying its own edge style; the layout owns the routing.
    fn disable_edge_style(&mut self, _edge: &str) {}

    /// Re-centres the edge label.
    fn reset_edge_label(&mut self, _edge: &str) {}
}

impl LayoutHost for Graph {
    fn contains(&self, cell: &str) -> bool {
        cell == Graph::ROOT || self.has_vertex(cell) || self.has_edge(cell)
    }

    fn is_vertex(&self, cell: &str) -> bool {
        self.has_vertex(cell)
    }

    fn is_visible(&self, cell: &str) -> bool {
        self.vertex(cell).map(|v| v.visible).unwrap_or(true)
    }

    fn is_collapsed(&self, cell: &str) -> bool {
        self.vertex(cell).is_some_and(|v| v.collapsed)
    }

    fn is_port(&self, cell: &str) -> bool {
        self.vertex(cell).is_some_and(|v| v.is_port())
    }

    fn parent(&self, cell: &str) -> Option<&str> {
        Graph::parent(self, cell)
    }

    fn children(&self, parent: &str) -> Vec<&str> {
        Graph::children(self, parent)
    }

    fn connected_edges(&self, cell: &str) -> Vec<&str> {
        Graph::connected_edges(self, cell)
    }

    fn terminal(&self, edge: &str, source: bool) -> Option<&str> {
        let edge = self.edge(edge)?;
        if source {
            edge.source.as_deref()
        } else {
            edge.target.as_deref()
        }
    }

    fn vertex_bounds(&self, vertex: &str) -> Option<Geometry> {
        self.vertex(vertex)?.geometry
    }

    fn set_vertex_location(&mut self, vertex: &str, x: f64, y: f64) {
        self.set_location(vertex, x, y);
    }

    fn set_edge_points(&mut self, edge: &str, points: Vec<Point>) {
        if let Some(edge) = self.edge_mut(edge) {
            edge.points = points;
        }
    }

    fn reset_edge(&mut self, edge: &str) {
        if let Some(edge) = self.edge_mut(edge) {
            edge.points.clear();
        }
    }

    fn disable_edge_style(&mut self, edge: &str) {
        if let Some(edge) = self.edge_mut(edge) {
            edge.layout_managed = true;
        }
    }

    fn reset_edge_label(&mut self, edge: &str) {
        if let Some(edge) = self.edge_mut(edge) {
            edge.label_offset = None;
        }
    }
}
