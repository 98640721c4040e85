//! Coordinate assignment.
//!
//! Ranks are laid out along the y axis (before orientation is applied) and every cell gets an
//! in-rank x. The x values are relaxed towards the neighbour medians over a fixed number of
//! iterations; the iteration that had to leave cells furthest from their medians the least wins.
//! Placement is then turned into vertex locations and edge control points.

mod median;
mod min_path;
mod route;

use crate::config::LayoutConfig;
use crate::graphlib::Point;
use crate::model::{Cell, HierarchyModel, Stage};

const INITIAL_BEST_DELTA: f64 = 100_000_000.0;

/// Top-left corner computed for a vertex, in host coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct VertexPlacement {
    pub vertex: String,
    pub x: f64,
    pub y: f64,
}

/// Control points computed for a host edge, ordered from its source to its target.
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeRoute {
    pub edge: String,
    pub points: Vec<Point>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Placement {
    pub vertices: Vec<VertexPlacement>,
    pub edges: Vec<EdgeRoute>,
    /// Furthest in-rank coordinate reached by a vertex or a control point.
    pub limit_x: f64,
    /// Total displacement left by the retained iteration.
    pub x_delta: f64,
}

/// Places every cell of an ordered model.
pub fn run(model: &mut HierarchyModel, config: &LayoutConfig, initial_x: f64) -> Placement {
    CoordinateAssignment::new(config, initial_x).execute(model)
}

pub struct CoordinateAssignment<'a> {
    config: &'a LayoutConfig,
    initial_x: f64,
    current_x_delta: f64,
    widest_rank: usize,
    widest_rank_value: f64,
    rank_widths: Vec<f64>,
    /// Centre line of every rank along the rank axis.
    rank_y: Vec<f64>,
}

impl<'a> CoordinateAssignment<'a> {
    pub fn new(config: &'a LayoutConfig, initial_x: f64) -> Self {
        Self {
            config,
            initial_x,
            current_x_delta: 0.0,
            widest_rank: 0,
            widest_rank_value: 0.0,
            rank_widths: Vec::new(),
            rank_y: Vec::new(),
        }
    }

    pub fn execute(mut self, model: &mut HierarchyModel) -> Placement {
        let _span = tracing::debug_span!(
            "coordinate_assignment",
            ranks = model.ranks.len(),
            initial_x = self.initial_x
        )
        .entered();

        self.current_x_delta = 0.0;
        self.initial_coords(model);

        let mut best_delta = INITIAL_BEST_DELTA;
        if self.config.fine_tuning {
            self.min_node(model);
            for iteration in 0..self.config.max_placement_iterations {
                if iteration != 0 {
                    self.median_pos(model, iteration);
                    self.min_node(model);
                }
                if self.current_x_delta < best_delta {
                    keep_working_positions(model);
                    best_delta = self.current_x_delta;
                } else {
                    restore_best_positions(model);
                }
                self.min_path(model);
                self.current_x_delta = 0.0;
            }
        } else {
            best_delta = 0.0;
        }
        tracing::debug!(
            x_delta = best_delta,
            widest_rank = self.widest_rank,
            "coordinates assigned"
        );

        let mut placement = self.set_cell_locations(model);
        placement.x_delta = best_delta;
        model.advance(Stage::Ordered, Stage::Placed);
        placement
    }

    /// Sizes every cell, assigns the rank coordinates and centres every rank on the widest one.
    fn initial_coords(&mut self, model: &mut HierarchyModel) {
        self.calculate_widest_rank(model);

        for r in 0..model.ranks.len() {
            let mut local_x = self.initial_x + (self.widest_rank_value - self.rank_widths[r]) / 2.0;
            for k in 0..model.ranks[r].len() {
                let cell = model.ranks[r][k];
                let width = model.width(cell);
                local_x += width / 2.0;
                model.set_x(cell, r, local_x);
                model.set_work_x(cell, r, local_x);
                local_x += width / 2.0 + self.config.intra_cell_spacing;
            }
        }
    }

    fn calculate_widest_rank(&mut self, model: &mut HierarchyModel) {
        let orientation = self.config.orientation;
        let intra = self.config.intra_cell_spacing;
        let inter = self.config.inter_rank_cell_spacing;

        self.rank_widths = vec![0.0; model.ranks.len()];
        self.rank_y = vec![0.0; model.ranks.len()];
        self.widest_rank = 0;
        self.widest_rank_value = 0.0;

        let mut y = -inter;
        let mut last_rank_max_height = 0.0_f64;
        for r in (0..model.ranks.len()).rev() {
            let mut max_height = 0.0_f64;
            let mut local_x = self.initial_x;

            for k in 0..model.ranks[r].len() {
                let cell = model.ranks[r][k];
                match cell {
                    Cell::Node(n) => {
                        let node = &mut model.nodes[n.0];
                        if orientation.is_horizontal() {
                            node.width = node.host_height;
                            node.height = node.host_width;
                        } else {
                            node.width = node.host_width;
                            node.height = node.host_height;
                        }
                        max_height = max_height.max(node.height);
                    }
                    Cell::Edge(e) => {
                        let edge = &mut model.edges[e.0];
                        let parallel = edge.edges.len().saturating_sub(1);
                        edge.width = parallel as f64 * self.config.parallel_edge_spacing;
                    }
                }
                let width = model.width(cell);
                local_x += width / 2.0;
                model.set_x(cell, r, local_x);
                model.set_work_x(cell, r, local_x);
                local_x += width / 2.0 + intra;
            }

            let rank_width = if model.ranks[r].is_empty() {
                0.0
            } else {
                local_x - intra - self.initial_x
            };
            self.rank_widths[r] = rank_width;
            if rank_width > self.widest_rank_value {
                self.widest_rank_value = rank_width;
                self.widest_rank = r;
            }

            let distance = max_height / 2.0 + last_rank_max_height / 2.0 + inter;
            last_rank_max_height = max_height;
            if orientation.is_reversed() {
                y -= distance;
            } else {
                y += distance;
            }
            self.rank_y[r] = y;
            for k in 0..model.ranks[r].len() {
                let cell = model.ranks[r][k];
                model.set_y(cell, r, y);
            }
        }
    }
}

fn keep_working_positions(model: &mut HierarchyModel) {
    for r in 0..model.ranks.len() {
        for k in 0..model.ranks[r].len() {
            let cell = model.ranks[r][k];
            let x = model.work_x(cell, r);
            model.set_x(cell, r, x);
        }
    }
}

fn restore_best_positions(model: &mut HierarchyModel) {
    for r in 0..model.ranks.len() {
        for k in 0..model.ranks[r].len() {
            let cell = model.ranks[r][k];
            let x = model.x(cell, r);
            model.set_work_x(cell, r, x);
        }
    }
}
