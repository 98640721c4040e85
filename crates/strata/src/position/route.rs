use super::{CoordinateAssignment, EdgeRoute, Placement, VertexPlacement};
use crate::config::EdgeStyle;
use crate::graphlib::Point;
use crate::model::{Cell, EdgeId, HierarchyEdge, HierarchyModel, HierarchyNode};

/// Vertical extent of the vertices of every rank, before orientation is applied.
struct RankExtents<'a> {
    top: Vec<f64>,
    bottom: Vec<f64>,
    centre: &'a [f64],
}

impl RankExtents<'_> {
    /// Middle of the channel between rank `upper` and the rank `lower` below it. Falls back to the
    /// rank centres when a rank holds no vertex.
    fn channel(&self, upper: usize, lower: usize) -> f64 {
        let y = (self.top[lower] + self.bottom[upper]) / 2.0;
        if y.is_finite() {
            y
        } else {
            (self.centre[upper] + self.centre[lower]) / 2.0
        }
    }
}

/// Per hierarchy edge, four values per wrapped edge: x and offset at the source end, then x and
/// offset at the target end.
type Jetties = Vec<Option<Vec<f64>>>;

impl CoordinateAssignment<'_> {
    pub(super) fn set_cell_locations(&self, model: &HierarchyModel) -> Placement {
        let horizontal = self.config.orientation.is_horizontal();
        let mut extents = RankExtents {
            top: vec![f64::INFINITY; model.ranks.len()],
            bottom: vec![f64::NEG_INFINITY; model.ranks.len()],
            centre: &self.rank_y,
        };
        let mut placement = Placement {
            limit_x: self.initial_x,
            ..Placement::default()
        };

        for node in &model.nodes {
            let x = node.x - node.width / 2.0;
            let y = node.y - node.height / 2.0;
            if let (Some(top), Some(bottom)) = (
                extents.top.get_mut(node.rank),
                extents.bottom.get_mut(node.rank),
            ) {
                *top = top.min(y);
                *bottom = bottom.max(y + node.height);
            }
            let (x_host, y_host) = if horizontal { (y, x) } else { (x, y) };
            placement.vertices.push(VertexPlacement {
                vertex: node.vertex.clone(),
                x: x_host,
                y: y_host,
            });
            placement.limit_x = placement.limit_x.max(x + node.width);
        }

        let jetties = if self.config.edge_style.uses_jetties() {
            self.local_edge_processing(model)
        } else {
            vec![None; model.edges.len()]
        };
        for (edge, jetty) in model.edges.iter().zip(&jetties) {
            self.set_edge_position(model, edge, jetty.as_deref(), &extents, &mut placement);
        }
        placement
    }

    /// Spreads the edges leaving each side of a vertex evenly over its width, in the order of the
    /// cells they lead to, and staggers their jetty lengths.
    fn local_edge_processing(&self, model: &HierarchyModel) -> Jetties {
        let separation = self.config.pref_hoz_edge_sep;
        let vertical_offset = self.config.pref_vert_edge_off;
        let mut jetties: Jetties = vec![None; model.edges.len()];

        for (r, rank) in model.ranks.iter().enumerate() {
            for &cell in rank {
                let Cell::Node(id) = cell else {
                    continue;
                };
                let node = &model.nodes[id.0];

                // Side 0 faces the rank below, side 1 the rank above.
                for side in 0..2 {
                    let (neighbours, neighbour_rank) = if side == 0 {
                        if r == 0 {
                            continue;
                        }
                        (model.previous_layer_cells(cell, r), r - 1)
                    } else {
                        if r + 1 >= model.ranks.len() {
                            continue;
                        }
                        (model.next_layer_cells(cell, r), r + 1)
                    };
                    if neighbours.is_empty() {
                        continue;
                    }

                    let mut sorted = neighbours.to_vec();
                    sorted.sort_by(|a, b| {
                        model
                            .x(*a, neighbour_rank)
                            .total_cmp(&model.x(*b, neighbour_rank))
                    });

                    let mut groups: Vec<EdgeId> = Vec::new();
                    let mut edge_count = 0;
                    for other in sorted {
                        match other {
                            Cell::Node(other) => {
                                let connections = if side == 0 {
                                    &node.connects_as_source
                                } else {
                                    &node.connects_as_target
                                };
                                for &e in connections {
                                    let edge = &model.edges[e.0];
                                    if edge.source == other || edge.target == other {
                                        edge_count += edge.edges.len();
                                        groups.push(e);
                                    }
                                }
                            }
                            Cell::Edge(e) => {
                                edge_count += model.edges[e.0].edges.len();
                                groups.push(e);
                            }
                        }
                    }
                    if edge_count == 0 {
                        continue;
                    }

                    let mut left = node.x - node.width / 2.0;
                    let mut right = left + node.width;
                    let required = (edge_count + 1) as f64 * separation;
                    if node.width > required + 2.0 * separation {
                        left += separation;
                        right -= separation;
                    }
                    let spacing = (right - left) / edge_count as f64;

                    let mut x = left + spacing / 2.0;
                    let mut y_offset = self.config.min_edge_jetty - vertical_offset;
                    let half = edge_count as f64 / 2.0;
                    for (j, e) in groups.into_iter().enumerate() {
                        let j = j as f64;
                        if j < half {
                            y_offset += vertical_offset;
                        } else if j > half {
                            y_offset -= vertical_offset;
                        }
                        let wrapped = model.edges[e.0].edges.len();
                        let positions =
                            jetties[e.0].get_or_insert_with(|| vec![0.0; wrapped * 4]);
                        for m in 0..wrapped {
                            positions[m * 4 + side * 2] = x;
                            positions[m * 4 + side * 2 + 1] = y_offset;
                            x += spacing;
                        }
                    }
                }
            }
        }
        jetties
    }

    fn set_edge_position(
        &self,
        model: &HierarchyModel,
        edge: &HierarchyEdge,
        jetties: Option<&[f64]>,
        extents: &RankExtents<'_>,
        placement: &mut Placement,
    ) {
        let (mut max_rank, mut min_rank) = (edge.max_rank, edge.min_rank);
        if max_rank == min_rank {
            max_rank = model.nodes[edge.source.0].rank;
            min_rank = model.nodes[edge.target.0].rank;
        }
        let layout_reversed = self.config.orientation.is_reversed();
        let curve = self.config.edge_style == EdgeStyle::Curve;
        let host_source = &model.nodes[edge.host_source().0].vertex;
        let point = |along: f64, across: f64| {
            if self.config.orientation.is_horizontal() {
                Point::new(across, along)
            } else {
                Point::new(along, across)
            }
        };

        let mut offset_x = 0.0;
        for (i, wrapped) in edge.edges.iter().enumerate() {
            // Grouped edges may run either way; each is routed from its own source.
            let reversed = edge.reversed != (wrapped.source_vertex != *host_source);
            let (from, to) = if reversed {
                (edge.target, edge.source)
            } else {
                (edge.source, edge.target)
            };
            let mut points = Vec::new();

            if let Some(positions) = jetties {
                let offset = if reversed { 2 } else { 0 };
                let mut y = match (reversed, layout_reversed) {
                    (true, true) => extents.bottom[min_rank],
                    (true, false) => extents.top[min_rank],
                    (false, true) => extents.top[max_rank],
                    (false, false) => extents.bottom[max_rank],
                };
                let mut jetty = positions[i * 4 + 1 + offset];
                if reversed != layout_reversed {
                    jetty = -jetty;
                }
                y += jetty;
                let x = match wrapped.source_port {
                    Some(port) => self.port_x(&model.nodes[from.0], port),
                    None => positions[i * 4 + offset],
                };
                points.push(point(x, y));
                if curve {
                    points.push(point(x, y + jetty));
                }
            }

            if edge.max_rank != edge.min_rank {
                let slots: Vec<usize> = if reversed {
                    (0..edge.x.len()).collect()
                } else {
                    (0..edge.x.len()).rev().collect()
                };
                for slot in slots {
                    let rank = edge.min_rank + 1 + slot;
                    let x = edge.x[slot] + offset_x;
                    let mut top_channel = extents.channel(rank + 1, rank);
                    let mut bottom_channel = extents.channel(rank, rank - 1);
                    if reversed {
                        std::mem::swap(&mut top_channel, &mut bottom_channel);
                    }
                    points.push(point(x, top_channel));
                    points.push(point(x, bottom_channel));
                    placement.limit_x = placement.limit_x.max(x);
                }
            }

            if let Some(positions) = jetties {
                let offset = if reversed { 2 } else { 0 };
                let rank_y = match (reversed, layout_reversed) {
                    (true, true) => extents.top[max_rank],
                    (true, false) => extents.bottom[max_rank],
                    (false, true) => extents.bottom[min_rank],
                    (false, false) => extents.top[min_rank],
                };
                let mut jetty = positions[i * 4 + 3 - offset];
                if reversed != layout_reversed {
                    jetty = -jetty;
                }
                let y = rank_y - jetty;
                let x = match wrapped.target_port {
                    Some(port) => self.port_x(&model.nodes[to.0], port),
                    None => positions[i * 4 + 2 - offset],
                };
                if curve {
                    points.push(point(x, y - jetty));
                }
                points.push(point(x, y));
            }

            placement.edges.push(EdgeRoute {
                edge: wrapped.id.clone(),
                points,
            });

            offset_x = if offset_x == 0.0 {
                self.config.parallel_edge_spacing
            } else if offset_x > 0.0 {
                -offset_x
            } else {
                -offset_x + self.config.parallel_edge_spacing
            };
        }
    }

    /// In-rank coordinate of a port, from its relative position on the vertex.
    fn port_x(&self, node: &HierarchyNode, port: Point) -> f64 {
        let ratio = if self.config.orientation.is_horizontal() {
            port.y
        } else {
            port.x
        };
        node.x - node.width / 2.0 + node.width * ratio
    }
}
