//! The layout pass.
//!
//! Splits the scope into hierarchies, then runs every hierarchy through cycle removal, layering,
//! crossing reduction and placement, packing them side by side along the rank axis.

use crate::config::LayoutConfig;
use crate::error::{Error, Result};
use crate::facade::HostFacade;
use crate::host::LayoutHost;
use crate::model::HierarchyModel;
use crate::{cycle, layering, order, position};
use indexmap::{IndexMap, IndexSet};
use serde::Serialize;

/// How many ids the missing-bounds warning lists.
const MISSING_BOUNDS_SAMPLE: usize = 5;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HierarchyReport {
    /// Layer of every vertex, counted from the roots.
    pub layers: IndexMap<String, usize>,
    pub inverted_edges: usize,
    pub crossings_before: usize,
    pub crossings_after: usize,
    /// Vertices the ranking scan could not resolve.
    pub unresolved: Vec<String>,
    pub limit_x: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutReport {
    pub hierarchies: Vec<HierarchyReport>,
    /// Vertices laid out with zero size because the host had no bounds for them.
    pub missing_bounds: Vec<String>,
}

impl LayoutReport {
    pub fn layer_of(&self, vertex: &str) -> Option<usize> {
        self.hierarchies
            .iter()
            .find_map(|h| h.layers.get(vertex).copied())
    }

    /// Crossings left over all hierarchies.
    pub fn crossings(&self) -> usize {
        self.hierarchies.iter().map(|h| h.crossings_after).sum()
    }
}

#[derive(Debug, Clone, Default)]
pub struct HierarchicalLayout {
    config: LayoutConfig,
}

impl HierarchicalLayout {
    pub fn new(config: LayoutConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    /// Lays out the vertices below `parent`, or the hierarchies reachable from `roots`.
    ///
    /// With both, roots outside `parent` are ignored. With neither, nothing is touched and
    /// [`Error::MissingScope`] is returned.
    pub fn execute<H: LayoutHost + ?Sized>(
        &self,
        host: &mut H,
        parent: Option<&str>,
        roots: Option<&[&str]>,
    ) -> Result<LayoutReport> {
        self.config.validate()?;
        let roots = roots.filter(|r| !r.is_empty());
        if parent.is_none() && roots.is_none() {
            return Err(Error::MissingScope);
        }
        if let Some(parent) = parent {
            if !host.contains(parent) {
                return Err(Error::UnknownCell(parent.to_string()));
            }
        }
        if let Some(missing) = roots.into_iter().flatten().find(|r| !host.is_vertex(r)) {
            return Err(Error::UnknownCell(missing.to_string()));
        }

        let _span = tracing::debug_span!(
            "hierarchical_layout",
            parent = parent.unwrap_or_default(),
            roots = roots.map_or(0, <[&str]>::len)
        )
        .entered();

        let models = self.build_models(&*host, parent, roots);

        let mut report = LayoutReport::default();
        let mut initial_x = 0.0;
        for mut model in models {
            let wrapped: Vec<String> = model.wrapped_edges().map(str::to_string).collect();
            for edge in &wrapped {
                host.reset_edge(edge);
                if self.config.disable_edge_style {
                    host.disable_edge_style(edge);
                }
            }

            let inverted_edges = cycle::run(&mut model);
            let unresolved = layering::run(&mut model, self.config.tighten_to_source);
            let crossings = order::run(
                &mut model,
                self.config.max_crossing_iterations,
                self.config.max_no_improvement_iterations,
            );
            let placement = position::run(&mut model, &self.config, initial_x);

            for vertex in &placement.vertices {
                host.set_vertex_location(&vertex.vertex, vertex.x, vertex.y);
            }
            for route in placement.edges {
                host.set_edge_points(&route.edge, route.points);
                if self.config.reset_edge_labels {
                    host.reset_edge_label(&route.edge);
                }
            }

            report.hierarchies.push(HierarchyReport {
                layers: model
                    .nodes
                    .iter()
                    .map(|n| (n.vertex.clone(), model.max_rank - n.rank))
                    .collect(),
                inverted_edges,
                crossings_before: crossings.before,
                crossings_after: crossings.after,
                unresolved: unresolved
                    .iter()
                    .map(|n| model.node(*n).vertex.clone())
                    .collect(),
                limit_x: placement.limit_x,
            });
            report.missing_bounds.append(&mut model.missing_bounds);
            initial_x = placement.limit_x + self.config.inter_hierarchy_spacing;
        }

        if !report.missing_bounds.is_empty() {
            let sample: Vec<&str> = report
                .missing_bounds
                .iter()
                .take(MISSING_BOUNDS_SAMPLE)
                .map(String::as_str)
                .collect();
            tracing::warn!(
                count = report.missing_bounds.len(),
                vertices = ?sample,
                "vertices without bounds were laid out with zero size"
            );
        }
        Ok(report)
    }

    /// Builds one model per hierarchy, all from the same per-pass view of the host.
    fn build_models<H: LayoutHost + ?Sized>(
        &self,
        host: &H,
        parent: Option<&str>,
        roots: Option<&[&str]>,
    ) -> Vec<HierarchyModel> {
        let facade = HostFacade::new(host, parent, self.config.traverse_ancestors);

        let (hierarchies, roots) = match roots {
            Some(roots) => {
                let roots: Vec<String> = roots
                    .iter()
                    .filter(|r| parent.is_none_or(|p| is_descendant(host, p, r)))
                    .map(|r| r.to_string())
                    .collect();
                (facade.hierarchies(&roots, None), roots)
            }
            None => {
                let mut candidates = IndexSet::new();
                if let Some(parent) = parent {
                    facade.filter_descendants(parent, &mut candidates);
                }
                facade.hierarchies_from_candidates(candidates)
            }
        };
        tracing::debug!(
            hierarchies = hierarchies.len(),
            roots = roots.len(),
            "scope split"
        );

        hierarchies
            .into_iter()
            .map(|vertices| {
                let vertices: Vec<String> = vertices.into_iter().collect();
                HierarchyModel::build(&facade, &vertices, &roots)
            })
            .collect()
    }
}

fn is_descendant<H: LayoutHost + ?Sized>(host: &H, parent: &str, cell: &str) -> bool {
    let mut cursor = host.parent(cell);
    while let Some(current) = cursor {
        if current == parent {
            return true;
        }
        cursor = host.parent(current);
    }
    false
}
