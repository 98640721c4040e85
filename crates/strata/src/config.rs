use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Side of the drawing the roots are placed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    #[default]
    North,
    South,
    East,
    West,
}

impl Orientation {
    /// East and west layouts run ranks along the x axis.
    pub fn is_horizontal(self) -> bool {
        matches!(self, Self::East | Self::West)
    }

    /// South and east layouts grow ranks towards negative coordinates.
    pub fn is_reversed(self) -> bool {
        matches!(self, Self::South | Self::East)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeStyle {
    Orthogonal,
    #[default]
    Polyline,
    Straight,
    Curve,
}

impl EdgeStyle {
    /// Styles that get jetty points where edges leave and enter vertices.
    pub fn uses_jetties(self) -> bool {
        !matches!(self, Self::Straight)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LayoutConfig {
    pub intra_cell_spacing: f64,
    pub inter_rank_cell_spacing: f64,
    pub inter_hierarchy_spacing: f64,
    pub parallel_edge_spacing: f64,
    pub orientation: Orientation,
    pub fine_tuning: bool,
    pub tighten_to_source: bool,
    pub max_crossing_iterations: usize,
    pub max_no_improvement_iterations: usize,
    pub max_placement_iterations: usize,
    pub edge_style: EdgeStyle,
    pub reset_edge_labels: bool,
    pub disable_edge_style: bool,
    pub traverse_ancestors: bool,
    pub pref_hoz_edge_sep: f64,
    pub pref_vert_edge_off: f64,
    pub min_edge_jetty: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            intra_cell_spacing: 30.0,
            inter_rank_cell_spacing: 100.0,
            inter_hierarchy_spacing: 60.0,
            parallel_edge_spacing: 10.0,
            orientation: Orientation::North,
            fine_tuning: true,
            tighten_to_source: true,
            max_crossing_iterations: 24,
            max_no_improvement_iterations: 2,
            max_placement_iterations: 8,
            edge_style: EdgeStyle::Polyline,
            reset_edge_labels: true,
            disable_edge_style: true,
            traverse_ancestors: true,
            pref_hoz_edge_sep: 5.0,
            pref_vert_edge_off: 2.0,
            min_edge_jetty: 12.0,
        }
    }
}

impl LayoutConfig {
    pub fn validate(&self) -> Result<()> {
        let spacings = [
            ("intraCellSpacing", self.intra_cell_spacing),
            ("interRankCellSpacing", self.inter_rank_cell_spacing),
            ("interHierarchySpacing", self.inter_hierarchy_spacing),
            ("parallelEdgeSpacing", self.parallel_edge_spacing),
            ("prefHozEdgeSep", self.pref_hoz_edge_sep),
            ("prefVertEdgeOff", self.pref_vert_edge_off),
            ("minEdgeJetty", self.min_edge_jetty),
        ];
        for (option, value) in spacings {
            if !value.is_finite() || value < 0.0 {
                return Err(Error::InvalidConfig {
                    option,
                    value: value.to_string(),
                });
            }
        }
        if self.max_crossing_iterations == 0 {
            return Err(Error::InvalidConfig {
                option: "maxCrossingIterations",
                value: "0".to_string(),
            });
        }
        Ok(())
    }
}
