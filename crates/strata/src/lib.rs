//! Hierarchical (layered) graph layout.
//!
//! A pass runs four stages over an internal model of the host diagram: cycle removal, layering,
//! crossing reduction and coordinate assignment. Results are written back through
//! [`LayoutHost`]; [`graphlib::Graph`] implements it out of the box.

pub use strata_graphlib as graphlib;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod config;
pub mod cycle;
pub mod error;
pub mod facade;
pub mod host;
pub mod layering;
pub mod layout;
pub mod model;
pub mod order;
pub mod position;

pub use config::{EdgeStyle, LayoutConfig, Orientation};
pub use error::{Error, Result};
pub use host::LayoutHost;
pub use layout::{HierarchicalLayout, HierarchyReport, LayoutReport};

/// Lays out every top-level vertex of `graph`.
pub fn layout(graph: &mut graphlib::Graph, config: &LayoutConfig) -> Result<LayoutReport> {
    HierarchicalLayout::new(config.clone()).execute(graph, Some(graphlib::Graph::ROOT), None)
}
