//! Compound diagram container used by `strata`.
//!
//! A [`Graph`] holds vertices (with optional geometry), ports (vertices with relative geometry
//! hanging off a parent vertex) and edges whose terminals may be missing. Cell ids share one
//! namespace per kind: vertex ids and edge ids are looked up separately. Top-level vertices live
//! under the implicit [`Graph::ROOT`] container.

pub mod graph;

pub use graph::{Edge, Geometry, Graph, Point, Vertex};
