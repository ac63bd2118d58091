// src/graph/mod.rs

//! Work-breakdown dependency graph.
//!
//! - [`node`] defines the [`WorkNode`] stored in the arena.
//! - [`edge`] defines finish-to-start [`DependencyEdge`]s and their status.
//! - [`dependency_graph`] owns both, enforces acyclicity and propagates
//!   satisfaction when a predecessor changes state.

pub mod dependency_graph;
pub mod edge;
pub mod node;

pub use dependency_graph::{DependencyGraph, EdgeAnnotation, Propagation};
pub use edge::{DependencyEdge, EdgeId, EdgeStatus};
pub use node::WorkNode;
