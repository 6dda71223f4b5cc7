//! Dynamic exploration graph (DEG) for approximate nearest neighbor search.
//!
//! A DEG is a single-layer, degree-regular, undirected and weighted graph.
//! Every vertex keeps exactly `edges_per_vertex` edges and the edges
//! approximate a relative neighborhood graph (RNG), which keeps greedy search
//! effective while vertices are inserted and removed online.
//!
//! # Architecture
//!
//! ```text
//! callers ── add / remove ──▶ GraphDesigner (FIFO queues, build loop)
//!                                  │ extend / shrink / improve
//!                                  ▼
//! search / explore ──────────▶ RegularGraph ──distance──▶ FeatureSpace
//!                                  ▲
//!                  ReachabilityAnalyzer (union-find, removal repair)
//! ```
//!
//! - [`RegularGraph`]: vertex/edge store with dense ids and a label map
//! - [`search`](RegularGraph::search), [`explore`](RegularGraph::explore),
//!   [`has_path`](RegularGraph::has_path): best-first beam search
//! - [`GraphDesigner`]: single-writer maintenance engine with RNG-aware edge
//!   wiring and bounded edge-swap improvement
//! - [`DynamicExplorationGraph`]: facade sharing one graph between readers and
//!   the build loop
//!
//! # Parameters
//!
//! - `edges_per_vertex`: degree of every vertex (fixed per graph)
//! - `extend_k` / `extend_eps`: candidate search when inserting
//! - `improve_k` / `improve_eps` / `max_path_length`: edge improvement
//!
//! # Example
//!
//! ```
//! use deg_feature::{FeatureVector, Metric, PrimitiveSpace};
//! use deg_graph::{DesignerConfig, DynamicExplorationGraph};
//! use std::sync::Arc;
//!
//! let space = Arc::new(PrimitiveSpace::float(Metric::L2, 2));
//! let deg = DynamicExplorationGraph::new(space, 4, DesignerConfig::for_degree(4)).unwrap();
//!
//! for i in 0..20 {
//!     let f = FeatureVector::from(vec![i as f32, (i * i % 7) as f32]);
//!     deg.designer().add(i, f).unwrap();
//! }
//! deg.designer().build_until_idle(|_| {}).unwrap();
//!
//! let query = FeatureVector::from(vec![3.0f32, 2.0]);
//! let results = deg.search(&query, 3, 0.1).unwrap();
//! assert_eq!(results.len(), 3);
//! ```

pub mod analysis;
pub mod designer;
mod graph;
mod index;
mod search;

pub use designer::{BuildStatus, DesignerConfig, ExtendSchema, GraphDesigner};
pub use designer::reachability::{ReachabilityAnalyzer, ReachableGroup};
pub use graph::{Label, Neighbors, RegularGraph, Vertex, VertexId};
pub use index::{DynamicExplorationGraph, SearchHit};
pub use search::{LabelFilter, VertexDistance};

/// Error type for graph operations.
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    #[error("Feature error: {0}")]
    Feature(#[from] deg_feature::FeatureError),

    #[error("Graph contains label {0} already")]
    DuplicateLabel(Label),

    #[error("Label not found: {0}")]
    UnknownLabel(Label),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A structural invariant could not be restored. Aborts the build loop.
    #[error("Graph inconsistency: {0}")]
    Inconsistent(String),

    #[error("Graph validation failed: {0}")]
    Validation(String),
}

/// Result type for graph operations.
pub type Result<T> = std::result::Result<T, GraphError>;
