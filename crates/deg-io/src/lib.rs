//! Binary file format for dynamic exploration graphs.
//!
//! Persists a [`RegularGraph`] with its features, edges and labels, and
//! restores it with the feature space looked up in a
//! [`FeatureSpaceRegistry`].
//!
//! # File layout
//!
//! All numbers are little-endian.
//!
//! ```text
//! header:  metric:u8 | dims:u16 | vertex_count:u32 | edges_per_vertex:u8
//! vertex:  feature bytes | neighbor ids:i32 * epv | weights:f32 * epv | label:i32
//! ```
//!
//! Neighbor ids are sorted ascending. Vertices with fewer edges than
//! `edges_per_vertex` are padded with their own id and weight 0. The feature
//! size is not stored, it follows from the file size. The component type
//! is not stored either: it is passed by the caller or taken from the
//! file name (`graph.float.deg`).
//!
//! # Example
//!
//! ```no_run
//! use deg_feature::FeatureSpaceRegistry;
//! use deg_graph::DesignerConfig;
//!
//! let registry = FeatureSpaceRegistry::new();
//! let deg = deg_io::load("index/graph.float.deg", None, &registry, DesignerConfig::for_degree(30))?;
//! deg_io::save(&deg, "index/copy.float.deg")?;
//! # Ok::<(), deg_io::IoError>(())
//! ```

mod format;
mod reader;
mod writer;

pub use format::{component_from_path, Header, HEADER_SIZE};
pub use reader::read_graph;
pub use writer::write_graph;

use deg_feature::{ComponentType, FeatureSpaceRegistry};
use deg_graph::{DesignerConfig, DynamicExplorationGraph};
use std::path::Path;

/// Error type for graph file operations.
#[derive(Debug, thiserror::Error)]
pub enum IoError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Feature error: {0}")]
    Feature(#[from] deg_feature::FeatureError),

    #[error("Graph error: {0}")]
    Graph(#[from] deg_graph::GraphError),

    /// The file content does not follow the format.
    #[error("Format error: {0}")]
    Format(String),
}

/// Result type for graph file operations.
pub type Result<T> = std::result::Result<T, IoError>;

/// Write the graph of `deg` to `path`.
///
/// Holds the read lock for the duration of the write, so the build loop
/// pauses meanwhile.
pub fn save<P: AsRef<Path>>(deg: &DynamicExplorationGraph, path: P) -> Result<()> {
    write_graph(&deg.read(), path)
}

/// Read a graph file and wrap it with a designer using `config`.
pub fn load<P: AsRef<Path>>(
    path: P,
    component: Option<ComponentType>,
    registry: &FeatureSpaceRegistry,
    config: DesignerConfig,
) -> Result<DynamicExplorationGraph> {
    let graph = read_graph(path, component, registry)?;
    Ok(DynamicExplorationGraph::from_graph(graph, config)?)
}
