//! Feature vectors and distance spaces for dynamic exploration graphs.
//!
//! The graph never looks inside a feature vector. Everything it needs is
//! provided by a [`FeatureSpace`]:
//!
//! - **Feature vectors**: typed, cheaply clonable component arrays
//!   (`u8`, `i16`, `i32`, `f32`, `f64` or opaque bytes)
//! - **Metrics**: squared L2, inner product, Manhattan and cosine kernels
//! - **FeatureSpace**: dimensionality, component type, byte size and the
//!   distance callback used by search and graph construction
//! - **FeatureSpaceRegistry**: resolves a space from the metadata stored in a
//!   persisted graph file
//! - **brute**: exact k-NN ground truth for quality diagnostics
//!
//! # Architecture
//!
//! ```text
//! deg-io (file format)  ──resolve──▶  FeatureSpaceRegistry
//!        │                                   │
//!        ▼                                   ▼
//! deg-graph (RegularGraph, search, designer) ──distance──▶ FeatureSpace
//! ```
//!
//! # Example
//!
//! ```
//! use deg_feature::{FeatureSpace, FeatureVector, Metric, PrimitiveSpace};
//!
//! let space = PrimitiveSpace::float(Metric::L2, 2);
//! let a = FeatureVector::from(vec![0.0f32, 0.0]);
//! let b = FeatureVector::from(vec![3.0f32, 4.0]);
//!
//! // squared euclidean distance
//! assert_eq!(space.compute_distance(&a, &b), 25.0);
//! ```

pub mod brute;
mod distance;
mod feature;
mod space;

pub use distance::{
    cosine_distance, euclidean_distance_squared, inner_product, manhattan_distance, Metric,
};
pub use feature::{ComponentType, FeatureData, FeatureVector};
pub use space::{FeatureSpace, FeatureSpaceRegistry, PrimitiveSpace};

/// Error type for feature operations.
#[derive(Debug, thiserror::Error)]
pub enum FeatureError {
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Component type mismatch: expected {expected}, got {actual}")]
    ComponentMismatch {
        expected: ComponentType,
        actual: ComponentType,
    },

    #[error("Invalid feature: {0}")]
    InvalidFeature(String),

    #[error("No feature space for component={component}, metric={metric}, dims={dims}")]
    UnknownSpace {
        component: ComponentType,
        metric: u8,
        dims: usize,
    },
}

/// Result type for feature operations.
pub type Result<T> = std::result::Result<T, FeatureError>;
