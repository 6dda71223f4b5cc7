//! Feature spaces.
//!
//! A [`FeatureSpace`] is the distance oracle of a graph: it knows the shape of
//! the features it accepts and computes distances between them. Persisted
//! graphs only store the metric id and dimensionality, so loading them goes
//! through a [`FeatureSpaceRegistry`].

use crate::distance::{scalar, Metric};
use crate::feature::{ComponentType, FeatureData, FeatureVector};
use crate::{FeatureError, Result};
use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;

/// Distance oracle and shape description of a feature vector type.
///
/// # Thread Safety
///
/// Distances are computed concurrently by parallel searches, so
/// implementations must be `Send + Sync` and free of side effects.
pub trait FeatureSpace: Send + Sync + fmt::Debug {
    /// Number of components per feature.
    fn dims(&self) -> usize;

    fn component_type(&self) -> ComponentType;

    /// Metric id as stored in graph files (see [`Metric::id`]).
    fn metric(&self) -> u8;

    /// Whether distances are computed by native (SIMD) kernels.
    fn is_native(&self) -> bool {
        false
    }

    /// Size of a serialized feature in bytes.
    fn feature_byte_size(&self) -> usize {
        self.dims() * self.component_type().byte_size().unwrap_or(1)
    }

    /// Compute the distance between two features of this space.
    ///
    /// Both features are assumed to match the space; use
    /// [`FeatureSpace::validate`] at the boundary.
    fn compute_distance(&self, a: &FeatureVector, b: &FeatureVector) -> f32;

    /// Check that a feature matches this space.
    fn validate(&self, feature: &FeatureVector) -> Result<()> {
        if feature.component_type() != self.component_type() {
            return Err(FeatureError::ComponentMismatch {
                expected: self.component_type(),
                actual: feature.component_type(),
            });
        }
        if feature.dims() != self.dims() {
            return Err(FeatureError::DimensionMismatch {
                expected: self.dims(),
                actual: feature.dims(),
            });
        }
        if let Some(i) = feature.first_non_finite() {
            return Err(FeatureError::InvalidFeature(format!(
                "non-finite value at index {}",
                i
            )));
        }
        Ok(())
    }

    /// Decode a serialized feature of this space.
    fn read_feature(&self, bytes: &[u8]) -> Result<FeatureVector> {
        FeatureVector::read_le(self.component_type(), self.dims(), bytes)
    }
}

/// Feature space over primitive components with a built-in metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrimitiveSpace {
    component: ComponentType,
    metric: Metric,
    dims: usize,
}

impl PrimitiveSpace {
    /// Create a space, `None` for custom components.
    pub fn new(component: ComponentType, metric: Metric, dims: usize) -> Option<Self> {
        component.is_primitive().then_some(Self {
            component,
            metric,
            dims,
        })
    }

    /// Float feature space.
    pub fn float(metric: Metric, dims: usize) -> Self {
        Self {
            component: ComponentType::Float,
            metric,
            dims,
        }
    }

    /// Byte feature space.
    pub fn byte(metric: Metric, dims: usize) -> Self {
        Self {
            component: ComponentType::Byte,
            metric,
            dims,
        }
    }

    pub fn metric_kind(&self) -> Metric {
        self.metric
    }
}

impl FeatureSpace for PrimitiveSpace {
    fn dims(&self) -> usize {
        self.dims
    }

    fn component_type(&self) -> ComponentType {
        self.component
    }

    fn metric(&self) -> u8 {
        self.metric.id()
    }

    #[inline]
    fn compute_distance(&self, a: &FeatureVector, b: &FeatureVector) -> f32 {
        match (a.data(), b.data()) {
            (FeatureData::Float(x), FeatureData::Float(y)) => self.metric.distance(x, y),
            (FeatureData::Byte(x), FeatureData::Byte(y)) => {
                scalar::distance(self.metric, &x[..], &y[..])
            }
            (FeatureData::Short(x), FeatureData::Short(y)) => {
                scalar::distance(self.metric, &x[..], &y[..])
            }
            (FeatureData::Int(x), FeatureData::Int(y)) => {
                scalar::distance(self.metric, &x[..], &y[..])
            }
            (FeatureData::Double(x), FeatureData::Double(y)) => {
                scalar::distance(self.metric, &x[..], &y[..])
            }
            _ => {
                debug_assert!(false, "feature does not belong to {:?}", self);
                f32::MAX
            }
        }
    }
}

/// Lookup table of feature spaces for loading persisted graphs.
///
/// Spaces are matched by `(component_type, metric, dims, is_native)`.
/// Registered spaces take precedence over the built-in [`PrimitiveSpace`]s,
/// which cover every primitive component with the metrics of [`Metric`].
#[derive(Default)]
pub struct FeatureSpaceRegistry {
    spaces: RwLock<Vec<Arc<dyn FeatureSpace>>>,
}

impl FeatureSpaceRegistry {
    /// Create a registry containing only the built-in spaces.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an additional space.
    pub fn register(&self, space: Arc<dyn FeatureSpace>) {
        self.spaces.write().push(space);
    }

    /// Number of registered (non built-in) spaces.
    pub fn len(&self) -> usize {
        self.spaces.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.spaces.read().is_empty()
    }

    /// Find a space matching the given metadata.
    pub fn find(
        &self,
        component: ComponentType,
        metric: u8,
        dims: usize,
        is_native: bool,
    ) -> Option<Arc<dyn FeatureSpace>> {
        let registered = self
            .spaces
            .read()
            .iter()
            .rev()
            .find(|s| {
                s.component_type() == component
                    && s.metric() == metric
                    && s.dims() == dims
                    && s.is_native() == is_native
            })
            .cloned();
        if registered.is_some() {
            return registered;
        }

        if is_native {
            return None;
        }
        let metric = Metric::from_id(metric)?;
        PrimitiveSpace::new(component, metric, dims).map(|s| Arc::new(s) as Arc<dyn FeatureSpace>)
    }

    /// Like [`FeatureSpaceRegistry::find`], failing with
    /// [`FeatureError::UnknownSpace`] when nothing matches.
    pub fn resolve(
        &self,
        component: ComponentType,
        metric: u8,
        dims: usize,
        is_native: bool,
    ) -> Result<Arc<dyn FeatureSpace>> {
        self.find(component, metric, dims, is_native)
            .ok_or(FeatureError::UnknownSpace {
                component,
                metric,
                dims,
            })
    }
}

impl fmt::Debug for FeatureSpaceRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FeatureSpaceRegistry")
            .field("registered", &self.len())
            .finish()
    }
}
