//! Distance metrics for feature vectors.
//!
//! Provides the metrics a graph file can refer to by id:
//! - **L2** (id 1): squared Euclidean distance, no square root
//! - **Inner product** (id 2): `1 - a · b`, for normalized embeddings
//! - **Manhattan** (id 10): sum of absolute differences
//! - **Cosine** (id 3): `1 - cos(a, b)`
//!
//! The `f32` kernels are designed to be auto-vectorized by the compiler when
//! using release builds with appropriate target features. Integer and double
//! features go through generic kernels that widen to `f64`.

use serde::{Deserialize, Serialize};

/// Distance metric of a feature space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Metric {
    /// Squared Euclidean distance: sum((a[i] - b[i])^2)
    L2,
    /// Inner product distance: 1 - (a · b)
    InnerProduct,
    /// Cosine distance: 1 - (a · b) / (||a|| * ||b||)
    Cosine,
    /// Manhattan (L1) distance: sum(|a[i] - b[i]|)
    Manhattan,
}

impl Metric {
    /// Metric id stored in graph files.
    pub fn id(&self) -> u8 {
        match self {
            Self::L2 => 1,
            Self::InnerProduct => 2,
            Self::Cosine => 3,
            Self::Manhattan => 10,
        }
    }

    /// Resolve a metric id, `None` for custom metrics.
    pub fn from_id(id: u8) -> Option<Self> {
        match id {
            1 => Some(Self::L2),
            2 => Some(Self::InnerProduct),
            3 => Some(Self::Cosine),
            10 => Some(Self::Manhattan),
            _ => None,
        }
    }

    /// Compute the distance between two float vectors.
    ///
    /// Returns a distance value where lower = more similar.
    #[inline]
    pub fn distance(&self, a: &[f32], b: &[f32]) -> f32 {
        match self {
            Self::L2 => euclidean_distance_squared(a, b),
            Self::InnerProduct => 1.0 - inner_product(a, b),
            Self::Cosine => cosine_distance(a, b),
            Self::Manhattan => manhattan_distance(a, b),
        }
    }
}

/// Compute squared Euclidean distance.
///
/// Graph edges only need the relative ordering of distances, so the square
/// root is never taken.
///
/// # Example
///
/// ```
/// use deg_feature::euclidean_distance_squared;
///
/// let a = [0.0, 0.0];
/// let b = [3.0, 4.0];
/// assert!((euclidean_distance_squared(&a, &b) - 25.0).abs() < 0.001);
/// ```
#[inline]
pub fn euclidean_distance_squared(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len(), "Vector dimensions must match");

    // Process in chunks of 4 for better auto-vectorization
    let mut sum = 0.0f32;
    let chunks = a.len() / 4;

    for i in 0..chunks {
        let base = i * 4;
        let d0 = a[base] - b[base];
        let d1 = a[base + 1] - b[base + 1];
        let d2 = a[base + 2] - b[base + 2];
        let d3 = a[base + 3] - b[base + 3];
        sum += d0 * d0 + d1 * d1 + d2 * d2 + d3 * d3;
    }

    for i in (chunks * 4)..a.len() {
        let d = a[i] - b[i];
        sum += d * d;
    }

    sum
}

/// Compute the Manhattan (L1) distance.
#[inline]
pub fn manhattan_distance(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len(), "Vector dimensions must match");

    let mut sum = 0.0f32;
    let chunks = a.len() / 4;

    for i in 0..chunks {
        let base = i * 4;
        sum += (a[base] - b[base]).abs()
            + (a[base + 1] - b[base + 1]).abs()
            + (a[base + 2] - b[base + 2]).abs()
            + (a[base + 3] - b[base + 3]).abs();
    }

    for i in (chunks * 4)..a.len() {
        sum += (a[i] - b[i]).abs();
    }

    sum
}

/// Compute cosine distance between two vectors.
///
/// Returns a value in [0, 2] where:
/// - 0 = identical direction
/// - 1 = orthogonal
/// - 2 = opposite direction
///
/// # Example
///
/// ```
/// use deg_feature::cosine_distance;
///
/// let c = [1.0, 0.0];
/// let d = [0.0, 1.0];
/// assert!((cosine_distance(&c, &d) - 1.0).abs() < 0.001);
/// ```
#[inline]
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len(), "Vector dimensions must match");

    let (dot, norm_a, norm_b) = dot_and_norms(a, b);

    let denom = (norm_a * norm_b).sqrt();
    if denom < f32::EPSILON {
        return 1.0; // Undefined for zero vectors, return orthogonal
    }

    // Clamp to [-1, 1] to handle floating point errors
    let similarity = (dot / denom).clamp(-1.0, 1.0);

    1.0 - similarity
}

/// Compute inner product (dot product) of two vectors.
///
/// # Example
///
/// ```
/// use deg_feature::inner_product;
///
/// let a = [1.0, 2.0, 3.0];
/// let b = [4.0, 5.0, 6.0];
/// assert!((inner_product(&a, &b) - 32.0).abs() < 0.001);
/// ```
#[inline]
pub fn inner_product(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len(), "Vector dimensions must match");

    let mut sum = 0.0f32;
    let chunks = a.len() / 4;

    for i in 0..chunks {
        let base = i * 4;
        sum += a[base] * b[base]
            + a[base + 1] * b[base + 1]
            + a[base + 2] * b[base + 2]
            + a[base + 3] * b[base + 3];
    }

    for i in (chunks * 4)..a.len() {
        sum += a[i] * b[i];
    }

    sum
}

/// Compute dot product and squared norms in a single pass.
///
/// Returns (dot, norm_a_squared, norm_b_squared)
#[inline]
fn dot_and_norms(a: &[f32], b: &[f32]) -> (f32, f32, f32) {
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    (dot, norm_a, norm_b)
}

/// Kernels for non-float components.
///
/// Components are widened to `f64` and the result is narrowed back to `f32`,
/// which keeps integer L2 distances exact up to 2^24.
pub(crate) mod scalar {
    use super::Metric;

    pub(crate) trait Component: Copy {
        fn widen(self) -> f64;
    }

    macro_rules! component {
        ($($t:ty),*) => {
            $(impl Component for $t {
                #[inline]
                fn widen(self) -> f64 {
                    self as f64
                }
            })*
        };
    }

    component!(u8, i16, i32, f64);

    #[inline]
    pub(crate) fn distance<T: Component>(metric: Metric, a: &[T], b: &[T]) -> f32 {
        debug_assert_eq!(a.len(), b.len(), "Vector dimensions must match");

        let pairs = a.iter().zip(b).map(|(x, y)| (x.widen(), y.widen()));
        let d = match metric {
            Metric::L2 => pairs.map(|(x, y)| (x - y) * (x - y)).sum::<f64>(),
            Metric::Manhattan => pairs.map(|(x, y)| (x - y).abs()).sum::<f64>(),
            Metric::InnerProduct => 1.0 - pairs.map(|(x, y)| x * y).sum::<f64>(),
            Metric::Cosine => {
                let (dot, na, nb) = pairs.fold((0.0, 0.0, 0.0), |(d, na, nb), (x, y)| {
                    (d + x * y, na + x * x, nb + y * y)
                });
                let denom = (na * nb).sqrt();
                if denom < f64::EPSILON {
                    1.0
                } else {
                    1.0 - (dot / denom).clamp(-1.0, 1.0)
                }
            }
        };
        d as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_euclidean_distance_squared() {
        let a = [0.0, 0.0];
        let b = [3.0, 4.0];
        assert!((euclidean_distance_squared(&a, &b) - 25.0).abs() < 0.001);

        // Same vectors = 0 distance
        let c = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert!(euclidean_distance_squared(&c, &c) < 0.001);
    }

    #[test]
    fn test_manhattan_distance() {
        let a = [1.0, -1.0, 0.0, 2.0, 5.0];
        let b = [0.0, 1.0, 0.0, 2.0, 1.0];
        assert!((manhattan_distance(&a, &b) - 7.0).abs() < 0.001);
    }

    #[test]
    fn test_cosine_distance() {
        let a = [1.0, 2.0, 3.0];
        assert!(cosine_distance(&a, &a) < 0.001);

        let d = [1.0, 0.0];
        let e = [-1.0, 0.0];
        assert!((cosine_distance(&d, &e) - 2.0).abs() < 0.001);

        // Zero vector should return 1.0 (orthogonal)
        assert!((cosine_distance(&[0.0, 0.0], &[1.0, 2.0]) - 1.0).abs() < 0.001);
    }

    #[test]
    fn test_metric_enum() {
        let a = [1.0, 0.0];
        let b = [0.0, 1.0];

        assert!((Metric::L2.distance(&a, &b) - 2.0).abs() < 0.001);
        assert!((Metric::Cosine.distance(&a, &b) - 1.0).abs() < 0.001);
        // orthogonal unit vectors: 1 - 0
        assert!((Metric::InnerProduct.distance(&a, &b) - 1.0).abs() < 0.001);
        assert!((Metric::Manhattan.distance(&a, &b) - 2.0).abs() < 0.001);
    }

    #[test]
    fn test_metric_ids() {
        for m in [Metric::L2, Metric::InnerProduct, Metric::Cosine, Metric::Manhattan] {
            assert_eq!(Metric::from_id(m.id()), Some(m));
        }
        assert_eq!(Metric::L2.id(), 1);
        assert_eq!(Metric::InnerProduct.id(), 2);
        assert_eq!(Metric::Manhattan.id(), 10);
        assert_eq!(Metric::from_id(42), None);
    }

    #[test]
    fn test_scalar_kernels_match_float() {
        let a: [u8; 5] = [1, 2, 3, 4, 200];
        let b: [u8; 5] = [4, 2, 1, 0, 100];
        let af: Vec<f32> = a.iter().map(|&x| x as f32).collect();
        let bf: Vec<f32> = b.iter().map(|&x| x as f32).collect();

        for m in [Metric::L2, Metric::Manhattan, Metric::Cosine] {
            let d = scalar::distance(m, &a, &b);
            assert!((d - m.distance(&af, &bf)).abs() < 0.01, "{:?}", m);
        }
    }

    #[test]
    fn test_high_dimensional() {
        let a: Vec<f32> = (0..128).map(|i| i as f32).collect();
        let b: Vec<f32> = (0..128).map(|i| (i + 1) as f32).collect();

        // Each diff is 1
        assert!((euclidean_distance_squared(&a, &b) - 128.0).abs() < 0.01);
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn arb_pair() -> impl Strategy<Value = (Vec<f32>, Vec<f32>)> {
        (1usize..40).prop_flat_map(|dims| {
            (
                prop::collection::vec(-100.0f32..100.0, dims),
                prop::collection::vec(-100.0f32..100.0, dims),
            )
        })
    }

    proptest! {
        #[test]
        fn metrics_are_symmetric((a, b) in arb_pair()) {
            for m in [Metric::L2, Metric::InnerProduct, Metric::Cosine, Metric::Manhattan] {
                let ab = m.distance(&a, &b);
                let ba = m.distance(&b, &a);
                prop_assert!((ab - ba).abs() <= 1e-3 * ab.abs().max(1.0));
            }
        }

        #[test]
        fn l2_and_manhattan_are_non_negative((a, b) in arb_pair()) {
            prop_assert!(Metric::L2.distance(&a, &b) >= 0.0);
            prop_assert!(Metric::Manhattan.distance(&a, &b) >= 0.0);
            prop_assert!(Metric::L2.distance(&a, &a) == 0.0);
        }
    }
}
