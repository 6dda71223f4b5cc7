//! Exact nearest neighbor search.
//!
//! Linear scan over all features - O(n) per query. Used as ground truth for
//! graph quality diagnostics (neighbor rank, recall) and in tests.

use crate::feature::FeatureVector;
use crate::space::FeatureSpace;
use crate::Result;
use parking_lot::RwLock;
use std::collections::{BinaryHeap, HashMap};
use std::sync::Arc;

/// An exact match returned from a linear scan.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExactMatch<K> {
    /// Key of the matched feature (label or vertex id).
    pub key: K,
    /// Distance to the query (lower = more similar).
    pub distance: f32,
}

impl<K: Ord> Eq for ExactMatch<K> {}

impl<K: Ord> PartialOrd for ExactMatch<K> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl<K: Ord> Ord for ExactMatch<K> {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        // Use total_cmp for proper NaN handling, ties by key
        self.distance
            .total_cmp(&other.distance)
            .then_with(|| self.key.cmp(&other.key))
    }
}

/// Find the `k` features closest to `query`, ascending by distance.
pub fn exact_top_k<'a, K: Copy + Ord>(
    space: &dyn FeatureSpace,
    query: &FeatureVector,
    items: impl IntoIterator<Item = (K, &'a FeatureVector)>,
    k: usize,
) -> Vec<ExactMatch<K>> {
    if k == 0 {
        return Vec::new();
    }

    // Max-heap holding the best k seen so far
    let mut heap: BinaryHeap<ExactMatch<K>> = BinaryHeap::with_capacity(k + 1);
    for (key, feature) in items {
        let candidate = ExactMatch {
            key,
            distance: space.compute_distance(query, feature),
        };
        if heap.len() < k {
            heap.push(candidate);
        } else if heap.peek().map(|worst| candidate < *worst).unwrap_or(false) {
            heap.pop();
            heap.push(candidate);
        }
    }

    heap.into_sorted_vec()
}

/// Brute force index over labeled features.
///
/// Thread-safe via RwLock. Serves as the exact baseline a graph index is
/// measured against.
pub struct BruteForceIndex {
    /// Feature storage: label -> feature
    features: RwLock<HashMap<i32, FeatureVector>>,
    space: Arc<dyn FeatureSpace>,
}

impl BruteForceIndex {
    pub fn new(space: Arc<dyn FeatureSpace>) -> Self {
        Self {
            features: RwLock::new(HashMap::new()),
            space,
        }
    }

    pub fn space(&self) -> &Arc<dyn FeatureSpace> {
        &self.space
    }

    /// Insert or replace the feature of a label.
    pub fn insert(&self, label: i32, feature: FeatureVector) -> Result<()> {
        self.space.validate(&feature)?;
        self.features.write().insert(label, feature);
        Ok(())
    }

    /// Returns `true` if the label was present.
    pub fn remove(&self, label: i32) -> bool {
        self.features.write().remove(&label).is_some()
    }

    /// Exact k nearest labels of `query`.
    pub fn search(&self, query: &FeatureVector, k: usize) -> Result<Vec<ExactMatch<i32>>> {
        self.space.validate(query)?;
        let features = self.features.read();
        Ok(exact_top_k(
            self.space.as_ref(),
            query,
            features.iter().map(|(label, f)| (*label, f)),
            k,
        ))
    }

    pub fn contains(&self, label: i32) -> bool {
        self.features.read().contains_key(&label)
    }

    pub fn len(&self) -> usize {
        self.features.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FeatureError, Metric, PrimitiveSpace};

    fn create_test_index() -> BruteForceIndex {
        BruteForceIndex::new(Arc::new(PrimitiveSpace::float(Metric::L2, 2)))
    }

    #[test]
    fn test_search_order() {
        let index = create_test_index();
        for i in 0..10 {
            index.insert(i, FeatureVector::from(vec![i as f32, 0.0])).unwrap();
        }

        let results = index.search(&FeatureVector::from(vec![3.2f32, 0.0]), 3).unwrap();
        let labels: Vec<i32> = results.iter().map(|m| m.key).collect();
        assert_eq!(labels, vec![3, 4, 2]);
        assert!(results.windows(2).all(|w| w[0].distance <= w[1].distance));
    }

    #[test]
    fn test_ties_broken_by_key() {
        let index = create_test_index();
        index.insert(7, FeatureVector::from(vec![1.0f32, 0.0])).unwrap();
        index.insert(3, FeatureVector::from(vec![-1.0f32, 0.0])).unwrap();

        let results = index.search(&FeatureVector::from(vec![0.0f32, 0.0]), 1).unwrap();
        assert_eq!(results[0].key, 3);
    }

    #[test]
    fn test_remove_and_k_larger_than_len() {
        let index = create_test_index();
        index.insert(1, FeatureVector::from(vec![0.0f32, 0.0])).unwrap();
        index.insert(2, FeatureVector::from(vec![1.0f32, 0.0])).unwrap();

        assert!(index.remove(1));
        assert!(!index.remove(1));
        assert_eq!(index.len(), 1);

        let results = index.search(&FeatureVector::from(vec![0.0f32, 0.0]), 10).unwrap();
        assert_eq!(results.len(), 1);
        assert!(index.search(&FeatureVector::from(vec![0.0f32, 0.0]), 0).unwrap().is_empty());
    }

    #[test]
    fn test_rejects_invalid_feature() {
        let index = create_test_index();
        let result = index.insert(1, FeatureVector::from(vec![0.0f32; 3]));
        assert!(matches!(result, Err(FeatureError::DimensionMismatch { .. })));
        assert!(index.is_empty());
    }
}
