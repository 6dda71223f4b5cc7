//! Best-first beam search over a [`RegularGraph`].
//!
//! Three traversals share the same frontier/result machinery:
//! - [`RegularGraph::search`]: answer one or more queries
//! - [`RegularGraph::explore`]: expand the neighborhood of seed vertices
//!   under a distance-computation budget
//! - [`RegularGraph::has_path`]: stop as soon as a target vertex is reached

use crate::graph::{Label, RegularGraph, VertexId};
use deg_feature::FeatureVector;
use std::cmp::Reverse;
use std::collections::{BTreeSet, BinaryHeap, HashMap, HashSet};

/// A vertex and its distance to the query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VertexDistance {
    pub id: VertexId,
    pub distance: f32,
}

impl VertexDistance {
    pub fn new(id: VertexId, distance: f32) -> Self {
        Self { id, distance }
    }
}

impl Eq for VertexDistance {}

impl PartialOrd for VertexDistance {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for VertexDistance {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        // ties broken by id for deterministic results
        self.distance
            .total_cmp(&other.distance)
            .then_with(|| self.id.cmp(&other.id))
    }
}

/// Predicate restricting which labels may appear in search results.
///
/// Filtered vertices are still traversed.
pub trait LabelFilter {
    fn is_valid(&self, label: Label) -> bool;
}

impl<F: Fn(Label) -> bool> LabelFilter for F {
    fn is_valid(&self, label: Label) -> bool {
        self(label)
    }
}

impl LabelFilter for HashSet<Label> {
    fn is_valid(&self, label: Label) -> bool {
        self.contains(&label)
    }
}

/// Visited bitmap over internal ids.
struct Visited {
    bits: Vec<u64>,
}

impl Visited {
    fn new(capacity: usize) -> Self {
        Self {
            bits: vec![0; capacity.div_ceil(64)],
        }
    }

    /// Mark `id` as visited. Returns true if it was not visited before.
    #[inline]
    fn insert(&mut self, id: VertexId) -> bool {
        let (word, bit) = ((id / 64) as usize, id % 64);
        let mask = 1u64 << bit;
        let fresh = self.bits[word] & mask == 0;
        self.bits[word] |= mask;
        fresh
    }
}

/// Result set bounded to `k` entries with a shrinking radius.
struct TopK {
    k: usize,
    entries: BTreeSet<VertexDistance>,
    radius: f32,
}

impl TopK {
    fn new(k: usize) -> Self {
        Self {
            k,
            entries: BTreeSet::new(),
            radius: f32::MAX,
        }
    }

    fn insert(&mut self, candidate: VertexDistance) {
        self.entries.insert(candidate);
        if self.entries.len() > self.k {
            self.entries.pop_last();
        }
        if self.entries.len() >= self.k {
            if let Some(worst) = self.entries.last() {
                self.radius = worst.distance;
            }
        }
    }

    fn into_vec(self) -> Vec<VertexDistance> {
        self.entries.into_iter().collect()
    }
}

impl RegularGraph {
    /// Minimum distance of a vertex to any of the queries.
    fn min_distance(&self, queries: &[FeatureVector], id: VertexId) -> f32 {
        queries
            .iter()
            .map(|q| self.distance_to(q, id))
            .fold(f32::MAX, f32::min)
    }

    fn passes(&self, filter: Option<&dyn LabelFilter>, id: VertexId) -> bool {
        match (filter, self.vertex(id)) {
            (None, Some(_)) => true,
            (Some(f), Some(v)) => f.is_valid(v.label()),
            (_, None) => false,
        }
    }

    /// Approximate k nearest neighbor search.
    ///
    /// Every vertex is scored by its minimum distance to any of `queries`.
    /// The search starts at `seeds` and expands the closest frontier vertex
    /// until it lies outside `radius * (1 + eps)`, where `radius` is the
    /// distance of the k-th best result so far. Vertices rejected by `filter`
    /// are traversed but never returned.
    ///
    /// Returns at most `k` results sorted by distance (closest first).
    pub fn search(
        &self,
        queries: &[FeatureVector],
        k: usize,
        eps: f32,
        filter: Option<&dyn LabelFilter>,
        seeds: &[VertexId],
    ) -> Vec<VertexDistance> {
        if k == 0 || queries.is_empty() || self.is_empty() {
            return Vec::new();
        }

        let mut visited = Visited::new(self.len());
        // Min-heap for the frontier (closest first)
        let mut frontier: BinaryHeap<Reverse<VertexDistance>> = BinaryHeap::new();
        let mut results = TopK::new(k);

        for &seed in seeds {
            if self.vertex(seed).is_none() || !visited.insert(seed) {
                continue;
            }
            let candidate = VertexDistance::new(seed, self.min_distance(queries, seed));
            frontier.push(Reverse(candidate));
            if self.passes(filter, seed) {
                results.insert(candidate);
            }
        }

        let scale = 1.0 + eps;
        while let Some(Reverse(current)) = frontier.pop() {
            if current.distance > results.radius * scale {
                break;
            }

            let Some(vertex) = self.vertex(current.id) else {
                continue;
            };
            for neighbor in vertex.edges().ids() {
                if !visited.insert(neighbor) {
                    continue;
                }

                let distance = self.min_distance(queries, neighbor);
                if distance <= results.radius * scale {
                    let candidate = VertexDistance::new(neighbor, distance);
                    frontier.push(Reverse(candidate));

                    if distance < results.radius && self.passes(filter, neighbor) {
                        results.insert(candidate);
                    }
                }
            }
        }

        results.into_vec()
    }

    /// Explore the neighborhood of `seeds` without a query vector.
    ///
    /// Vertices are scored by their minimum distance to any seed. Only
    /// neighbors strictly within the current radius are followed. The
    /// traversal stops after `max_distance_computations` distance
    /// evaluations (0 = unbounded) or when the frontier runs empty. The seeds
    /// themselves are never part of the result.
    pub fn explore(
        &self,
        seeds: &[VertexId],
        k: usize,
        max_distance_computations: usize,
        filter: Option<&dyn LabelFilter>,
    ) -> Vec<VertexDistance> {
        let queries: Vec<FeatureVector> = seeds
            .iter()
            .filter_map(|&s| self.vertex(s).map(|v| v.feature().clone()))
            .collect();
        if k == 0 || queries.is_empty() {
            return Vec::new();
        }

        let mut visited = Visited::new(self.len());
        let mut frontier: BinaryHeap<Reverse<VertexDistance>> = BinaryHeap::new();
        let mut results = TopK::new(k);
        let mut computations = 0usize;

        for &seed in seeds {
            if self.vertex(seed).is_some() && visited.insert(seed) {
                frontier.push(Reverse(VertexDistance::new(seed, 0.0)));
            }
        }

        while let Some(Reverse(current)) = frontier.pop() {
            let Some(vertex) = self.vertex(current.id) else {
                continue;
            };
            for neighbor in vertex.edges().ids() {
                if !visited.insert(neighbor) {
                    continue;
                }

                if max_distance_computations > 0 && computations >= max_distance_computations {
                    return results.into_vec();
                }
                computations += 1;

                let distance = self.min_distance(&queries, neighbor);
                if distance < results.radius {
                    let candidate = VertexDistance::new(neighbor, distance);
                    frontier.push(Reverse(candidate));
                    if self.passes(filter, neighbor) {
                        results.insert(candidate);
                    }
                }
            }
        }

        results.into_vec()
    }

    /// Check whether `to` can be reached from `from` with a beam search
    /// directed at `to`'s feature.
    ///
    /// Returns the path from one of the `from` vertices to `to` (both ends
    /// included), or an empty vector if the search converged without
    /// visiting `to`.
    pub fn has_path(&self, from: &[VertexId], to: VertexId, k: usize, eps: f32) -> Vec<VertexId> {
        let Some(target) = self.vertex(to) else {
            return Vec::new();
        };
        if from.contains(&to) {
            return vec![to];
        }
        let target = target.feature();

        let mut visited = Visited::new(self.len());
        let mut frontier: BinaryHeap<Reverse<VertexDistance>> = BinaryHeap::new();
        let mut results = TopK::new(k.max(1));
        // vertex -> vertex it was discovered from
        let mut trackback: HashMap<VertexId, VertexId> = HashMap::new();

        for &id in from {
            if self.vertex(id).is_none() || !visited.insert(id) {
                continue;
            }
            let candidate = VertexDistance::new(id, self.distance_to(target, id));
            frontier.push(Reverse(candidate));
            results.insert(candidate);
        }

        let scale = 1.0 + eps;
        while let Some(Reverse(current)) = frontier.pop() {
            if current.distance > results.radius * scale {
                break;
            }

            let Some(vertex) = self.vertex(current.id) else {
                continue;
            };
            for neighbor in vertex.edges().ids() {
                if !visited.insert(neighbor) {
                    continue;
                }

                if neighbor == to {
                    let mut path = vec![to, current.id];
                    let mut id = current.id;
                    while let Some(&previous) = trackback.get(&id) {
                        path.push(previous);
                        id = previous;
                    }
                    path.reverse();
                    return path;
                }

                let distance = self.distance_to(target, neighbor);
                if distance <= results.radius * scale {
                    let candidate = VertexDistance::new(neighbor, distance);
                    frontier.push(Reverse(candidate));
                    trackback.insert(neighbor, current.id);
                    if distance < results.radius {
                        results.insert(candidate);
                    }
                }
            }
        }

        Vec::new()
    }
}
