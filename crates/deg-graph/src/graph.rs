//! Degree-regular graph storage.
//!
//! [`RegularGraph`] is a pure structural store: a dense vertex array indexed
//! by [`VertexId`], a label -> id map and per-vertex weighted neighbor lists.
//! It performs no search and no autonomous mutation.

use crate::search::LabelFilter;
use crate::{GraphError, Result};
use deg_feature::{FeatureSpace, FeatureVector};
use rand::seq::IteratorRandom;
use rand::Rng;
use std::collections::HashMap;
use std::sync::Arc;

/// Internal vertex ID (dense, for array indexing).
pub type VertexId = u32;

/// Caller-assigned stable vertex identifier.
pub type Label = i32;

/// Weighted neighbor list of a vertex.
///
/// Lookups are linear scans; iteration order is insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Neighbors {
    entries: Vec<(VertexId, f32)>,
}

impl Neighbors {
    /// Create empty neighbors.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Create neighbors with initial capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
        }
    }

    /// Add a neighbor or update its weight.
    /// Returns true if added, false if already present.
    pub fn insert(&mut self, id: VertexId, weight: f32) -> bool {
        match self.entries.iter_mut().find(|(n, _)| *n == id) {
            Some(entry) => {
                entry.1 = weight;
                false
            }
            None => {
                self.entries.push((id, weight));
                true
            }
        }
    }

    /// Remove a neighbor, returning the weight of the removed edge.
    pub fn remove(&mut self, id: VertexId) -> Option<f32> {
        let pos = self.entries.iter().position(|(n, _)| *n == id)?;
        Some(self.entries.swap_remove(pos).1)
    }

    pub fn contains(&self, id: VertexId) -> bool {
        self.entries.iter().any(|(n, _)| *n == id)
    }

    /// Weight of the edge to `id`.
    pub fn weight(&self, id: VertexId) -> Option<f32> {
        self.entries.iter().find(|(n, _)| *n == id).map(|(_, w)| *w)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over (neighbor, weight) pairs.
    pub fn iter(&self) -> impl Iterator<Item = (VertexId, f32)> + '_ {
        self.entries.iter().copied()
    }

    /// Iterate over neighbor IDs.
    pub fn ids(&self) -> impl Iterator<Item = VertexId> + '_ {
        self.entries.iter().map(|(n, _)| *n)
    }

    /// Neighbor with the highest edge weight.
    pub fn worst(&self) -> Option<(VertexId, f32)> {
        self.iter().max_by(|a, b| a.1.total_cmp(&b.1).then_with(|| b.0.cmp(&a.0)))
    }
}

/// A vertex of the graph.
#[derive(Debug, Clone)]
pub struct Vertex {
    label: Label,
    feature: FeatureVector,
    edges: Neighbors,
}

impl Vertex {
    pub fn label(&self) -> Label {
        self.label
    }

    pub fn feature(&self) -> &FeatureVector {
        &self.feature
    }

    pub fn edges(&self) -> &Neighbors {
        &self.edges
    }

    pub fn degree(&self) -> usize {
        self.edges.len()
    }
}

/// Undirected, weighted graph where every vertex targets the same degree.
///
/// Edges are stored on both endpoints with the same weight. Removing a vertex
/// moves the last vertex of the dense array into the freed slot, so internal
/// ids are only stable until the next removal; labels are the stable identity.
///
/// Cloning copies vertices and edges and shares the feature space.
#[derive(Clone)]
pub struct RegularGraph {
    /// Distance oracle
    space: Arc<dyn FeatureSpace>,
    /// Target degree of every vertex
    edges_per_vertex: usize,
    /// Vertex storage: internal_id -> Vertex
    vertices: Vec<Vertex>,
    /// Label -> internal ID mapping
    label_to_id: HashMap<Label, VertexId>,
}

impl RegularGraph {
    /// Create an empty graph.
    pub fn new(edges_per_vertex: usize, space: Arc<dyn FeatureSpace>) -> Self {
        Self::with_capacity(edges_per_vertex, space, 0)
    }

    /// Create an empty graph with room for `capacity` vertices.
    pub fn with_capacity(
        edges_per_vertex: usize,
        space: Arc<dyn FeatureSpace>,
        capacity: usize,
    ) -> Self {
        Self {
            space,
            edges_per_vertex,
            vertices: Vec::with_capacity(capacity),
            label_to_id: HashMap::with_capacity(capacity),
        }
    }

    pub fn space(&self) -> &Arc<dyn FeatureSpace> {
        &self.space
    }

    pub fn edges_per_vertex(&self) -> usize {
        self.edges_per_vertex
    }

    /// Number of vertices.
    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    pub fn vertex(&self, id: VertexId) -> Option<&Vertex> {
        self.vertices.get(id as usize)
    }

    pub fn vertex_by_label(&self, label: Label) -> Option<&Vertex> {
        self.id_of(label).and_then(|id| self.vertex(id))
    }

    /// Internal id currently assigned to `label`.
    pub fn id_of(&self, label: Label) -> Option<VertexId> {
        self.label_to_id.get(&label).copied()
    }

    pub fn contains_label(&self, label: Label) -> bool {
        self.label_to_id.contains_key(&label)
    }

    /// Iterate over (id, vertex) pairs in id order.
    pub fn vertices(&self) -> impl Iterator<Item = (VertexId, &Vertex)> + '_ {
        self.vertices
            .iter()
            .enumerate()
            .map(|(i, v)| (i as VertexId, v))
    }

    /// Iterate over all labels in id order.
    pub fn labels(&self) -> impl Iterator<Item = Label> + '_ {
        self.vertices.iter().map(|v| v.label)
    }

    /// Pick a uniformly random vertex.
    pub fn random_vertex<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<VertexId> {
        if self.vertices.is_empty() {
            return None;
        }
        Some(rng.gen_range(0..self.vertices.len()) as VertexId)
    }

    /// Pick a uniformly random label, restricted to labels accepted by
    /// `filter` if one is given.
    pub fn random_label<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        filter: Option<&dyn LabelFilter>,
    ) -> Option<Label> {
        match filter {
            None => self.random_vertex(rng).map(|id| self.vertices[id as usize].label),
            Some(filter) => self.labels().filter(|&l| filter.is_valid(l)).choose(rng),
        }
    }

    /// Add an edge-less vertex.
    ///
    /// # Errors
    ///
    /// Returns an error if the label exists or the feature does not match the
    /// feature space.
    pub fn add_vertex(&mut self, label: Label, feature: FeatureVector) -> Result<VertexId> {
        if self.label_to_id.contains_key(&label) {
            return Err(GraphError::DuplicateLabel(label));
        }
        self.space.validate(&feature)?;

        let id = self.vertices.len() as VertexId;
        self.vertices.push(Vertex {
            label,
            feature,
            edges: Neighbors::with_capacity(self.edges_per_vertex),
        });
        self.label_to_id.insert(label, id);
        Ok(id)
    }

    /// Remove a vertex and all of its edges.
    ///
    /// The last vertex is moved into the freed slot. Returns the former
    /// neighbors with the weights of the removed edges, keyed by their ids
    /// after the move.
    pub fn remove_vertex_by_label(&mut self, label: Label) -> Result<HashMap<VertexId, f32>> {
        let id = self
            .label_to_id
            .remove(&label)
            .ok_or(GraphError::UnknownLabel(label))?;
        let idx = id as usize;

        // detach from all neighbors
        let edges: Vec<(VertexId, f32)> = self.vertices[idx].edges.iter().collect();
        for &(neighbor, _) in &edges {
            self.vertices[neighbor as usize].edges.remove(id);
        }

        let last = (self.vertices.len() - 1) as VertexId;
        self.vertices.swap_remove(idx);

        if id != last {
            // the former last vertex now lives at `id`, rewrite back-references
            let moved: Vec<(VertexId, f32)> = self.vertices[idx].edges.iter().collect();
            for (neighbor, weight) in moved {
                let list = &mut self.vertices[neighbor as usize].edges;
                list.remove(last);
                list.insert(id, weight);
            }
            let moved_label = self.vertices[idx].label;
            self.label_to_id.insert(moved_label, id);
        }

        Ok(edges
            .into_iter()
            .map(|(n, w)| if n == last { (id, w) } else { (n, w) })
            .collect())
    }

    /// Add an undirected edge or update its weight.
    ///
    /// Returns true if the edge was newly created.
    pub fn add_undirected_edge(&mut self, a: VertexId, b: VertexId, weight: f32) -> bool {
        if a == b || a as usize >= self.vertices.len() || b as usize >= self.vertices.len() {
            debug_assert!(a != b, "self loops are not allowed");
            return false;
        }
        let created = self.vertices[a as usize].edges.insert(b, weight);
        self.vertices[b as usize].edges.insert(a, weight);
        created
    }

    /// Remove an undirected edge. Returns true if the edge existed.
    pub fn remove_undirected_edge(&mut self, a: VertexId, b: VertexId) -> bool {
        let (Some(_), Some(_)) = (self.vertex(a), self.vertex(b)) else {
            return false;
        };
        let removed = self.vertices[a as usize].edges.remove(b).is_some();
        self.vertices[b as usize].edges.remove(a);
        removed
    }

    pub fn has_edge(&self, a: VertexId, b: VertexId) -> bool {
        self.vertex(a).map(|v| v.edges.contains(b)).unwrap_or(false)
    }

    /// Weight of the edge between `a` and `b`, `None` if there is no edge.
    pub fn edge_weight(&self, a: VertexId, b: VertexId) -> Option<f32> {
        self.vertex(a).and_then(|v| v.edges.weight(b))
    }

    /// Distance between the features of two vertices.
    pub fn distance(&self, a: VertexId, b: VertexId) -> f32 {
        match (self.vertex(a), self.vertex(b)) {
            (Some(va), Some(vb)) => self.space.compute_distance(&va.feature, &vb.feature),
            _ => f32::MAX,
        }
    }

    /// Distance between a feature and a vertex.
    pub fn distance_to(&self, feature: &FeatureVector, id: VertexId) -> f32 {
        match self.vertex(id) {
            Some(v) => self.space.compute_distance(feature, &v.feature),
            None => f32::MAX,
        }
    }

    /// Edge-level RNG check.
    ///
    /// Returns false if `vertex` has a neighbor `n` which is connected to
    /// `target` such that `weight > max(w(vertex, n), w(n, target))`, i.e. a
    /// shorter detour from `vertex` to `target` exists.
    pub fn check_rng(&self, vertex: VertexId, target: VertexId, weight: f32) -> bool {
        let Some(v) = self.vertex(vertex) else {
            return true;
        };
        for (neighbor, neighbor_weight) in v.edges.iter() {
            if let Some(neighbor_target) = self.edge_weight(neighbor, target) {
                if weight > neighbor_weight.max(neighbor_target) {
                    return false;
                }
            }
        }
        true
    }
}

impl std::fmt::Debug for RegularGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegularGraph")
            .field("vertices", &self.vertices.len())
            .field("edges_per_vertex", &self.edges_per_vertex)
            .field("space", &self.space)
            .finish()
    }
}
