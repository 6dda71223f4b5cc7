//! Dynamic exploration graph facade.
//!
//! Shares one [`RegularGraph`] between concurrent readers and the
//! [`GraphDesigner`]'s build loop through a reader/writer lock.

use crate::designer::{DesignerConfig, GraphDesigner};
use crate::graph::{Label, RegularGraph, VertexId};
use crate::search::{LabelFilter, VertexDistance};
use crate::{GraphError, Result};
use deg_feature::{FeatureSpace, FeatureVector};
use parking_lot::{RwLock, RwLockReadGuard};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A search result resolved to its label.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub label: Label,
    /// Distance to the closest query (lower = more similar).
    pub distance: f32,
}

/// Graph index with online inserts and removals.
pub struct DynamicExplorationGraph {
    graph: Arc<RwLock<RegularGraph>>,
    designer: GraphDesigner,
}

impl DynamicExplorationGraph {
    /// Create an empty graph.
    ///
    /// # Errors
    ///
    /// Returns an error if `config` does not fit `edges_per_vertex`.
    pub fn new(
        space: Arc<dyn FeatureSpace>,
        edges_per_vertex: usize,
        config: DesignerConfig,
    ) -> Result<Self> {
        Self::from_graph(RegularGraph::new(edges_per_vertex, space), config)
    }

    /// Wrap an existing graph, e.g. one loaded from disk.
    pub fn from_graph(graph: RegularGraph, config: DesignerConfig) -> Result<Self> {
        let graph = Arc::new(RwLock::new(graph));
        let designer = GraphDesigner::new(Arc::clone(&graph), config)?;
        Ok(Self { graph, designer })
    }

    /// The designer queueing changes to this graph.
    pub fn designer(&self) -> &GraphDesigner {
        &self.designer
    }

    /// Read access to the graph. Blocks the build loop while held.
    pub fn read(&self) -> RwLockReadGuard<'_, RegularGraph> {
        self.graph.read()
    }

    /// Approximate k nearest neighbor search starting at the first vertex.
    ///
    /// # Errors
    ///
    /// Returns an error if the query does not match the feature space.
    pub fn search(&self, query: &FeatureVector, k: usize, eps: f32) -> Result<Vec<SearchHit>> {
        self.search_with(std::slice::from_ref(query), k, eps, None, &[])
    }

    /// Search with several queries, a label filter and seed labels.
    ///
    /// Without seed labels the search starts at the first vertex.
    ///
    /// # Errors
    ///
    /// Returns an error if a query does not match the feature space or a
    /// seed label is unknown.
    pub fn search_with(
        &self,
        queries: &[FeatureVector],
        k: usize,
        eps: f32,
        filter: Option<&dyn LabelFilter>,
        seed_labels: &[Label],
    ) -> Result<Vec<SearchHit>> {
        let graph = self.graph.read();
        for query in queries {
            graph.space().validate(query)?;
        }
        if graph.is_empty() {
            return Ok(Vec::new());
        }

        let seeds = if seed_labels.is_empty() {
            vec![0]
        } else {
            resolve(&graph, seed_labels)?
        };
        let results = graph.search(queries, k, eps, filter, &seeds);
        Ok(to_hits(&graph, results))
    }

    /// Explore the neighborhood of stored vertices.
    ///
    /// Seed labels which are not stored are skipped. The seeds are never part
    /// of the result and vertices rejected by `filter` are traversed but not
    /// returned. A budget of 0 means an unbounded number of distance
    /// computations.
    ///
    /// # Errors
    ///
    /// Returns an error if none of `seed_labels` is stored.
    pub fn explore(
        &self,
        seed_labels: &[Label],
        k: usize,
        max_distance_computations: usize,
        filter: Option<&dyn LabelFilter>,
    ) -> Result<Vec<SearchHit>> {
        let graph = self.graph.read();
        let seeds: Vec<VertexId> = seed_labels
            .iter()
            .filter_map(|&label| graph.id_of(label))
            .collect();
        if seeds.is_empty() {
            return match seed_labels.first() {
                Some(&label) => Err(GraphError::UnknownLabel(label)),
                None => Ok(Vec::new()),
            };
        }

        let results = graph.explore(&seeds, k, max_distance_computations, filter);
        Ok(to_hits(&graph, results))
    }

    /// Snapshot of the graph with its own designer.
    ///
    /// The copy starts with the current designer configuration and an empty
    /// queue; requests queued on this graph are not carried over.
    ///
    /// # Errors
    ///
    /// Returns an error if the current configuration does not fit the graph.
    pub fn copy(&self) -> Result<Self> {
        let snapshot = self.graph.read().clone();
        Self::from_graph(snapshot, self.designer.config())
    }

    /// Uniformly random stored label, optionally restricted by `filter`.
    pub fn random_label<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        filter: Option<&dyn LabelFilter>,
    ) -> Option<Label> {
        self.graph.read().random_label(rng, filter)
    }

    pub fn len(&self) -> usize {
        self.graph.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.read().is_empty()
    }

    pub fn edges_per_vertex(&self) -> usize {
        self.graph.read().edges_per_vertex()
    }

    pub fn contains(&self, label: Label) -> bool {
        self.graph.read().contains_label(label)
    }

    /// Feature of a stored vertex.
    pub fn feature_of(&self, label: Label) -> Option<FeatureVector> {
        self.graph
            .read()
            .vertex_by_label(label)
            .map(|v| v.feature().clone())
    }

    /// Labels of all stored vertices.
    pub fn labels(&self) -> Vec<Label> {
        self.graph.read().labels().collect()
    }
}

impl std::fmt::Debug for DynamicExplorationGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DynamicExplorationGraph")
            .field("graph", &*self.graph.read())
            .field("designer", &self.designer)
            .finish()
    }
}

fn resolve(graph: &RegularGraph, labels: &[Label]) -> Result<Vec<VertexId>> {
    labels
        .iter()
        .map(|&label| graph.id_of(label).ok_or(GraphError::UnknownLabel(label)))
        .collect()
}

fn to_hits(graph: &RegularGraph, results: Vec<VertexDistance>) -> Vec<SearchHit> {
    results
        .into_iter()
        .filter_map(|r| {
            graph.vertex(r.id).map(|v| SearchHit {
                label: v.label(),
                distance: r.distance,
            })
        })
        .collect()
}
