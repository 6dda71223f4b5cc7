//! Graph quality and consistency diagnostics.
//!
//! All functions are read-only and run in O(n * degree) except the neighbor
//! rank without ground truth, which sorts all vertices per vertex.

use crate::graph::{Label, RegularGraph, VertexId};
use crate::{GraphError, Result};
use deg_feature::brute::exact_top_k;
use std::collections::{HashMap, VecDeque};

/// Maximal difference between an edge weight and the recomputed distance.
const WEIGHT_TOLERANCE: f32 = 0.001;

/// Average weight over all edges, 0 for a graph without edges.
pub fn calc_avg_edge_weight(graph: &RegularGraph) -> f64 {
    let mut sum = 0.0f64;
    let mut count = 0usize;
    for (_, vertex) in graph.vertices() {
        for (_, weight) in vertex.edges().iter() {
            sum += f64::from(weight);
            count += 1;
        }
    }
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

/// Average rank of every vertex's neighbors in its exact nearest neighbor
/// ordering. Rank 1 is the nearest other vertex, so 1.0 would be optimal for
/// a degree of one.
///
/// `top_lists` maps a label to the labels of its nearest neighbors (the
/// label itself excluded). Vertices without a list, or whose neighbors are
/// not all contained in their list, are ranked by a brute force scan.
pub fn calc_avg_neighbor_rank(
    graph: &RegularGraph,
    top_lists: Option<&HashMap<Label, Vec<Label>>>,
) -> f64 {
    let mut sum = 0.0f64;
    let mut count = 0usize;
    for (id, vertex) in graph.vertices() {
        let from_list = top_lists
            .and_then(|lists| lists.get(&vertex.label()))
            .and_then(|list| rank_with_top_list(graph, id, list));
        if let Some(rank) = from_list.or_else(|| rank_exact(graph, id)) {
            sum += rank;
            count += 1;
        }
    }
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

fn rank_with_top_list(graph: &RegularGraph, id: VertexId, top_list: &[Label]) -> Option<f64> {
    let vertex = graph.vertex(id)?;
    if vertex.edges().is_empty() {
        return None;
    }

    let mut sum = 0.0f64;
    for neighbor in vertex.edges().ids() {
        let label = graph.vertex(neighbor)?.label();
        let rank = top_list.iter().position(|&l| l == label)?;
        // the list omits the vertex itself
        sum += (rank + 1) as f64;
    }
    Some(sum / vertex.degree() as f64)
}

fn rank_exact(graph: &RegularGraph, id: VertexId) -> Option<f64> {
    let vertex = graph.vertex(id)?;
    if vertex.edges().is_empty() {
        return None;
    }

    let ordering = exact_top_k(
        graph.space().as_ref(),
        vertex.feature(),
        graph.vertices().map(|(other, v)| (other, v.feature())),
        graph.len(),
    );
    let ranks: HashMap<VertexId, usize> = ordering
        .iter()
        .enumerate()
        .map(|(rank, m)| (m.key, rank))
        .collect();

    let sum: usize = vertex
        .edges()
        .ids()
        .map(|n| ranks.get(&n).copied().unwrap_or(graph.len()))
        .sum();
    Some(sum as f64 / vertex.degree() as f64)
}

/// Check the structural invariants of the graph.
///
/// Verifies the vertex count, that every vertex has
/// `min(vertices - 1, expected_degree)` edges, that edges are symmetric and
/// that each weight equals the distance of its endpoints.
///
/// # Errors
///
/// Returns [`GraphError::Validation`] describing the first violation.
pub fn check_graph_validation(
    graph: &RegularGraph,
    expected_vertices: usize,
    expected_degree: usize,
) -> Result<()> {
    let result = validate(graph, expected_vertices, expected_degree);
    if let Err(e) = &result {
        tracing::warn!(error = %e, "graph validation failed");
    }
    result
}

fn validate(graph: &RegularGraph, expected_vertices: usize, expected_degree: usize) -> Result<()> {
    if graph.len() != expected_vertices {
        return Err(GraphError::Validation(format!(
            "expected {} vertices, got {}",
            expected_vertices,
            graph.len()
        )));
    }

    let target_degree = expected_degree.min(graph.len().saturating_sub(1));
    for (id, vertex) in graph.vertices() {
        if vertex.degree() != target_degree {
            return Err(GraphError::Validation(format!(
                "vertex {} has {} edges, expected {}",
                id,
                vertex.degree(),
                target_degree
            )));
        }

        if graph.id_of(vertex.label()) != Some(id) {
            return Err(GraphError::Validation(format!(
                "label {} does not resolve to vertex {}",
                vertex.label(),
                id
            )));
        }

        for (neighbor, weight) in vertex.edges().iter() {
            if neighbor == id {
                return Err(GraphError::Validation(format!("vertex {} has a self loop", id)));
            }
            if graph.edge_weight(neighbor, id) != Some(weight) {
                return Err(GraphError::Validation(format!(
                    "edge {} -> {} has no matching reverse edge",
                    id, neighbor
                )));
            }
            let distance = graph.distance(id, neighbor);
            if (weight - distance).abs() > WEIGHT_TOLERANCE {
                return Err(GraphError::Validation(format!(
                    "edge {} -> {} has weight {} but distance {}",
                    id, neighbor, weight, distance
                )));
            }
        }
    }
    Ok(())
}

/// Number of directed edge entries (v, n) for which `v` has a shorter detour
/// to `n`.
pub fn calc_non_rng_edges(graph: &RegularGraph) -> usize {
    graph
        .vertices()
        .map(|(id, vertex)| {
            vertex
                .edges()
                .iter()
                .filter(|&(neighbor, weight)| !graph.check_rng(id, neighbor, weight))
                .count()
        })
        .sum()
}

/// Whether every vertex is reachable from vertex 0.
pub fn check_graph_connectivity(graph: &RegularGraph) -> bool {
    if graph.is_empty() {
        return true;
    }

    let mut seen = vec![false; graph.len()];
    let mut queue = VecDeque::from([0 as VertexId]);
    seen[0] = true;
    let mut reached = 1usize;

    while let Some(id) = queue.pop_front() {
        let Some(vertex) = graph.vertex(id) else {
            continue;
        };
        for neighbor in vertex.edges().ids() {
            if !seen[neighbor as usize] {
                seen[neighbor as usize] = true;
                reached += 1;
                queue.push_back(neighbor);
            }
        }
    }
    reached == graph.len()
}
