//! Insertion of a new vertex.

use super::improve::improve_edge;
use super::{DesignerConfig, ExtendSchema};
use crate::graph::{Label, RegularGraph, VertexId};
use crate::{GraphError, Result};
use deg_feature::FeatureVector;
use rand::Rng;
use std::collections::HashSet;

/// Counters of the improvements run after an insertion.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ImproveStats {
    pub tries: u64,
    pub improved: u64,
}

/// Insert `label` into the graph and wire it to `edges_per_vertex` neighbors.
///
/// Small graphs (at most `edges_per_vertex` vertices) are kept fully
/// connected. Otherwise an approximate search selects candidates, each
/// accepted candidate gives up one of its edges (v, n) which is replaced by
/// (new, v) and (new, n). Candidates violating the RNG property are skipped
/// in the first pass and accepted in the second.
pub(crate) fn extend_graph<R: Rng + ?Sized>(
    graph: &mut RegularGraph,
    config: &DesignerConfig,
    rng: &mut R,
    label: Label,
    feature: FeatureVector,
) -> Result<ImproveStats> {
    if graph.contains_label(label) {
        return Err(GraphError::DuplicateLabel(label));
    }
    let edges_per_vertex = graph.edges_per_vertex();

    if graph.len() < edges_per_vertex + 1 {
        let id = graph.add_vertex(label, feature)?;
        for other in 0..id {
            let weight = graph.distance(id, other);
            graph.add_undirected_edge(id, other, weight);
        }
        return Ok(ImproveStats::default());
    }

    graph.space().validate(&feature)?;
    let entry = graph
        .random_vertex(rng)
        .ok_or_else(|| GraphError::Inconsistent("graph without vertices".into()))?;
    let candidates = graph.search(
        std::slice::from_ref(&feature),
        config.extend_k.max(edges_per_vertex),
        config.extend_eps,
        None,
        &[entry],
    );

    let id = graph.add_vertex(label, feature)?;

    for check_rng in [true, false] {
        for candidate in &candidates {
            if degree(graph, id) >= edges_per_vertex {
                break;
            }
            let candidate_id = candidate.id;
            if graph.has_edge(id, candidate_id) {
                continue;
            }
            if check_rng && !graph.check_rng(candidate_id, id, candidate.distance) {
                continue;
            }

            let Some((neighbor, neighbor_distance)) = select_replaced_edge(
                graph,
                config.extend_schema,
                id,
                candidate_id,
                candidate.distance,
            ) else {
                continue;
            };

            graph.remove_undirected_edge(candidate_id, neighbor);
            graph.add_undirected_edge(id, candidate_id, candidate.distance);
            graph.add_undirected_edge(id, neighbor, neighbor_distance);
        }
        if degree(graph, id) >= edges_per_vertex {
            break;
        }
    }

    let found = degree(graph, id);
    if found < edges_per_vertex {
        tracing::error!(label, found, edges_per_vertex, "not enough neighbors for new vertex");
        return Err(GraphError::Inconsistent(format!(
            "found only {} of {} neighbors for label {}",
            found, edges_per_vertex, label
        )));
    }

    // edges to vertices which were not chosen directly are usually poor
    let mut stats = ImproveStats::default();
    if config.improve_k > 0 {
        let chosen: HashSet<VertexId> = candidates.iter().map(|c| c.id).collect();
        let indirect: Vec<(VertexId, f32)> = graph
            .vertex(id)
            .map(|v| v.edges().iter().filter(|(n, _)| !chosen.contains(n)).collect())
            .unwrap_or_default();
        for (neighbor, weight) in indirect {
            if graph.edge_weight(id, neighbor) != Some(weight) {
                continue;
            }
            stats.tries += 1;
            if improve_edge(graph, config, id, neighbor, weight) {
                stats.improved += 1;
            }
        }
    }
    Ok(stats)
}

fn degree(graph: &RegularGraph, id: VertexId) -> usize {
    graph.vertex(id).map(|v| v.degree()).unwrap_or(0)
}

/// Pick the edge of `candidate` that gets rewired to `new_vertex`.
///
/// Returns the other end of the edge and its distance to the new vertex.
/// Ends which are already adjacent to the new vertex are never chosen.
fn select_replaced_edge(
    graph: &RegularGraph,
    schema: ExtendSchema,
    new_vertex: VertexId,
    candidate: VertexId,
    candidate_weight: f32,
) -> Option<(VertexId, f32)> {
    let edges = graph.vertex(candidate)?.edges();
    let eligible = edges
        .iter()
        .filter(|&(n, _)| n != new_vertex && !graph.has_edge(new_vertex, n));

    match schema {
        ExtendSchema::ReplaceWorst => {
            let mut worst: Option<(VertexId, f32)> = None;
            for (neighbor, weight) in eligible {
                if worst.map_or(true, |(_, w)| weight > w) {
                    worst = Some((neighbor, weight));
                }
            }
            worst.map(|(n, _)| (n, graph.distance(new_vertex, n)))
        }
        ExtendSchema::MinimizeDistortion => {
            let mut best: Option<(VertexId, f32, f32)> = None;
            for (neighbor, weight) in eligible {
                let distance = graph.distance(new_vertex, neighbor);
                let distortion = (candidate_weight + distance) - weight;
                if best.map_or(true, |(_, _, d)| distortion < d) {
                    best = Some((neighbor, distance, distortion));
                }
            }
            best.map(|(n, d, _)| (n, d))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use deg_feature::{Metric, PrimitiveSpace};
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::sync::Arc;

    fn create_graph() -> RegularGraph {
        let space = Arc::new(PrimitiveSpace::float(Metric::L2, 2));
        RegularGraph::new(4, space)
    }

    fn point(x: f32, y: f32) -> FeatureVector {
        FeatureVector::from(vec![x, y])
    }

    fn assert_regular(graph: &RegularGraph) {
        for (id, vertex) in graph.vertices() {
            assert_eq!(vertex.degree(), graph.edges_per_vertex(), "vertex {}", id);
            for (n, w) in vertex.edges().iter() {
                assert_ne!(n, id);
                assert_eq!(graph.edge_weight(n, id), Some(w));
            }
        }
    }

    #[test]
    fn test_bootstrap_clique() {
        let mut graph = create_graph();
        let config = DesignerConfig::for_degree(4);
        let mut rng = StdRng::seed_from_u64(1);

        for i in 0..5 {
            extend_graph(&mut graph, &config, &mut rng, i, point(i as f32, 0.0)).unwrap();
        }
        assert_eq!(graph.len(), 5);
        assert_regular(&graph);
        assert_eq!(graph.edge_weight(0, 4), Some(16.0));
    }

    #[test]
    fn test_duplicate_label() {
        let mut graph = create_graph();
        let config = DesignerConfig::for_degree(4);
        let mut rng = StdRng::seed_from_u64(1);

        extend_graph(&mut graph, &config, &mut rng, 3, point(0.0, 0.0)).unwrap();
        let err = extend_graph(&mut graph, &config, &mut rng, 3, point(1.0, 0.0)).unwrap_err();
        assert!(matches!(err, GraphError::DuplicateLabel(3)));
        assert_eq!(graph.len(), 1);
    }

    #[test]
    fn test_steady_state_insert() {
        for schema in [ExtendSchema::ReplaceWorst, ExtendSchema::MinimizeDistortion] {
            let mut graph = create_graph();
            let config = DesignerConfig::for_degree(4).with_extend_schema(schema);
            let mut rng = StdRng::seed_from_u64(3);

            for i in 0..40 {
                let angle = i as f32 * 0.7;
                let f = point(angle.cos() * (1.0 + i as f32 * 0.1), angle.sin());
                extend_graph(&mut graph, &config, &mut rng, i, f).unwrap();
            }
            assert_eq!(graph.len(), 40);
            assert_regular(&graph);
        }
    }

    #[test]
    fn test_invalid_feature() {
        let mut graph = create_graph();
        let config = DesignerConfig::for_degree(4);
        let mut rng = StdRng::seed_from_u64(1);

        let err = extend_graph(
            &mut graph,
            &config,
            &mut rng,
            1,
            FeatureVector::from(vec![1.0f32]),
        )
        .unwrap_err();
        assert!(matches!(err, GraphError::Feature(_)));
        assert!(graph.is_empty());
    }
}
