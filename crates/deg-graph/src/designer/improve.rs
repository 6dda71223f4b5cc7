//! Edge improvement by bounded sequences of edge swaps.
//!
//! An edge (v1, v2) is removed and the two endpoints are reconnected through
//! a chain of swaps that must lower the summed edge weight of the graph. If no
//! such chain is found within `max_path_length` steps, every change is rolled
//! back.

use super::DesignerConfig;
use crate::graph::{RegularGraph, VertexId};
use rand::Rng;

/// Smallest weight reduction accepted as an improvement.
const MIN_GAIN: f32 = f32::EPSILON;

/// A single recorded edge modification.
#[derive(Debug, Clone, Copy)]
struct EdgeChange {
    a: VertexId,
    b: VertexId,
    weight: f32,
    removed: bool,
}

/// Edge changes of one improvement attempt, replayable in reverse.
#[derive(Debug, Default)]
pub(crate) struct ChangeLog {
    changes: Vec<EdgeChange>,
}

impl ChangeLog {
    pub fn add_edge(&mut self, graph: &mut RegularGraph, a: VertexId, b: VertexId, weight: f32) {
        if graph.add_undirected_edge(a, b, weight) {
            self.changes.push(EdgeChange {
                a,
                b,
                weight,
                removed: false,
            });
        }
    }

    pub fn remove_edge(&mut self, graph: &mut RegularGraph, a: VertexId, b: VertexId) -> Option<f32> {
        let weight = graph.edge_weight(a, b)?;
        graph.remove_undirected_edge(a, b);
        self.changes.push(EdgeChange {
            a,
            b,
            weight,
            removed: true,
        });
        Some(weight)
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    /// Undo all recorded changes, newest first.
    pub fn rollback(self, graph: &mut RegularGraph) {
        for change in self.changes.into_iter().rev() {
            if change.removed {
                graph.add_undirected_edge(change.a, change.b, change.weight);
            } else {
                graph.remove_undirected_edge(change.a, change.b);
            }
        }
    }
}

/// Try to replace the edge (v1, v2) by a cheaper set of edges.
///
/// Returns true if the graph was changed. On failure the graph is left as it
/// was before the call.
pub(crate) fn improve_edge(
    graph: &mut RegularGraph,
    config: &DesignerConfig,
    v1: VertexId,
    v2: VertexId,
    weight: f32,
) -> bool {
    if config.improve_k == 0 {
        return false;
    }

    let mut log = ChangeLog::default();
    if log.remove_edge(graph, v1, v2).is_none() {
        return false;
    }

    if swap_chain(graph, config, &mut log, v1, v2, weight) {
        true
    } else {
        tracing::trace!(v1, v2, changes = log.len(), "edge improvement rolled back");
        log.rollback(graph);
        false
    }
}

/// Search for the swap chain after (v1, v2) got removed.
///
/// v1 and v2 both miss one edge. Each round connects v2 to a vertex v3 found
/// near v2 and drops one of v3's edges (v3, v4), moving the missing edge to
/// v4. The chain ends as soon as v1 and v4 can be connected with a positive
/// total gain.
fn swap_chain(
    graph: &mut RegularGraph,
    config: &DesignerConfig,
    log: &mut ChangeLog,
    v1: VertexId,
    v2: VertexId,
    weight: f32,
) -> bool {
    let (mut v1, mut v2, mut v3, mut v4) = (v1, v2, v1, v1);
    let mut total_gain = weight;
    let mut steps = 0usize;

    loop {
        // 1. connect v2 to the neighborhood of v3/v4 and drop an edge there
        {
            let Some(feature) = graph.vertex(v2).map(|v| v.feature().clone()) else {
                return false;
            };
            let results = graph.search(
                std::slice::from_ref(&feature),
                config.improve_k,
                config.improve_eps,
                None,
                &[v3, v4],
            );

            let mut best_gain = total_gain;
            let mut best: Option<(VertexId, VertexId, f32, f32)> = None;
            for result in &results {
                let candidate = result.id;
                if candidate == v1 || candidate == v2 || graph.has_edge(v2, candidate) {
                    continue;
                }
                let Some(vertex) = graph.vertex(candidate) else {
                    continue;
                };
                for (neighbor, neighbor_weight) in vertex.edges().iter() {
                    let gain = (total_gain - result.distance) + neighbor_weight;
                    if neighbor != v2 && best_gain < gain {
                        best_gain = gain;
                        best = Some((candidate, neighbor, result.distance, neighbor_weight));
                    }
                }
            }

            let Some((new_v3, new_v4, dist23, dist34)) = best else {
                return false;
            };
            v3 = new_v3;
            v4 = new_v4;

            total_gain -= dist23;
            log.add_edge(graph, v2, v3, dist23);
            total_gain += dist34;
            log.remove_edge(graph, v3, v4);
        }

        // 2. close the chain between v1 and v4
        if v1 == v4 {
            // v1 misses two edges, splice it into an edge of a nearby vertex
            let Some(feature) = graph.vertex(v4).map(|v| v.feature().clone()) else {
                return false;
            };
            let results = graph.search(
                std::slice::from_ref(&feature),
                config.improve_k,
                config.improve_eps,
                None,
                &[v2, v3],
            );

            let mut best_gain = MIN_GAIN;
            let mut best: Option<(VertexId, f32, VertexId, f32)> = None;
            for result in &results {
                let good = result.id;
                if good == v4 || graph.has_edge(v4, good) {
                    continue;
                }
                let Some(vertex) = graph.vertex(good) else {
                    continue;
                };
                for (selected, old_weight) in vertex.edges().iter() {
                    if selected == v4 || graph.has_edge(v4, selected) {
                        continue;
                    }
                    let new_weight = graph.distance_to(&feature, selected);
                    let gain = (total_gain + old_weight) - (result.distance + new_weight);
                    if best_gain < gain {
                        best_gain = gain;
                        best = Some((good, result.distance, selected, new_weight));
                    }
                }
            }

            if let Some((good, good_weight, selected, selected_weight)) = best {
                log.remove_edge(graph, good, selected);
                log.add_edge(graph, v1, good, good_weight);
                log.add_edge(graph, v1, selected, selected_weight);
                return true;
            }
        } else if !graph.has_edge(v1, v4) {
            let dist14 = graph.distance(v1, v4);
            if total_gain - dist14 > MIN_GAIN {
                let entries = [v2, v3];
                let reachable = !graph
                    .has_path(&entries, v1, config.improve_k, config.improve_eps)
                    .is_empty()
                    || !graph
                        .has_path(&entries, v4, config.improve_k, config.improve_eps)
                        .is_empty();
                if reachable {
                    log.add_edge(graph, v1, v4, dist14);
                    return true;
                }
            }
        }

        // 3. chain length limit
        if steps >= config.max_path_length {
            return false;
        }

        // 4. alternate which end continues the chain
        if steps % 2 == 1 {
            std::mem::swap(&mut v1, &mut v4);
        }

        // 5. the chain already costs more than it saves
        if total_gain < 0.0 {
            return false;
        }

        (v2, v3, v4) = (v4, v2, v3);
        steps += 1;
    }
}

/// Try to improve every non-RNG edge of a random vertex.
///
/// Returns true if at least one edge was improved.
pub(crate) fn improve_random_vertex<R: Rng + ?Sized>(
    graph: &mut RegularGraph,
    config: &DesignerConfig,
    rng: &mut R,
) -> bool {
    let Some(v1) = graph.random_vertex(rng) else {
        return false;
    };
    let neighbors: Vec<VertexId> = match graph.vertex(v1) {
        Some(vertex) => vertex.edges().ids().collect(),
        None => return false,
    };

    let mut improved = false;
    for v2 in neighbors {
        let Some(weight) = graph.edge_weight(v1, v2) else {
            continue;
        };
        if !graph.check_rng(v2, v1, weight) {
            improved |= improve_edge(graph, config, v1, v2, weight);
        }
    }
    improved
}

#[cfg(test)]
mod tests {
    use super::*;
    use deg_feature::{FeatureVector, Metric, PrimitiveSpace};
    use std::sync::Arc;

    fn line_graph(n: usize) -> RegularGraph {
        let space = Arc::new(PrimitiveSpace::float(Metric::L2, 1));
        let mut graph = RegularGraph::new(2, space);
        for i in 0..n {
            graph
                .add_vertex(i as i32, FeatureVector::from(vec![i as f32]))
                .unwrap();
        }
        graph
    }

    fn degrees(graph: &RegularGraph) -> Vec<usize> {
        graph.vertices().map(|(_, v)| v.degree()).collect()
    }

    fn total_weight(graph: &RegularGraph) -> f32 {
        graph
            .vertices()
            .flat_map(|(_, v)| v.edges().iter().map(|(_, w)| w))
            .sum::<f32>()
            / 2.0
    }

    #[test]
    fn test_change_log_rollback() {
        let mut graph = line_graph(4);
        graph.add_undirected_edge(0, 1, 1.0);
        graph.add_undirected_edge(2, 3, 1.0);

        let mut log = ChangeLog::default();
        log.remove_edge(&mut graph, 0, 1);
        log.add_edge(&mut graph, 1, 2, 1.0);
        // already existing edges are not recorded
        log.add_edge(&mut graph, 2, 3, 1.0);
        assert_eq!(log.remove_edge(&mut graph, 0, 3), None);
        assert_eq!(log.len(), 2);

        log.rollback(&mut graph);
        assert!(graph.has_edge(0, 1));
        assert!(graph.has_edge(2, 3));
        assert!(!graph.has_edge(1, 2));
        assert_eq!(graph.edge_weight(0, 1), Some(1.0));
    }

    #[test]
    fn test_improve_crossed_ring() {
        // 2-regular ring over points on a line with long crossing edges
        let mut graph = line_graph(6);
        for (a, b) in [(0, 1), (1, 4), (4, 5), (5, 2), (2, 3), (3, 0)] {
            let w = graph.distance(a, b);
            graph.add_undirected_edge(a, b, w);
        }
        let before = total_weight(&graph);
        let config = DesignerConfig::for_degree(2);

        let weight = graph.edge_weight(1, 4).unwrap();
        let changed = improve_edge(&mut graph, &config, 1, 4, weight);

        assert_eq!(degrees(&graph), vec![2; 6]);
        if changed {
            assert!(total_weight(&graph) < before);
        } else {
            assert_eq!(total_weight(&graph), before);
            assert!(graph.has_edge(1, 4));
        }
    }

    #[test]
    fn test_success_always_lowers_total_weight() {
        use super::super::extend::extend_graph;
        use rand::rngs::StdRng;
        use rand::SeedableRng;

        // integer grid points keep every weight and gain exact, duplicates included
        let space = Arc::new(PrimitiveSpace::float(Metric::L2, 2));
        let mut graph = RegularGraph::new(4, space);
        let config = DesignerConfig::for_degree(4);
        let mut rng = StdRng::seed_from_u64(21);
        for label in 0..80 {
            let x = rng.gen_range(0..12) as f32;
            let y = rng.gen_range(0..12) as f32;
            extend_graph(&mut graph, &config, &mut rng, label, FeatureVector::from(vec![x, y]))
                .unwrap();
        }

        let edges: Vec<(VertexId, VertexId)> = graph
            .vertices()
            .flat_map(|(id, v)| v.edges().ids().filter(move |&n| id < n).map(move |n| (id, n)))
            .collect();
        for (a, b) in edges {
            let Some(weight) = graph.edge_weight(a, b) else {
                continue;
            };
            let before = total_weight(&graph);
            if improve_edge(&mut graph, &config, a, b, weight) {
                assert!(total_weight(&graph) < before, "edge ({}, {})", a, b);
            } else {
                assert_eq!(total_weight(&graph), before);
            }
            assert_eq!(degrees(&graph), vec![4; 80]);
        }
    }

    #[test]
    fn test_improvement_disabled() {
        let mut graph = line_graph(3);
        graph.add_undirected_edge(0, 1, 1.0);
        graph.add_undirected_edge(1, 2, 1.0);
        graph.add_undirected_edge(0, 2, 4.0);

        let config = DesignerConfig::for_degree(2).without_improvement();
        assert!(!improve_edge(&mut graph, &config, 0, 2, 4.0));
        assert_eq!(graph.edge_weight(0, 2), Some(4.0));
    }
}
