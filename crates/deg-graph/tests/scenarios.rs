//! End-to-end scenarios of the dynamic exploration graph.
//!
//! 1. Bootstrap clique - the first edges_per_vertex + 1 vertices are fully connected
//! 2. Steady-state insert - a vertex beyond the clique keeps the graph regular
//! 3. Removal repair - removing a vertex restores the degree of its neighbors
//! 4. RNG check - a long edge with a shorter detour is detected
//! 5. Bootstrap search - the exact nearest neighbor is found in a clique

use deg_feature::{FeatureVector, Metric, PrimitiveSpace};
use deg_graph::{DesignerConfig, DynamicExplorationGraph, RegularGraph};
use std::sync::Arc;

fn create_index(edges_per_vertex: usize, dims: usize) -> DynamicExplorationGraph {
    let space = Arc::new(PrimitiveSpace::float(Metric::L2, dims));
    DynamicExplorationGraph::new(
        space,
        edges_per_vertex,
        DesignerConfig::for_degree(edges_per_vertex),
    )
    .unwrap()
}

fn spiral(i: i32) -> FeatureVector {
    let angle = i as f32 * 0.9;
    let radius = 1.0 + i as f32 * 0.25;
    FeatureVector::from(vec![angle.cos() * radius, angle.sin() * radius])
}

fn assert_degree(deg: &DynamicExplorationGraph, degree: usize) {
    let graph = deg.read();
    for (id, vertex) in graph.vertices() {
        assert_eq!(vertex.degree(), degree, "vertex {} (label {})", id, vertex.label());
    }
}

// ============================================================================
// Scenario 1: Bootstrap clique
// ============================================================================

#[test]
fn test_bootstrap_clique() {
    let deg = create_index(4, 2);
    for i in 0..5 {
        deg.designer().add(i, spiral(i)).unwrap();
    }
    deg.designer().build_until_idle(|_| {}).unwrap();

    assert_eq!(deg.len(), 5);
    assert_degree(&deg, 4);
    deg.designer().check_graph_validation(5, 4).unwrap();
}

#[test]
fn test_partial_clique_below_degree() {
    let deg = create_index(4, 2);
    for i in 0..3 {
        deg.designer().add(i, spiral(i)).unwrap();
    }
    deg.designer().build_until_idle(|_| {}).unwrap();

    assert_degree(&deg, 2);
    deg.designer().check_graph_validation(3, 4).unwrap();
}

// ============================================================================
// Scenario 2: Steady-state insert
// ============================================================================

#[test]
fn test_steady_state_insert() {
    let deg = create_index(4, 2);
    for i in 0..5 {
        deg.designer().add(i, spiral(i)).unwrap();
    }
    deg.designer().build_until_idle(|_| {}).unwrap();

    deg.designer().add(5, spiral(5)).unwrap();
    let status = deg.designer().build_until_idle(|_| {}).unwrap();

    assert_eq!(status.last_add, None);
    assert_eq!(status.added, 1);
    assert_eq!(deg.len(), 6);
    assert_degree(&deg, 4);
    deg.designer().check_graph_validation(6, 4).unwrap();
}

// ============================================================================
// Scenario 3: Removal repair
// ============================================================================

#[test]
fn test_removal_repair() {
    let deg = create_index(4, 2);
    for i in 0..20 {
        deg.designer().add(i, spiral(i)).unwrap();
    }
    deg.designer().build_until_idle(|_| {}).unwrap();
    deg.designer().check_graph_validation(20, 4).unwrap();

    deg.designer().remove(7).unwrap();
    deg.designer().build_until_idle(|_| {}).unwrap();

    assert_eq!(deg.len(), 19);
    assert!(!deg.contains(7));
    assert_degree(&deg, 4);
    deg.designer().check_graph_validation(19, 4).unwrap();
    assert!(deg.designer().check_graph_connectivity());
}

#[test]
fn test_removal_down_to_clique() {
    let deg = create_index(4, 2);
    for i in 0..8 {
        deg.designer().add(i, spiral(i)).unwrap();
    }
    deg.designer().build_until_idle(|_| {}).unwrap();

    for label in 0..4 {
        deg.designer().remove(label).unwrap();
    }
    deg.designer().build_until_idle(|_| {}).unwrap();

    // four vertices left, fully connected
    assert_eq!(deg.len(), 4);
    deg.designer().check_graph_validation(4, 4).unwrap();
}

// ============================================================================
// Scenario 4: RNG check
// ============================================================================

#[test]
fn test_rng_check_collinear() {
    let space = Arc::new(PrimitiveSpace::float(Metric::L2, 2));
    let mut graph = RegularGraph::new(2, space);
    let a = graph.add_vertex(0, FeatureVector::from(vec![0.0f32, 0.0])).unwrap();
    let b = graph.add_vertex(1, FeatureVector::from(vec![1.0f32, 0.0])).unwrap();
    let c = graph.add_vertex(2, FeatureVector::from(vec![2.0f32, 0.0])).unwrap();
    for (x, y) in [(a, b), (b, c), (a, c)] {
        let w = graph.distance(x, y);
        graph.add_undirected_edge(x, y, w);
    }

    let ac = graph.edge_weight(a, c).unwrap();
    assert!(!graph.check_rng(a, c, ac));
    assert!(graph.check_rng(a, b, graph.edge_weight(a, b).unwrap()));
    assert!(graph.check_rng(b, c, graph.edge_weight(b, c).unwrap()));
    assert_eq!(deg_graph::analysis::calc_non_rng_edges(&graph), 2);
}

// ============================================================================
// Scenario 5: Bootstrap search
// ============================================================================

#[test]
fn test_clique_search_finds_top1() {
    let deg = create_index(4, 2);
    for i in 0..5 {
        deg.designer().add(i, spiral(i)).unwrap();
    }
    deg.designer().build_until_idle(|_| {}).unwrap();

    for i in 0..5 {
        let query = spiral(i);
        let results = deg.search(&query, 3, 0.0).unwrap();
        assert!(results.len() <= 3);
        assert_eq!(results[0].label, i);
        for pair in results.windows(2) {
            assert!(pair[0].distance <= pair[1].distance);
        }
    }
}

#[test]
fn test_recall_against_brute_force() {
    use deg_feature::brute::BruteForceIndex;

    let deg = create_index(8, 2);
    let space = Arc::new(PrimitiveSpace::float(Metric::L2, 2));
    let exact = BruteForceIndex::new(space);
    for i in 0..200 {
        deg.designer().add(i, spiral(i)).unwrap();
        exact.insert(i, spiral(i)).unwrap();
    }
    deg.designer().build_until_idle(|_| {}).unwrap();

    let mut hits = 0;
    let queries = 20;
    for q in 0..queries {
        let query = FeatureVector::from(vec![q as f32 - 10.0, 10.0 - q as f32 * 0.5]);
        let truth = exact.search(&query, 1).unwrap();
        let found = deg.search(&query, 10, 0.1).unwrap();
        if found.iter().any(|hit| hit.label == truth[0].key) {
            hits += 1;
        }
    }
    assert!(hits >= queries * 9 / 10, "recall too low: {}/{}", hits, queries);
}
