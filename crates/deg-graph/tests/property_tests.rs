use deg_feature::{FeatureVector, Metric, PrimitiveSpace};
use deg_graph::{DesignerConfig, DynamicExplorationGraph, ExtendSchema, Label};
use proptest::prelude::*;
use std::collections::BTreeSet;
use std::sync::Arc;

#[derive(Debug, Clone)]
enum Op {
    Insert(f32, f32),
    /// Index into the currently stored labels.
    Remove(usize),
}

// Strategy: inserts and removals in equal measure
fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        1 => (-100.0f32..100.0, -100.0f32..100.0).prop_map(|(x, y)| Op::Insert(x, y)),
        1 => any::<usize>().prop_map(Op::Remove),
    ]
}

fn arb_degree() -> impl Strategy<Value = usize> {
    prop::sample::select(vec![2usize, 4, 6, 8])
}

fn arb_schema() -> impl Strategy<Value = ExtendSchema> {
    prop_oneof![
        Just(ExtendSchema::ReplaceWorst),
        Just(ExtendSchema::MinimizeDistortion),
    ]
}

fn create_deg(degree: usize, schema: ExtendSchema) -> DynamicExplorationGraph {
    let space = Arc::new(PrimitiveSpace::float(Metric::L2, 2));
    let config = DesignerConfig::for_degree(degree).with_extend_schema(schema);
    DynamicExplorationGraph::new(space, degree, config).unwrap()
}

fn assert_invariants(deg: &DynamicExplorationGraph, expected: &BTreeSet<Label>) {
    let graph = deg.read();
    let degree = graph.edges_per_vertex().min(graph.len().saturating_sub(1));

    let labels: BTreeSet<Label> = graph.labels().collect();
    assert_eq!(&labels, expected);

    for (id, vertex) in graph.vertices() {
        // degree invariant
        assert_eq!(vertex.degree(), degree, "vertex {}", id);

        // label/id bijection
        assert_eq!(graph.id_of(vertex.label()), Some(id));
        let by_label = graph.vertex_by_label(vertex.label()).map(|v| v.label());
        assert_eq!(by_label, Some(vertex.label()));

        for (neighbor, weight) in vertex.edges().iter() {
            // symmetry
            assert_eq!(graph.edge_weight(neighbor, id), Some(weight));
            // weight correctness
            assert!((weight - graph.distance(id, neighbor)).abs() < 1e-3);
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn test_property_structure_under_changes(
        initial in prop::collection::vec((-100.0f32..100.0, -100.0f32..100.0), 0..30),
        ops in prop::collection::vec(arb_op(), 0..60),
        degree in arb_degree(),
        schema in arb_schema(),
    ) {
        let deg = create_deg(degree, schema);

        let mut next_label: Label = 0;
        let mut expected = BTreeSet::new();
        for (x, y) in initial {
            deg.designer().add(next_label, FeatureVector::from(vec![x, y])).unwrap();
            expected.insert(next_label);
            next_label += 1;
        }
        deg.designer().build_until_idle(|_| {}).unwrap();
        assert_invariants(&deg, &expected);

        for op in ops {
            match op {
                Op::Insert(x, y) => {
                    deg.designer().add(next_label, FeatureVector::from(vec![x, y])).unwrap();
                    expected.insert(next_label);
                    next_label += 1;
                }
                Op::Remove(index) if !expected.is_empty() => {
                    let label = *expected.iter().nth(index % expected.len()).unwrap();
                    deg.designer().remove(label).unwrap();
                    expected.remove(&label);
                }
                Op::Remove(_) => {}
            }
            deg.designer().build_until_idle(|_| {}).unwrap();
            assert_invariants(&deg, &expected);
        }
    }

    #[test]
    fn test_property_drain_to_empty(
        points in prop::collection::vec((-100.0f32..100.0, -100.0f32..100.0), 1..40),
        order in prop::collection::vec(any::<usize>(), 40),
        degree in arb_degree(),
        schema in arb_schema(),
    ) {
        let deg = create_deg(degree, schema);
        let mut expected = BTreeSet::new();
        for (i, (x, y)) in points.iter().enumerate() {
            deg.designer().add(i as Label, FeatureVector::from(vec![*x, *y])).unwrap();
            expected.insert(i as Label);
        }
        deg.designer().build_until_idle(|_| {}).unwrap();
        assert_invariants(&deg, &expected);

        // remove in random order through the clique sizes down to nothing
        for index in order.into_iter().take(points.len()) {
            let label = *expected.iter().nth(index % expected.len()).unwrap();
            deg.designer().remove(label).unwrap();
            expected.remove(&label);
            deg.designer().build_until_idle(|_| {}).unwrap();
            assert_invariants(&deg, &expected);
        }
        prop_assert!(deg.is_empty());
    }

    #[test]
    fn test_property_search_ordering(
        points in prop::collection::vec((-50.0f32..50.0, -50.0f32..50.0), 5..60),
        query in (-50.0f32..50.0, -50.0f32..50.0),
        k in 1usize..12,
        degree in arb_degree(),
    ) {
        let deg = create_deg(degree, ExtendSchema::ReplaceWorst);
        for (i, (x, y)) in points.iter().enumerate() {
            deg.designer().add(i as Label, FeatureVector::from(vec![*x, *y])).unwrap();
        }
        deg.designer().build_until_idle(|_| {}).unwrap();

        let query = FeatureVector::from(vec![query.0, query.1]);
        let results = deg.search(&query, k, 0.0).unwrap();

        prop_assert!(results.len() <= k);
        prop_assert!(!results.is_empty());
        let distinct: BTreeSet<Label> = results.iter().map(|hit| hit.label).collect();
        prop_assert_eq!(distinct.len(), results.len());
        for pair in results.windows(2) {
            prop_assert!(pair[0].distance <= pair[1].distance);
        }
    }
}
