//! DEG build and search benchmarks.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use deg_feature::{FeatureVector, Metric, PrimitiveSpace};
use deg_graph::{DesignerConfig, DynamicExplorationGraph};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;

const DIMS: usize = 32;
const DEGREE: usize = 16;

fn generate_vectors(n: usize, dims: usize) -> Vec<FeatureVector> {
    let mut rng = StdRng::seed_from_u64(42);
    (0..n)
        .map(|_| {
            let v: Vec<f32> = (0..dims).map(|_| rng.gen::<f32>()).collect();
            FeatureVector::from(v)
        })
        .collect()
}

fn build_graph(vectors: &[FeatureVector]) -> DynamicExplorationGraph {
    let space = Arc::new(PrimitiveSpace::float(Metric::L2, DIMS));
    let deg =
        DynamicExplorationGraph::new(space, DEGREE, DesignerConfig::for_degree(DEGREE)).unwrap();
    for (i, v) in vectors.iter().enumerate() {
        deg.designer().add(i as i32, v.clone()).unwrap();
    }
    deg.designer().build_until_idle(|_| {}).unwrap();
    deg
}

fn bench_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("deg_build");
    group.sample_size(10);

    for n in [500, 2000].iter() {
        let vectors = generate_vectors(*n, DIMS);

        group.bench_with_input(BenchmarkId::from_parameter(n), n, |bencher, _| {
            bencher.iter(|| build_graph(black_box(&vectors)))
        });
    }

    group.finish();
}

fn bench_remove(c: &mut Criterion) {
    let mut group = c.benchmark_group("deg_remove");
    group.sample_size(10);

    let vectors = generate_vectors(1000, DIMS);
    group.bench_function("remove_100_of_1000", |bencher| {
        bencher.iter_with_setup(
            || build_graph(&vectors),
            |deg| {
                deg.designer().remove_if(|label| label % 10 == 0);
                deg.designer().build_until_idle(|_| {}).unwrap();
            },
        )
    });

    group.finish();
}

fn bench_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("deg_search");

    for n in [1000, 5000].iter() {
        let vectors = generate_vectors(*n, DIMS);
        let deg = build_graph(&vectors);
        let query = generate_vectors(1, DIMS).remove(0);

        for eps in [0.0f32, 0.1] {
            let id = format!("{}/eps{}", n, eps);
            group.bench_with_input(BenchmarkId::from_parameter(id), &eps, |bencher, &eps| {
                bencher.iter(|| deg.search(black_box(&query), 10, eps).unwrap())
            });
        }
    }

    group.finish();
}

criterion_group!(benches, bench_build, bench_remove, bench_search);
criterion_main!(benches);
