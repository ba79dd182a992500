use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use relax_sssp::{Graph, GraphBuilder, SequentialBackend, SsspEngine};

/// A grid where each cell links right and down, plus sparse long jumps.
fn grid(side: usize) -> Graph {
    let n = side * side;
    let mut builder = GraphBuilder::with_edge_capacity(n, n * 3);
    for v in 0..n {
        let (row, col) = (v / side, v % side);
        if col + 1 < side {
            builder.add_edge(v, v + 1, ((v * 13) % 17 + 1) as i64).unwrap();
        }
        if row + 1 < side {
            builder.add_edge(v, v + side, ((v * 7) % 11 + 1) as i64).unwrap();
        }
        if v % 97 == 0 {
            builder.add_edge(v, (v * 31 + 5) % n, 40).unwrap();
        }
    }
    builder.build()
}

fn bench_sssp(c: &mut Criterion) {
    let mut group = c.benchmark_group("sssp_solve");
    group.sample_size(20);
    for side in [32usize, 96] {
        let graph = grid(side);

        let sequential = SsspEngine::new(SequentialBackend::sequential());
        group.bench_with_input(BenchmarkId::new("sequential", side * side), &graph, |b, graph| {
            b.iter(|| black_box(sequential.solve(graph, 0).unwrap()));
        });

        #[cfg(feature = "parallel")]
        {
            let parallel = SsspEngine::new(relax_sssp::ParallelBackend::parallel());
            group.bench_with_input(BenchmarkId::new("parallel", side * side), &graph, |b, graph| {
                b.iter(|| black_box(parallel.solve(graph, 0).unwrap()));
            });
        }
    }
    group.finish();
}

criterion_group!(benches, bench_sssp);
criterion_main!(benches);
