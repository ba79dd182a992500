use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use relax_sssp::{GraphBuilder, InsertionOrder};

/// Every vertex connects to 16 others with a fixed stride pattern.
fn edges(nodes: usize) -> Vec<(usize, usize, i64)> {
    let mut edges = Vec::with_capacity(nodes * 16);
    for i in 0..nodes {
        for j in 0..16 {
            let target = (i + j * 7 + 1) % nodes;
            edges.push((i, target, ((i * 31 + j) % 97) as i64));
        }
    }
    edges
}

fn bench_csr_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("csr_build");
    for nodes in [1_000usize, 10_000] {
        let grouped = edges(nodes);

        group.bench_with_input(BenchmarkId::new("strict", nodes), &grouped, |b, edges| {
            b.iter(|| {
                let mut builder = GraphBuilder::with_edge_capacity(nodes, edges.len());
                for &(from, to, w) in edges {
                    builder.add_edge(from, to, w).unwrap();
                }
                black_box(builder.build())
            });
        });

        // Reverse source order forces the counting-sort path.
        let shuffled: Vec<_> = grouped.iter().rev().copied().collect();
        group.bench_with_input(BenchmarkId::new("regroup", nodes), &shuffled, |b, edges| {
            b.iter(|| {
                let mut builder = GraphBuilder::with_edge_capacity(nodes, edges.len())
                    .insertion_order(InsertionOrder::Regroup);
                for &(from, to, w) in edges {
                    builder.add_edge(from, to, w).unwrap();
                }
                black_box(builder.build())
            });
        });
    }
    group.finish();
}

fn bench_csr_scan(c: &mut Criterion) {
    let nodes = 10_000;
    let mut builder = GraphBuilder::new(nodes);
    for (from, to, w) in edges(nodes) {
        builder.add_edge(from, to, w).unwrap();
    }
    let graph = builder.build();

    c.bench_function("csr_out_edges_scan", |b| {
        b.iter(|| {
            let mut sum = 0u64;
            for v in 0..graph.vertex_count() {
                for (_, w) in graph.out_edges(v) {
                    sum += u64::from(w);
                }
            }
            black_box(sum)
        });
    });
}

criterion_group!(benches, bench_csr_build, bench_csr_scan);
criterion_main!(benches);
