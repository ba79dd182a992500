use std::collections::HashMap;

use petgraph::{algo::dijkstra, graph::NodeIndex, visit::EdgeRef, Graph as PetGraph};
use proptest::prelude::*;
use relax_sssp::{Graph, GraphBuilder, InsertionOrder, SequentialBackend, SsspEngine, VertexId};

type Edge = (VertexId, VertexId, u32);

fn random_graph() -> impl Strategy<Value = (usize, Vec<Edge>, VertexId)> {
    (1usize..24).prop_flat_map(|n| {
        (
            Just(n),
            proptest::collection::vec((0..n, 0..n, 0u32..100), 0..80),
            0..n,
        )
    })
}

fn build(n: usize, edges: &[Edge]) -> Graph {
    let mut builder = GraphBuilder::new(n).insertion_order(InsertionOrder::Regroup);
    for &(from, to, w) in edges {
        builder.add_edge(from, to, i64::from(w)).unwrap();
    }
    builder.build()
}

fn reference_costs(n: usize, edges: &[Edge], source: VertexId) -> HashMap<NodeIndex, u64> {
    let mut reference = PetGraph::<(), u32>::new();
    let nodes: Vec<_> = (0..n).map(|_| reference.add_node(())).collect();
    for &(from, to, w) in edges {
        reference.add_edge(nodes[from], nodes[to], w);
    }
    dijkstra(&reference, nodes[source], None, |e| u64::from(*e.weight()))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn test_costs_match_dijkstra((n, edges, source) in random_graph()) {
        let graph = build(n, &edges);
        let engine = SsspEngine::new(SequentialBackend::sequential());
        let outcome = engine.run(&graph, source, None).unwrap();
        let expected = reference_costs(n, &edges, source);

        for v in 0..n {
            let got = outcome.tree.cost(v).map(u64::from);
            prop_assert_eq!(got, expected.get(&NodeIndex::new(v)).copied(), "vertex {}", v);
        }
        prop_assert!(outcome.stats.iterations <= n.max(1));
    }

    #[test]
    fn test_parents_form_shortest_path_tree((n, edges, source) in random_graph()) {
        let graph = build(n, &edges);
        let engine = SsspEngine::new(SequentialBackend::sequential());
        let tree = engine.solve(&graph, source).unwrap();

        for v in (0..n).filter(|&v| v != source && tree.is_reachable(v)) {
            let parent = tree.parent(v).unwrap();
            let cost = tree.cost(v).unwrap();
            let parent_cost = tree.cost(parent).unwrap();
            prop_assert!(graph.out_edges(parent).any(|(to, w)| to == v && parent_cost + w == cost));

            let path = tree.path_to(v).unwrap();
            prop_assert_eq!(path.first().copied(), Some(source));
            prop_assert_eq!(path.last().copied(), Some(v));
        }
    }

    #[test]
    fn test_costs_never_increase((n, edges, source) in random_graph()) {
        let graph = build(n, &edges);
        let engine = SsspEngine::new(SequentialBackend::sequential());
        let mut previous: Option<Vec<u32>> = None;
        let mut monotone = true;
        engine
            .solve_traced(&graph, source, |snap| {
                if let Some(prev) = &previous {
                    monotone &= prev.iter().zip(snap.costs).all(|(before, after)| after <= before);
                }
                previous = Some(snap.costs.to_vec());
            })
            .unwrap();
        prop_assert!(monotone);
    }

    #[test]
    fn test_grouped_insertion_offsets((n, mut edges, _source) in random_graph()) {
        edges.sort_by_key(|&(from, _, _)| from);
        let mut builder = GraphBuilder::new(n);
        for &(from, to, w) in &edges {
            builder.add_edge(from, to, i64::from(w)).unwrap();
        }
        let graph = builder.build();

        for v in 0..n {
            let before = edges.iter().filter(|&&(from, _, _)| from < v).count();
            prop_assert_eq!(graph.offsets()[v] as usize, before);
        }
        let inserted: Vec<u32> = edges.iter().map(|&(_, to, _)| to as u32).collect();
        prop_assert_eq!(graph.edges(), inserted.as_slice());
        prop_assert_eq!(graph, build(n, &edges));
    }
}

#[cfg(feature = "parallel")]
proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn test_parallel_matches_sequential((n, edges, source) in random_graph()) {
        let graph = build(n, &edges);
        let sequential = SsspEngine::new(SequentialBackend::sequential());
        let parallel = SsspEngine::new(relax_sssp::ParallelBackend::with_threads(4).unwrap());
        let a = sequential.run(&graph, source, None).unwrap();
        let b = parallel.run(&graph, source, None).unwrap();
        prop_assert_eq!(a.tree, b.tree);
        prop_assert_eq!(a.stats, b.stats);
    }
}

#[cfg(feature = "parallel")]
#[test]
fn test_contended_sink_matches_sequential() {
    // Every middle vertex becomes active together and relaxes into the sink.
    const MIDDLE: usize = 4000;
    let sink = MIDDLE + 1;
    let mut builder = GraphBuilder::with_edge_capacity(MIDDLE + 2, 2 * MIDDLE);
    for v in 1..=MIDDLE {
        builder.add_edge(0, v, 1).unwrap();
    }
    for v in 1..=MIDDLE {
        builder.add_edge(v, sink, 1).unwrap();
    }
    let graph = builder.build();

    let expected = SsspEngine::new(SequentialBackend::sequential()).run(&graph, 0, None).unwrap();
    assert_eq!(expected.tree.cost(sink), Some(2));
    assert_eq!(expected.tree.parent(sink), Some(1));

    let parallel = SsspEngine::new(relax_sssp::ParallelBackend::with_threads(8).unwrap());
    for _ in 0..5 {
        let outcome = parallel.run(&graph, 0, None).unwrap();
        assert_eq!(outcome.tree, expected.tree);
        assert_eq!(outcome.stats, expected.stats);
    }
}
