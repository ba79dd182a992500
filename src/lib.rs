//! # `relax-sssp` - Parallel Single-Source Shortest Paths
//!
//! Builds compact (CSR) graphs with non-negative integer weights and computes
//! single-source shortest paths with a frontier-based relaxation that runs as
//! data-parallel kernels on an injected execution backend.
//!
//! ## Guarantees
//!
//! ### Correctness
//! - **Order-independent relaxation**: concurrent proposals for one vertex are
//!   merged with a single atomic minimum over a packed `(cost, parent)` word,
//!   so the cost and the parent that produced it can never disagree.
//! - **Deterministic results**: equal-cost proposals resolve to the smaller
//!   parent id, so sequential and parallel backends return identical trees.
//! - **No overflow**: the builder caps the total edge weight at
//!   [`graph::MAX_TOTAL_WEIGHT`], which keeps every candidate cost below
//!   [`INFINITY`].
//!
//! ### Resource Safety
//! - **Scoped device resources**: every buffer, kernel and program a run
//!   acquires is released on every exit path through [`backend::ResourceScope`].
//! - **Bounded runs**: the fixpoint loop is capped (by default at the vertex
//!   count) and reports [`SsspError::ConvergenceExceeded`] instead of spinning.
//!
//! ## Architecture
//!
//! 1. **Graph** ([`graph`]): [`GraphBuilder`] enforces grouped insertion and
//!    freezes into an immutable, shareable [`Graph`] snapshot.
//! 2. **Backend** ([`backend`]): the [`ExecutionBackend`] trait (compile,
//!    allocate, dispatch, read back, release) plus in-process host backends.
//! 3. **Engine** ([`engine`]): [`SsspEngine`] drives initialize, then
//!    alternating relax/commit phases until the frontier is empty.
//!
//! ## Example
//!
//! ```rust
//! use relax_sssp::{GraphBuilder, SequentialBackend, SsspEngine};
//!
//! // A -> B (4), A -> C (2), B -> C (3), B -> D (1), C -> A (2), C -> B (1), C -> D (5)
//! let mut builder = GraphBuilder::new(4);
//! for (from, to, w) in [(0, 1, 4), (0, 2, 2), (1, 2, 3), (1, 3, 1), (2, 0, 2), (2, 1, 1), (2, 3, 5)] {
//!     builder.add_edge(from, to, w).unwrap();
//! }
//! let graph = builder.build();
//!
//! let engine = SsspEngine::new(SequentialBackend::sequential());
//! let route = engine.run(&graph, 0, Some(3)).unwrap().route.unwrap();
//! assert_eq!(route.cost, 4);
//! assert_eq!(route.path, vec![0, 2, 1, 3]);
//! ```

#![warn(missing_docs, clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

pub mod backend;
pub mod engine;
pub mod error;
pub mod graph;

pub use backend::{
    host::{HostBackend, HostStats, SequentialBackend},
    ExecutionBackend, KernelSource,
};
#[cfg(feature = "parallel")]
pub use backend::host::ParallelBackend;
pub use engine::{EngineConfig, IterationSnapshot, Outcome, Route, RunStats, ShortestPathTree, SsspEngine};
pub use error::{Result, SsspError};
pub use graph::{Cost, Graph, GraphBuilder, InsertionOrder, VertexId, Weight, INFINITY, NO_PARENT};

// Compile-time assertions for the device layout
const _: () = {
    use core::mem;

    // A pending proposal is one 64-bit word: cost in the high half, parent in the low half.
    assert!(mem::size_of::<u64>() == 2 * mem::size_of::<Cost>());
    assert!(mem::size_of::<Weight>() == mem::size_of::<u32>());

    // Every storable vertex id stays distinct from the parent sentinel.
    assert!(graph::MAX_VERTICES == NO_PARENT as usize);

    // Twice the weight budget still fits below the unreachable marker.
    assert!(2 * graph::MAX_TOTAL_WEIGHT < INFINITY as u64);
};
