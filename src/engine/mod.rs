//! Frontier-based parallel shortest paths over an [`ExecutionBackend`].
//!
//! A run alternates two phases, each one dispatch over all vertices:
//! 1. **relax**: every active vertex proposes `cost[v] + w` to each
//!    neighbour through an atomic minimum on the packed `(cost, parent)`
//!    pending word
//! 2. **commit**: every vertex adopts a strictly better proposal and
//!    becomes active, or goes inactive
//!
//! The loop stops once a readback of the active flags finds none set.
//! Costs only decrease, so the fixpoint is the shortest-path tree.
//!
//! ```
//! use relax_sssp::{GraphBuilder, SequentialBackend, SsspEngine};
//!
//! let mut builder = GraphBuilder::new(3);
//! builder.add_edge(0, 1, 4).unwrap();
//! builder.add_edge(0, 2, 1).unwrap();
//! builder.add_edge(2, 1, 1).unwrap();
//! let graph = builder.build();
//!
//! let engine = SsspEngine::new(SequentialBackend::sequential());
//! let outcome = engine.run(&graph, 0, Some(1)).unwrap();
//! let route = outcome.route.unwrap();
//! assert_eq!(route.cost, 2);
//! assert_eq!(route.path, vec![0, 2, 1]);
//! ```

mod config;
mod path;
mod state;

pub use config::EngineConfig;
pub use path::{Route, ShortestPathTree};

use self::state::{read_u32s, DeviceGraph, Kernels, WorkingState};
use crate::{
    backend::{ExecutionBackend, ResourceScope},
    error::{Result, SsspError},
    graph::{Cost, Graph, VertexId},
};

/// Counters describing one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    /// Relax/commit iterations until the frontier emptied.
    pub iterations: usize,
    /// Kernel dispatches issued, including initialization.
    pub dispatches: usize,
}

/// Everything a run produces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    /// Costs and predecessors of every vertex.
    pub tree: ShortestPathTree,
    /// Path to the requested target, if one was requested.
    pub route: Option<Route>,
    /// Run counters.
    pub stats: RunStats,
}

/// State visible to an observer after each iteration of
/// [`SsspEngine::solve_traced`].
#[derive(Debug, Clone, Copy)]
pub struct IterationSnapshot<'a> {
    /// 1-based iteration number.
    pub iteration: usize,
    /// Vertices that committed an improvement in this iteration.
    pub active: usize,
    /// Committed costs after this iteration.
    pub costs: &'a [Cost],
}

type Observer<'o> = &'o mut dyn FnMut(&IterationSnapshot<'_>);

/// Runs shortest-path queries on a backend.
///
/// The engine holds no per-run state: every call allocates its own device
/// buffers and releases them before returning, so one engine can serve
/// concurrent runs when its backend is `Sync`.
#[derive(Debug, Clone)]
pub struct SsspEngine<B> {
    backend: B,
    config: EngineConfig,
}

impl<B: ExecutionBackend> SsspEngine<B> {
    /// An engine with the default configuration.
    pub fn new(backend: B) -> Self {
        Self::with_config(backend, EngineConfig::default())
    }

    /// An engine with an explicit configuration.
    pub fn with_config(backend: B, config: EngineConfig) -> Self {
        Self { backend, config }
    }

    /// The backend runs are dispatched to.
    #[inline]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// The active configuration.
    #[inline]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Computes shortest paths from `source` to every vertex.
    ///
    /// # Errors
    /// [`SsspError::InvalidVertexId`] for a bad source; compilation, backend
    /// and [`SsspError::ConvergenceExceeded`] failures from the run itself.
    pub fn solve(&self, graph: &Graph, source: VertexId) -> Result<ShortestPathTree> {
        graph.check_vertex(source)?;
        self.execute(graph, source, None, None).map(|(tree, _)| tree)
    }

    /// Computes shortest paths from `source` and, if `target` is given,
    /// extracts the route to it.
    ///
    /// # Errors
    /// As [`SsspEngine::solve`], plus [`SsspError::UnreachableTarget`] when
    /// `target` has no path from `source`.
    pub fn run(&self, graph: &Graph, source: VertexId, target: Option<VertexId>) -> Result<Outcome> {
        graph.check_vertex(source)?;
        if let Some(target) = target {
            graph.check_vertex(target)?;
        }

        let (tree, stats) = self.execute(graph, source, target, None)?;
        let route = target.map(|t| tree.route_to(t)).transpose()?;
        Ok(Outcome { tree, route, stats })
    }

    /// Like [`SsspEngine::solve`], calling `observer` after every iteration.
    ///
    /// Each call reads the cost buffer back, so this is meant for inspection
    /// and tests rather than throughput.
    ///
    /// # Errors
    /// As [`SsspEngine::solve`].
    pub fn solve_traced<F>(&self, graph: &Graph, source: VertexId, mut observer: F) -> Result<Outcome>
    where
        F: FnMut(&IterationSnapshot<'_>),
    {
        graph.check_vertex(source)?;
        let (tree, stats) = self.execute(graph, source, None, Some(&mut observer))?;
        Ok(Outcome {
            tree,
            route: None,
            stats,
        })
    }

    fn execute(
        &self,
        graph: &Graph,
        source: VertexId,
        target: Option<VertexId>,
        mut observer: Option<Observer<'_>>,
    ) -> Result<(ShortestPathTree, RunStats)> {
        let n = graph.vertex_count();
        let span = tracing::info_span!(
            "sssp_run",
            source,
            target = ?target,
            vertices = n,
            edges = graph.edge_count()
        );
        let _enter = span.enter();

        // Graph ids are bounded by `MAX_VERTICES`, which fits in a `u32`.
        let n32 = u32::try_from(n)
            .map_err(|_| SsspError::MalformedGraph(format!("{n} vertices exceed the kernel's u32 range")))?;
        let source32 = u32::try_from(source).map_err(|_| SsspError::InvalidVertexId {
            vertex: source,
            vertex_count: n,
        })?;

        let mut scope = ResourceScope::new(&self.backend);
        let kernels = Kernels::build(&mut scope, self.config.kernel())?;
        let device_graph = DeviceGraph::upload(&mut scope, graph)?;
        let state = WorkingState::allocate(&mut scope, n)?;
        let backend = scope.backend();

        backend.dispatch(kernels.initialize, &state.initialize_args(source32, n32), n)?;
        let mut stats = RunStats {
            iterations: 0,
            dispatches: 1,
        };

        let relax_args = state.relax_args(&device_graph, n32);
        let commit_args = state.commit_args(n32);
        let limit = self.config.iteration_limit(n);
        loop {
            if stats.iterations == limit {
                tracing::warn!(limit, "iteration bound reached with vertices still active");
                return Err(SsspError::ConvergenceExceeded { iterations: limit });
            }

            backend.dispatch(kernels.relax, &relax_args, n)?;
            backend.dispatch(kernels.commit, &commit_args, n)?;
            stats.iterations += 1;
            stats.dispatches += 2;

            let active = read_u32s(backend, state.active, n)?
                .into_iter()
                .filter(|&flag| flag != 0)
                .count();
            tracing::trace!(iteration = stats.iterations, active, "iteration committed");

            if let Some(observer) = observer.as_mut() {
                let costs = read_u32s(backend, state.cost, n)?;
                observer(&IterationSnapshot {
                    iteration: stats.iterations,
                    active,
                    costs: &costs,
                });
            }

            if active == 0 {
                break;
            }
        }
        tracing::debug!(iterations = stats.iterations, dispatches = stats.dispatches, "converged");

        let costs = read_u32s(backend, state.cost, n)?;
        let parents = read_u32s(backend, state.parent, n)?;
        Ok((ShortestPathTree::new(source, costs, parents), stats))
    }
}
