//! Error taxonomy shared by the graph builder, the backends and the engine.

use crate::backend::BackendError;

/// Result type for graph construction and shortest-path runs.
pub type Result<T> = std::result::Result<T, SsspError>;

/// Errors raised while building a graph or running the relaxation engine.
#[derive(Debug, thiserror::Error)]
pub enum SsspError {
    /// A vertex id outside `0..vertex_count`.
    #[error("invalid vertex id {vertex} (graph has {vertex_count} vertices)")]
    InvalidVertexId {
        /// The rejected id.
        vertex: usize,
        /// Number of vertices in the graph.
        vertex_count: usize,
    },

    /// A negative edge weight, or one that does not fit in a `u32`.
    #[error("invalid edge weight {weight}: weights must lie in 0..={}", u32::MAX)]
    InvalidWeight {
        /// The rejected weight.
        weight: i64,
    },

    /// Edges of a source vertex were not inserted as one contiguous run.
    #[error(
        "vertex {vertex} inserted after vertex {last}; edges must be grouped by non-decreasing source"
    )]
    OutOfOrderInsertion {
        /// The vertex that arrived out of order.
        vertex: usize,
        /// The last source vertex seen before it.
        last: usize,
    },

    /// The sum of all edge weights would allow path costs to overflow.
    #[error("total edge weight {total} exceeds the limit of {limit}")]
    WeightBudgetExceeded {
        /// Total weight including the rejected edge.
        total: u64,
        /// Largest accepted total.
        limit: u64,
    },

    /// CSR parts that do not describe a valid graph.
    #[error("malformed graph: {0}")]
    MalformedGraph(String),

    /// The engine configuration could not be parsed.
    #[error("invalid engine configuration: {0}")]
    InvalidConfig(#[from] serde_json::Error),

    /// The backend rejected the kernel program.
    #[error("kernel compilation failed:\n{log}")]
    Compilation {
        /// Backend build log.
        log: String,
    },

    /// Any other backend failure (allocation, dispatch, readback).
    #[error(transparent)]
    Backend(BackendError),

    /// The fixpoint loop hit its iteration bound with vertices still active.
    #[error("relaxation did not converge within {iterations} iterations")]
    ConvergenceExceeded {
        /// The bound that was reached.
        iterations: usize,
    },

    /// The target has no path from the source.
    #[error("vertex {target} is unreachable from vertex {origin}")]
    UnreachableTarget {
        /// Source vertex of the run.
        origin: usize,
        /// Requested target.
        target: usize,
    },

    /// Parent pointers loop or dead-end before reaching the source.
    #[error("parent chain from vertex {target} does not reach the source within {steps} steps")]
    BrokenParentChain {
        /// Vertex the walk started from.
        target: usize,
        /// Steps taken before giving up.
        steps: usize,
    },
}

impl SsspError {
    /// Returns `true` for outcomes a caller is expected to handle as data
    /// rather than as a failure (currently only [`SsspError::UnreachableTarget`]).
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::UnreachableTarget { .. })
    }
}

impl From<BackendError> for SsspError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::Compilation { log } => Self::Compilation { log },
            other => Self::Backend(other),
        }
    }
}
