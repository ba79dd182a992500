//! Immutable CSR (compressed sparse row) snapshot of a weighted digraph.
//!
//! Memory layout:
//! - `offsets`: `Vec<u32>` of length `n + 1`; the trailing slot is the edge count
//! - `edges`: contiguous `u32` destinations, grouped by source vertex
//! - `weights`: contiguous `u32` weights, parallel to `edges`
//!
//! The public [`Graph::offsets`] view hides the trailing slot, so it has
//! exactly one entry per vertex.

pub mod builder;

use core::ops::Range;

use serde::{Deserialize, Serialize};

use crate::{
    error::{Result, SsspError},
    graph::{VertexId, Weight, MAX_TOTAL_WEIGHT, MAX_VERTICES},
};

/// A frozen directed graph with non-negative edge weights.
///
/// Snapshots are plain values: they are `Send + Sync`, can be shared by any
/// number of concurrent runs, and never change after construction.
///
/// ### Performance Characteristics
/// | Operation | Complexity | Notes |
/// |-----------|------------|-------|
/// | `out_edges` | \(O(1)\) | Iterator over a contiguous slot range |
/// | `out_degree` | \(O(1)\) | Difference of two offsets |
/// | `from_csr_parts` | \(O(n + m)\) | Validates shape, ids and weight budget |
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "CsrParts", into = "CsrParts")]
pub struct Graph {
    offsets: Vec<u32>,
    edges: Vec<u32>,
    weights: Vec<Weight>,
    total_weight: u64,
}

/// Serialized form: one offset per vertex, no trailing sentinel.
#[derive(Serialize, Deserialize)]
struct CsrParts {
    offsets: Vec<u32>,
    edges: Vec<u32>,
    weights: Vec<Weight>,
}

impl Graph {
    /// Assembles a snapshot from parts the builder has already validated.
    pub(crate) fn from_validated(
        offsets: Vec<u32>,
        edges: Vec<u32>,
        weights: Vec<Weight>,
        total_weight: u64,
    ) -> Self {
        debug_assert_eq!(edges.len(), weights.len());
        debug_assert_eq!(offsets.last().map(|&o| o as usize), Some(edges.len()));
        Self {
            offsets,
            edges,
            weights,
            total_weight,
        }
    }

    /// Builds a graph directly from CSR parts.
    ///
    /// `offsets` holds one entry per vertex; vertex `v` owns the slots
    /// `offsets[v]..offsets[v + 1]` (the last vertex runs to the end of
    /// `edges`).
    ///
    /// # Errors
    /// Returns [`SsspError::MalformedGraph`] if offsets are not monotone or
    /// exceed the edge count, if `edges` and `weights` differ in length, or
    /// if a destination is out of range, and
    /// [`SsspError::WeightBudgetExceeded`] if the weights sum past
    /// [`MAX_TOTAL_WEIGHT`].
    pub fn from_csr_parts(offsets: Vec<u32>, edges: Vec<u32>, weights: Vec<Weight>) -> Result<Self> {
        let n = offsets.len();
        if n > MAX_VERTICES {
            return Err(SsspError::MalformedGraph(format!(
                "{n} vertices exceed the limit of {MAX_VERTICES}"
            )));
        }
        if edges.len() != weights.len() {
            return Err(SsspError::MalformedGraph(format!(
                "{} edges but {} weights",
                edges.len(),
                weights.len()
            )));
        }
        let m = u32::try_from(edges.len())
            .map_err(|_| SsspError::MalformedGraph(format!("{} edges exceed u32 slots", edges.len())))?;
        if offsets.windows(2).any(|w| w[0] > w[1]) {
            return Err(SsspError::MalformedGraph("offsets must be monotone".into()));
        }
        if let Some(&last) = offsets.last() {
            if last > m {
                return Err(SsspError::MalformedGraph(format!(
                    "offset {last} is past the edge count {m}"
                )));
            }
        }
        if let Some(&bad) = edges.iter().find(|&&to| to as usize >= n) {
            return Err(SsspError::MalformedGraph(format!(
                "edge destination {bad} out of bounds for {n} vertices"
            )));
        }
        let total_weight: u64 = weights.iter().map(|&w| u64::from(w)).sum();
        if total_weight > MAX_TOTAL_WEIGHT {
            return Err(SsspError::WeightBudgetExceeded {
                total: total_weight,
                limit: MAX_TOTAL_WEIGHT,
            });
        }

        // Slots before the first offset belong to no vertex.
        if offsets.first().is_some_and(|&o| o != 0) {
            return Err(SsspError::MalformedGraph("first offset must be 0".into()));
        }

        let mut offsets = offsets;
        offsets.push(m);
        Ok(Self::from_validated(offsets, edges, weights, total_weight))
    }

    /// Number of vertices, including those without outgoing edges.
    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.offsets.len() - 1
    }

    /// Number of edges.
    #[inline]
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// First edge slot of every vertex, one entry per vertex.
    #[inline]
    pub fn offsets(&self) -> &[u32] {
        &self.offsets[..self.vertex_count()]
    }

    /// Destination vertex of every edge slot.
    #[inline]
    pub fn edges(&self) -> &[u32] {
        &self.edges
    }

    /// Weight of every edge slot.
    #[inline]
    pub fn weights(&self) -> &[Weight] {
        &self.weights
    }

    /// Sum of all edge weights.
    #[inline]
    pub fn total_weight(&self) -> u64 {
        self.total_weight
    }

    /// Returns `true` if `vertex` is a valid id for this graph.
    #[inline]
    pub fn contains_vertex(&self, vertex: VertexId) -> bool {
        vertex < self.vertex_count()
    }

    /// Fails with [`SsspError::InvalidVertexId`] unless `vertex` is in range.
    pub(crate) fn check_vertex(&self, vertex: VertexId) -> Result<()> {
        if self.contains_vertex(vertex) {
            Ok(())
        } else {
            Err(SsspError::InvalidVertexId {
                vertex,
                vertex_count: self.vertex_count(),
            })
        }
    }

    /// Offsets including the trailing edge-count slot (`n + 1` entries).
    #[inline]
    pub(crate) fn csr_offsets(&self) -> &[u32] {
        &self.offsets
    }

    /// Edge slots owned by `vertex`.
    ///
    /// # Panics
    /// Panics if `vertex >= vertex_count()`.
    #[inline]
    pub fn edge_range(&self, vertex: VertexId) -> Range<usize> {
        assert!(self.contains_vertex(vertex), "vertex {vertex} out of bounds");
        self.offsets[vertex] as usize..self.offsets[vertex + 1] as usize
    }

    /// Out-degree of `vertex`.
    ///
    /// # Panics
    /// Panics if `vertex >= vertex_count()`.
    #[inline]
    pub fn out_degree(&self, vertex: VertexId) -> usize {
        self.edge_range(vertex).len()
    }

    /// Outgoing `(destination, weight)` pairs of `vertex`, in insertion order.
    ///
    /// # Panics
    /// Panics if `vertex >= vertex_count()`.
    pub fn out_edges(&self, vertex: VertexId) -> impl Iterator<Item = (VertexId, Weight)> + '_ {
        let range = self.edge_range(vertex);
        self.edges[range.clone()]
            .iter()
            .zip(&self.weights[range])
            .map(|(&to, &w)| (to as VertexId, w))
    }
}

impl TryFrom<CsrParts> for Graph {
    type Error = SsspError;

    fn try_from(parts: CsrParts) -> Result<Self> {
        Self::from_csr_parts(parts.offsets, parts.edges, parts.weights)
    }
}

impl From<Graph> for CsrParts {
    fn from(graph: Graph) -> Self {
        let mut offsets = graph.offsets;
        offsets.pop();
        Self {
            offsets,
            edges: graph.edges,
            weights: graph.weights,
        }
    }
}
