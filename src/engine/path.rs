//! Converged results and path reconstruction.

use crate::{
    error::{Result, SsspError},
    graph::{Cost, VertexId, INFINITY, NO_PARENT},
};

/// Costs and predecessors of every vertex after a converged run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShortestPathTree {
    source: VertexId,
    costs: Vec<Cost>,
    parents: Vec<u32>,
}

/// Cost and vertex sequence of one shortest path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    /// Total weight of the path.
    pub cost: Cost,
    /// Vertices from the source to the target, both included.
    pub path: Vec<VertexId>,
}

impl ShortestPathTree {
    pub(crate) fn new(source: VertexId, costs: Vec<Cost>, parents: Vec<u32>) -> Self {
        debug_assert_eq!(costs.len(), parents.len());
        Self {
            source,
            costs,
            parents,
        }
    }

    /// The vertex every path starts from.
    #[inline]
    pub fn source(&self) -> VertexId {
        self.source
    }

    /// Number of vertices covered.
    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.costs.len()
    }

    /// Raw cost array; unreached vertices hold [`INFINITY`].
    #[inline]
    pub fn costs(&self) -> &[Cost] {
        &self.costs
    }

    /// Shortest distance to `vertex`, or `None` if it is unreachable or
    /// out of range.
    pub fn cost(&self, vertex: VertexId) -> Option<Cost> {
        self.costs.get(vertex).copied().filter(|&c| c != INFINITY)
    }

    /// Predecessor of `vertex` on its shortest path. `None` for the source,
    /// unreached vertices and ids out of range.
    pub fn parent(&self, vertex: VertexId) -> Option<VertexId> {
        self.parents
            .get(vertex)
            .copied()
            .filter(|&p| p != NO_PARENT)
            .map(|p| p as VertexId)
    }

    /// Returns `true` if a path from the source reaches `vertex`.
    #[inline]
    pub fn is_reachable(&self, vertex: VertexId) -> bool {
        self.cost(vertex).is_some()
    }

    /// Vertices on the shortest path to `target`, source first.
    ///
    /// # Errors
    /// - [`SsspError::InvalidVertexId`] if `target` is out of range
    /// - [`SsspError::UnreachableTarget`] if no path exists
    /// - [`SsspError::BrokenParentChain`] if the predecessors do not lead back
    ///   to the source within `vertex_count` steps
    pub fn path_to(&self, target: VertexId) -> Result<Vec<VertexId>> {
        let n = self.vertex_count();
        if target >= n {
            return Err(SsspError::InvalidVertexId {
                vertex: target,
                vertex_count: n,
            });
        }
        if self.costs[target] == INFINITY {
            return Err(SsspError::UnreachableTarget {
                origin: self.source,
                target,
            });
        }

        let mut path = vec![target];
        let mut current = target;
        let mut steps = 0;
        while current != self.source {
            let parent = self.parents[current] as usize;
            if steps == n || parent >= n {
                return Err(SsspError::BrokenParentChain { target, steps });
            }
            current = parent;
            path.push(current);
            steps += 1;
        }
        path.reverse();
        Ok(path)
    }

    /// Cost and path to `target`.
    ///
    /// # Errors
    /// Same as [`ShortestPathTree::path_to`].
    pub fn route_to(&self, target: VertexId) -> Result<Route> {
        let path = self.path_to(target)?;
        Ok(Route {
            cost: self.costs[target],
            path,
        })
    }
}
