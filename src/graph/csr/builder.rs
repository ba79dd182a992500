//! Incremental CSR construction from edge insertions.

use serde::{Deserialize, Serialize};

use crate::{
    error::{Result, SsspError},
    graph::{csr::Graph, VertexId, Weight, MAX_TOTAL_WEIGHT, MAX_VERTICES},
};

/// How the builder treats edges whose source is lower than the previous one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum InsertionOrder {
    /// Sources must be non-decreasing; a violation fails with
    /// [`SsspError::OutOfOrderInsertion`].
    #[default]
    Strict,
    /// Any order is accepted; edges are regrouped by source (stably) at
    /// [`GraphBuilder::build`].
    Regroup,
}

/// Accumulates weighted edges into a CSR layout.
///
/// In [`InsertionOrder::Strict`] mode `offsets[from]` is written the first
/// time a new source appears, so edges of one vertex must arrive as one
/// contiguous run. Vertices that never receive an edge can be pinned with
/// [`register_vertex`](Self::register_vertex); [`build`](Self::build) gives
/// any vertex left unpinned an empty edge range.
///
/// ```rust
/// use relax_sssp::GraphBuilder;
///
/// let mut builder = GraphBuilder::new(3);
/// builder.add_edge(0, 1, 4)?;
/// builder.add_edge(0, 2, 1)?;
/// builder.add_edge(1, 2, 2)?;
/// builder.register_vertex(2)?;
///
/// let graph = builder.build();
/// assert_eq!(graph.offsets(), &[0, 2, 3]);
/// assert_eq!(graph.edges(), &[1, 2, 2]);
/// # Ok::<(), relax_sssp::SsspError>(())
/// ```
#[derive(Debug, Clone)]
pub struct GraphBuilder {
    order: InsertionOrder,
    offsets: Vec<u32>,
    pinned: Vec<bool>,
    edges: Vec<u32>,
    weights: Vec<Weight>,
    // Per-edge source, only recorded in `Regroup` mode.
    sources: Vec<u32>,
    last_source: Option<VertexId>,
    total_weight: u64,
}

impl GraphBuilder {
    /// Creates an empty builder for `vertex_count` vertices.
    ///
    /// # Panics
    /// Panics if `vertex_count` exceeds [`MAX_VERTICES`].
    pub fn new(vertex_count: usize) -> Self {
        Self::with_edge_capacity(vertex_count, 0)
    }

    /// Creates an empty builder with room for `edge_capacity` edges.
    ///
    /// # Panics
    /// Panics if `vertex_count` exceeds [`MAX_VERTICES`].
    pub fn with_edge_capacity(vertex_count: usize, edge_capacity: usize) -> Self {
        assert!(
            vertex_count <= MAX_VERTICES,
            "vertex count {vertex_count} exceeds the limit of {MAX_VERTICES}"
        );
        Self {
            order: InsertionOrder::Strict,
            offsets: vec![0; vertex_count],
            pinned: vec![false; vertex_count],
            edges: Vec::with_capacity(edge_capacity),
            weights: Vec::with_capacity(edge_capacity),
            sources: Vec::new(),
            last_source: None,
            total_weight: 0,
        }
    }

    /// Sets the insertion policy.
    ///
    /// # Panics
    /// Panics if edges were already added; the policy decides how they are
    /// recorded.
    #[must_use]
    pub fn insertion_order(mut self, order: InsertionOrder) -> Self {
        assert!(self.edges.is_empty(), "insertion order must be chosen before adding edges");
        self.order = order;
        self
    }

    /// Number of vertices.
    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.offsets.len()
    }

    /// Number of edges added so far.
    #[inline]
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Appends the edge `from -> to` with the given weight.
    ///
    /// # Errors
    /// - [`SsspError::InvalidVertexId`] if `from` or `to` is out of range
    /// - [`SsspError::InvalidWeight`] if `weight` is negative or above `u32::MAX`
    /// - [`SsspError::OutOfOrderInsertion`] in strict mode when `from` is lower
    ///   than the previous source
    /// - [`SsspError::WeightBudgetExceeded`] if the total weight would pass
    ///   [`MAX_TOTAL_WEIGHT`]
    ///
    /// A failed call leaves the builder unchanged.
    ///
    /// # Panics
    /// Panics if the edge count would no longer fit in a `u32` slot index.
    pub fn add_edge(&mut self, from: VertexId, to: VertexId, weight: i64) -> Result<()> {
        self.check_vertex(from)?;
        self.check_vertex(to)?;
        let weight = Weight::try_from(weight).map_err(|_| SsspError::InvalidWeight { weight })?;
        let total = self.total_weight + u64::from(weight);
        if total > MAX_TOTAL_WEIGHT {
            return Err(SsspError::WeightBudgetExceeded {
                total,
                limit: MAX_TOTAL_WEIGHT,
            });
        }
        assert!(self.edges.len() < u32::MAX as usize, "edge slots exhausted");

        match self.order {
            InsertionOrder::Strict => {
                if self.last_source != Some(from) {
                    self.check_order(from)?;
                    self.pin(from);
                }
            }
            InsertionOrder::Regroup => self.sources.push(from as u32),
        }

        self.edges.push(to as u32);
        self.weights.push(weight);
        self.total_weight = total;
        Ok(())
    }

    /// Pins `vertex` to the current edge count.
    ///
    /// Used for vertices without outgoing edges. Registering the vertex that
    /// is currently receiving edges is a no-op. In [`InsertionOrder::Regroup`]
    /// mode offsets are derived at build time, so this only validates the id.
    ///
    /// # Errors
    /// [`SsspError::InvalidVertexId`] if `vertex` is out of range, and in
    /// strict mode [`SsspError::OutOfOrderInsertion`] if a higher vertex was
    /// already seen.
    pub fn register_vertex(&mut self, vertex: VertexId) -> Result<()> {
        self.check_vertex(vertex)?;
        if self.order == InsertionOrder::Regroup || self.last_source == Some(vertex) {
            return Ok(());
        }
        self.check_order(vertex)?;
        self.pin(vertex);
        Ok(())
    }

    /// Freezes the current contents into an immutable [`Graph`].
    ///
    /// The builder stays usable; later insertions do not affect the
    /// returned snapshot.
    pub fn build(&self) -> Graph {
        let offsets = match self.order {
            InsertionOrder::Strict => self.settled_offsets(),
            InsertionOrder::Regroup => return self.build_regrouped(),
        };
        Graph::from_validated(offsets, self.edges.clone(), self.weights.clone(), self.total_weight)
    }

    fn check_vertex(&self, vertex: VertexId) -> Result<()> {
        if vertex < self.vertex_count() {
            Ok(())
        } else {
            Err(SsspError::InvalidVertexId {
                vertex,
                vertex_count: self.vertex_count(),
            })
        }
    }

    fn check_order(&self, vertex: VertexId) -> Result<()> {
        match self.last_source {
            Some(last) if vertex < last => Err(SsspError::OutOfOrderInsertion { vertex, last }),
            _ => Ok(()),
        }
    }

    fn pin(&mut self, vertex: VertexId) {
        self.offsets[vertex] = self.edges.len() as u32;
        self.pinned[vertex] = true;
        self.last_source = Some(vertex);
    }

    /// Offsets with the trailing sentinel, every unpinned vertex moved to
    /// the offset of the next pinned one so that its range is empty.
    fn settled_offsets(&self) -> Vec<u32> {
        let edge_count = self.edges.len() as u32;
        let mut offsets = Vec::with_capacity(self.offsets.len() + 1);
        offsets.extend_from_slice(&self.offsets);
        offsets.push(edge_count);

        let mut next = edge_count;
        for v in (0..self.offsets.len()).rev() {
            if self.pinned[v] {
                next = offsets[v];
            } else {
                offsets[v] = next;
            }
        }
        offsets
    }

    /// Stable counting sort of the recorded edges by source.
    fn build_regrouped(&self) -> Graph {
        let n = self.vertex_count();
        let mut offsets = vec![0u32; n + 1];
        for &s in &self.sources {
            offsets[s as usize + 1] += 1;
        }
        for v in 0..n {
            offsets[v + 1] += offsets[v];
        }

        let mut cursor: Vec<u32> = offsets[..n].to_vec();
        let mut edges = vec![0u32; self.edges.len()];
        let mut weights = vec![0 as Weight; self.weights.len()];
        for (i, &s) in self.sources.iter().enumerate() {
            let slot = cursor[s as usize] as usize;
            cursor[s as usize] += 1;
            edges[slot] = self.edges[i];
            weights[slot] = self.weights[i];
        }

        Graph::from_validated(offsets, edges, weights, self.total_weight)
    }
}
