//! Compact graph layout consumed by the relaxation engine.
//!
//! Graphs are assembled with [`GraphBuilder`] and frozen into an immutable
//! [`Graph`] snapshot:
//! - `offsets`: first edge slot of each vertex
//! - `edges`: destination per edge slot
//! - `weights`: weight per edge slot, indexed like `edges`

pub mod csr;

pub use csr::{builder::GraphBuilder, builder::InsertionOrder, Graph};

/// Vertex identifier. Stored as `u32` inside a [`Graph`].
pub type VertexId = usize;

/// Edge weight.
pub type Weight = u32;

/// Path cost. [`INFINITY`] marks an unreached vertex.
pub type Cost = u32;

/// Cost of a vertex that has no path from the source.
pub const INFINITY: Cost = u32::MAX;

/// Parent slot value for the source and for unreached vertices.
pub const NO_PARENT: u32 = u32::MAX;

/// Largest vertex count a graph may hold; every id stays below [`NO_PARENT`].
pub const MAX_VERTICES: usize = NO_PARENT as usize;

/// Largest accepted sum of all edge weights.
///
/// Committed costs are lengths of simple paths, so they never exceed the
/// total weight, and a candidate is at most twice that. Keeping the total
/// under half of [`INFINITY`] means cost arithmetic can never overflow.
pub const MAX_TOTAL_WEIGHT: u64 = (INFINITY as u64 - 1) / 2;
