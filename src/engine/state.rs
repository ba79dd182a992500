//! Device-side buffers of one run.

use zerocopy::AsBytes;

use crate::{
    backend::{AccessMode, BufferHandle, ExecutionBackend, KernelArg, KernelHandle, KernelSource, ResourceScope},
    error::{Result, SsspError},
    graph::Graph,
};

/// The three entry points of the relaxation program.
pub(crate) struct Kernels {
    pub(crate) initialize: KernelHandle,
    pub(crate) relax: KernelHandle,
    pub(crate) commit: KernelHandle,
}

impl Kernels {
    const ENTRY_POINTS: [&'static str; 3] = [KernelSource::INITIALIZE, KernelSource::RELAX, KernelSource::COMMIT];

    /// Compiles `source` and creates every kernel the engine dispatches.
    ///
    /// A program that does not declare all three entry points is rejected
    /// before it reaches the backend.
    pub(crate) fn build<B>(scope: &mut ResourceScope<'_, B>, source: &KernelSource) -> Result<Self>
    where
        B: ExecutionBackend + ?Sized,
    {
        let declared = source.declared_entry_points();
        let missing: Vec<String> = Self::ENTRY_POINTS
            .iter()
            .filter(|name| !declared.contains(*name))
            .map(|name| format!("error: program does not declare kernel `{name}`"))
            .collect();
        if !missing.is_empty() {
            return Err(SsspError::Compilation { log: missing.join("\n") });
        }

        let program = scope.compile(source)?;
        Ok(Self {
            initialize: scope.create_kernel(program, KernelSource::INITIALIZE)?,
            relax: scope.create_kernel(program, KernelSource::RELAX)?,
            commit: scope.create_kernel(program, KernelSource::COMMIT)?,
        })
    }
}

/// Read-only copy of a [`Graph`] on the device.
pub(crate) struct DeviceGraph {
    offsets: BufferHandle,
    edges: BufferHandle,
    weights: BufferHandle,
}

impl DeviceGraph {
    pub(crate) fn upload<B>(scope: &mut ResourceScope<'_, B>, graph: &Graph) -> Result<Self>
    where
        B: ExecutionBackend + ?Sized,
    {
        let offsets = scope.upload(graph.csr_offsets(), AccessMode::ReadOnly)?;
        let edges = scope.upload(graph.edges(), AccessMode::ReadOnly)?;
        let weights = scope.upload(graph.weights(), AccessMode::ReadOnly)?;
        tracing::debug!(
            bytes = graph.csr_offsets().as_bytes().len() + graph.edges().as_bytes().len() + graph.weights().as_bytes().len(),
            "uploaded graph"
        );
        Ok(Self {
            offsets,
            edges,
            weights,
        })
    }
}

/// Per-vertex working buffers, one entry per vertex each.
pub(crate) struct WorkingState {
    pub(crate) active: BufferHandle,
    pub(crate) cost: BufferHandle,
    pub(crate) pending: BufferHandle,
    pub(crate) parent: BufferHandle,
}

impl WorkingState {
    pub(crate) fn allocate<B>(scope: &mut ResourceScope<'_, B>, vertex_count: usize) -> Result<Self>
    where
        B: ExecutionBackend + ?Sized,
    {
        Ok(Self {
            active: scope.allocate_for::<u32>(vertex_count, AccessMode::ReadWrite)?,
            cost: scope.allocate_for::<u32>(vertex_count, AccessMode::ReadWrite)?,
            pending: scope.allocate_for::<u64>(vertex_count, AccessMode::ReadWrite)?,
            parent: scope.allocate_for::<u32>(vertex_count, AccessMode::ReadWrite)?,
        })
    }

    pub(crate) fn initialize_args(&self, source: u32, vertex_count: u32) -> [KernelArg; 6] {
        [
            KernelArg::Buffer(self.active),
            KernelArg::Buffer(self.cost),
            KernelArg::Buffer(self.pending),
            KernelArg::Buffer(self.parent),
            KernelArg::Scalar(source),
            KernelArg::Scalar(vertex_count),
        ]
    }

    pub(crate) fn relax_args(&self, graph: &DeviceGraph, vertex_count: u32) -> [KernelArg; 7] {
        [
            KernelArg::Buffer(graph.offsets),
            KernelArg::Buffer(graph.edges),
            KernelArg::Buffer(graph.weights),
            KernelArg::Buffer(self.active),
            KernelArg::Buffer(self.cost),
            KernelArg::Buffer(self.pending),
            KernelArg::Scalar(vertex_count),
        ]
    }

    pub(crate) fn commit_args(&self, vertex_count: u32) -> [KernelArg; 5] {
        [
            KernelArg::Buffer(self.active),
            KernelArg::Buffer(self.cost),
            KernelArg::Buffer(self.pending),
            KernelArg::Buffer(self.parent),
            KernelArg::Scalar(vertex_count),
        ]
    }
}

/// Blocking readback of `len` `u32` values.
pub(crate) fn read_u32s<B>(backend: &B, buffer: BufferHandle, len: usize) -> Result<Vec<u32>>
where
    B: ExecutionBackend + ?Sized,
{
    let mut out = vec![0u32; len];
    backend.read_buffer(buffer, 0, out.as_bytes_mut())?;
    Ok(out)
}
