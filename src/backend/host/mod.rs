//! In-process reference backends.
//!
//! [`HostBackend`] implements [`ExecutionBackend`] on ordinary memory. It
//! "compiles" a program by scanning it for `__kernel void name(`
//! declarations and binding each declared name to a native implementation
//! of the same kernel. Two pools are provided:
//! - [`SequentialBackend`]: one worker after another on the calling thread
//! - `ParallelBackend` (feature `parallel`): workers spread over rayon
//!
//! Both produce identical buffers for the same dispatch sequence: the only
//! shared write is an atomic minimum, which is order-independent.

mod kernels;
mod pool;
mod words;

use core::sync::atomic::{AtomicU64, Ordering};
use std::{
    collections::HashMap,
    sync::{Arc, PoisonError, RwLock},
};

use crossbeam_utils::CachePadded;

use self::{
    kernels::{Bound, NativeKernel},
    words::AtomicWords,
};
use super::{
    AccessMode, BackendError, BufferHandle, ExecutionBackend, KernelArg, KernelHandle, KernelSource, ProgramHandle,
    Resource,
};

#[cfg(feature = "parallel")]
pub use pool::Rayon;
pub use pool::{Sequential, WorkerPool};

/// Host backend running every worker on the calling thread.
pub type SequentialBackend = HostBackend<Sequential>;

/// Host backend spreading workers over a rayon pool.
#[cfg(feature = "parallel")]
pub type ParallelBackend = HostBackend<Rayon>;

struct HostBuffer {
    access: AccessMode,
    words: Arc<AtomicWords>,
}

struct HostProgram {
    entry_points: Vec<String>,
}

#[derive(Default)]
struct Registry {
    buffers: HashMap<u64, HostBuffer>,
    programs: HashMap<u64, HostProgram>,
    kernels: HashMap<u64, NativeKernel>,
}

/// Activity counters of a [`HostBackend`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HostStats {
    /// Kernel dispatches completed.
    pub dispatches: u64,
    /// Edge relaxations performed by relax dispatches.
    pub relaxations: u64,
    /// Buffers, kernels and programs not yet released.
    pub live_resources: usize,
}

/// An [`ExecutionBackend`] over host memory, generic over how workers run.
pub struct HostBackend<P> {
    pool: P,
    registry: RwLock<Registry>,
    next_id: AtomicU64,
    dispatches: CachePadded<AtomicU64>,
    relaxations: CachePadded<AtomicU64>,
}

impl HostBackend<Sequential> {
    /// A backend that runs workers sequentially.
    pub fn sequential() -> Self {
        Self::with_pool(Sequential)
    }
}

#[cfg(feature = "parallel")]
impl HostBackend<Rayon> {
    /// A backend on rayon's global pool.
    pub fn parallel() -> Self {
        Self::with_pool(Rayon::global())
    }

    /// A backend on a dedicated pool of `threads` threads.
    ///
    /// # Errors
    /// [`BackendError::Allocation`] if the pool cannot be built.
    pub fn with_threads(threads: usize) -> Result<Self, BackendError> {
        Rayon::with_threads(threads).map(Self::with_pool)
    }
}

impl<P: WorkerPool> HostBackend<P> {
    /// A backend running workers on `pool`.
    pub fn with_pool(pool: P) -> Self {
        Self {
            pool,
            registry: RwLock::new(Registry::default()),
            next_id: AtomicU64::new(1),
            dispatches: CachePadded::new(AtomicU64::new(0)),
            relaxations: CachePadded::new(AtomicU64::new(0)),
        }
    }

    /// The worker pool.
    pub fn pool(&self) -> &P {
        &self.pool
    }

    /// Snapshot of the activity counters.
    pub fn stats(&self) -> HostStats {
        let registry = self.read();
        HostStats {
            dispatches: self.dispatches.load(Ordering::Relaxed),
            relaxations: self.relaxations.load(Ordering::Relaxed),
            live_resources: registry.buffers.len() + registry.programs.len() + registry.kernels.len(),
        }
    }

    fn fresh_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    // Registry contents stay consistent even if a worker panicked while a
    // guard was held: every mutation is a single map operation.
    fn read(&self) -> std::sync::RwLockReadGuard<'_, Registry> {
        self.registry.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Registry> {
        self.registry.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn resolve_args(&self, args: &[KernelArg]) -> Result<Vec<Bound>, BackendError> {
        let registry = self.read();
        args.iter()
            .map(|arg| match *arg {
                KernelArg::Scalar(value) => Ok(Bound::Scalar(value)),
                KernelArg::Buffer(handle) => registry
                    .buffers
                    .get(&handle.raw())
                    .map(|b| Bound::Buffer {
                        words: Arc::clone(&b.words),
                        access: b.access,
                    })
                    .ok_or(BackendError::UnknownHandle {
                        kind: "buffer",
                        id: handle.raw(),
                    }),
            })
            .collect()
    }
}

impl<P: WorkerPool> ExecutionBackend for HostBackend<P> {
    fn compile(&self, source: &KernelSource) -> Result<ProgramHandle, BackendError> {
        let declared = source.declared_entry_points();
        let mut log = Vec::new();
        if declared.is_empty() {
            log.push("error: program declares no __kernel entry points".to_owned());
        }
        for name in &declared {
            if NativeKernel::from_entry_point(name).is_none() {
                log.push(format!("error: kernel `{name}` has no host implementation"));
            }
        }
        if !log.is_empty() {
            return Err(BackendError::Compilation { log: log.join("\n") });
        }

        let id = self.fresh_id();
        let entry_points = declared.into_iter().map(str::to_owned).collect();
        self.write().programs.insert(id, HostProgram { entry_points });
        tracing::trace!(program = id, "compiled host program");
        Ok(ProgramHandle::from_raw(id))
    }

    fn create_kernel(&self, program: ProgramHandle, entry_point: &str) -> Result<KernelHandle, BackendError> {
        let kind = {
            let registry = self.read();
            let prog = registry.programs.get(&program.raw()).ok_or(BackendError::UnknownHandle {
                kind: "program",
                id: program.raw(),
            })?;
            prog.entry_points
                .iter()
                .find(|name| *name == entry_point)
                .and_then(|name| NativeKernel::from_entry_point(name))
                .ok_or_else(|| BackendError::UnknownKernel {
                    program: program.raw(),
                    name: entry_point.to_owned(),
                })?
        };
        let id = self.fresh_id();
        self.write().kernels.insert(id, kind);
        Ok(KernelHandle::from_raw(id))
    }

    fn allocate_buffer(
        &self,
        size_bytes: usize,
        access: AccessMode,
        initial: Option<&[u8]>,
    ) -> Result<BufferHandle, BackendError> {
        let words = match initial {
            Some(bytes) if bytes.len() != size_bytes => {
                return Err(BackendError::InitialDataSize {
                    expected: size_bytes,
                    actual: bytes.len(),
                });
            }
            Some(bytes) => AtomicWords::from_bytes(bytes),
            None => AtomicWords::zeroed(size_bytes),
        };
        let id = self.fresh_id();
        self.write().buffers.insert(
            id,
            HostBuffer {
                access,
                words: Arc::new(words),
            },
        );
        Ok(BufferHandle::from_raw(id))
    }

    fn dispatch(&self, kernel: KernelHandle, args: &[KernelArg], work_size: usize) -> Result<(), BackendError> {
        let kind = *self.read().kernels.get(&kernel.raw()).ok_or(BackendError::UnknownHandle {
            kind: "kernel",
            id: kernel.raw(),
        })?;
        // Buffers are held through `Arc`s, so the registry lock is not
        // held while workers run.
        let bound = kind.bind(self.resolve_args(args)?)?;

        let relaxed = self.pool.run(work_size, &|v| bound.execute(v));

        self.dispatches.fetch_add(1, Ordering::Relaxed);
        self.relaxations.fetch_add(relaxed, Ordering::Relaxed);
        tracing::trace!(kernel = kind.name(), work_size, relaxed, "dispatch complete");
        Ok(())
    }

    fn read_buffer(&self, buffer: BufferHandle, offset: usize, out: &mut [u8]) -> Result<(), BackendError> {
        let words = {
            let registry = self.read();
            let buf = registry.buffers.get(&buffer.raw()).ok_or(BackendError::UnknownHandle {
                kind: "buffer",
                id: buffer.raw(),
            })?;
            Arc::clone(&buf.words)
        };
        let in_range = offset
            .checked_add(out.len())
            .is_some_and(|end| end <= words.len_bytes());
        if !in_range {
            return Err(BackendError::OutOfRange {
                id: buffer.raw(),
                offset,
                len: out.len(),
                size: words.len_bytes(),
            });
        }
        words.read_bytes(offset, out);
        Ok(())
    }

    fn release(&self, resource: Resource) {
        let mut registry = self.write();
        match resource {
            Resource::Buffer(h) => {
                registry.buffers.remove(&h.raw());
            }
            Resource::Kernel(h) => {
                registry.kernels.remove(&h.raw());
            }
            Resource::Program(h) => {
                registry.programs.remove(&h.raw());
            }
        }
    }
}

impl Default for HostBackend<Sequential> {
    fn default() -> Self {
        Self::sequential()
    }
}

impl<P: core::fmt::Debug> core::fmt::Debug for HostBackend<P> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("HostBackend")
            .field("pool", &self.pool)
            .field("dispatches", &self.dispatches.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests;
