//! The parallel execution capability the engine drives.
//!
//! A backend compiles a kernel program, owns device buffers and runs a
//! kernel over `work_size` logical workers. The engine never assumes more
//! than this trait: a GPU binding and the in-process [`host`] backends are
//! interchangeable.
//!
//! Important:
//! - [`ExecutionBackend::dispatch`] is a phase barrier. When it returns, every
//!   worker has finished and its writes are visible to the next dispatch and
//!   to [`ExecutionBackend::read_buffer`].
//! - [`ExecutionBackend::release`] must be idempotent. Use [`ResourceScope`]
//!   to tie resources to a lexical scope.

pub mod host;
mod program;
mod scope;

use std::sync::Arc;

pub use program::KernelSource;
pub use scope::ResourceScope;

macro_rules! handle {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(u64);

        impl $name {
            /// Wraps a backend-specific raw id.
            #[inline]
            pub const fn from_raw(raw: u64) -> Self {
                Self(raw)
            }

            /// The backend-specific raw id.
            #[inline]
            pub const fn raw(self) -> u64 {
                self.0
            }
        }
    };
}

handle!(
    /// Opaque id of a device buffer.
    BufferHandle
);
handle!(
    /// Opaque id of a compiled program.
    ProgramHandle
);
handle!(
    /// Opaque id of a kernel entry point inside a program.
    KernelHandle
);

/// Access a kernel has to a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessMode {
    /// Kernels may only read the buffer.
    ReadOnly,
    /// Kernels may read and write the buffer.
    ReadWrite,
}

/// One positional kernel argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KernelArg {
    /// A device buffer.
    Buffer(BufferHandle),
    /// A 32-bit unsigned scalar.
    Scalar(u32),
}

/// Anything a backend allocates and the caller must release.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    /// A device buffer.
    Buffer(BufferHandle),
    /// A kernel object.
    Kernel(KernelHandle),
    /// A compiled program.
    Program(ProgramHandle),
}

impl From<BufferHandle> for Resource {
    fn from(handle: BufferHandle) -> Self {
        Self::Buffer(handle)
    }
}

impl From<KernelHandle> for Resource {
    fn from(handle: KernelHandle) -> Self {
        Self::Kernel(handle)
    }
}

impl From<ProgramHandle> for Resource {
    fn from(handle: ProgramHandle) -> Self {
        Self::Program(handle)
    }
}

/// Failures reported by an execution backend.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// The program did not build.
    #[error("kernel compilation failed:\n{log}")]
    Compilation {
        /// Build log with one diagnostic per line.
        log: String,
    },

    /// The program does not declare the requested entry point.
    #[error("program {program} declares no kernel named `{name}`")]
    UnknownKernel {
        /// Raw program id.
        program: u64,
        /// Requested entry point.
        name: String,
    },

    /// A handle that was never issued or was already released.
    #[error("unknown {kind} handle {id}")]
    UnknownHandle {
        /// Resource kind (`"buffer"`, `"kernel"`, `"program"`).
        kind: &'static str,
        /// Raw id.
        id: u64,
    },

    /// Initial contents differ in size from the requested buffer.
    #[error("initial data of {actual} bytes does not match buffer size {expected}")]
    InitialDataSize {
        /// Requested buffer size in bytes.
        expected: usize,
        /// Size of the supplied data.
        actual: usize,
    },

    /// A readback outside the buffer.
    #[error("read of {len} bytes at offset {offset} exceeds buffer {id} of {size} bytes")]
    OutOfRange {
        /// Raw buffer id.
        id: u64,
        /// Requested byte offset.
        offset: usize,
        /// Requested length.
        len: usize,
        /// Buffer size.
        size: usize,
    },

    /// Arguments that do not fit the kernel's signature.
    #[error("kernel `{kernel}` argument {index}: {reason}")]
    InvalidArgument {
        /// Kernel entry point.
        kernel: &'static str,
        /// Position of the offending argument.
        index: usize,
        /// What is wrong with it.
        reason: String,
    },

    /// The backend could not provide a resource.
    #[error("resource allocation failed: {0}")]
    Allocation(String),

    /// Opaque failure from a device driver or foreign binding.
    #[error(transparent)]
    Device(#[from] anyhow::Error),
}

/// A parallel execution backend.
///
/// Implementations must be usable through a shared reference: the engine
/// borrows the backend for the duration of a run, and several runs may
/// share one backend from different threads if it is `Sync`.
pub trait ExecutionBackend {
    /// Builds a program from source.
    ///
    /// # Errors
    /// [`BackendError::Compilation`] with the build log.
    fn compile(&self, source: &KernelSource) -> Result<ProgramHandle, BackendError>;

    /// Creates a kernel object for one entry point of `program`.
    ///
    /// # Errors
    /// [`BackendError::UnknownKernel`] or [`BackendError::UnknownHandle`].
    fn create_kernel(&self, program: ProgramHandle, entry_point: &str) -> Result<KernelHandle, BackendError>;

    /// Allocates a buffer of `size_bytes`, optionally initialized from `initial`.
    ///
    /// # Errors
    /// [`BackendError::InitialDataSize`] or [`BackendError::Allocation`].
    fn allocate_buffer(
        &self,
        size_bytes: usize,
        access: AccessMode,
        initial: Option<&[u8]>,
    ) -> Result<BufferHandle, BackendError>;

    /// Runs `kernel` over `work_size` logical workers and waits for all of them.
    ///
    /// # Errors
    /// Any argument, handle or device failure.
    fn dispatch(&self, kernel: KernelHandle, args: &[KernelArg], work_size: usize) -> Result<(), BackendError>;

    /// Copies `out.len()` bytes starting at `offset` out of `buffer`. Blocks.
    ///
    /// # Errors
    /// [`BackendError::OutOfRange`] or [`BackendError::UnknownHandle`].
    fn read_buffer(&self, buffer: BufferHandle, offset: usize, out: &mut [u8]) -> Result<(), BackendError>;

    /// Releases a resource. Releasing twice, or releasing an unknown handle,
    /// is a no-op.
    fn release(&self, resource: Resource);
}

impl<B: ExecutionBackend + ?Sized> ExecutionBackend for &B {
    fn compile(&self, source: &KernelSource) -> Result<ProgramHandle, BackendError> {
        (**self).compile(source)
    }

    fn create_kernel(&self, program: ProgramHandle, entry_point: &str) -> Result<KernelHandle, BackendError> {
        (**self).create_kernel(program, entry_point)
    }

    fn allocate_buffer(
        &self,
        size_bytes: usize,
        access: AccessMode,
        initial: Option<&[u8]>,
    ) -> Result<BufferHandle, BackendError> {
        (**self).allocate_buffer(size_bytes, access, initial)
    }

    fn dispatch(&self, kernel: KernelHandle, args: &[KernelArg], work_size: usize) -> Result<(), BackendError> {
        (**self).dispatch(kernel, args, work_size)
    }

    fn read_buffer(&self, buffer: BufferHandle, offset: usize, out: &mut [u8]) -> Result<(), BackendError> {
        (**self).read_buffer(buffer, offset, out)
    }

    fn release(&self, resource: Resource) {
        (**self).release(resource);
    }
}

impl<B: ExecutionBackend + ?Sized> ExecutionBackend for Arc<B> {
    fn compile(&self, source: &KernelSource) -> Result<ProgramHandle, BackendError> {
        (**self).compile(source)
    }

    fn create_kernel(&self, program: ProgramHandle, entry_point: &str) -> Result<KernelHandle, BackendError> {
        (**self).create_kernel(program, entry_point)
    }

    fn allocate_buffer(
        &self,
        size_bytes: usize,
        access: AccessMode,
        initial: Option<&[u8]>,
    ) -> Result<BufferHandle, BackendError> {
        (**self).allocate_buffer(size_bytes, access, initial)
    }

    fn dispatch(&self, kernel: KernelHandle, args: &[KernelArg], work_size: usize) -> Result<(), BackendError> {
        (**self).dispatch(kernel, args, work_size)
    }

    fn read_buffer(&self, buffer: BufferHandle, offset: usize, out: &mut [u8]) -> Result<(), BackendError> {
        (**self).read_buffer(buffer, offset, out)
    }

    fn release(&self, resource: Resource) {
        (**self).release(resource);
    }
}
