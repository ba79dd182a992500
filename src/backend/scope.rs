//! Scoped ownership of backend resources.

use zerocopy::AsBytes;

use super::{
    AccessMode, BackendError, BufferHandle, ExecutionBackend, KernelHandle, KernelSource, ProgramHandle,
    Resource,
};

/// Records every resource acquired through it and releases all of them, in
/// reverse acquisition order, when dropped.
///
/// Because release happens in `Drop`, an early `?` return, a convergence
/// failure and a successful run all leave the backend clean.
pub struct ResourceScope<'b, B: ExecutionBackend + ?Sized> {
    backend: &'b B,
    held: Vec<Resource>,
}

impl<'b, B: ExecutionBackend + ?Sized> ResourceScope<'b, B> {
    /// Opens an empty scope over `backend`.
    pub fn new(backend: &'b B) -> Self {
        Self {
            backend,
            held: Vec::new(),
        }
    }

    /// The backend this scope allocates from.
    #[inline]
    pub fn backend(&self) -> &'b B {
        self.backend
    }

    /// Number of resources currently held.
    #[inline]
    pub fn held(&self) -> usize {
        self.held.len()
    }

    /// Compiles `source` and takes ownership of the program.
    ///
    /// # Errors
    /// Propagates the backend's compilation failure.
    pub fn compile(&mut self, source: &KernelSource) -> Result<ProgramHandle, BackendError> {
        let program = self.backend.compile(source)?;
        self.held.push(program.into());
        Ok(program)
    }

    /// Creates a kernel and takes ownership of it.
    ///
    /// # Errors
    /// Propagates the backend's failure.
    pub fn create_kernel(&mut self, program: ProgramHandle, entry_point: &str) -> Result<KernelHandle, BackendError> {
        let kernel = self.backend.create_kernel(program, entry_point)?;
        self.held.push(kernel.into());
        Ok(kernel)
    }

    /// Uploads `data` into a new buffer.
    ///
    /// # Errors
    /// Propagates the backend's allocation failure.
    pub fn upload<T: AsBytes>(&mut self, data: &[T], access: AccessMode) -> Result<BufferHandle, BackendError> {
        let bytes = data.as_bytes();
        self.allocate(bytes.len(), access, Some(bytes))
    }

    /// Allocates an uninitialized buffer for `len` values of `T`.
    ///
    /// # Errors
    /// Propagates the backend's allocation failure.
    pub fn allocate_for<T>(&mut self, len: usize, access: AccessMode) -> Result<BufferHandle, BackendError> {
        let size = len
            .checked_mul(core::mem::size_of::<T>())
            .ok_or_else(|| BackendError::Allocation(format!("{len} elements overflow the address space")))?;
        self.allocate(size, access, None)
    }

    fn allocate(
        &mut self,
        size_bytes: usize,
        access: AccessMode,
        initial: Option<&[u8]>,
    ) -> Result<BufferHandle, BackendError> {
        let buffer = self.backend.allocate_buffer(size_bytes, access, initial)?;
        self.held.push(buffer.into());
        Ok(buffer)
    }

    /// Releases everything held so far. The scope stays usable.
    pub fn release_all(&mut self) {
        while let Some(resource) = self.held.pop() {
            self.backend.release(resource);
        }
    }
}

impl<B: ExecutionBackend + ?Sized> Drop for ResourceScope<'_, B> {
    fn drop(&mut self) {
        self.release_all();
    }
}
