//! Worker pools that map a kernel body over its logical workers.

/// Runs `body` once for every worker id in `0..work_size` and returns the sum
/// of the per-worker counts. Returning is the phase barrier.
pub trait WorkerPool: Send + Sync {
    /// Executes all workers and waits for them.
    fn run(&self, work_size: usize, body: &(dyn Fn(usize) -> u64 + Sync)) -> u64;
}

/// Runs workers one after another on the calling thread.
///
/// Produces the same buffers as any parallel pool, which makes it the
/// reference for deterministic tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sequential;

impl WorkerPool for Sequential {
    fn run(&self, work_size: usize, body: &(dyn Fn(usize) -> u64 + Sync)) -> u64 {
        (0..work_size).map(body).sum()
    }
}

#[cfg(feature = "parallel")]
pub use self::rayon_pool::Rayon;

#[cfg(feature = "parallel")]
mod rayon_pool {
    use std::sync::Arc;

    use rayon::prelude::*;

    use super::WorkerPool;
    use crate::backend::BackendError;

    /// Spreads workers over a rayon thread pool.
    #[derive(Clone, Default)]
    pub struct Rayon {
        pool: Option<Arc<rayon::ThreadPool>>,
    }

    impl Rayon {
        /// Uses rayon's global pool.
        pub fn global() -> Self {
            Self { pool: None }
        }

        /// Uses a dedicated pool of `threads` threads.
        ///
        /// # Errors
        /// [`BackendError::Allocation`] if the pool cannot be built.
        pub fn with_threads(threads: usize) -> Result<Self, BackendError> {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(threads)
                .thread_name(|i| format!("sssp-worker-{i}"))
                .build()
                .map_err(|e| BackendError::Allocation(e.to_string()))?;
            Ok(Self {
                pool: Some(Arc::new(pool)),
            })
        }

        /// Number of threads workers are spread over.
        pub fn threads(&self) -> usize {
            self.pool
                .as_ref()
                .map_or_else(rayon::current_num_threads, |p| p.current_num_threads())
        }
    }

    impl WorkerPool for Rayon {
        fn run(&self, work_size: usize, body: &(dyn Fn(usize) -> u64 + Sync)) -> u64 {
            let job = || (0..work_size).into_par_iter().map(body).sum::<u64>();
            match &self.pool {
                Some(pool) => pool.install(job),
                None => job(),
            }
        }
    }

    impl core::fmt::Debug for Rayon {
        fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
            f.debug_struct("Rayon").field("threads", &self.threads()).finish()
        }
    }
}
