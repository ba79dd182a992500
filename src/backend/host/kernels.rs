//! Native implementations of the relaxation program's entry points.
//!
//! Each kernel body handles one logical worker (one vertex), exactly like
//! its OpenCL counterpart in `relaxation.cl`. Argument lists are checked
//! against the kernel signature before any worker runs.

use std::sync::Arc;

use super::words::AtomicWords;
use crate::{
    backend::{AccessMode, BackendError, KernelSource},
    graph::{INFINITY, NO_PARENT},
};

/// Packs a proposal so that ordering the word orders by cost, then parent.
#[inline(always)]
pub(crate) const fn pack(cost: u32, parent: u32) -> u64 {
    ((cost as u64) << 32) | parent as u64
}

/// Inverse of [`pack`].
#[inline(always)]
pub(crate) const fn unpack(word: u64) -> (u32, u32) {
    ((word >> 32) as u32, word as u32)
}

/// Entry points the host backends know how to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum NativeKernel {
    Initialize,
    Relax,
    Commit,
}

/// A resolved kernel argument.
pub(crate) enum Bound {
    Buffer { words: Arc<AtomicWords>, access: AccessMode },
    Scalar(u32),
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Param {
    Read,
    Write,
    Scalar,
}

impl NativeKernel {
    pub(crate) fn from_entry_point(name: &str) -> Option<Self> {
        match name {
            KernelSource::INITIALIZE => Some(Self::Initialize),
            KernelSource::RELAX => Some(Self::Relax),
            KernelSource::COMMIT => Some(Self::Commit),
            _ => None,
        }
    }

    pub(crate) fn name(self) -> &'static str {
        match self {
            Self::Initialize => KernelSource::INITIALIZE,
            Self::Relax => KernelSource::RELAX,
            Self::Commit => KernelSource::COMMIT,
        }
    }

    fn signature(self) -> &'static [Param] {
        use Param::{Read, Scalar, Write};
        match self {
            // active, cost, pending, parent, source, vertex_count
            Self::Initialize => &[Write, Write, Write, Write, Scalar, Scalar],
            // offsets, edges, weights, active, cost, pending, vertex_count
            Self::Relax => &[Read, Read, Read, Read, Read, Write, Scalar],
            // active, cost, pending, parent, vertex_count
            Self::Commit => &[Write, Write, Write, Write, Scalar],
        }
    }

    /// Checks `args` against the signature and buffer sizes.
    pub(crate) fn bind(self, args: Vec<Bound>) -> Result<BoundKernel, BackendError> {
        let signature = self.signature();
        if args.len() != signature.len() {
            return Err(self.invalid(
                args.len().min(signature.len()),
                format!("expected {} arguments, got {}", signature.len(), args.len()),
            ));
        }

        let mut buffers = Vec::with_capacity(signature.len());
        let mut scalars = Vec::with_capacity(2);
        for (index, (param, arg)) in signature.iter().zip(args).enumerate() {
            match (param, arg) {
                (Param::Scalar, Bound::Scalar(value)) => scalars.push(value),
                (Param::Scalar, Bound::Buffer { .. }) => {
                    return Err(self.invalid(index, "expected a scalar, got a buffer".into()));
                }
                (_, Bound::Scalar(_)) => {
                    return Err(self.invalid(index, "expected a buffer, got a scalar".into()));
                }
                (Param::Write, Bound::Buffer { access: AccessMode::ReadOnly, .. }) => {
                    return Err(self.invalid(index, "kernel writes to a read-only buffer".into()));
                }
                (_, Bound::Buffer { words, .. }) => buffers.push(words),
            }
        }

        let vertex_count = *scalars.last().expect("every signature ends with vertex_count") as usize;
        let mut buffers = buffers.into_iter();
        let mut next = || buffers.next().expect("buffer count matches signature");

        let bound = match self {
            Self::Initialize => BoundKernel::Initialize(Initialize {
                active: next(),
                cost: next(),
                pending: next(),
                parent: next(),
                source: scalars[0],
                vertex_count,
            }),
            Self::Relax => BoundKernel::Relax(Relax {
                offsets: next(),
                edges: next(),
                weights: next(),
                active: next(),
                cost: next(),
                pending: next(),
                vertex_count,
            }),
            Self::Commit => BoundKernel::Commit(Commit {
                active: next(),
                cost: next(),
                pending: next(),
                parent: next(),
                vertex_count,
            }),
        };
        bound.check_sizes()?;
        Ok(bound)
    }

    fn invalid(self, index: usize, reason: String) -> BackendError {
        BackendError::InvalidArgument {
            kernel: self.name(),
            index,
            reason,
        }
    }
}

pub(crate) struct Initialize {
    active: Arc<AtomicWords>,
    cost: Arc<AtomicWords>,
    pending: Arc<AtomicWords>,
    parent: Arc<AtomicWords>,
    source: u32,
    vertex_count: usize,
}

pub(crate) struct Relax {
    offsets: Arc<AtomicWords>,
    edges: Arc<AtomicWords>,
    weights: Arc<AtomicWords>,
    active: Arc<AtomicWords>,
    cost: Arc<AtomicWords>,
    pending: Arc<AtomicWords>,
    vertex_count: usize,
}

pub(crate) struct Commit {
    active: Arc<AtomicWords>,
    cost: Arc<AtomicWords>,
    pending: Arc<AtomicWords>,
    parent: Arc<AtomicWords>,
    vertex_count: usize,
}

/// A kernel with validated arguments, ready to run over its workers.
pub(crate) enum BoundKernel {
    Initialize(Initialize),
    Relax(Relax),
    Commit(Commit),
}

impl BoundKernel {
    pub(crate) fn kind(&self) -> NativeKernel {
        match self {
            Self::Initialize(_) => NativeKernel::Initialize,
            Self::Relax(_) => NativeKernel::Relax,
            Self::Commit(_) => NativeKernel::Commit,
        }
    }

    /// Runs logical worker `v`. Returns the number of edges it relaxed.
    #[inline]
    pub(crate) fn execute(&self, v: usize) -> u64 {
        match self {
            Self::Initialize(k) => {
                k.run(v);
                0
            }
            Self::Relax(k) => k.run(v),
            Self::Commit(k) => {
                k.run(v);
                0
            }
        }
    }

    fn check_sizes(&self) -> Result<(), BackendError> {
        let kind = self.kind();
        let need_u32 = |index: usize, words: &AtomicWords, len: usize| {
            if words.len_u32() < len {
                Err(kind.invalid(index, format!("buffer holds {} u32 values, need {len}", words.len_u32())))
            } else {
                Ok(())
            }
        };
        let need_u64 = |index: usize, words: &AtomicWords, len: usize| {
            if words.len_u64() < len {
                Err(kind.invalid(index, format!("buffer holds {} u64 values, need {len}", words.len_u64())))
            } else {
                Ok(())
            }
        };

        match self {
            Self::Initialize(k) => {
                let n = k.vertex_count;
                need_u32(0, &k.active, n)?;
                need_u32(1, &k.cost, n)?;
                need_u64(2, &k.pending, n)?;
                need_u32(3, &k.parent, n)
            }
            Self::Relax(k) => {
                let n = k.vertex_count;
                need_u32(0, &k.offsets, n + 1)?;
                if let Some(v) = (0..n).find(|&v| k.offsets.load_u32(v) > k.offsets.load_u32(v + 1)) {
                    return Err(kind.invalid(0, format!("offsets decrease after vertex {v}")));
                }
                let edge_count = k.offsets.load_u32(n) as usize;
                need_u32(1, &k.edges, edge_count)?;
                need_u32(2, &k.weights, edge_count)?;
                need_u32(3, &k.active, n)?;
                need_u32(4, &k.cost, n)?;
                need_u64(5, &k.pending, n)
            }
            Self::Commit(k) => {
                let n = k.vertex_count;
                need_u32(0, &k.active, n)?;
                need_u32(1, &k.cost, n)?;
                need_u64(2, &k.pending, n)?;
                need_u32(3, &k.parent, n)
            }
        }
    }
}

impl Initialize {
    #[inline]
    fn run(&self, v: usize) {
        if v >= self.vertex_count {
            return;
        }
        let is_source = v == self.source as usize;
        let cost = if is_source { 0 } else { INFINITY };
        self.active.store_u32(v, u32::from(is_source));
        self.cost.store_u32(v, cost);
        self.parent.store_u32(v, NO_PARENT);
        self.pending.store_u64(v, pack(cost, NO_PARENT));
    }
}

impl Relax {
    #[inline]
    fn run(&self, v: usize) -> u64 {
        if v >= self.vertex_count || self.active.load_u32(v) == 0 {
            return 0;
        }
        let base = self.cost.load_u32(v);
        if base == INFINITY {
            return 0;
        }

        let start = self.offsets.load_u32(v) as usize;
        let end = (self.offsets.load_u32(v + 1) as usize)
            .min(self.edges.len_u32())
            .min(self.weights.len_u32());
        let mut relaxed = 0;
        for e in start..end {
            let to = self.edges.load_u32(e) as usize;
            let candidate = u64::from(base) + u64::from(self.weights.load_u32(e));
            if to < self.vertex_count && candidate < u64::from(INFINITY) {
                // `v < vertex_count <= u32::MAX` and `candidate < INFINITY`.
                self.pending.fetch_min_u64(to, pack(candidate as u32, v as u32));
                relaxed += 1;
            }
        }
        relaxed
    }
}

impl Commit {
    #[inline]
    fn run(&self, v: usize) {
        if v >= self.vertex_count {
            return;
        }
        let (proposed, proposer) = unpack(self.pending.load_u64(v));
        let (cost, parent) = if proposed < self.cost.load_u32(v) {
            self.cost.store_u32(v, proposed);
            self.parent.store_u32(v, proposer);
            self.active.store_u32(v, 1);
            (proposed, proposer)
        } else {
            self.active.store_u32(v, 0);
            (self.cost.load_u32(v), self.parent.load_u32(v))
        };
        self.pending.store_u64(v, pack(cost, parent));
    }
}
