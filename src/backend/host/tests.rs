//! Tests for the host backends.

use zerocopy::AsBytes;

use super::kernels::{pack, unpack};
use super::words::AtomicWords;
use super::*;
use crate::graph::{INFINITY, NO_PARENT};

fn relaxation_kernels(backend: &SequentialBackend) -> (ProgramHandle, [KernelHandle; 3]) {
    let program = backend.compile(&KernelSource::relaxation()).unwrap();
    let kernels = [KernelSource::INITIALIZE, KernelSource::RELAX, KernelSource::COMMIT]
        .map(|name| backend.create_kernel(program, name).unwrap());
    (program, kernels)
}

fn read_u32s(backend: &SequentialBackend, buffer: BufferHandle, len: usize) -> Vec<u32> {
    let mut out = vec![0u32; len];
    backend.read_buffer(buffer, 0, out.as_bytes_mut()).unwrap();
    out
}

#[test]
fn test_u32_lanes_share_words_without_clobbering() {
    let words = AtomicWords::from_bytes([7u32, 8, 9].as_bytes());
    assert_eq!(words.len_bytes(), 12);
    assert_eq!(words.len_u32(), 3);
    assert_eq!(words.len_u64(), 1);

    words.store_u32(1, 42);
    assert_eq!(words.load_u32(0), 7);
    assert_eq!(words.load_u32(1), 42);
    assert_eq!(words.load_u32(2), 9);

    let mut bytes = [0u8; 8];
    words.read_bytes(4, &mut bytes);
    assert_eq!(bytes, [42u32, 9].as_bytes());
}

#[test]
fn test_fetch_min_orders_by_cost_then_parent() {
    let words = AtomicWords::zeroed(8);
    words.store_u64(0, pack(INFINITY, NO_PARENT));
    words.fetch_min_u64(0, pack(10, 3));
    words.fetch_min_u64(0, pack(10, 1));
    words.fetch_min_u64(0, pack(12, 0));
    assert_eq!(unpack(words.load_u64(0)), (10, 1));
}

#[test]
fn test_compile_rejects_unknown_entry_points() {
    let backend = SequentialBackend::sequential();
    let src = KernelSource::new("__kernel void sssp_relax(uint n) {}\n__kernel void bogus(uint n) {}");
    match backend.compile(&src) {
        Err(BackendError::Compilation { log }) => assert!(log.contains("`bogus`"), "log: {log}"),
        other => panic!("expected compilation failure, got {other:?}"),
    }

    let err = backend.compile(&KernelSource::new("int main() {}")).unwrap_err();
    assert!(matches!(err, BackendError::Compilation { .. }));
    assert_eq!(backend.stats().live_resources, 0);
}

#[test]
fn test_create_kernel_requires_declaration() {
    let backend = SequentialBackend::sequential();
    let program = backend
        .compile(&KernelSource::new("__kernel void sssp_commit(uint n) {}"))
        .unwrap();
    assert!(backend.create_kernel(program, KernelSource::COMMIT).is_ok());
    assert!(matches!(
        backend.create_kernel(program, KernelSource::RELAX),
        Err(BackendError::UnknownKernel { .. })
    ));
}

#[test]
fn test_release_is_idempotent() {
    let backend = SequentialBackend::sequential();
    let (program, kernels) = relaxation_kernels(&backend);
    let buffer = backend.allocate_buffer(16, AccessMode::ReadWrite, None).unwrap();
    assert_eq!(backend.stats().live_resources, 5);

    backend.release(buffer.into());
    backend.release(buffer.into());
    for k in kernels {
        backend.release(k.into());
    }
    backend.release(program.into());
    backend.release(program.into());
    assert_eq!(backend.stats().live_resources, 0);

    let mut out = [0u8; 4];
    assert!(matches!(
        backend.read_buffer(buffer, 0, &mut out),
        Err(BackendError::UnknownHandle { kind: "buffer", .. })
    ));
}

#[test]
fn test_allocation_and_readback_bounds() {
    let backend = SequentialBackend::sequential();
    assert!(matches!(
        backend.allocate_buffer(8, AccessMode::ReadOnly, Some(&[1u8, 2, 3][..])),
        Err(BackendError::InitialDataSize { expected: 8, actual: 3 })
    ));

    let buffer = backend
        .allocate_buffer(12, AccessMode::ReadOnly, Some([1u32, 2, 3].as_bytes()))
        .unwrap();
    assert_eq!(read_u32s(&backend, buffer, 3), vec![1, 2, 3]);

    let mut out = [0u8; 8];
    assert!(matches!(
        backend.read_buffer(buffer, 8, &mut out),
        Err(BackendError::OutOfRange { size: 12, .. })
    ));
}

#[test]
fn test_dispatch_validates_arguments() {
    let backend = SequentialBackend::sequential();
    let (_, [initialize, _, commit]) = relaxation_kernels(&backend);
    let rw = |bytes: usize| backend.allocate_buffer(bytes, AccessMode::ReadWrite, None).unwrap();
    let (active, cost, pending, parent) = (rw(8), rw(8), rw(16), rw(8));

    // Too few arguments.
    let err = backend
        .dispatch(commit, &[KernelArg::Buffer(active), KernelArg::Scalar(2)], 2)
        .unwrap_err();
    assert!(matches!(err, BackendError::InvalidArgument { kernel: "sssp_commit", .. }));

    // Read-only buffer in a written slot.
    let ro = backend.allocate_buffer(8, AccessMode::ReadOnly, None).unwrap();
    let args = [
        KernelArg::Buffer(ro),
        KernelArg::Buffer(cost),
        KernelArg::Buffer(pending),
        KernelArg::Buffer(parent),
        KernelArg::Scalar(2),
    ];
    let err = backend.dispatch(commit, &args, 2).unwrap_err();
    assert!(matches!(err, BackendError::InvalidArgument { index: 0, .. }));

    // Buffers too small for the vertex count.
    let args = [
        KernelArg::Buffer(active),
        KernelArg::Buffer(cost),
        KernelArg::Buffer(pending),
        KernelArg::Buffer(parent),
        KernelArg::Scalar(0),
        KernelArg::Scalar(5),
    ];
    let err = backend.dispatch(initialize, &args, 5).unwrap_err();
    assert!(matches!(err, BackendError::InvalidArgument { index: 0, .. }));
    assert_eq!(backend.stats().dispatches, 0);
}

#[test]
fn test_relax_rejects_decreasing_offsets() {
    let backend = SequentialBackend::sequential();
    let (_, [initialize, relax, _]) = relaxation_kernels(&backend);
    let ro = |data: &[u32]| {
        backend
            .allocate_buffer(data.len() * 4, AccessMode::ReadOnly, Some(data.as_bytes()))
            .unwrap()
    };
    let offsets = ro(&[0u32, 4, 1][..]);
    let edges = ro(&[1u32, 1, 1, 1][..]);
    let weights = ro(&[1u32, 1][..]);
    let rw = |bytes: usize| backend.allocate_buffer(bytes, AccessMode::ReadWrite, None).unwrap();
    let (active, cost, pending, parent) = (rw(8), rw(8), rw(16), rw(8));

    let mut init_args = [active, cost, pending, parent].map(KernelArg::Buffer).to_vec();
    init_args.extend([KernelArg::Scalar(0), KernelArg::Scalar(2)]);
    backend.dispatch(initialize, &init_args, 2).unwrap();

    let relax_args = [
        KernelArg::Buffer(offsets),
        KernelArg::Buffer(edges),
        KernelArg::Buffer(weights),
        KernelArg::Buffer(active),
        KernelArg::Buffer(cost),
        KernelArg::Buffer(pending),
        KernelArg::Scalar(2),
    ];
    match backend.dispatch(relax, &relax_args, 2) {
        Err(BackendError::InvalidArgument { kernel: "sssp_relax", index: 0, reason }) => {
            assert!(reason.contains("decrease"), "reason: {reason}");
        }
        other => panic!("expected an argument error, got {other:?}"),
    }
    assert_eq!(backend.stats().relaxations, 0);
}

#[test]
fn test_single_iteration_relaxes_source_edges() {
    // 0 -> 1 (5), 0 -> 2 (2), 2 -> 1 (1)
    let backend = SequentialBackend::sequential();
    let (_, [initialize, relax, commit]) = relaxation_kernels(&backend);
    let ro = |data: &[u32]| {
        backend
            .allocate_buffer(data.len() * 4, AccessMode::ReadOnly, Some(data.as_bytes()))
            .unwrap()
    };
    let offsets = ro(&[0u32, 2, 2, 3][..]);
    let edges = ro(&[1u32, 2, 1][..]);
    let weights = ro(&[5u32, 2, 1][..]);
    let rw = |bytes: usize| backend.allocate_buffer(bytes, AccessMode::ReadWrite, None).unwrap();
    let (active, cost, pending, parent) = (rw(12), rw(12), rw(24), rw(12));

    let state = [active, cost, pending, parent].map(KernelArg::Buffer);
    let mut init_args = state.to_vec();
    init_args.extend([KernelArg::Scalar(0), KernelArg::Scalar(3)]);
    backend.dispatch(initialize, &init_args, 3).unwrap();
    assert_eq!(read_u32s(&backend, cost, 3), vec![0, INFINITY, INFINITY]);
    assert_eq!(read_u32s(&backend, active, 3), vec![1, 0, 0]);

    let relax_args = [
        KernelArg::Buffer(offsets),
        KernelArg::Buffer(edges),
        KernelArg::Buffer(weights),
        KernelArg::Buffer(active),
        KernelArg::Buffer(cost),
        KernelArg::Buffer(pending),
        KernelArg::Scalar(3),
    ];
    let mut commit_args = state.to_vec();
    commit_args.push(KernelArg::Scalar(3));

    backend.dispatch(relax, &relax_args, 3).unwrap();
    backend.dispatch(commit, &commit_args, 3).unwrap();
    assert_eq!(read_u32s(&backend, cost, 3), vec![0, 5, 2]);
    assert_eq!(read_u32s(&backend, parent, 3), vec![NO_PARENT, 0, 0]);
    assert_eq!(read_u32s(&backend, active, 3), vec![0, 1, 1]);

    backend.dispatch(relax, &relax_args, 3).unwrap();
    backend.dispatch(commit, &commit_args, 3).unwrap();
    assert_eq!(read_u32s(&backend, cost, 3), vec![0, 3, 2]);
    assert_eq!(read_u32s(&backend, parent, 3), vec![NO_PARENT, 2, 0]);
    assert_eq!(read_u32s(&backend, active, 3), vec![0, 1, 0]);

    let stats = backend.stats();
    assert_eq!(stats.dispatches, 5);
    assert_eq!(stats.relaxations, 3);
}

#[cfg(feature = "parallel")]
#[test]
fn test_parallel_pool_reports_threads() {
    let backend = ParallelBackend::with_threads(3).unwrap();
    assert_eq!(backend.pool().threads(), 3);
}
