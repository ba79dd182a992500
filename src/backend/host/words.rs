//! Byte-addressed device memory backed by 64-bit atomic words.
//!
//! Every host buffer is a run of `AtomicU64` words holding its bytes in
//! native order. Typed access comes in two widths:
//! - `u64` elements map one-to-one onto words, so `fetch_min` is a single
//!   hardware atomic.
//! - `u32` elements are lanes of a word; stores use a CAS loop on the word
//!   so that concurrent writers of neighbouring lanes never clobber each other.
//!
//! Kernels run with `Relaxed` ordering. Visibility between phases comes
//! from the dispatch boundary (a thread join), not from these operations.

use core::sync::atomic::{AtomicU64, Ordering};

const WORD_BYTES: usize = core::mem::size_of::<u64>();

/// A fixed-size, zero-initialized or host-initialized atomic byte buffer.
pub(crate) struct AtomicWords {
    len_bytes: usize,
    words: Box<[AtomicU64]>,
}

impl AtomicWords {
    /// Creates a zeroed buffer of `len_bytes` bytes.
    pub(crate) fn zeroed(len_bytes: usize) -> Self {
        let words = (0..len_bytes.div_ceil(WORD_BYTES)).map(|_| AtomicU64::new(0)).collect();
        Self { len_bytes, words }
    }

    /// Creates a buffer holding a copy of `bytes`.
    pub(crate) fn from_bytes(bytes: &[u8]) -> Self {
        let words = bytes
            .chunks(WORD_BYTES)
            .map(|chunk| {
                let mut word = [0u8; WORD_BYTES];
                word[..chunk.len()].copy_from_slice(chunk);
                AtomicU64::new(u64::from_ne_bytes(word))
            })
            .collect();
        Self {
            len_bytes: bytes.len(),
            words,
        }
    }

    /// Size in bytes.
    #[inline]
    pub(crate) fn len_bytes(&self) -> usize {
        self.len_bytes
    }

    /// Number of whole `u32` elements.
    #[inline]
    pub(crate) fn len_u32(&self) -> usize {
        self.len_bytes / 4
    }

    /// Number of whole `u64` elements.
    #[inline]
    pub(crate) fn len_u64(&self) -> usize {
        self.len_bytes / WORD_BYTES
    }

    /// Copies `out.len()` bytes starting at `offset`.
    ///
    /// # Panics
    /// Panics if the range exceeds the buffer; callers check bounds first.
    pub(crate) fn read_bytes(&self, offset: usize, out: &mut [u8]) {
        assert!(offset + out.len() <= self.len_bytes, "read past end of buffer");
        let mut pos = offset;
        let mut written = 0;
        while written < out.len() {
            let word = self.words[pos / WORD_BYTES].load(Ordering::Relaxed).to_ne_bytes();
            let start = pos % WORD_BYTES;
            let take = (WORD_BYTES - start).min(out.len() - written);
            out[written..written + take].copy_from_slice(&word[start..start + take]);
            written += take;
            pos += take;
        }
    }

    #[inline(always)]
    pub(crate) fn load_u32(&self, index: usize) -> u32 {
        let (word, shift) = lane(index);
        (self.words[word].load(Ordering::Relaxed) >> shift) as u32
    }

    #[inline(always)]
    pub(crate) fn store_u32(&self, index: usize, value: u32) {
        let (word, shift) = lane(index);
        let mask = u64::from(u32::MAX) << shift;
        let bits = u64::from(value) << shift;
        // The closure always returns `Some`, so the update cannot fail.
        let _ = self.words[word].fetch_update(Ordering::Relaxed, Ordering::Relaxed, |w| {
            Some((w & !mask) | bits)
        });
    }

    #[inline(always)]
    pub(crate) fn load_u64(&self, index: usize) -> u64 {
        self.words[index].load(Ordering::Relaxed)
    }

    #[inline(always)]
    pub(crate) fn store_u64(&self, index: usize, value: u64) {
        self.words[index].store(value, Ordering::Relaxed);
    }

    /// Atomically lowers element `index` to `value` if smaller; returns the
    /// previous value.
    #[inline(always)]
    pub(crate) fn fetch_min_u64(&self, index: usize, value: u64) -> u64 {
        self.words[index].fetch_min(value, Ordering::Relaxed)
    }
}

/// Word index and bit shift of `u32` lane `index`, matching the byte order
/// in which the host uploaded the data.
#[inline(always)]
fn lane(index: usize) -> (usize, u32) {
    #[cfg(target_endian = "little")]
    {
        (index >> 1, ((index & 1) as u32) * 32)
    }
    #[cfg(target_endian = "big")]
    {
        (index >> 1, ((!index & 1) as u32) * 32)
    }
}
