use std::collections::TryReserveError;

use ndshare_common_traits::memory_owner::{MemoryAllocation, MemoryOwner};

use crate::align::{align_up, is_ptr_aligned};

/// A fixed-size, zero-initialized block of bytes whose start is aligned to a
/// power-of-two boundary.
///
/// Unlike a `Vec<u8>`, the block never grows: it is allocated once for a known
/// array size and handed to an ownership token, which keeps its address stable
/// until release.
pub struct AlignedBytes {
    /// The underlying byte vector, may include padding at start.
    inner: Vec<u8>,
    /// Offset from start of inner vec to maintain alignment.
    start: usize,
    /// Length of the aligned region in bytes.
    len: usize,
    /// Required alignment, specified during creation.
    alignment: usize,
}

impl AlignedBytes {
    /// Creates a zero-filled block of `len` bytes aligned to `alignment`.
    ///
    /// Memory is always allocated, even for `len == 0`, so the returned pointer is a
    /// real aligned address.
    ///
    /// # Panics
    ///
    /// Panics if `alignment` is not a power of two.
    pub fn try_zeroed(len: usize, alignment: usize) -> Result<AlignedBytes, TryReserveError> {
        let alignment = alignment.max(1);
        assert!(alignment.is_power_of_two());

        let mut inner = Vec::<u8>::new();
        // An overflowing request goes through try_reserve_exact so it surfaces as
        // a capacity error rather than a panic.
        let vec_capacity = len.checked_add(alignment).unwrap_or(usize::MAX);
        inner.try_reserve_exact(vec_capacity)?;

        let p = inner.as_ptr() as usize;
        // The reservation covers `alignment` bytes of padding, so this cannot overflow.
        let start = align_up(p, alignment).map_or(0, |aligned| aligned - p);
        inner.resize(start + len, 0);

        let res = AlignedBytes {
            inner,
            start,
            len,
            alignment,
        };
        debug_assert!(is_ptr_aligned(res.as_ptr(), alignment));
        Ok(res)
    }

    /// Returns the number of bytes in the block.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if the block holds no bytes.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Alignment the block was created with.
    #[inline]
    pub fn alignment(&self) -> usize {
        self.alignment
    }

    /// Total bytes reserved past the aligned start.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.inner.capacity() - self.start
    }

    /// Returns a raw pointer to the aligned start of the block.
    #[inline]
    pub fn as_ptr(&self) -> *const u8 {
        unsafe { self.inner.as_ptr().add(self.start) }
    }

    /// Returns a mutable raw pointer to the aligned start of the block.
    #[inline]
    pub fn as_mut_ptr(&mut self) -> *mut u8 {
        unsafe { self.inner.as_mut_ptr().add(self.start) }
    }
}

impl std::fmt::Debug for AlignedBytes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlignedBytes")
            .field("len", &self.len)
            .field("alignment", &self.alignment)
            .field("internal_offset", &self.start)
            .field("internal_cap", &self.inner.capacity())
            .finish_non_exhaustive()
    }
}

unsafe impl MemoryOwner for AlignedBytes {
    fn memory(&mut self) -> MemoryAllocation {
        MemoryAllocation {
            ptr: self.as_mut_ptr(),
            len: self.len(),
            capacity: self.capacity(),
            alignment: self.alignment,
        }
    }
}
