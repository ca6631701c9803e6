//! `MemoryOwner`: A trait for types that own a block of memory exposed to array views.

/// A trait for types that own a block of memory that array views may read and write
/// without copying.
///
/// # Safety
///
/// Implementors must guarantee that:
/// - The memory returned by `memory()` remains valid for the entire lifetime of the
///   owner, and its address does not change when the owner value is moved.
/// - The memory is not accessed through the owner while views obtained from the
///   returned pointer are alive (the owner is typically moved into a release callback
///   and left untouched until it is dropped).
/// - The reported length, capacity and alignment are accurate.
pub unsafe trait MemoryOwner {
    /// Returns information about the owned memory block.
    ///
    /// Takes `&mut self` so that the returned pointer is derived from exclusive access
    /// and may be used for writes.
    fn memory(&mut self) -> MemoryAllocation;
}

/// Represents a block of allocated memory with its size information.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryAllocation {
    /// Pointer to the start of the allocated memory.
    pub ptr: *mut u8,
    /// Current length of the allocated memory in bytes.
    pub len: usize,
    /// Total capacity of the allocated memory in bytes.
    pub capacity: usize,
    /// Formal alignment of the memory buffer.
    pub alignment: usize,
}

impl MemoryAllocation {
    /// Address one past the last byte of the region.
    #[inline]
    pub fn end_addr(&self) -> usize {
        self.ptr as usize + self.len
    }

    /// Returns `true` if `[ptr, ptr + len)` lies inside this region.
    pub fn contains(&self, ptr: *const u8, len: usize) -> bool {
        let start = ptr as usize;
        match start.checked_add(len) {
            Some(end) => start >= self.ptr as usize && end <= self.end_addr(),
            None => false,
        }
    }
}

unsafe impl<T: Copy> MemoryOwner for Vec<T> {
    fn memory(&mut self) -> MemoryAllocation {
        let size = std::mem::size_of::<T>();
        MemoryAllocation {
            ptr: self.as_mut_ptr() as *mut u8,
            len: self.len() * size,
            capacity: self.capacity() * size,
            alignment: std::mem::align_of::<T>(),
        }
    }
}

unsafe impl<O: MemoryOwner + ?Sized> MemoryOwner for Box<O> {
    fn memory(&mut self) -> MemoryAllocation {
        (**self).memory()
    }
}
