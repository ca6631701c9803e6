//! Allocators and release callbacks that record how often memory is freed.

use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use ndshare_common::{Result, error::Error};
use ndshare_common_traits::memory_owner::{MemoryAllocation, MemoryOwner};
use ndshare_exchange::{
    BufferAllocator, BufferDescriptor, Device, Element, HeapAllocator, OwnershipToken, ReleaseFn,
    wrap_existing,
};

/// Allocation and release counts of a [`CountingAllocator`].
#[derive(Debug, Default)]
pub struct AllocStats {
    allocations: AtomicUsize,
    releases: AtomicUsize,
    live_bytes: AtomicUsize,
}

impl AllocStats {
    pub fn allocations(&self) -> usize {
        self.allocations.load(Ordering::SeqCst)
    }

    pub fn releases(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }

    pub fn live_bytes(&self) -> usize {
        self.live_bytes.load(Ordering::SeqCst)
    }

    /// Allocations not released yet.
    pub fn outstanding(&self) -> usize {
        self.allocations() - self.releases()
    }
}

/// Heap allocator that counts allocations and their releases.
#[derive(Debug, Default, Clone)]
pub struct CountingAllocator {
    stats: Arc<AllocStats>,
}

impl CountingAllocator {
    pub fn new() -> CountingAllocator {
        Default::default()
    }

    pub fn stats(&self) -> Arc<AllocStats> {
        self.stats.clone()
    }
}

impl BufferAllocator for CountingAllocator {
    fn allocate(&self, size: usize, alignment: usize) -> Result<Box<dyn MemoryOwner + Send>> {
        let inner = HeapAllocator.allocate(size, alignment)?;
        self.stats.allocations.fetch_add(1, Ordering::SeqCst);
        self.stats.live_bytes.fetch_add(size, Ordering::SeqCst);
        Ok(Box::new(Counted {
            inner,
            size,
            stats: self.stats.clone(),
        }))
    }

    fn name(&self) -> &str {
        "counting"
    }
}

struct Counted {
    inner: Box<dyn MemoryOwner + Send>,
    size: usize,
    stats: Arc<AllocStats>,
}

unsafe impl MemoryOwner for Counted {
    fn memory(&mut self) -> MemoryAllocation {
        self.inner.memory()
    }
}

impl Drop for Counted {
    fn drop(&mut self) {
        self.stats.releases.fetch_add(1, Ordering::SeqCst);
        self.stats.live_bytes.fetch_sub(self.size, Ordering::SeqCst);
    }
}

/// Shared counter of release callback invocations.
#[derive(Debug, Default, Clone)]
pub struct ReleaseCounter(Arc<AtomicUsize>);

impl ReleaseCounter {
    pub fn new() -> ReleaseCounter {
        Default::default()
    }

    pub fn count(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }

    /// A release callback that only bumps the counter.
    pub fn callback(&self) -> ReleaseFn {
        let counter = self.0.clone();
        Box::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })
    }

    /// Adopts `values` through [`wrap_existing`] with a callback that frees the vector
    /// and bumps the counter.
    pub fn wrap<T: Element>(
        &self,
        values: Vec<T>,
        shape: &[usize],
    ) -> Result<(BufferDescriptor<'static>, OwnershipToken)> {
        if shape.iter().try_fold(1usize, |acc, &n| acc.checked_mul(n)) != Some(values.len()) {
            return Err(Error::invalid_shape(
                format!("{} elements", values.len()),
                format!("shape {shape:?}"),
            ));
        }
        let parts = RawVec::new(values);
        let ptr = parts.ptr as *mut u8;
        let counter = self.0.clone();
        let release: ReleaseFn = Box::new(move || {
            parts.free();
            counter.fetch_add(1, Ordering::SeqCst);
        });
        unsafe { wrap_existing(ptr, T::DTYPE, shape, Device::CPU, release) }
    }
}

/// A vector taken apart so that its buffer can be handed out as a raw pointer.
struct RawVec<T> {
    ptr: *mut T,
    len: usize,
    capacity: usize,
}

unsafe impl<T: Send> Send for RawVec<T> {}

impl<T> RawVec<T> {
    fn new(values: Vec<T>) -> RawVec<T> {
        let mut values = std::mem::ManuallyDrop::new(values);
        RawVec {
            ptr: values.as_mut_ptr(),
            len: values.len(),
            capacity: values.capacity(),
        }
    }

    fn free(self) {
        drop(unsafe { Vec::from_raw_parts(self.ptr, self.len, self.capacity) });
    }
}
