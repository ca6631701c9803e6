//! Reference-counted ownership of an exchanged allocation.
//!
//! An [`OwnershipToken`] binds a memory region to a release callback. Every clone of
//! the token and every descriptor registered against it holds one reference; the
//! callback runs when the last reference is dropped, on whichever thread drops it.
//! Because the callback is a `FnOnce` taken out of the shared state in `Drop`, a
//! second release is unrepresentable rather than merely detected.

use std::{
    fmt,
    ops::Range,
    sync::{
        Arc, Mutex, MutexGuard, PoisonError,
        atomic::{AtomicU64, Ordering},
    },
};

use ndshare_common::{Result, error::Error};
use ndshare_common_traits::memory_owner::{MemoryAllocation, MemoryOwner};

use crate::{
    descriptor::BufferDescriptor,
    device::Device,
    dtype::DType,
    layout::{self, MemoryOrder},
};

/// Callback that frees an allocation.
pub type ReleaseFn = Box<dyn FnOnce() + Send>;

static NEXT_TOKEN_ID: AtomicU64 = AtomicU64::new(1);

/// Shared handle to an allocation with a release callback that fires exactly once.
#[derive(Clone)]
pub struct OwnershipToken(Arc<TokenInner>);

struct TokenInner {
    id: u64,
    region: MemoryAllocation,
    device: Device,
    views: Mutex<Vec<ViewSlot>>,
    next_view: AtomicU64,
    release: Option<ReleaseFn>,
}

// The region pointer is only dereferenced through descriptors, which carry their own
// aliasing rules; the release callback is `Send` and runs once from `Drop`.
unsafe impl Send for TokenInner {}
unsafe impl Sync for TokenInner {}

#[derive(Debug, Clone)]
struct ViewSlot {
    id: u64,
    range: Range<usize>,
    writable: bool,
}

impl ViewSlot {
    fn conflicts_with(&self, range: &Range<usize>, writable: bool) -> bool {
        (self.writable || writable)
            && !self.range.is_empty()
            && !range.is_empty()
            && self.range.start < range.end
            && range.start < self.range.end
    }
}

impl OwnershipToken {
    /// Creates a token for `region` that calls `release` once no reference remains.
    ///
    /// # Safety
    ///
    /// `region` must describe memory that stays valid, and is not accessed by anyone
    /// else, until `release` is invoked.
    pub unsafe fn new(region: MemoryAllocation, device: Device, release: ReleaseFn) -> OwnershipToken {
        let id = NEXT_TOKEN_ID.fetch_add(1, Ordering::Relaxed);
        log::debug!(
            "token {id}: adopting {} bytes at {:p} on {device}",
            region.len,
            region.ptr
        );
        OwnershipToken(Arc::new(TokenInner {
            id,
            region,
            device,
            views: Mutex::new(Vec::new()),
            next_view: AtomicU64::new(1),
            release: Some(release),
        }))
    }

    /// Takes ownership of a host memory container; the container is dropped on release.
    pub fn from_owner<O>(mut owner: O) -> OwnershipToken
    where
        O: MemoryOwner + Send + 'static,
    {
        let region = owner.memory();
        // Safety: `MemoryOwner` guarantees the region is stable across the move into
        // the callback and stays valid until the owner is dropped.
        unsafe { OwnershipToken::new(region, Device::CPU, Box::new(move || drop(owner))) }
    }

    pub fn id(&self) -> u64 {
        self.0.id
    }

    pub fn region(&self) -> MemoryAllocation {
        self.0.region
    }

    pub fn device(&self) -> Device {
        self.0.device
    }

    /// Number of live references: token clones plus registered descriptors.
    pub fn ref_count(&self) -> usize {
        Arc::strong_count(&self.0)
    }

    /// Number of descriptors currently registered against this token.
    pub fn view_count(&self) -> usize {
        self.views().len()
    }

    /// Returns `true` if this handle is the only reference.
    pub fn is_unique(&self) -> bool {
        self.ref_count() == 1
    }

    pub fn ptr_eq(&self, other: &OwnershipToken) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Takes one more reference.
    pub fn retain(&self) -> OwnershipToken {
        self.clone()
    }

    /// Drops this reference. Returns `true` if it was the last one and the release
    /// callback ran.
    pub fn release(self) -> bool {
        Arc::into_inner(self.0).map(drop).is_some()
    }

    /// Registers an externally built descriptor against this token, so that the
    /// allocation stays alive for as long as the descriptor does.
    ///
    /// The descriptor must lie inside the token's region and must not already belong
    /// to a token. A writable descriptor may not overlap any other registered
    /// descriptor, and a read-only one may not overlap a writable one.
    pub fn share(&self, mut desc: BufferDescriptor<'static>) -> Result<BufferDescriptor<'static>> {
        if desc.is_owned() {
            return Err(Error::invalid_operation(
                "share: descriptor is already registered with a token",
            ));
        }
        let start = desc.as_ptr() as usize;
        let lease = self.register(start..start + desc.span_bytes(), desc.is_writable())?;
        desc.attach(lease);
        Ok(desc)
    }

    /// Builds a writable, row-major descriptor over `shape` elements of `dtype`
    /// starting `byte_offset` bytes into the region, and registers it.
    pub fn carve(
        &self,
        dtype: DType,
        byte_offset: usize,
        shape: &[usize],
    ) -> Result<BufferDescriptor<'static>> {
        self.carve_ordered(dtype, byte_offset, shape, MemoryOrder::RowMajor)
    }

    /// Same as [`OwnershipToken::carve`] with an explicit contiguous order.
    pub fn carve_ordered(
        &self,
        dtype: DType,
        byte_offset: usize,
        shape: &[usize],
        order: MemoryOrder,
    ) -> Result<BufferDescriptor<'static>> {
        let region = self.region();
        let nbytes = layout::element_count(shape)
            .and_then(|n| n.checked_mul(dtype.size()))
            .ok_or_else(|| Error::invalid_shape("addressable extents", format!("{shape:?}")))?;
        let end = byte_offset
            .checked_add(nbytes)
            .ok_or_else(|| Error::invalid_shape("addressable extents", format!("{shape:?}")))?;
        if end > region.len {
            return Err(Error::invalid_shape(
                format!("at most {} bytes", region.len),
                format!("bytes {byte_offset}..{end}"),
            ));
        }

        let ptr = region.ptr.wrapping_add(byte_offset);
        // Safety: the range was checked against the region, which stays valid while
        // the lease attached below keeps the token alive.
        let mut desc = unsafe {
            BufferDescriptor::from_raw_parts(ptr, dtype, shape, None, order, self.device())?
        };
        let start = ptr as usize;
        let lease = self.register(start..start + nbytes, true)?;
        desc.attach(lease);
        Ok(desc)
    }

    pub(crate) fn register(&self, range: Range<usize>, writable: bool) -> Result<ViewLease> {
        if !self
            .0
            .region
            .contains(range.start as *const u8, range.end - range.start)
        {
            return Err(Error::invalid_arg(
                "descriptor",
                format!(
                    "byte range {:#x}..{:#x} is outside the token region {:p}+{}",
                    range.start, range.end, self.0.region.ptr, self.0.region.len
                ),
            ));
        }

        let mut views = self.views();
        if let Some(other) = views.iter().find(|slot| slot.conflicts_with(&range, writable)) {
            return Err(Error::overlapping_view(format!(
                "bytes {:#x}..{:#x} overlap view {} of token {}",
                range.start, range.end, other.id, self.0.id
            )));
        }
        let id = self.0.next_view.fetch_add(1, Ordering::Relaxed);
        views.push(ViewSlot {
            id,
            range,
            writable,
        });
        log::trace!("token {}: registered view {id}", self.0.id);
        Ok(ViewLease {
            token: self.clone(),
            view_id: id,
        })
    }

    fn mark_readonly(&self, view_id: u64) {
        if let Some(slot) = self.views().iter_mut().find(|slot| slot.id == view_id) {
            slot.writable = false;
        }
    }

    fn unregister(&self, view_id: u64) {
        self.views().retain(|slot| slot.id != view_id);
        log::trace!("token {}: unregistered view {view_id}", self.0.id);
    }

    fn views(&self) -> MutexGuard<'_, Vec<ViewSlot>> {
        self.0.views.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for OwnershipToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OwnershipToken")
            .field("id", &self.0.id)
            .field("ptr", &self.0.region.ptr)
            .field("len", &self.0.region.len)
            .field("device", &self.0.device)
            .field("ref_count", &self.ref_count())
            .finish_non_exhaustive()
    }
}

impl Drop for TokenInner {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            log::debug!(
                "token {}: releasing {} bytes at {:p}",
                self.id,
                self.region.len,
                self.region.ptr
            );
            release();
        }
    }
}

/// A descriptor's registration with a token. Holds one token reference.
pub(crate) struct ViewLease {
    token: OwnershipToken,
    view_id: u64,
}

impl ViewLease {
    pub(crate) fn token(&self) -> &OwnershipToken {
        &self.token
    }

    pub(crate) fn downgrade(&self) {
        self.token.mark_readonly(self.view_id);
    }
}

impl Drop for ViewLease {
    fn drop(&mut self) {
        self.token.unregister(self.view_id);
    }
}
