//! Allocating and adopting exchanged buffers.

use std::sync::Arc;

use ndshare_bytes::AlignedBytes;
use ndshare_common::{Result, error::Error};
use ndshare_common_traits::memory_owner::{MemoryAllocation, MemoryOwner};

use crate::{
    descriptor::BufferDescriptor,
    device::Device,
    dtype::{DType, Element},
    layout::{self, MemoryOrder},
    options::ExchangeOptions,
    policy::{self, ReturnPolicy},
    token::{OwnershipToken, ReleaseFn},
};

/// Source of zero-filled, aligned host memory for owned arrays.
pub trait BufferAllocator: Send + Sync {
    /// Allocates `size` zeroed bytes aligned to `alignment`. The returned owner frees
    /// the memory when dropped.
    fn allocate(&self, size: usize, alignment: usize) -> Result<Box<dyn MemoryOwner + Send>>;

    fn name(&self) -> &str;
}

/// Allocator backed by the global heap.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeapAllocator;

impl BufferAllocator for HeapAllocator {
    fn allocate(&self, size: usize, alignment: usize) -> Result<Box<dyn MemoryOwner + Send>> {
        let bytes = AlignedBytes::try_zeroed(size, alignment)
            .map_err(|e| Error::allocation(size, e.to_string()))?;
        Ok(Box::new(bytes))
    }

    fn name(&self) -> &str {
        "heap"
    }
}

/// Allocates owned arrays with a configured allocator and options.
#[derive(Clone)]
pub struct Exchange {
    options: ExchangeOptions,
    allocator: Arc<dyn BufferAllocator>,
}

impl Exchange {
    pub fn new(options: ExchangeOptions) -> Result<Exchange> {
        Self::with_allocator(options, Arc::new(HeapAllocator))
    }

    pub fn with_allocator(
        options: ExchangeOptions,
        allocator: Arc<dyn BufferAllocator>,
    ) -> Result<Exchange> {
        options.validate()?;
        Ok(Exchange { options, allocator })
    }

    pub fn options(&self) -> &ExchangeOptions {
        &self.options
    }

    pub fn allocator_name(&self) -> &str {
        self.allocator.name()
    }

    /// Allocates a zero-filled array of `shape` elements of `dtype` in the default
    /// order. The returned descriptor is registered with the returned token; the
    /// memory is freed once both are dropped.
    pub fn allocate_owned(
        &self,
        shape: &[usize],
        dtype: DType,
    ) -> Result<(BufferDescriptor<'static>, OwnershipToken)> {
        self.allocate_owned_ordered(shape, dtype, self.options.default_order)
    }

    pub fn allocate_owned_ordered(
        &self,
        shape: &[usize],
        dtype: DType,
        order: MemoryOrder,
    ) -> Result<(BufferDescriptor<'static>, OwnershipToken)> {
        let size = layout::element_count(shape)
            .and_then(|n| n.checked_mul(dtype.size()))
            .ok_or_else(|| Error::allocation(usize::MAX, format!("shape {shape:?} overflows")))?;
        let token = self.allocate_region(size)?;
        let order = match order {
            MemoryOrder::Any => self.options.default_order,
            order => order,
        };
        let desc = token.carve_ordered(dtype, 0, shape, order)?;
        Ok((desc, token))
    }

    /// Allocates a zero-filled region of `size` bytes to carve descriptors from.
    pub fn allocate_region(&self, size: usize) -> Result<OwnershipToken> {
        self.options.check_allocation(size)?;
        let owner = self.allocator.allocate(size, self.options.alignment)?;
        log::debug!(
            "{} allocator: {size} bytes aligned to {}",
            self.allocator.name(),
            self.options.alignment
        );
        Ok(OwnershipToken::from_owner(owner))
    }

    /// Allocates an array holding a copy of `values` with the given shape.
    pub fn copy_of<T: Element>(
        &self,
        values: &[T],
        shape: &[usize],
        order: MemoryOrder,
    ) -> Result<BufferDescriptor<'static>> {
        check_len(values.len(), shape)?;
        let (mut desc, _token) = self.allocate_owned_ordered(shape, T::DTYPE, order)?;
        let mut view = desc.any_layout_view_mut::<T>(shape.len())?;
        let mut values = values.iter().copied();
        view.fill_with(|_| values.next().unwrap_or_else(T::zeroed));
        drop(view);
        Ok(desc)
    }

    /// Hands `desc` across the boundary under `policy`.
    pub fn export<'a>(
        &self,
        desc: BufferDescriptor<'a>,
        policy: ReturnPolicy,
    ) -> Result<BufferDescriptor<'a>> {
        policy::export(desc, policy)
    }
}

impl Default for Exchange {
    fn default() -> Self {
        Exchange {
            options: ExchangeOptions::default(),
            allocator: Arc::new(HeapAllocator),
        }
    }
}

impl std::fmt::Debug for Exchange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Exchange")
            .field("options", &self.options)
            .field("allocator", &self.allocator.name())
            .finish()
    }
}

/// Allocates a zero-filled row-major array on the heap with default options.
pub fn allocate_owned(
    shape: &[usize],
    dtype: DType,
) -> Result<(BufferDescriptor<'static>, OwnershipToken)> {
    Exchange::default().allocate_owned(shape, dtype)
}

pub fn allocate_owned_ordered(
    shape: &[usize],
    dtype: DType,
    order: MemoryOrder,
) -> Result<(BufferDescriptor<'static>, OwnershipToken)> {
    Exchange::default().allocate_owned_ordered(shape, dtype, order)
}

/// Adopts foreign memory holding a contiguous row-major array. `release` runs once
/// the descriptor and every token reference are dropped.
///
/// If validation fails, `release` is dropped without being called and the memory
/// remains the caller's responsibility.
///
/// # Safety
///
/// `ptr` must point to at least `product(shape) * dtype.size()` bytes that stay valid
/// for reads and writes, and are accessed by no one else, until `release` runs.
pub unsafe fn wrap_existing(
    ptr: *mut u8,
    dtype: DType,
    shape: &[usize],
    device: Device,
    release: ReleaseFn,
) -> Result<(BufferDescriptor<'static>, OwnershipToken)> {
    if ptr.is_null() {
        return Err(Error::invalid_arg("ptr", "null data pointer"));
    }
    let len = layout::element_count(shape)
        .and_then(|n| n.checked_mul(dtype.size()))
        .ok_or_else(|| Error::invalid_shape("addressable extents", format!("{shape:?}")))?;
    let region = MemoryAllocation {
        ptr,
        len,
        capacity: len,
        alignment: dtype.alignment(),
    };
    // Validate before the token exists, so that a failure does not run `release`.
    let probe = unsafe {
        BufferDescriptor::from_raw_parts(ptr, dtype, shape, None, MemoryOrder::RowMajor, device)?
    };
    drop(probe);

    let token = unsafe { OwnershipToken::new(region, device, release) };
    let desc = token.carve(dtype, 0, shape)?;
    Ok((desc, token))
}

/// Adopts a vector as a row-major array of `shape`; the vector is dropped on release.
pub fn wrap_vec<T: Element>(
    values: Vec<T>,
    shape: &[usize],
) -> Result<(BufferDescriptor<'static>, OwnershipToken)> {
    check_len(values.len(), shape)?;
    let token = OwnershipToken::from_owner(values);
    let desc = token.carve(T::DTYPE, 0, shape)?;
    Ok((desc, token))
}

fn check_len(len: usize, shape: &[usize]) -> Result<()> {
    match layout::element_count(shape) {
        Some(count) if count == len => Ok(()),
        _ => Err(Error::invalid_shape(
            format!("{len} elements"),
            format!("shape {shape:?}"),
        )),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use ndshare_common::error::ErrorKind;

    use super::*;

    #[test]
    fn test_allocate_owned_is_zeroed_and_aligned() {
        let (desc, token) = allocate_owned(&[3, 5], DType::Float64).unwrap();
        assert_eq!(desc.strides(), &[5, 1]);
        assert_eq!(desc.as_ptr() as usize % 64, 0);
        assert!(desc.owner().unwrap().ptr_eq(&token));
        let view = desc.matrix_view::<f64>(MemoryOrder::RowMajor).unwrap();
        assert!(view.to_vec().iter().all(|&x| x == 0.0));
    }

    #[test]
    fn test_allocate_empty_and_scalar() {
        let (empty, _token) = allocate_owned(&[0, 4], DType::Int8).unwrap();
        assert!(empty.is_empty());
        let (scalar, _token) = allocate_owned(&[], DType::Int32).unwrap();
        assert_eq!(scalar.len(), 1);
        assert_eq!(scalar.any_layout_view::<i32>(0).unwrap().at(&[]), 0);
    }

    #[test]
    fn test_allocation_limits() {
        let exchange = Exchange::new(ExchangeOptions {
            max_allocation_bytes: Some(64),
            ..Default::default()
        })
        .unwrap();
        exchange.allocate_owned(&[16], DType::Float32).unwrap();
        let err = exchange.allocate_owned(&[17], DType::Float32).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::Allocation { .. }));

        let err = allocate_owned(&[usize::MAX, 2], DType::UInt8).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::Allocation { .. }));
    }

    #[test]
    fn test_column_major_default_order() {
        let exchange = Exchange::new(ExchangeOptions {
            default_order: MemoryOrder::ColumnMajor,
            ..Default::default()
        })
        .unwrap();
        let (desc, _token) = exchange.allocate_owned(&[2, 3], DType::Int16).unwrap();
        assert!(desc.is_column_major());
        assert_eq!(desc.strides(), &[1, 2]);
    }

    #[test]
    fn test_copy_of() {
        let exchange = Exchange::default();
        let desc = exchange
            .copy_of(&[1u8, 2, 3, 4, 5, 6], &[2, 3], MemoryOrder::ColumnMajor)
            .unwrap();
        let m = desc.matrix_view::<u8>(MemoryOrder::ColumnMajor).unwrap();
        assert_eq!(m.to_vec(), vec![1, 2, 3, 4, 5, 6]);
        assert!(exchange.copy_of(&[1u8, 2], &[3], MemoryOrder::RowMajor).is_err());
    }

    #[test]
    fn test_wrap_vec_releases_with_descriptor() {
        let (desc, token) = wrap_vec(vec![1.5f32, 2.5, 3.5, 4.5], &[2, 2]).unwrap();
        drop(token);
        let m = desc.matrix_view::<f32>(MemoryOrder::RowMajor).unwrap();
        assert_eq!(m.at(1, 0), 3.5);

        let err = wrap_vec(vec![1u32; 3], &[2, 2]).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::InvalidShape { .. }));
    }

    #[test]
    fn test_wrap_existing_failure_does_not_release() {
        let released = Arc::new(AtomicUsize::new(0));
        let counter = released.clone();
        let err = unsafe {
            wrap_existing(
                std::ptr::null_mut(),
                DType::Float32,
                &[4],
                Device::CPU,
                Box::new(move || {
                    counter.fetch_add(1, Ordering::SeqCst);
                }),
            )
        }
        .unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::InvalidArgument { .. }));
        assert_eq!(released.load(Ordering::SeqCst), 0);
    }
}
