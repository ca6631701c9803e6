//! `BufferDescriptor`: a typed, shaped, strided view over memory.

use std::{fmt, marker::PhantomData, ptr::NonNull};

use ndshare_bytes::align::is_ptr_aligned;
use ndshare_common::{Result, error::Error, verify_shape};

use crate::{
    alloc,
    device::Device,
    dtype::{DType, Element},
    layout::{self, Dims, MemoryOrder},
    matrix::{MatrixView, MatrixViewMut, VectorView, VectorViewMut},
    token::{OwnershipToken, ViewLease},
    view::{Cursor, StridedView, StridedViewMut},
    view_spec::ViewSpec,
};

/// Describes an n-dimensional array in memory: element type, shape, element strides,
/// base pointer and device, plus an optional registration with an
/// [`OwnershipToken`].
///
/// A descriptor without a token is a plain borrow of someone else's memory and carries
/// that borrow's lifetime `'a`. Descriptors produced by allocation, wrapping or
/// carving are registered with a token and are `'static`: the memory lives at least as
/// long as the descriptor.
///
/// Descriptors are not `Clone`. Reading requires `&self`; writing requires `&mut self`
/// and a writable descriptor.
pub struct BufferDescriptor<'a> {
    ptr: NonNull<u8>,
    dtype: DType,
    shape: Dims,
    strides: Dims,
    device: Device,
    writable: bool,
    lease: Option<ViewLease>,
    _marker: PhantomData<&'a mut [u8]>,
}

// Shared access only reads; mutation needs `&mut`, like a slice.
unsafe impl Send for BufferDescriptor<'_> {}
unsafe impl Sync for BufferDescriptor<'_> {}

impl<'a> BufferDescriptor<'a> {
    /// Describes a mutable slice as an array of the given shape.
    ///
    /// When `strides` is `None` the array is contiguous in `order` (row-major for
    /// `Any`). Explicit strides must agree with `order` unless it is `Any`.
    pub fn describe<T: Element>(
        data: &'a mut [T],
        shape: &[usize],
        strides: Option<&[isize]>,
        order: MemoryOrder,
    ) -> Result<BufferDescriptor<'a>> {
        let capacity = data.len();
        let ptr = NonNull::from(data).cast::<u8>();
        Self::build(
            ptr,
            T::DTYPE,
            shape,
            strides,
            order,
            Device::CPU,
            true,
            Some(capacity),
        )
    }

    /// Same as [`BufferDescriptor::describe`], producing a read-only descriptor.
    pub fn describe_readonly<T: Element>(
        data: &'a [T],
        shape: &[usize],
        strides: Option<&[isize]>,
        order: MemoryOrder,
    ) -> Result<BufferDescriptor<'a>> {
        let capacity = data.len();
        let ptr = NonNull::from(data).cast::<u8>();
        Self::build(
            ptr,
            T::DTYPE,
            shape,
            strides,
            order,
            Device::CPU,
            false,
            Some(capacity),
        )
    }

    /// One-dimensional descriptor over a whole slice.
    pub fn from_slice<T: Element>(data: &'a mut [T]) -> BufferDescriptor<'a> {
        let len = data.len();
        BufferDescriptor {
            ptr: NonNull::from(data).cast::<u8>(),
            dtype: T::DTYPE,
            shape: Dims::from_iter([len]),
            strides: Dims::from_iter([1]),
            device: Device::CPU,
            writable: true,
            lease: None,
            _marker: PhantomData,
        }
    }

    /// Describes foreign memory.
    ///
    /// # Safety
    ///
    /// Every element addressed by `shape` and `strides` starting at `ptr` must be
    /// valid for reads and writes of `dtype` for `'a`, and must not be accessed by
    /// anyone else while the descriptor or any view derived from it is alive.
    pub unsafe fn from_raw_parts(
        ptr: *mut u8,
        dtype: DType,
        shape: &[usize],
        strides: Option<&[isize]>,
        order: MemoryOrder,
        device: Device,
    ) -> Result<BufferDescriptor<'a>> {
        let ptr = NonNull::new(ptr)
            .ok_or_else(|| Error::invalid_arg("ptr", "null data pointer"))?;
        if !is_ptr_aligned(ptr.as_ptr(), dtype.alignment()) {
            return Err(Error::invalid_arg(
                "ptr",
                format!("{:p} is not aligned for {dtype}", ptr.as_ptr()),
            ));
        }
        Self::build(ptr, dtype, shape, strides, order, device, true, None)
    }

    #[allow(clippy::too_many_arguments)]
    fn build(
        ptr: NonNull<u8>,
        dtype: DType,
        shape: &[usize],
        strides: Option<&[isize]>,
        order: MemoryOrder,
        device: Device,
        writable: bool,
        capacity: Option<usize>,
    ) -> Result<BufferDescriptor<'a>> {
        let strides = match strides {
            Some(strides) => validate_strides(shape, strides)?,
            None => order
                .strides_for(shape)
                .ok_or_else(|| Error::invalid_shape("addressable extents", format!("{shape:?}")))?,
        };
        if !order.is_satisfied_by(shape, &strides) {
            return Err(Error::layout_mismatch(
                order.name(),
                format!("strides {:?} for shape {shape:?}", strides.as_slice()),
            ));
        }

        let span = layout::span(shape, &strides)
            .filter(|&n| n.checked_mul(dtype.size()).is_some())
            .filter(|_| {
                layout::element_count(shape)
                    .and_then(|n| n.checked_mul(dtype.size()))
                    .is_some()
            })
            .ok_or_else(|| Error::invalid_shape("addressable extents", format!("{shape:?}")))?;
        if let Some(capacity) = capacity {
            if span > capacity {
                return Err(Error::invalid_shape(
                    format!("at most {capacity} elements"),
                    format!("layout spanning {span} elements"),
                ));
            }
        }

        Ok(BufferDescriptor {
            ptr,
            dtype,
            shape: shape.iter().copied().collect(),
            strides,
            device,
            writable,
            lease: None,
            _marker: PhantomData,
        })
    }

    pub(crate) fn attach(&mut self, lease: ViewLease) {
        debug_assert!(self.lease.is_none());
        self.lease = Some(lease);
    }

    #[inline]
    pub fn dtype(&self) -> DType {
        self.dtype
    }

    #[inline]
    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    #[inline]
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Extent of dimension `dim`.
    ///
    /// # Panics
    ///
    /// Panics if `dim >= ndim()`.
    #[inline]
    pub fn shape_at(&self, dim: usize) -> usize {
        self.shape[dim]
    }

    /// Element strides.
    #[inline]
    pub fn strides(&self) -> &[usize] {
        &self.strides
    }

    /// Element stride of dimension `dim`.
    ///
    /// # Panics
    ///
    /// Panics if `dim >= ndim()`.
    #[inline]
    pub fn stride_at(&self, dim: usize) -> usize {
        self.strides[dim]
    }

    /// Strides in bytes.
    pub fn byte_strides(&self) -> Dims {
        let size = self.dtype.size();
        self.strides.iter().map(|&s| s * size).collect()
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        // Checked when the descriptor was built.
        self.shape.iter().product()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Size of the elements in bytes, excluding gaps between strided elements.
    pub fn nbytes(&self) -> usize {
        self.len() * self.dtype.size()
    }

    /// Bytes from the base pointer to the end of the last addressed element.
    pub fn span_bytes(&self) -> usize {
        layout::span(&self.shape, &self.strides).unwrap_or(0) * self.dtype.size()
    }

    #[inline]
    pub fn as_ptr(&self) -> *const u8 {
        self.ptr.as_ptr()
    }

    /// Mutable base pointer.
    pub fn as_mut_ptr(&mut self) -> Result<*mut u8> {
        self.ensure_writable()?;
        Ok(self.ptr.as_ptr())
    }

    #[inline]
    pub fn device(&self) -> Device {
        self.device
    }

    #[inline]
    pub fn is_writable(&self) -> bool {
        self.writable
    }

    /// Downgrades to a read-only descriptor. A registered descriptor then no longer
    /// blocks other read-only registrations over its range.
    pub fn into_readonly(mut self) -> BufferDescriptor<'a> {
        self.writable = false;
        if let Some(lease) = &self.lease {
            lease.downgrade();
        }
        self
    }

    /// Returns `true` if the descriptor keeps an allocation alive.
    #[inline]
    pub fn is_owned(&self) -> bool {
        self.lease.is_some()
    }

    /// Token this descriptor is registered with.
    pub fn owner(&self) -> Option<&OwnershipToken> {
        self.lease.as_ref().map(ViewLease::token)
    }

    /// Contiguous order of the layout, or `Any`.
    pub fn order(&self) -> MemoryOrder {
        layout::order_of(&self.shape, &self.strides)
    }

    pub fn is_row_major(&self) -> bool {
        layout::is_row_major(&self.shape, &self.strides)
    }

    pub fn is_column_major(&self) -> bool {
        layout::is_column_major(&self.shape, &self.strides)
    }

    pub fn is_non_overlapping(&self) -> bool {
        layout::is_non_overlapping(&self.shape, &self.strides)
    }

    pub fn inspect(&self) -> Inspection {
        Inspection {
            ptr: self.ptr.as_ptr() as usize,
            dtype: self.dtype,
            shape: self.shape.to_vec(),
            strides: self.strides.to_vec(),
            device: self.device,
            writable: self.writable,
            owned: self.is_owned(),
        }
    }

    /// Typed strided view honoring the static requirements of `spec`.
    pub fn typed_view<T: Element>(&self, spec: &ViewSpec) -> Result<StridedView<'_, T>> {
        spec.check(T::DTYPE, self)?;
        Ok(unsafe { StridedView::new(self.ptr.as_ptr().cast(), &self.shape, &self.strides) })
    }

    /// Mutable typed strided view honoring the static requirements of `spec`.
    pub fn typed_view_mut<T: Element>(&mut self, spec: &ViewSpec) -> Result<StridedViewMut<'_, T>> {
        spec.check(T::DTYPE, self)?;
        self.ensure_mutable_layout()?;
        Ok(unsafe { StridedViewMut::new(self.ptr.as_ptr().cast(), &self.shape, &self.strides) })
    }

    /// View addressing elements in any stride order. Fails with `TypeMismatch` if the
    /// element type or the dimensionality differ.
    pub fn any_layout_view<T: Element>(&self, ndim: usize) -> Result<StridedView<'_, T>> {
        self.check_any_layout(T::DTYPE, ndim)?;
        Ok(unsafe { StridedView::new(self.ptr.as_ptr().cast(), &self.shape, &self.strides) })
    }

    pub fn any_layout_view_mut<T: Element>(&mut self, ndim: usize) -> Result<StridedViewMut<'_, T>> {
        self.check_any_layout(T::DTYPE, ndim)?;
        self.ensure_mutable_layout()?;
        Ok(unsafe { StridedViewMut::new(self.ptr.as_ptr().cast(), &self.shape, &self.strides) })
    }

    /// Rank-2 view; `order` may be `Any`.
    pub fn matrix_view<T: Element>(&self, order: MemoryOrder) -> Result<MatrixView<'_, T>> {
        ViewSpec::matrix(order).check(T::DTYPE, self)?;
        Ok(unsafe {
            MatrixView::new(
                self.ptr.as_ptr().cast(),
                [self.shape[0], self.shape[1]],
                [self.strides[0], self.strides[1]],
            )
        })
    }

    pub fn matrix_view_mut<T: Element>(&mut self, order: MemoryOrder) -> Result<MatrixViewMut<'_, T>> {
        ViewSpec::matrix(order).check(T::DTYPE, self)?;
        self.ensure_mutable_layout()?;
        Ok(unsafe {
            MatrixViewMut::new(
                self.ptr.as_ptr().cast(),
                [self.shape[0], self.shape[1]],
                [self.strides[0], self.strides[1]],
            )
        })
    }

    pub fn vector_view<T: Element>(&self) -> Result<VectorView<'_, T>> {
        ViewSpec::vector().check(T::DTYPE, self)?;
        Ok(unsafe { VectorView::new(self.ptr.as_ptr().cast(), self.shape[0], self.strides[0]) })
    }

    pub fn vector_view_mut<T: Element>(&mut self) -> Result<VectorViewMut<'_, T>> {
        ViewSpec::vector().check(T::DTYPE, self)?;
        self.ensure_mutable_layout()?;
        Ok(unsafe { VectorViewMut::new(self.ptr.as_ptr().cast(), self.shape[0], self.strides[0]) })
    }

    /// Copies the elements into a new owned allocation, contiguous in `order`
    /// (`Any` produces row-major).
    pub fn to_contiguous(&self, order: MemoryOrder) -> Result<BufferDescriptor<'static>> {
        if !self.device.is_host_accessible() {
            return Err(Error::unsupported_device(self.device.to_string()));
        }
        let (mut copy, _token) = alloc::allocate_owned_ordered(&self.shape, self.dtype, order)?;
        let size = self.dtype.size();
        let mut src = Cursor::new(&self.shape, &self.strides);
        let mut dst = Cursor::new(&copy.shape, &copy.strides);
        let dst_base = copy.ptr.as_ptr();
        while !src.is_done() {
            // Safety: both offsets address elements inside their validated layouts,
            // and the fresh allocation cannot alias the source.
            unsafe {
                std::ptr::copy_nonoverlapping(
                    self.ptr.as_ptr().add(src.offset() * size),
                    dst_base.add(dst.offset() * size),
                    size,
                );
            }
            src.advance();
            dst.advance();
        }
        Ok(copy)
    }

    fn check_any_layout(&self, dtype: DType, ndim: usize) -> Result<()> {
        if !self.device.is_host_accessible() {
            return Err(Error::unsupported_device(self.device.to_string()));
        }
        if self.dtype != dtype || self.ndim() != ndim {
            return Err(Error::type_mismatch(
                format!("{dtype} array with {ndim} dimensions"),
                format!("{} array with {} dimensions", self.dtype, self.ndim()),
            ));
        }
        Ok(())
    }

    fn ensure_writable(&self) -> Result<()> {
        if self.writable {
            Ok(())
        } else {
            Err(Error::read_only())
        }
    }

    fn ensure_mutable_layout(&self) -> Result<()> {
        self.ensure_writable()?;
        if !self.is_non_overlapping() {
            return Err(Error::overlapping_view(format!(
                "strides {:?} address some elements more than once",
                self.strides.as_slice()
            )));
        }
        Ok(())
    }
}

impl fmt::Debug for BufferDescriptor<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BufferDescriptor")
            .field("ptr", &self.ptr)
            .field("dtype", &self.dtype)
            .field("shape", &self.shape.as_slice())
            .field("strides", &self.strides.as_slice())
            .field("device", &self.device)
            .field("writable", &self.writable)
            .field("token", &self.owner().map(OwnershipToken::id))
            .finish()
    }
}

fn validate_strides(shape: &[usize], strides: &[isize]) -> Result<Dims> {
    verify_shape!(strides, strides.len() == shape.len());
    strides
        .iter()
        .map(|&s| {
            usize::try_from(s).map_err(|_| {
                Error::invalid_shape("non-negative strides", format!("{strides:?}"))
            })
        })
        .collect()
}

/// Snapshot of a descriptor's metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inspection {
    pub ptr: usize,
    pub dtype: DType,
    pub shape: Vec<usize>,
    pub strides: Vec<usize>,
    pub device: Device,
    pub writable: bool,
    pub owned: bool,
}

impl fmt::Display for Inspection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Array data pointer : {:#x}", self.ptr)?;
        writeln!(f, "Array dimension : {}", self.shape.len())?;
        for (dim, (extent, stride)) in self.shape.iter().zip(&self.strides).enumerate() {
            writeln!(f, "Array dimension [{dim}] : {extent}")?;
            writeln!(f, "Array stride    [{dim}] : {stride}")?;
        }
        writeln!(f, "Device : {}", self.device)?;
        write!(f, "Array dtype: {}", self.dtype)
    }
}
