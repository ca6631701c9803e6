//! Typed strided views over descriptor memory.
//!
//! Views borrow their descriptor, so the memory, the element type and the layout
//! are fixed for the view's lifetime. Element access is bounds checked; the layout
//! itself was validated when the descriptor was built.

use std::{fmt, marker::PhantomData};

use crate::{
    dtype::Element,
    layout::{self, Dims},
};

/// Walks the indices of a shape in row-major order, tracking the element offset of
/// the current index under a set of strides.
#[derive(Debug, Clone)]
pub(crate) struct Cursor {
    shape: Dims,
    strides: Dims,
    index: Dims,
    offset: usize,
    remaining: usize,
}

impl Cursor {
    pub(crate) fn new(shape: &[usize], strides: &[usize]) -> Cursor {
        Cursor {
            shape: shape.iter().copied().collect(),
            strides: strides.iter().copied().collect(),
            index: shape.iter().map(|_| 0).collect(),
            offset: 0,
            remaining: layout::element_count(shape).unwrap_or(0),
        }
    }

    #[inline]
    pub(crate) fn is_done(&self) -> bool {
        self.remaining == 0
    }

    #[inline]
    pub(crate) fn offset(&self) -> usize {
        self.offset
    }

    #[inline]
    pub(crate) fn index(&self) -> &[usize] {
        &self.index
    }

    pub(crate) fn advance(&mut self) {
        if self.remaining == 0 {
            return;
        }
        self.remaining -= 1;
        if self.remaining == 0 {
            return;
        }
        for dim in (0..self.shape.len()).rev() {
            self.index[dim] += 1;
            self.offset = self.offset.wrapping_add(self.strides[dim]);
            if self.index[dim] < self.shape[dim] {
                return;
            }
            self.offset = self
                .offset
                .wrapping_sub(self.strides[dim].wrapping_mul(self.shape[dim]));
            self.index[dim] = 0;
        }
    }
}

fn offset_of(shape: &[usize], strides: &[usize], index: &[usize]) -> Option<usize> {
    if index.len() != shape.len() {
        return None;
    }
    let mut offset = 0;
    for ((&i, &extent), &stride) in index.iter().zip(shape).zip(strides) {
        if i >= extent {
            return None;
        }
        offset += i * stride;
    }
    Some(offset)
}

/// Read-only view of an n-dimensional array of `T`.
pub struct StridedView<'v, T> {
    ptr: *const T,
    shape: Dims,
    strides: Dims,
    _marker: PhantomData<&'v [T]>,
}

unsafe impl<T: Sync> Send for StridedView<'_, T> {}
unsafe impl<T: Sync> Sync for StridedView<'_, T> {}

impl<'v, T: Element> StridedView<'v, T> {
    /// # Safety
    ///
    /// Every element addressed by `shape` and `strides` must be readable for `'v` and
    /// not written during that time.
    pub(crate) unsafe fn new(ptr: *const T, shape: &[usize], strides: &[usize]) -> Self {
        StridedView {
            ptr,
            shape: shape.iter().copied().collect(),
            strides: strides.iter().copied().collect(),
            _marker: PhantomData,
        }
    }

    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn strides(&self) -> &[usize] {
        &self.strides
    }

    pub fn len(&self) -> usize {
        self.shape.iter().product()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Element at `index`, or `None` if the index is out of bounds or has the wrong
    /// rank.
    pub fn get(&self, index: &[usize]) -> Option<T> {
        let offset = offset_of(&self.shape, &self.strides, index)?;
        Some(unsafe { *self.ptr.add(offset) })
    }

    /// Element at `index`.
    ///
    /// # Panics
    ///
    /// Panics if the index is out of bounds.
    pub fn at(&self, index: &[usize]) -> T {
        match self.get(index) {
            Some(value) => value,
            None => panic!("index {index:?} out of bounds for shape {:?}", self.shape()),
        }
    }

    /// Elements in row-major index order, regardless of the memory layout.
    pub fn iter(&self) -> Elements<'_, T> {
        Elements {
            ptr: self.ptr,
            cursor: Cursor::new(&self.shape, &self.strides),
            _marker: PhantomData,
        }
    }

    pub fn to_vec(&self) -> Vec<T> {
        self.iter().collect()
    }
}

impl<T: Element + fmt::Debug> fmt::Debug for StridedView<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StridedView")
            .field("shape", &self.shape())
            .field("strides", &self.strides())
            .field("values", &self.to_vec())
            .finish()
    }
}

impl<T: Element + fmt::Debug> fmt::Debug for StridedViewMut<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StridedViewMut")
            .field("shape", &self.shape())
            .field("strides", &self.strides())
            .field("values", &self.to_vec())
            .finish()
    }
}

/// Iterator over the elements of a view in row-major index order.
pub struct Elements<'v, T> {
    ptr: *const T,
    cursor: Cursor,
    _marker: PhantomData<&'v [T]>,
}

impl<T: Element> Iterator for Elements<'_, T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        if self.cursor.is_done() {
            return None;
        }
        let value = unsafe { *self.ptr.add(self.cursor.offset()) };
        self.cursor.advance();
        Some(value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.cursor.remaining, Some(self.cursor.remaining))
    }
}

impl<T: Element> ExactSizeIterator for Elements<'_, T> {}

/// Mutable view of an n-dimensional array of `T`. The layout never addresses an
/// element twice.
pub struct StridedViewMut<'v, T> {
    ptr: *mut T,
    shape: Dims,
    strides: Dims,
    _marker: PhantomData<&'v mut [T]>,
}

unsafe impl<T: Send> Send for StridedViewMut<'_, T> {}
unsafe impl<T: Sync> Sync for StridedViewMut<'_, T> {}

impl<'v, T: Element> StridedViewMut<'v, T> {
    /// # Safety
    ///
    /// Every element addressed by `shape` and `strides` must be valid for reads and
    /// writes for `'v`, exclusively accessed through this view, and addressed by at
    /// most one index.
    pub(crate) unsafe fn new(ptr: *mut T, shape: &[usize], strides: &[usize]) -> Self {
        StridedViewMut {
            ptr,
            shape: shape.iter().copied().collect(),
            strides: strides.iter().copied().collect(),
            _marker: PhantomData,
        }
    }

    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn strides(&self) -> &[usize] {
        &self.strides
    }

    pub fn len(&self) -> usize {
        self.shape.iter().product()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Reborrows as a read-only view.
    pub fn as_view(&self) -> StridedView<'_, T> {
        unsafe { StridedView::new(self.ptr, &self.shape, &self.strides) }
    }

    pub fn get(&self, index: &[usize]) -> Option<T> {
        let offset = offset_of(&self.shape, &self.strides, index)?;
        Some(unsafe { *self.ptr.add(offset) })
    }

    pub fn get_mut(&mut self, index: &[usize]) -> Option<&mut T> {
        let offset = offset_of(&self.shape, &self.strides, index)?;
        Some(unsafe { &mut *self.ptr.add(offset) })
    }

    /// # Panics
    ///
    /// Panics if the index is out of bounds.
    pub fn at(&self, index: &[usize]) -> T {
        self.as_view().at(index)
    }

    /// # Panics
    ///
    /// Panics if the index is out of bounds.
    pub fn set(&mut self, index: &[usize], value: T) {
        match self.get_mut(index) {
            Some(slot) => *slot = value,
            None => panic!("index {index:?} out of bounds for shape {:?}", self.shape),
        }
    }

    /// Writes `f(index)` to every element.
    pub fn fill_with(&mut self, mut f: impl FnMut(&[usize]) -> T) {
        let mut cursor = Cursor::new(&self.shape, &self.strides);
        while !cursor.is_done() {
            unsafe { *self.ptr.add(cursor.offset()) = f(cursor.index()) };
            cursor.advance();
        }
    }

    /// Replaces every element `x` with `f(x)`.
    pub fn map_inplace(&mut self, mut f: impl FnMut(T) -> T) {
        let mut cursor = Cursor::new(&self.shape, &self.strides);
        while !cursor.is_done() {
            unsafe {
                let slot = self.ptr.add(cursor.offset());
                *slot = f(*slot);
            }
            cursor.advance();
        }
    }

    pub fn to_vec(&self) -> Vec<T> {
        self.as_view().to_vec()
    }
}
