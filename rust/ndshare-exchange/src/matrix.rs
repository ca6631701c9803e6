//! Fixed-rank views: matrices and vectors.

use std::{fmt, marker::PhantomData};

use crate::{dtype::Element, layout::MemoryOrder};

/// Read-only rank-2 view.
pub struct MatrixView<'v, T> {
    ptr: *const T,
    rows: usize,
    cols: usize,
    row_stride: usize,
    col_stride: usize,
    _marker: PhantomData<&'v [T]>,
}

unsafe impl<T: Sync> Send for MatrixView<'_, T> {}
unsafe impl<T: Sync> Sync for MatrixView<'_, T> {}

impl<'v, T: Element> MatrixView<'v, T> {
    /// # Safety
    ///
    /// Same contract as a read-only strided view over `shape` and `strides`.
    pub(crate) unsafe fn new(ptr: *const T, shape: [usize; 2], strides: [usize; 2]) -> Self {
        MatrixView {
            ptr,
            rows: shape[0],
            cols: shape[1],
            row_stride: strides[0],
            col_stride: strides[1],
            _marker: PhantomData,
        }
    }

    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[inline]
    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn order(&self) -> MemoryOrder {
        crate::layout::order_of(&[self.rows, self.cols], &[self.row_stride, self.col_stride])
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> Option<T> {
        (row < self.rows && col < self.cols)
            .then(|| unsafe { *self.ptr.add(row * self.row_stride + col * self.col_stride) })
    }

    /// # Panics
    ///
    /// Panics if `(row, col)` is out of bounds.
    pub fn at(&self, row: usize, col: usize) -> T {
        match self.get(row, col) {
            Some(value) => value,
            None => panic!(
                "({row}, {col}) out of bounds for a {}x{} matrix",
                self.rows, self.cols
            ),
        }
    }

    /// Elements in row-major order.
    pub fn to_vec(&self) -> Vec<T> {
        let mut values = Vec::with_capacity(self.rows * self.cols);
        for r in 0..self.rows {
            for c in 0..self.cols {
                values.push(self.at(r, c));
            }
        }
        values
    }
}

/// Mutable rank-2 view.
pub struct MatrixViewMut<'v, T> {
    ptr: *mut T,
    rows: usize,
    cols: usize,
    row_stride: usize,
    col_stride: usize,
    _marker: PhantomData<&'v mut [T]>,
}

unsafe impl<T: Send> Send for MatrixViewMut<'_, T> {}
unsafe impl<T: Sync> Sync for MatrixViewMut<'_, T> {}

impl<'v, T: Element> MatrixViewMut<'v, T> {
    /// # Safety
    ///
    /// Same contract as a mutable strided view over `shape` and `strides`.
    pub(crate) unsafe fn new(ptr: *mut T, shape: [usize; 2], strides: [usize; 2]) -> Self {
        MatrixViewMut {
            ptr,
            rows: shape[0],
            cols: shape[1],
            row_stride: strides[0],
            col_stride: strides[1],
            _marker: PhantomData,
        }
    }

    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[inline]
    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn as_view(&self) -> MatrixView<'_, T> {
        unsafe {
            MatrixView::new(
                self.ptr,
                [self.rows, self.cols],
                [self.row_stride, self.col_stride],
            )
        }
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> Option<T> {
        self.as_view().get(row, col)
    }

    /// # Panics
    ///
    /// Panics if `(row, col)` is out of bounds.
    pub fn at(&self, row: usize, col: usize) -> T {
        self.as_view().at(row, col)
    }

    /// # Panics
    ///
    /// Panics if `(row, col)` is out of bounds.
    pub fn set(&mut self, row: usize, col: usize, value: T) {
        assert!(
            row < self.rows && col < self.cols,
            "({row}, {col}) out of bounds for a {}x{} matrix",
            self.rows,
            self.cols
        );
        unsafe { *self.ptr.add(row * self.row_stride + col * self.col_stride) = value };
    }

    /// Writes `f(row, col)` to every element.
    pub fn fill_with(&mut self, mut f: impl FnMut(usize, usize) -> T) {
        for r in 0..self.rows {
            for c in 0..self.cols {
                self.set(r, c, f(r, c));
            }
        }
    }

    pub fn map_inplace(&mut self, mut f: impl FnMut(T) -> T) {
        for r in 0..self.rows {
            for c in 0..self.cols {
                let value = self.at(r, c);
                self.set(r, c, f(value));
            }
        }
    }

    /// Elements in row-major order.
    pub fn to_vec(&self) -> Vec<T> {
        self.as_view().to_vec()
    }
}

/// Read-only rank-1 view.
pub struct VectorView<'v, T> {
    ptr: *const T,
    len: usize,
    stride: usize,
    _marker: PhantomData<&'v [T]>,
}

unsafe impl<T: Sync> Send for VectorView<'_, T> {}
unsafe impl<T: Sync> Sync for VectorView<'_, T> {}

impl<'v, T: Element> VectorView<'v, T> {
    /// # Safety
    ///
    /// Same contract as a read-only strided view of one dimension.
    pub(crate) unsafe fn new(ptr: *const T, len: usize, stride: usize) -> Self {
        VectorView {
            ptr,
            len,
            stride,
            _marker: PhantomData,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn stride(&self) -> usize {
        self.stride
    }

    #[inline]
    pub fn get(&self, i: usize) -> Option<T> {
        (i < self.len).then(|| unsafe { *self.ptr.add(i * self.stride) })
    }

    /// # Panics
    ///
    /// Panics if `i` is out of bounds.
    pub fn at(&self, i: usize) -> T {
        match self.get(i) {
            Some(value) => value,
            None => panic!("index {i} out of bounds for length {}", self.len),
        }
    }

    /// The elements as a slice when they are adjacent in memory.
    pub fn as_slice(&self) -> Option<&'v [T]> {
        (self.stride == 1 || self.len <= 1)
            .then(|| unsafe { std::slice::from_raw_parts(self.ptr, self.len) })
    }

    pub fn iter(&self) -> impl ExactSizeIterator<Item = T> + '_ {
        (0..self.len).map(|i| self.at(i))
    }

    pub fn to_vec(&self) -> Vec<T> {
        self.iter().collect()
    }
}

/// Mutable rank-1 view.
pub struct VectorViewMut<'v, T> {
    ptr: *mut T,
    len: usize,
    stride: usize,
    _marker: PhantomData<&'v mut [T]>,
}

unsafe impl<T: Send> Send for VectorViewMut<'_, T> {}
unsafe impl<T: Sync> Sync for VectorViewMut<'_, T> {}

impl<'v, T: Element> VectorViewMut<'v, T> {
    /// # Safety
    ///
    /// Same contract as a mutable strided view of one dimension.
    pub(crate) unsafe fn new(ptr: *mut T, len: usize, stride: usize) -> Self {
        VectorViewMut {
            ptr,
            len,
            stride,
            _marker: PhantomData,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn as_view(&self) -> VectorView<'_, T> {
        unsafe { VectorView::new(self.ptr, self.len, self.stride) }
    }

    #[inline]
    pub fn get(&self, i: usize) -> Option<T> {
        self.as_view().get(i)
    }

    /// # Panics
    ///
    /// Panics if `i` is out of bounds.
    pub fn at(&self, i: usize) -> T {
        self.as_view().at(i)
    }

    /// # Panics
    ///
    /// Panics if `i` is out of bounds.
    pub fn set(&mut self, i: usize, value: T) {
        assert!(i < self.len, "index {i} out of bounds for length {}", self.len);
        unsafe { *self.ptr.add(i * self.stride) = value };
    }

    pub fn as_mut_slice(&mut self) -> Option<&mut [T]> {
        (self.stride == 1 || self.len <= 1)
            .then(|| unsafe { std::slice::from_raw_parts_mut(self.ptr, self.len) })
    }

    pub fn fill_with(&mut self, mut f: impl FnMut(usize) -> T) {
        for i in 0..self.len {
            self.set(i, f(i));
        }
    }

    pub fn map_inplace(&mut self, mut f: impl FnMut(T) -> T) {
        for i in 0..self.len {
            let value = self.at(i);
            self.set(i, f(value));
        }
    }

    pub fn to_vec(&self) -> Vec<T> {
        self.as_view().to_vec()
    }
}

impl<T: Element + fmt::Debug> fmt::Debug for MatrixView<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MatrixView")
            .field("rows", &self.rows)
            .field("cols", &self.cols)
            .field("values", &self.to_vec())
            .finish()
    }
}

impl<T: Element + fmt::Debug> fmt::Debug for MatrixViewMut<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MatrixViewMut")
            .field("rows", &self.rows)
            .field("cols", &self.cols)
            .field("values", &self.to_vec())
            .finish()
    }
}

impl<T: Element + fmt::Debug> fmt::Debug for VectorView<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VectorView")
            .field("stride", &self.stride)
            .field("values", &self.to_vec())
            .finish()
    }
}

impl<T: Element + fmt::Debug> fmt::Debug for VectorViewMut<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VectorViewMut")
            .field("stride", &self.stride)
            .field("values", &self.to_vec())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matrix_addressing() {
        // 2x3 column-major.
        let data = [1.0f32, 4.0, 2.0, 5.0, 3.0, 6.0];
        let m = unsafe { MatrixView::new(data.as_ptr(), [2, 3], [1, 2]) };
        assert_eq!(m.to_vec(), vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        assert_eq!(m.order(), MemoryOrder::ColumnMajor);
        assert_eq!(m.get(2, 0), None);
    }

    #[test]
    fn test_matrix_mut() {
        let mut data = [0u16; 6];
        let mut m = unsafe { MatrixViewMut::new(data.as_mut_ptr(), [3, 2], [2, 1]) };
        m.fill_with(|r, c| (r * 2 + c) as u16);
        m.map_inplace(|x| x * 3);
        assert_eq!(m.at(2, 1), 15);
        assert_eq!(data, [0, 3, 6, 9, 12, 15]);
    }

    #[test]
    fn test_vector_strided() {
        let mut data = [1i64, -1, 2, -2, 3, -3];
        let mut v = unsafe { VectorViewMut::new(data.as_mut_ptr(), 3, 2) };
        assert!(v.as_mut_slice().is_none());
        v.map_inplace(|x| x * 10);
        assert_eq!(v.to_vec(), vec![10, 20, 30]);
        assert_eq!(data, [10, -1, 20, -2, 30, -3]);
    }

    #[test]
    fn test_debug_lists_values() {
        let mut data = [1u8, 2, 3, 4];
        let m = unsafe { MatrixView::new(data.as_ptr(), [2, 2], [2, 1]) };
        assert_eq!(
            format!("{m:?}"),
            "MatrixView { rows: 2, cols: 2, values: [1, 2, 3, 4] }"
        );
        let v = unsafe { VectorViewMut::new(data.as_mut_ptr(), 2, 2) };
        assert_eq!(format!("{v:?}"), "VectorViewMut { stride: 2, values: [1, 3] }");
    }
}
