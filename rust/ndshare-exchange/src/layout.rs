//! Memory order and stride arithmetic.
//!
//! Strides are expressed in elements and are never negative. Dimensions of extent 1
//! do not constrain contiguity (their stride is never used to address memory), and an
//! array with a zero extent is contiguous in every order.

use std::fmt;

use serde::{Deserialize, Serialize};
use tinyvec::TinyVec;

/// Inline storage for shapes and strides; most arrays have at most four dimensions.
pub type Dims = TinyVec<[usize; 4]>;

/// Traversal order of an array's elements in memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryOrder {
    /// The last dimension varies fastest (C order).
    #[default]
    RowMajor,
    /// The first dimension varies fastest (Fortran order).
    ColumnMajor,
    /// No particular order; any non-negative strides.
    Any,
}

impl MemoryOrder {
    pub fn name(self) -> &'static str {
        match self {
            MemoryOrder::RowMajor => "row-major",
            MemoryOrder::ColumnMajor => "column-major",
            MemoryOrder::Any => "any order",
        }
    }

    /// Returns `true` if `strides` lay out `shape` in this order.
    /// `Any` accepts everything.
    pub fn is_satisfied_by(self, shape: &[usize], strides: &[usize]) -> bool {
        match self {
            MemoryOrder::RowMajor => is_row_major(shape, strides),
            MemoryOrder::ColumnMajor => is_column_major(shape, strides),
            MemoryOrder::Any => true,
        }
    }

    /// Contiguous strides for `shape` in this order (`Any` yields row-major).
    ///
    /// Returns `None` if the element count overflows.
    pub fn strides_for(self, shape: &[usize]) -> Option<Dims> {
        match self {
            MemoryOrder::RowMajor | MemoryOrder::Any => row_major_strides(shape),
            MemoryOrder::ColumnMajor => column_major_strides(shape),
        }
    }
}

impl fmt::Display for MemoryOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Number of elements addressed by `shape`, or `None` on overflow.
pub fn element_count(shape: &[usize]) -> Option<usize> {
    shape.iter().try_fold(1usize, |acc, &n| acc.checked_mul(n))
}

/// Row-major (C order) element strides for `shape`.
pub fn row_major_strides(shape: &[usize]) -> Option<Dims> {
    let mut strides: Dims = shape.iter().map(|_| 0).collect();
    let mut acc = 1usize;
    for (stride, &extent) in strides.iter_mut().zip(shape).rev() {
        *stride = acc;
        acc = acc.checked_mul(extent)?;
    }
    Some(strides)
}

/// Column-major (Fortran order) element strides for `shape`.
pub fn column_major_strides(shape: &[usize]) -> Option<Dims> {
    let mut strides: Dims = shape.iter().map(|_| 0).collect();
    let mut acc = 1usize;
    for (stride, &extent) in strides.iter_mut().zip(shape) {
        *stride = acc;
        acc = acc.checked_mul(extent)?;
    }
    Some(strides)
}

pub fn is_row_major(shape: &[usize], strides: &[usize]) -> bool {
    is_contiguous_along(shape.iter().zip(strides).rev())
}

pub fn is_column_major(shape: &[usize], strides: &[usize]) -> bool {
    is_contiguous_along(shape.iter().zip(strides))
}

fn is_contiguous_along<'s>(dims: impl Iterator<Item = (&'s usize, &'s usize)> + Clone) -> bool {
    if dims.clone().any(|(&extent, _)| extent == 0) {
        return true;
    }
    let mut expected = 1usize;
    for (&extent, &stride) in dims {
        if extent == 1 {
            continue;
        }
        if stride != expected {
            return false;
        }
        expected = match expected.checked_mul(extent) {
            Some(n) => n,
            None => return false,
        };
    }
    true
}

/// Number of elements between the first and one past the last addressed element,
/// i.e. the minimal buffer length the layout requires. `None` on overflow.
pub fn span(shape: &[usize], strides: &[usize]) -> Option<usize> {
    if shape.contains(&0) {
        return Some(0);
    }
    shape
        .iter()
        .zip(strides)
        .try_fold(1usize, |acc, (&extent, &stride)| {
            (extent - 1)
                .checked_mul(stride)
                .and_then(|n| acc.checked_add(n))
        })
}

/// Returns `true` if no two distinct indices map to the same element offset.
///
/// Dimensions are visited from the smallest stride up; each stride must step past
/// everything the previous dimensions can reach.
pub fn is_non_overlapping(shape: &[usize], strides: &[usize]) -> bool {
    if shape.contains(&0) {
        return true;
    }
    let mut dims: TinyVec<[(usize, usize); 4]> = shape
        .iter()
        .zip(strides)
        .filter(|&(&extent, _)| extent > 1)
        .map(|(&extent, &stride)| (stride, extent))
        .collect();
    dims.sort_unstable();

    let mut reach = 0usize;
    for (stride, extent) in dims {
        if stride <= reach {
            return false;
        }
        reach = match (extent - 1)
            .checked_mul(stride)
            .and_then(|n| reach.checked_add(n))
        {
            Some(n) => n,
            None => return false,
        };
    }
    true
}

/// Order a layout is contiguous in; `Any` if neither. Row-major wins when both
/// apply (vectors, single elements, empty arrays).
pub fn order_of(shape: &[usize], strides: &[usize]) -> MemoryOrder {
    if is_row_major(shape, strides) {
        MemoryOrder::RowMajor
    } else if is_column_major(shape, strides) {
        MemoryOrder::ColumnMajor
    } else {
        MemoryOrder::Any
    }
}
