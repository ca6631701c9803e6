//! Runtime selection of a typed handler for an array of unknown element type and
//! rank.

use std::fmt;

use ndshare_common::Result;

use crate::{
    descriptor::BufferDescriptor,
    dtype::{DType, Element},
    view::StridedViewMut,
};

/// Element type and rank an arm of a [`DispatchTable`] accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DispatchKey {
    pub dtype: DType,
    pub ndim: usize,
}

impl DispatchKey {
    pub fn of(desc: &BufferDescriptor<'_>) -> DispatchKey {
        DispatchKey {
            dtype: desc.dtype(),
            ndim: desc.ndim(),
        }
    }
}

impl fmt::Display for DispatchKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.dtype, self.ndim)
    }
}

/// Outcome of a dispatch. Finding no arm is a normal result, not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatched<R> {
    Matched { key: DispatchKey, value: R },
    NoMatch { key: DispatchKey },
}

impl<R> Dispatched<R> {
    pub fn is_match(&self) -> bool {
        matches!(self, Dispatched::Matched { .. })
    }

    pub fn key(&self) -> DispatchKey {
        match self {
            Dispatched::Matched { key, .. } | Dispatched::NoMatch { key } => *key,
        }
    }

    pub fn value(self) -> Option<R> {
        match self {
            Dispatched::Matched { value, .. } => Some(value),
            Dispatched::NoMatch { .. } => None,
        }
    }
}

type ArmFn<'h, R> = Box<dyn FnMut(&mut BufferDescriptor<'_>) -> Result<R> + 'h>;

struct Arm<'h, R> {
    key: DispatchKey,
    call: ArmFn<'h, R>,
}

/// Ordered list of `(element type, rank)` handlers.
///
/// Arms are tried in the order they were added; the first arm whose key equals the
/// descriptor's element type and rank receives a mutable strided view.
///
/// ```
/// use ndshare_exchange::{BufferDescriptor, DispatchTable, MemoryOrder};
///
/// let mut data = [0i32; 6];
/// let mut desc = BufferDescriptor::describe(&mut data, &[2, 3], None, MemoryOrder::RowMajor)?;
/// let mut table = DispatchTable::new()
///     .on::<f32, _>(2, |_view| "float")
///     .on::<i32, _>(2, |_view| "int");
/// assert_eq!(table.dispatch(&mut desc)?.value(), Some("int"));
/// # Ok::<(), ndshare_exchange::Error>(())
/// ```
pub struct DispatchTable<'h, R> {
    arms: Vec<Arm<'h, R>>,
}

impl<'h, R> DispatchTable<'h, R> {
    pub fn new() -> Self {
        DispatchTable { arms: Vec::new() }
    }

    /// Adds an arm for rank-`ndim` arrays of `T`.
    pub fn on<T, F>(mut self, ndim: usize, mut handler: F) -> Self
    where
        T: Element,
        F: FnMut(StridedViewMut<'_, T>) -> R + 'h,
        R: 'h,
    {
        let key = DispatchKey {
            dtype: T::DTYPE,
            ndim,
        };
        let call = boxed_arm(move |desc| {
            let view = desc.any_layout_view_mut::<T>(ndim)?;
            Ok(handler(view))
        });
        self.arms.push(Arm { key, call });
        self
    }

    /// Keys of the arms in priority order.
    pub fn candidates(&self) -> Vec<DispatchKey> {
        self.arms.iter().map(|arm| arm.key).collect()
    }

    /// Runs the first arm matching `desc`.
    ///
    /// Errors only come from a matched arm being unable to view the array
    /// (device memory, a read-only or self-overlapping descriptor).
    pub fn dispatch(&mut self, desc: &mut BufferDescriptor<'_>) -> Result<Dispatched<R>> {
        let key = DispatchKey::of(desc);
        match self.arms.iter().position(|arm| arm.key == key) {
            Some(pos) => {
                log::trace!("dispatch {key}: arm {pos}");
                let value = (self.arms[pos].call)(desc)?;
                Ok(Dispatched::Matched { key, value })
            }
            None => {
                log::trace!("dispatch {key}: no match among {} arms", self.arms.len());
                Ok(Dispatched::NoMatch { key })
            }
        }
    }
}

impl<R> Default for DispatchTable<'_, R> {
    fn default() -> Self {
        Self::new()
    }
}

fn boxed_arm<'h, R, F>(f: F) -> ArmFn<'h, R>
where
    F: for<'d, 'a> FnMut(&'d mut BufferDescriptor<'a>) -> Result<R> + 'h,
{
    Box::new(f)
}

#[cfg(test)]
mod tests {
    use ndshare_common::error::ErrorKind;

    use super::*;
    use crate::layout::MemoryOrder;

    fn fill_table<'h>() -> DispatchTable<'h, &'static str> {
        DispatchTable::new()
            .on::<f32, _>(2, |mut view| {
                view.fill_with(|idx| (idx[0] * idx[1]) as f32 + 0.5);
                "float32"
            })
            .on::<i32, _>(2, |mut view| {
                view.fill_with(|idx| (idx[0] + idx[1]) as i32);
                "int32"
            })
    }

    #[test]
    fn test_first_matching_arm_wins() {
        let mut data = [0i32; 6];
        let mut desc =
            BufferDescriptor::describe(&mut data, &[2, 3], None, MemoryOrder::RowMajor).unwrap();
        let mut table = fill_table().on::<i32, _>(2, |_| "shadowed");
        let outcome = table.dispatch(&mut desc).unwrap();
        assert_eq!(
            outcome,
            Dispatched::Matched {
                key: DispatchKey {
                    dtype: DType::Int32,
                    ndim: 2
                },
                value: "int32"
            }
        );
        drop(desc);
        assert_eq!(data, [0, 1, 2, 1, 2, 3]);
    }

    #[test]
    fn test_no_match_is_not_an_error() {
        let mut data = [0f64; 4];
        let mut desc = BufferDescriptor::from_slice(&mut data);
        let mut table = fill_table();
        let outcome = table.dispatch(&mut desc).unwrap();
        assert!(!outcome.is_match());
        assert_eq!(outcome.key().to_string(), "(float64, 1)");
        assert_eq!(table.candidates().len(), 2);
    }

    #[test]
    fn test_read_only_match_is_an_error() {
        let data = [0f32; 4];
        let mut desc =
            BufferDescriptor::describe_readonly(&data, &[2, 2], None, MemoryOrder::Any).unwrap();
        let err = fill_table().dispatch(&mut desc).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::ReadOnly));
    }
}
