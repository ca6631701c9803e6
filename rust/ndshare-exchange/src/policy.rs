//! How an array crosses the boundary when a function returns it.

use std::fmt;

use ndshare_common::{Result, error::Error};
use serde::{Deserialize, Serialize};

use crate::{descriptor::BufferDescriptor, layout::MemoryOrder};

/// Ownership semantics of a returned array. Every function that hands an array back
/// takes one explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReturnPolicy {
    /// The caller receives a fresh, independently owned copy.
    Copy,
    /// The caller receives the same memory; whatever keeps it alive (a token or the
    /// borrow) stays in charge.
    Reference,
    /// The caller takes over the allocation's token. Only valid for owned descriptors.
    TakeOwnership,
}

impl fmt::Display for ReturnPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ReturnPolicy::Copy => "copy",
            ReturnPolicy::Reference => "reference",
            ReturnPolicy::TakeOwnership => "take_ownership",
        };
        f.write_str(name)
    }
}

/// Applies `policy` to a descriptor being returned.
///
/// A copy keeps column-major order for column-major arrays and is row-major
/// otherwise.
pub fn export(desc: BufferDescriptor<'_>, policy: ReturnPolicy) -> Result<BufferDescriptor<'_>> {
    log::trace!("exporting {} array {:?} as {policy}", desc.dtype(), desc.shape());
    match policy {
        ReturnPolicy::Copy => {
            let order = if desc.is_column_major() && !desc.is_row_major() {
                MemoryOrder::ColumnMajor
            } else {
                MemoryOrder::RowMajor
            };
            desc.to_contiguous(order)
        }
        ReturnPolicy::Reference => Ok(desc),
        ReturnPolicy::TakeOwnership => {
            if desc.is_owned() {
                Ok(desc)
            } else {
                Err(Error::invalid_operation(
                    "take_ownership of a borrowed array",
                ))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use ndshare_common::error::ErrorKind;

    use super::*;
    use crate::{
        alloc::{allocate_owned, wrap_vec},
        dtype::DType,
    };

    #[test]
    fn test_copy_is_independent() {
        let mut data = vec![1i32, 2, 3, 4, 5, 6];
        let desc =
            BufferDescriptor::describe(&mut data, &[3, 2], Some(&[1, 3]), MemoryOrder::Any)
                .unwrap();
        let source = desc.as_ptr();
        let copy = export(desc, ReturnPolicy::Copy).unwrap();
        assert!(copy.is_owned());
        assert!(copy.is_column_major());
        assert_ne!(copy.as_ptr(), source);
        let m = copy.matrix_view::<i32>(MemoryOrder::ColumnMajor).unwrap();
        assert_eq!(m.at(0, 0), 1);
        assert_eq!(m.at(2, 1), 6);
    }

    #[test]
    fn test_reference_shares_memory() {
        let (desc, token) = wrap_vec(vec![7u8; 4], &[4]).unwrap();
        let ptr = desc.as_ptr();
        let exported = export(desc, ReturnPolicy::Reference).unwrap();
        assert_eq!(exported.as_ptr(), ptr);
        assert!(exported.owner().unwrap().ptr_eq(&token));
    }

    #[test]
    fn test_take_ownership_requires_owner() {
        let (desc, _token) = allocate_owned(&[2], DType::Float32).unwrap();
        assert!(export(desc, ReturnPolicy::TakeOwnership).is_ok());

        let mut data = [0f32; 2];
        let borrowed = BufferDescriptor::from_slice(&mut data);
        let err = export(borrowed, ReturnPolicy::TakeOwnership).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::InvalidOperation { .. }));
    }
}
