//! # ndshare: zero-copy n-dimensional array exchange
//!
//! ndshare lets native code and a host runtime hand n-dimensional arrays to each
//! other without copying the elements. An array crosses the boundary as a
//! [`BufferDescriptor`](exchange::BufferDescriptor): a pointer plus element type,
//! shape, strides and device. Memory allocated on one side is kept alive by an
//! [`OwnershipToken`](exchange::OwnershipToken), whose release callback runs exactly
//! once after the last holder lets go.
//!
//! ## Module Organization
//!
//! * [`exchange`] - Descriptors, typed views, allocation, ownership and dispatch
//! * [`common`] - Error and result types shared by all crates
//! * [`tutorial`] - Worked examples over the exchange layer
//!
//! ### Support Modules
//!
//! * [`support::bytes`] - Aligned byte buffers
//! * [`support::common_traits`] - Memory ownership traits
//!
//! ## Getting Started
//!
//! ```
//! use ndshare::exchange::{BufferDescriptor, MemoryOrder, ReturnPolicy, ViewSpec, export};
//!
//! let mut pixels = vec![0u8; 2 * 2 * 3];
//! let mut desc = BufferDescriptor::describe(&mut pixels, &[2, 2, 3], None, MemoryOrder::RowMajor)?;
//! desc.typed_view_mut::<u8>(&ViewSpec::new().ndim(3))?.fill_with(|idx| idx[2] as u8);
//!
//! let copy = export(desc, ReturnPolicy::Copy)?;
//! assert!(copy.is_owned());
//! assert_eq!(copy.any_layout_view::<u8>(3)?.to_vec()[..3], [0, 1, 2]);
//! # Ok::<(), ndshare::exchange::Error>(())
//! ```

pub use ndshare_common as common;
pub use ndshare_exchange as exchange;
pub use ndshare_tutorial as tutorial;

pub mod support {
    pub use ndshare_bytes as bytes;
    pub use ndshare_common_traits as common_traits;
}
