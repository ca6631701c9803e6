//! Zero-copy exchange of n-dimensional numeric arrays.
//!
//! - [`BufferDescriptor`] describes typed, shaped, strided memory and hands out typed
//!   views ([`StridedView`], [`MatrixView`], [`VectorView`]) after checking element
//!   type, rank, memory order and device.
//! - [`OwnershipToken`] ties an allocation to a release callback that runs exactly
//!   once, when the last token handle and the last registered descriptor are gone.
//! - [`Exchange`] allocates owned arrays; [`wrap_existing`] and [`wrap_vec`] adopt
//!   memory that already exists.
//! - [`DispatchTable`] picks a typed handler for an array of unknown type at runtime.
//! - [`ReturnPolicy`] states how an array crosses the boundary when returned.

pub mod alloc;
pub mod descriptor;
pub mod device;
pub mod dispatch;
pub mod dtype;
pub mod layout;
pub mod matrix;
pub mod options;
pub mod policy;
pub mod token;
pub mod view;
pub mod view_spec;

pub use alloc::{
    BufferAllocator, Exchange, HeapAllocator, allocate_owned, allocate_owned_ordered,
    wrap_existing, wrap_vec,
};
pub use descriptor::{BufferDescriptor, Inspection};
pub use device::{Device, DeviceKind};
pub use dispatch::{DispatchKey, DispatchTable, Dispatched};
pub use dtype::{DType, DTypeCode, Element};
pub use layout::{Dims, MemoryOrder};
pub use matrix::{MatrixView, MatrixViewMut, VectorView, VectorViewMut};
pub use ndshare_common::{
    Result,
    error::{Error, ErrorKind},
};
pub use options::ExchangeOptions;
pub use policy::{ReturnPolicy, export};
pub use token::{OwnershipToken, ReleaseFn};
pub use view::{Elements, StridedView, StridedViewMut};
pub use view_spec::ViewSpec;
