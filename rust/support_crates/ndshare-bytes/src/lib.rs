//! Aligned byte storage for ndshare array allocations.
//!
//! [`AlignedBytes`] is the default backing store of owned arrays: a fixed-size,
//! zero-initialized heap block whose start is aligned to a caller-chosen power of two.

pub mod align;
pub mod buffer;

pub use buffer::AlignedBytes;
