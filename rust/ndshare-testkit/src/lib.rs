//! Test utilities for the ndshare crates:
//! - Allocators and release callbacks that count what they free
//! - Random array layouts and sequential fill patterns

pub mod counting;
pub mod layouts;

pub use counting::{AllocStats, CountingAllocator, ReleaseCounter};
pub use layouts::{RandomLayout, random_layout, sequence};
