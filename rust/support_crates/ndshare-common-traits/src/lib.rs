//! Traits and definitions used throughout the ndshare crates.
//!
//! # Modules
//!
//! - [`memory_owner`]: Traits for values that own a block of memory which can be
//!   exposed to array views without copying

pub mod memory_owner;
