//! Core definitions (error types and validation helpers), relied upon by all ndshare-* crates.

pub mod error;
pub mod result;

pub use result::Result;
