//! Worked examples of exchanging arrays and objects across a native boundary.
//!
//! - [`matrices`]: dense `f32` matrices and vectors in fixed or any memory order
//! - [`arrays`]: n-dimensional arrays, custom ownership and runtime specialization
//! - [`primitives`]: plain value types and vectors passed by reference

pub mod arrays;
pub mod matrices;
pub mod primitives;
