//! Utility types and functions for meshpick.
//!
//! This module contains fundamental types used throughout the library:
//! - [`Aabb`] / [`Ray`] - Query primitives
//! - [`Error`] / [`Result`] - Error handling
//! - Math type re-exports from glam

mod error;
mod math;

pub use error::*;
pub use math::*;
