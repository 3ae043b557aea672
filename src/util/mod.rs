//! Utility types shared across the renderer.
//!
//! - [`Error`] / [`Result`] - Error handling
//! - Math re-exports from glam plus ray/box primitives
//! - Per-path random streams

mod error;
mod math;
mod rng;

pub use error::*;
pub use math::*;
pub use rng::*;
