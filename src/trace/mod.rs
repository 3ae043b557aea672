//! Ray queries against the scene.
//!
//! ```text
//! Camera ──primary ray──► dda_traverse (voxels) ─┐
//!                         Floor::ray_march (SDF) ─┴─► closest hit
//! ```

mod camera;
mod dda;
mod pick;
mod sdf;

pub use camera::Camera;
pub use dda::{dda_traverse, DdaHit};
pub use pick::raycast_voxel_grid;
pub use sdf::{Floor, MARCH_EPS, MAX_MARCH_STEPS};

/// Hits farther than this count as misses; shadow rays use it as "reached the sky".
pub const DIS_LIMIT: f32 = 100.0;
