//! # voxtrace
//!
//! Progressive Monte-Carlo path tracer for editable sparse voxel scenes.
//!
//! A [`VoxelGrid`](grid::VoxelGrid) stores materials and colors in 8³ blocks. Rays walk
//! it with a DDA and also hit an analytic SDF floor. Each pass traces one path per
//! pixel with next-event estimation toward a directional light and Russian roulette
//! termination, and sums the result into an accumulation buffer that is tone mapped
//! on demand. The number of passes per frame adapts to the measured frame time.
//!
//! ## Modules
//!
//! - [`util`] - Errors, math helpers, per-path random streams
//! - [`grid`] - Voxel storage and the shared, versioned grid
//! - [`trace`] - DDA traversal, SDF floor, camera rays, picking
//! - [`render`] - Path tracer, accumulation, adaptive sampling, [`Renderer`](render::Renderer)
//! - [`scene`] - Scene configuration and built-in scenes
//! - [`persist`] - Snapshots and save slots
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use voxtrace::prelude::*;
//!
//! let grid = Arc::new(SharedGrid::new(Preset::Wall.build()));
//! let mut renderer = Renderer::new(grid, 320, 180).with_camera(Preset::Wall.camera());
//! let mut spp = SppController::default();
//! for _ in 0..10 {
//!     renderer.render_frame(&mut spp);
//! }
//! let image = renderer.fetch_image();
//! assert_eq!(image.pixels.len(), 320 * 180);
//! ```

pub mod grid;
pub mod persist;
pub mod render;
pub mod scene;
pub mod trace;
pub mod util;

// Re-export commonly used types
pub use util::{Error, Result};

/// Build date stamped by `build.rs`.
pub const BUILD_DATE: &str = env!("VOXTRACE_BUILD_DATE");

/// Build time of day stamped by `build.rs`.
pub const BUILD_TIME: &str = env!("VOXTRACE_BUILD_TIME");

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::grid::{Material, SharedGrid, Voxel, VoxelGrid};
    pub use crate::persist::{SaveSlots, Snapshot};
    pub use crate::render::{FrameStats, Image, Renderer, SppController};
    pub use crate::scene::{Backdrop, DirectionalLight, Preset, SceneConfig};
    pub use crate::trace::{Camera, Floor};
    pub use crate::util::{Error, IVec3, Result, UVec2, Vec3};
}
