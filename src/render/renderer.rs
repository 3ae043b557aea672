//! Renderer facade tying grid, camera, config and accumulation together.

use std::sync::Arc;
use std::time::{Duration, Instant};

use super::{AccumulationBuffer, Image, SppController, TraceContext};
use crate::grid::{Material, SharedGrid};
use crate::persist::{self, Snapshot};
use crate::scene::SceneConfig;
use crate::trace::{self, Camera};
use crate::util::{IVec3, Result, UVec2, Vec3};

/// Timing of one adaptive frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameStats {
    /// Passes run this frame.
    pub spp: u32,
    pub elapsed: Duration,
    /// Samples per pixel accumulated so far.
    pub total_samples: u64,
    /// Passes the controller wants for the next frame.
    pub next_spp: u32,
}

/// Progressive path tracer over a [`SharedGrid`].
///
/// Accumulated samples are thrown away whenever the grid version, the camera, the
/// configuration or the highlighted cell changes.
pub struct Renderer {
    grid: Arc<SharedGrid>,
    camera: Camera,
    config: SceneConfig,
    highlight: Option<IVec3>,
    buffer: AccumulationBuffer,
    /// Grid version the buffer's samples were traced against.
    seen_version: u64,
}

impl Renderer {
    pub fn new(grid: Arc<SharedGrid>, width: u32, height: u32) -> Self {
        let seen_version = grid.version();
        Self {
            grid,
            camera: Camera::default(),
            config: SceneConfig::default(),
            highlight: None,
            buffer: AccumulationBuffer::new(width, height),
            seen_version,
        }
    }

    pub fn with_camera(mut self, camera: Camera) -> Self {
        self.set_camera(camera);
        self
    }

    pub fn with_config(mut self, config: SceneConfig) -> Self {
        self.set_config(config);
        self
    }

    #[inline]
    pub fn grid(&self) -> &Arc<SharedGrid> {
        &self.grid
    }

    #[inline]
    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    #[inline]
    pub fn config(&self) -> &SceneConfig {
        &self.config
    }

    #[inline]
    pub fn highlight(&self) -> Option<IVec3> {
        self.highlight
    }

    #[inline]
    pub fn resolution(&self) -> UVec2 {
        self.buffer.resolution()
    }

    /// Samples per pixel accumulated since the last reset.
    #[inline]
    pub fn samples(&self) -> u64 {
        self.buffer.passes()
    }

    #[inline]
    pub fn buffer(&self) -> &AccumulationBuffer {
        &self.buffer
    }

    pub fn set_camera(&mut self, camera: Camera) {
        if camera != self.camera {
            self.camera = camera;
            self.reset_framebuffer();
        }
    }

    /// Replace the configuration. Values are clamped into range first.
    pub fn set_config(&mut self, config: SceneConfig) {
        let config = config.sanitized();
        if config != self.config {
            self.config = config;
            self.reset_framebuffer();
        }
    }

    /// Cell to draw highlighted, typically the one under the cursor.
    pub fn set_highlight(&mut self, cell: Option<IVec3>) {
        if cell != self.highlight {
            self.highlight = cell;
            self.reset_framebuffer();
        }
    }

    /// Change the output size; drops accumulated samples.
    pub fn resize(&mut self, width: u32, height: u32) {
        if UVec2::new(width, height) != self.buffer.resolution() {
            self.buffer = AccumulationBuffer::new(width, height);
        }
    }

    pub fn reset_framebuffer(&mut self) {
        self.buffer.reset();
    }

    /// Reset if the grid was edited since the last pass.
    fn sync_grid_version(&mut self) {
        let version = self.grid.version();
        if version != self.seen_version {
            tracing::debug!(from = self.seen_version, to = version, "grid edited, resetting");
            self.seen_version = version;
            self.buffer.reset();
        }
    }

    /// Run exactly one sample pass over every pixel.
    pub fn accumulate(&mut self) {
        self.sync_grid_version();
        let grid = self.grid.read();
        let ctx = TraceContext::new(&grid, &self.config).with_highlight(self.highlight);
        let camera = self.camera;
        let res = self.buffer.resolution();
        self.buffer
            .add_pass(|pixel, pass| ctx.sample_pixel(&camera, res, pixel, pass));
    }

    /// Tone-mapped view of the accumulated samples.
    pub fn fetch_image(&self) -> Image {
        self.buffer.tone_map(&self.config.tone_map())
    }

    /// One frame of the adaptive loop: run `controller.spp()` passes, then feed the
    /// measured time back to the controller.
    #[tracing::instrument(skip_all, fields(spp = controller.spp()))]
    pub fn render_frame(&mut self, controller: &mut SppController) -> FrameStats {
        let spp = controller.spp();
        let start = Instant::now();
        for _ in 0..spp {
            self.accumulate();
        }
        let elapsed = start.elapsed();
        let next_spp = controller.update(elapsed);
        FrameStats {
            spp,
            elapsed,
            total_samples: self.samples(),
            next_spp,
        }
    }

    /// Pick the cell under `pixel`; see [`trace::raycast_voxel_grid`].
    pub fn raycast_voxel_grid(&self, pixel: UVec2, solid: bool) -> Option<IVec3> {
        let grid = self.grid.read();
        trace::raycast_voxel_grid(&grid, &self.camera, self.buffer.resolution(), pixel, solid)
    }

    pub fn set_voxel(&mut self, cell: IVec3, material: Material, color: Vec3) {
        self.grid.set_voxel(cell, material, color);
        self.sync_grid_version();
    }

    pub fn delete_voxel(&mut self, cell: IVec3) {
        self.grid.delete_voxel(cell);
        self.sync_grid_version();
    }

    pub fn set_voxel_color(&mut self, cell: IVec3, color: Vec3) {
        self.grid.set_voxel_color(cell, color);
        self.sync_grid_version();
    }

    pub fn get_voxel_color(&self, cell: IVec3) -> Vec3 {
        self.grid.get_voxel_color(cell)
    }

    /// Encode the current grid.
    pub fn save_snapshot(&self) -> Result<Vec<u8>> {
        persist::save(&self.grid.read())
    }

    /// Replace the grid from a blob and reset accumulation.
    ///
    /// A blob that fails to decode or does not fit the grid changes nothing.
    pub fn load_snapshot(&mut self, blob: &[u8]) -> Result<()> {
        let snapshot = Snapshot::decode(blob)?;
        self.grid.try_edit(|grid| snapshot.apply(grid))?;
        self.sync_grid_version();
        tracing::info!(voxels = self.grid.read().non_empty_count(), "snapshot loaded");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::VoxelGrid;

    fn small() -> Renderer {
        let shared = Arc::new(SharedGrid::new(VoxelGrid::new(16, 1.0 / 16.0)));
        shared.set_voxel(IVec3::ZERO, Material::Diffuse, Vec3::ONE);
        let camera = Camera::new(Vec3::new(0.3, 0.4, 0.8), Vec3::splat(1.0 / 32.0));
        Renderer::new(shared, 8, 6).with_camera(camera)
    }

    #[test]
    fn test_samples_count_up_and_reset() {
        let mut r = small();
        assert_eq!(r.samples(), 0);
        r.accumulate();
        r.accumulate();
        assert_eq!(r.samples(), 2);
        r.reset_framebuffer();
        assert_eq!(r.samples(), 0);
    }

    #[test]
    fn test_changes_reset_accumulation() {
        let mut r = small();
        r.accumulate();
        r.set_camera(*r.camera());
        assert_eq!(r.samples(), 1, "same camera keeps samples");

        let mut cam = *r.camera();
        cam.position.x += 0.1;
        r.set_camera(cam);
        assert_eq!(r.samples(), 0);

        r.accumulate();
        r.set_voxel(IVec3::new(1, 0, 0), Material::Diffuse, Vec3::ONE);
        assert_eq!(r.samples(), 0);

        r.accumulate();
        // Edits through another handle are noticed on the next pass
        r.grid().clone().delete_voxel(IVec3::new(1, 0, 0));
        r.accumulate();
        assert_eq!(r.samples(), 1);

        r.set_highlight(Some(IVec3::ZERO));
        assert_eq!(r.samples(), 0);

        r.accumulate();
        let config = SceneConfig {
            exposure: 5.0,
            ..*r.config()
        };
        r.set_config(config);
        assert_eq!(r.samples(), 0);
    }

    #[test]
    fn test_failed_load_keeps_samples() {
        let mut r = small();
        r.accumulate();
        assert!(r.load_snapshot(b"garbage").is_err());
        assert_eq!(r.samples(), 1);

        let other = VoxelGrid::new(32, 0.1);
        let blob = persist::save(&other).unwrap();
        assert!(r.load_snapshot(&blob).is_err());
        assert_eq!(r.samples(), 1);
        assert_eq!(r.grid().read().non_empty_count(), 1);
    }

    #[test]
    fn test_successful_load_resets() {
        let mut r = small();
        let blob = r.save_snapshot().unwrap();
        r.delete_voxel(IVec3::ZERO);
        r.accumulate();
        r.load_snapshot(&blob).unwrap();
        assert_eq!(r.samples(), 0);
        assert_eq!(r.grid().read().material(IVec3::ZERO), Material::Diffuse);
    }

    #[test]
    fn test_render_frame_runs_spp_passes() {
        let mut r = small();
        let mut ctl = SppController::new(1.0);
        let stats = r.render_frame(&mut ctl);
        assert_eq!(stats.spp, 1);
        assert_eq!(stats.total_samples, 1);
        let stats = r.render_frame(&mut ctl);
        assert_eq!(stats.total_samples, 1 + stats.spp as u64);
    }
}
