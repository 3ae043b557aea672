//! Samples-per-frame controller.

use std::time::Duration;

/// Hard cap on samples per frame.
pub const MAX_SPP: u32 = 128;

/// Default frame-rate target.
pub const TARGET_FPS: f32 = 30.0;

/// Picks how many passes the next frame runs from how long the last batch took.
///
/// Over budget (`elapsed * target_fps > 1`) the count drops, at most halving and
/// never below one. Otherwise it grows by at least one, at most doubling, up to
/// `max_spp`. Within those bounds the step aims at the count that would exactly
/// fill the frame at the measured cost per sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SppController {
    spp: u32,
    target_fps: f32,
    max_spp: u32,
}

impl Default for SppController {
    fn default() -> Self {
        Self::new(TARGET_FPS)
    }
}

impl SppController {
    pub fn new(target_fps: f32) -> Self {
        let target_fps = if target_fps.is_finite() && target_fps > 0.0 {
            target_fps
        } else {
            tracing::warn!(target_fps, "invalid target fps, using default");
            TARGET_FPS
        };
        Self {
            spp: 1,
            target_fps,
            max_spp: MAX_SPP,
        }
    }

    pub fn with_max_spp(mut self, max_spp: u32) -> Self {
        self.max_spp = max_spp.max(1);
        self.spp = self.spp.min(self.max_spp);
        self
    }

    /// Passes to run in the next frame.
    #[inline]
    pub fn spp(&self) -> u32 {
        self.spp
    }

    #[inline]
    pub fn target_fps(&self) -> f32 {
        self.target_fps
    }

    #[inline]
    pub fn max_spp(&self) -> u32 {
        self.max_spp
    }

    /// Feed the wall-clock time of the last batch of `spp()` passes; returns the new count.
    pub fn update(&mut self, elapsed: Duration) -> u32 {
        let secs = elapsed.as_secs_f32();
        let current = self.spp.max(1);
        let per_sample = secs / current as f32;
        let estimated = if per_sample > 0.0 {
            // Saturating float-to-int cast
            (1.0 / (self.target_fps * per_sample)) as u32
        } else {
            u32::MAX
        };

        let next = if secs * self.target_fps > 1.0 {
            let lo = (current / 2).max(1);
            let hi = current.saturating_sub(1).max(1);
            estimated.clamp(lo, hi)
        } else {
            let lo = current.saturating_add(1).min(self.max_spp);
            let hi = current.saturating_mul(2).min(self.max_spp);
            estimated.clamp(lo, hi)
        };
        if next != self.spp {
            tracing::trace!(from = self.spp, to = next, secs, "spp adjusted");
        }
        self.spp = next;
        next
    }
}
