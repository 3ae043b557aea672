//! Deterministic per-path random streams.
//!
//! Every path gets its own generator seeded from the pixel, the pass index and a
//! scene-wide seed, so a pass is reproducible regardless of how rayon schedules rows.

use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;

use super::math::Vec3;

/// SplitMix64 finalizer.
#[inline]
fn mix64(mut z: u64) -> u64 {
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}

/// Derive a stream seed from pixel coordinates, pass index and a base seed.
#[inline]
pub fn path_seed(base: u64, x: u32, y: u32, pass: u64) -> u64 {
    let pixel = ((y as u64) << 32) | x as u64;
    mix64(mix64(base ^ mix64(pixel)).wrapping_add(pass))
}

/// Random stream owned by a single path.
pub struct PathRng {
    inner: Xoshiro256PlusPlus,
}

impl PathRng {
    pub fn new(seed: u64) -> Self {
        Self {
            inner: Xoshiro256PlusPlus::seed_from_u64(seed),
        }
    }

    /// Stream for one pixel sample.
    pub fn for_path(base: u64, x: u32, y: u32, pass: u64) -> Self {
        Self::new(path_seed(base, x, y, pass))
    }

    /// Uniform float in [0, 1).
    #[inline]
    pub fn next_f32(&mut self) -> f32 {
        self.inner.random::<f32>()
    }

    /// Vector with components uniform in [-0.5, 0.5).
    #[inline]
    pub fn centered_vec3(&mut self) -> Vec3 {
        Vec3::new(
            self.next_f32() - 0.5,
            self.next_f32() - 0.5,
            self.next_f32() - 0.5,
        )
    }
}
