//! Progressive accumulation buffer and tone mapping.

use rayon::prelude::*;

use crate::util::{UVec2, Vec2, Vec3};

/// Running radiance sum of one pixel.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Texel {
    pub sum: Vec3,
    pub count: u32,
}

/// Display curve applied by [`AccumulationBuffer::tone_map`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ToneMap {
    pub exposure: f32,
    pub vignette_strength: f32,
    pub vignette_radius: f32,
    pub vignette_center: Vec2,
}

impl Default for ToneMap {
    fn default() -> Self {
        Self {
            exposure: 3.0,
            vignette_strength: 0.9,
            vignette_radius: 0.0,
            vignette_center: Vec2::splat(0.5),
        }
    }
}

impl ToneMap {
    /// Vignette attenuation at normalized image position `uv`, never negative.
    #[inline]
    pub fn darken(&self, uv: Vec2) -> f32 {
        let dist = uv.distance(self.vignette_center);
        (1.0 - self.vignette_strength * (dist - self.vignette_radius).max(0.0)).max(0.0)
    }
}

/// Tone-mapped frame, row-major from the top-left, channels in [0, 1].
#[derive(Clone, Debug, PartialEq)]
pub struct Image {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<Vec3>,
}

impl Image {
    #[inline]
    pub fn pixel(&self, x: u32, y: u32) -> Vec3 {
        self.pixels[(y * self.width + x) as usize]
    }

    /// Interleaved 8-bit RGB.
    pub fn to_rgb8(&self) -> Vec<u8> {
        self.pixels
            .iter()
            .flat_map(|p| {
                let c = (p.clamp(Vec3::ZERO, Vec3::ONE) * 255.0).round();
                [c.x as u8, c.y as u8, c.z as u8]
            })
            .collect()
    }

    /// Mean absolute per-channel difference to another frame of the same size.
    pub fn mean_abs_diff(&self, other: &Image) -> f32 {
        if self.pixels.is_empty() || self.pixels.len() != other.pixels.len() {
            return 0.0;
        }
        let total: f32 = self
            .pixels
            .iter()
            .zip(&other.pixels)
            .map(|(a, b)| (*a - *b).abs().element_sum())
            .sum();
        total / (3 * self.pixels.len()) as f32
    }
}

/// Per-pixel radiance sums and sample counts.
#[derive(Clone, Debug)]
pub struct AccumulationBuffer {
    width: u32,
    height: u32,
    texels: Vec<Texel>,
    passes: u64,
}

impl AccumulationBuffer {
    pub fn new(width: u32, height: u32) -> Self {
        let width = width.max(1);
        let height = height.max(1);
        Self {
            width,
            height,
            texels: vec![Texel::default(); (width * height) as usize],
            passes: 0,
        }
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    pub fn resolution(&self) -> UVec2 {
        UVec2::new(self.width, self.height)
    }

    /// Completed passes since the last reset.
    #[inline]
    pub fn passes(&self) -> u64 {
        self.passes
    }

    #[inline]
    pub fn texel(&self, x: u32, y: u32) -> Texel {
        self.texels[(y * self.width + x) as usize]
    }

    /// Zero every sum and count.
    pub fn reset(&mut self) {
        self.texels.fill(Texel::default());
        self.passes = 0;
    }

    /// Run one sample per pixel, rows in parallel.
    ///
    /// `sample(pixel, pass)` must be independent per pixel; it never sees another
    /// pixel's slot.
    #[tracing::instrument(level = "debug", skip_all, fields(w = self.width, h = self.height, pass = self.passes))]
    pub fn add_pass<F>(&mut self, sample: F)
    where
        F: Fn(UVec2, u64) -> Vec3 + Sync,
    {
        let pass = self.passes;
        let width = self.width as usize;
        self.texels
            .par_chunks_mut(width)
            .enumerate()
            .for_each(|(y, row)| {
                for (x, texel) in row.iter_mut().enumerate() {
                    let radiance = sample(UVec2::new(x as u32, y as u32), pass);
                    texel.sum += radiance;
                    texel.count += 1;
                }
            });
        self.passes += 1;
    }

    /// Tone map into a displayable image without touching the sums.
    pub fn tone_map(&self, params: &ToneMap) -> Image {
        let w = self.width as f32;
        let h = self.height as f32;
        let pixels = self
            .texels
            .par_iter()
            .enumerate()
            .map(|(i, t)| {
                if t.count == 0 {
                    return Vec3::ZERO;
                }
                let x = (i as u32 % self.width) as f32;
                let y = (i as u32 / self.width) as f32;
                let darken = params.darken(Vec2::new(x / w, y / h));
                let scaled = t.sum * (darken * params.exposure / t.count as f32);
                scaled.max(Vec3::ZERO).powf(0.5).min(Vec3::ONE)
            })
            .collect();
        Image {
            width: self.width,
            height: self.height,
            pixels,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat() -> ToneMap {
        ToneMap {
            exposure: 1.0,
            vignette_strength: 0.0,
            ..ToneMap::default()
        }
    }

    #[test]
    fn test_empty_buffer_is_black() {
        let buf = AccumulationBuffer::new(4, 3);
        let img = buf.tone_map(&ToneMap::default());
        assert_eq!(img.pixels.len(), 12);
        assert!(img.pixels.iter().all(|p| *p == Vec3::ZERO));
    }

    #[test]
    fn test_pass_counts_and_average() {
        let mut buf = AccumulationBuffer::new(3, 2);
        buf.add_pass(|_, _| Vec3::splat(0.16));
        buf.add_pass(|_, _| Vec3::splat(0.34));
        assert_eq!(buf.passes(), 2);
        let t = buf.texel(2, 1);
        assert_eq!(t.count, 2);

        let img = buf.tone_map(&flat());
        // sqrt(mean) = sqrt(0.25)
        assert!((img.pixel(1, 1).x - 0.5).abs() < 1e-5);
    }

    #[test]
    fn test_each_pixel_gets_its_own_sample() {
        let mut buf = AccumulationBuffer::new(5, 4);
        buf.add_pass(|p, _| Vec3::new(p.x as f32, p.y as f32, 0.0));
        assert_eq!(buf.texel(3, 2).sum, Vec3::new(3.0, 2.0, 0.0));
        assert_eq!(buf.texel(0, 3).sum, Vec3::new(0.0, 3.0, 0.0));
    }

    #[test]
    fn test_tone_map_does_not_mutate() {
        let mut buf = AccumulationBuffer::new(2, 2);
        buf.add_pass(|_, _| Vec3::ONE);
        let before = buf.texel(1, 1);
        let a = buf.tone_map(&ToneMap::default());
        let b = buf.tone_map(&ToneMap::default());
        assert_eq!(a, b);
        assert_eq!(buf.texel(1, 1), before);
        assert_eq!(buf.passes(), 1);
    }

    #[test]
    fn test_reset_zeroes() {
        let mut buf = AccumulationBuffer::new(2, 2);
        buf.add_pass(|_, _| Vec3::ONE);
        buf.reset();
        assert_eq!(buf.passes(), 0);
        assert_eq!(buf.texel(0, 0), Texel::default());
    }

    #[test]
    fn test_vignette_never_negative() {
        let tm = ToneMap {
            vignette_strength: 10.0,
            ..ToneMap::default()
        };
        assert_eq!(tm.darken(Vec2::ZERO), 0.0);
        assert_eq!(tm.darken(Vec2::splat(0.5)), 1.0);
    }

    #[test]
    fn test_rgb8_clamps() {
        let img = Image {
            width: 2,
            height: 1,
            pixels: vec![Vec3::new(2.0, -1.0, 0.5), Vec3::ONE],
        };
        assert_eq!(img.to_rgb8(), vec![255, 0, 128, 255, 255, 255]);
    }
}
