//! Scene configuration: lighting, floor, tone mapping.
//!
//! Stored as JSON. Missing fields take their defaults, and out-of-range values are
//! clamped by [`SceneConfig::sanitized`] rather than rejected.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::render::ToneMap;
use crate::trace::Floor;
use crate::util::{Result, Vec2, Vec3};

/// Sun-like light sampled by next-event estimation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DirectionalLight {
    /// Direction toward the light. Normalized on sanitize.
    pub direction: Vec3,
    /// Per-sample jitter applied to the direction, giving soft shadows.
    pub noise: f32,
    pub color: Vec3,
}

impl Default for DirectionalLight {
    fn default() -> Self {
        Self {
            direction: Vec3::new(1.2, 0.3, 0.7).normalize(),
            noise: 0.03,
            color: Vec3::ONE,
        }
    }
}

/// Vertical plane `z = z` facing +Z, behind the scene.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Backdrop {
    pub z: f32,
    pub color: Vec3,
}

impl Default for Backdrop {
    fn default() -> Self {
        Self {
            z: -5.5,
            color: Vec3::new(0.6, 0.7, 0.7),
        }
    }
}

/// Everything about a scene that is not voxels or camera.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    // Geometry
    pub floor: Floor,
    pub floor_color: Vec3,
    /// Optional wall behind the scene.
    pub backdrop: Option<Backdrop>,

    // Lighting
    pub light: DirectionalLight,
    /// Radiance of rays escaping to the sky.
    ///
    /// Black, the default, means escaping rays carry no light at all. Any other
    /// value adds an ambient sky term on top of the sun and emissive voxels.
    pub background: Vec3,

    // Tone mapping
    pub exposure: f32,
    pub vignette_strength: f32,
    pub vignette_radius: f32,
    /// Vignette center in normalized image coordinates.
    pub vignette_center: Vec2,

    /// Width of darkened voxel outlines, as a fraction of the voxel. 0 disables.
    pub voxel_edges: f32,

    /// Base seed for per-path random streams.
    pub seed: u64,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            floor: Floor::default(),
            floor_color: Vec3::new(0.3, 0.5, 0.7),
            backdrop: None,
            light: DirectionalLight::default(),
            background: Vec3::ZERO,
            exposure: 3.0,
            vignette_strength: 0.9,
            vignette_radius: 0.0,
            vignette_center: Vec2::splat(0.5),
            voxel_edges: 0.06,
            seed: 0,
        }
    }
}

/// Finite and non-negative, else `fallback`.
fn non_negative(name: &str, value: f32, fallback: f32) -> f32 {
    if value.is_finite() && value >= 0.0 {
        value
    } else {
        tracing::warn!(field = name, value, fallback, "clamping scene setting");
        fallback
    }
}

/// Finite components clamped to `[lo, hi]`; non-finite vectors fall back entirely.
fn clamp_vec3(name: &str, value: Vec3, lo: f32, hi: f32, fallback: Vec3) -> Vec3 {
    if !value.is_finite() {
        tracing::warn!(field = name, ?value, "non-finite color, using default");
        return fallback;
    }
    let clamped = value.clamp(Vec3::splat(lo), Vec3::splat(hi));
    if clamped != value {
        tracing::warn!(field = name, ?value, ?clamped, "clamping scene setting");
    }
    clamped
}

fn floor_is_valid(floor: &Floor) -> bool {
    match *floor {
        Floor::Disabled => true,
        Floor::Plane { height } => height.is_finite(),
        Floor::Disc {
            center,
            radius,
            half_height,
            rounding,
        } => {
            center.is_finite()
                && radius.is_finite()
                && half_height.is_finite()
                && rounding.is_finite()
                && radius > 0.0
                && half_height >= 0.0
                && (0.0..=radius).contains(&rounding)
        }
        Floor::Slab {
            center,
            half_extents,
        } => center.is_finite() && half_extents.is_finite() && half_extents.cmpge(Vec3::ZERO).all(),
    }
}

impl SceneConfig {
    /// Parse from JSON text.
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str::<Self>(text)?.sanitized())
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Read a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_json(&text)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path.as_ref(), self.to_json()?)?;
        Ok(())
    }

    /// Copy with every field forced into its valid range.
    pub fn sanitized(mut self) -> Self {
        let d = Self::default();

        if !floor_is_valid(&self.floor) {
            tracing::warn!(floor = ?self.floor, "invalid floor, disabling");
            self.floor = Floor::Disabled;
        }
        self.floor_color = clamp_vec3("floor_color", self.floor_color, 0.0, 1.0, d.floor_color);
        self.backdrop = self.backdrop.and_then(|mut b| {
            if !b.z.is_finite() {
                tracing::warn!(z = b.z, "non-finite backdrop, disabling");
                return None;
            }
            b.color = clamp_vec3("backdrop.color", b.color, 0.0, 1.0, Backdrop::default().color);
            Some(b)
        });

        let dir = self.light.direction;
        self.light.direction = if !dir.is_finite() || dir.length_squared() <= 1e-12 {
            tracing::warn!(?dir, "degenerate light direction, using default");
            d.light.direction
        } else if (dir.length() - 1.0).abs() > 1e-5 {
            dir.normalize()
        } else {
            dir
        };
        self.light.noise = non_negative("light.noise", self.light.noise, d.light.noise).min(1.0);
        self.light.color = clamp_vec3("light.color", self.light.color, 0.0, f32::MAX, d.light.color);
        self.background = clamp_vec3("background", self.background, 0.0, f32::MAX, d.background);

        self.exposure = non_negative("exposure", self.exposure, d.exposure);
        self.vignette_strength =
            non_negative("vignette_strength", self.vignette_strength, d.vignette_strength);
        self.vignette_radius = non_negative("vignette_radius", self.vignette_radius, d.vignette_radius);
        if !self.vignette_center.is_finite() {
            tracing::warn!(center = ?self.vignette_center, "non-finite vignette center, using default");
            self.vignette_center = d.vignette_center;
        }

        let edges = non_negative("voxel_edges", self.voxel_edges, d.voxel_edges);
        if edges > 0.5 {
            tracing::warn!(value = edges, "voxel_edges above 0.5, clamping");
        }
        self.voxel_edges = edges.min(0.5);
        self
    }

    /// Tone-mapping parameters for [`AccumulationBuffer::tone_map`](crate::render::AccumulationBuffer::tone_map).
    pub fn tone_map(&self) -> ToneMap {
        ToneMap {
            exposure: self.exposure,
            vignette_strength: self.vignette_strength,
            vignette_radius: self.vignette_radius,
            vignette_center: self.vignette_center,
        }
    }
}
