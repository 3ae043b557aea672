//! Analytic secondary geometry: a floor described by a signed distance function.

use serde::{Deserialize, Serialize};

use super::DIS_LIMIT;
use crate::util::{Vec3, INF};

/// Sphere tracing stops once the distance estimate drops below this.
pub const MARCH_EPS: f32 = 1e-4;

/// Maximum sphere-tracing iterations before giving up.
pub const MAX_MARCH_STEPS: u32 = 200;

/// Step for the finite-difference normal estimate.
const NORMAL_H: f32 = 1e-3;

/// Supported floor shapes.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Floor {
    /// No secondary geometry.
    Disabled,
    /// Infinite horizontal plane `y = height`.
    Plane { height: f32 },
    /// Rounded cylinder lying flat, centered on `center`.
    Disc {
        center: Vec3,
        radius: f32,
        half_height: f32,
        rounding: f32,
    },
    /// Axis-aligned box.
    Slab { center: Vec3, half_extents: Vec3 },
}

impl Default for Floor {
    fn default() -> Self {
        Self::Plane { height: -5e-3 }
    }
}

impl Floor {
    /// Signed distance from `p` to the surface.
    pub fn sdf(&self, p: Vec3) -> f32 {
        match *self {
            Self::Disabled => INF,
            Self::Plane { height } => p.y - height,
            Self::Disc {
                center,
                radius,
                half_height,
                rounding,
            } => {
                let o = p - center;
                let dr = Vec3::new(o.x, 0.0, o.z).length() - radius + rounding;
                let dh = o.y.abs() - half_height;
                let outside = (dr.max(0.0).powi(2) + dh.max(0.0).powi(2)).sqrt();
                dr.max(dh).min(0.0) + outside - rounding
            }
            Self::Slab {
                center,
                half_extents,
            } => ((p - center).abs() - half_extents).max_element(),
        }
    }

    /// Sphere-trace along `dir`; returns the hit distance or `INF`.
    ///
    /// Running past [`DIS_LIMIT`] or out of iterations is a miss.
    pub fn ray_march(&self, origin: Vec3, dir: Vec3) -> f32 {
        if matches!(self, Self::Disabled) {
            return INF;
        }
        let mut dist = 0.0_f32;
        for _ in 0..MAX_MARCH_STEPS {
            let s = self.sdf(origin + dist * dir);
            if !s.is_finite() {
                return INF;
            }
            if s < MARCH_EPS {
                return dist;
            }
            dist += s;
            if dist > DIS_LIMIT {
                return INF;
            }
        }
        INF
    }

    /// Surface normal from central differences of the distance field.
    pub fn normal(&self, p: Vec3) -> Vec3 {
        let mut n = Vec3::ZERO;
        for axis in 0..3 {
            let mut inc = p;
            let mut dec = p;
            inc[axis] += NORMAL_H;
            dec[axis] -= NORMAL_H;
            n[axis] = (0.5 / NORMAL_H) * (self.sdf(inc) - self.sdf(dec));
        }
        n.normalize_or(Vec3::Y)
    }
}
