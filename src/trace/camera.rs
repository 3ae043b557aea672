//! Pinhole camera used to generate primary rays.
//!
//! The camera is owned by whatever drives the renderer; the tracer only reads it.

use serde::{Deserialize, Serialize};

use crate::util::{Ray, UVec2, Vec2, Vec3};

/// Camera pose and field of view.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Camera {
    pub position: Vec3,
    pub look_at: Vec3,
    pub up: Vec3,
    /// Half-height of the image plane at unit distance (tangent of the half angle).
    pub fov: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            position: Vec3::new(1.0, 1.5, 2.0),
            look_at: Vec3::ZERO,
            up: Vec3::Y,
            fov: 0.23,
        }
    }
}

impl Camera {
    pub fn new(position: Vec3, look_at: Vec3) -> Self {
        Self {
            position,
            look_at,
            ..Self::default()
        }
    }

    pub fn with_fov(mut self, fov: f32) -> Self {
        self.fov = fov;
        self
    }

    /// Forward, right and up unit vectors of the image plane.
    fn basis(&self) -> (Vec3, Vec3, Vec3) {
        let forward = (self.look_at - self.position).normalize_or(-Vec3::Z);
        let up = self.up.normalize_or(Vec3::Y);
        // Looking straight along `up` leaves the cross product undefined
        let right = if forward.dot(up).abs() > 0.999 {
            Vec3::X
        } else {
            forward.cross(up).normalize()
        };
        let true_up = right.cross(forward).normalize();
        (forward, right, true_up)
    }

    /// Direction through a point on the image, in pixel units with the origin at
    /// the top-left corner.
    pub fn direction(&self, sample: Vec2, resolution: UVec2) -> Vec3 {
        let (forward, right, up) = self.basis();
        let h = resolution.y.max(1) as f32;
        let aspect = resolution.x.max(1) as f32 / h;
        let fu = 2.0 * self.fov * sample.x / h - self.fov * aspect;
        let fv = 2.0 * self.fov * (h - sample.y) / h - self.fov;
        (forward + fu * right + fv * up).normalize()
    }

    /// Primary ray through `pixel`, offset by `jitter` in [0, 1)².
    pub fn primary_ray(&self, pixel: UVec2, jitter: Vec2, resolution: UVec2) -> Ray {
        let sample = pixel.as_vec2() + jitter;
        Ray::new(self.position, self.direction(sample, resolution))
    }

    /// Unjittered ray through the pixel center.
    pub fn center_ray(&self, pixel: UVec2, resolution: UVec2) -> Ray {
        self.primary_ray(pixel, Vec2::splat(0.5), resolution)
    }
}
