//! Unidirectional path tracer with next-event estimation and Russian roulette.

use std::f32::consts::TAU;

use crate::grid::{Material, VoxelGrid};
use crate::scene::SceneConfig;
use crate::trace::{dda_traverse, Camera, DIS_LIMIT, MARCH_EPS};
use crate::util::{IVec3, PathRng, Ray, UVec2, Vec2, Vec3, INF};

/// Maximum bounces per path.
pub const MAX_DEPTH: u32 = 4;

/// Distance secondary rays start above the surface they leave.
pub const SURFACE_OFFSET: f32 = 4.0 * MARCH_EPS;

/// Color of the highlighted selection voxel.
pub const HIGHLIGHT_COLOR: Vec3 = Vec3::new(1.0, 0.65, 0.0);

/// Closest surface along a ray.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SurfaceHit {
    pub distance: f32,
    pub normal: Vec3,
    pub color: Vec3,
    pub emissive: bool,
}

/// Read-only view of everything a path needs.
#[derive(Clone, Copy)]
pub struct TraceContext<'a> {
    pub grid: &'a VoxelGrid,
    pub config: &'a SceneConfig,
    /// Cell drawn highlighted, with its emissive state inverted.
    pub highlight: Option<IVec3>,
}

/// Outline factor for a point on the surface of `voxel`.
///
/// Points within `edges` of at least two cell faces count as on an edge.
fn edge_factor(p: Vec3, voxel: IVec3, dx: f32, edges: f32) -> f32 {
    let local = (p / dx - voxel.as_vec3()).clamp(Vec3::ZERO, Vec3::ONE);
    let near = (0..3)
        .filter(|&i| local[i] < edges || local[i] > 1.0 - edges)
        .count();
    if near >= 2 {
        1.0
    } else {
        0.0
    }
}

impl<'a> TraceContext<'a> {
    pub fn new(grid: &'a VoxelGrid, config: &'a SceneConfig) -> Self {
        Self {
            grid,
            config,
            highlight: None,
        }
    }

    pub fn with_highlight(mut self, highlight: Option<IVec3>) -> Self {
        self.highlight = highlight;
        self
    }

    /// Nearest of the voxel, backdrop and floor hits; voxels win ties. `None` is sky.
    pub fn next_hit(&self, origin: Vec3, dir: Vec3) -> Option<SurfaceHit> {
        let voxel = dda_traverse(origin, dir, self.grid);
        let mut closest = voxel.hit.then(|| {
            let mut color = voxel.color;
            let mut emissive = voxel.material == Material::Emissive;
            let edges = self.config.voxel_edges;
            if edges > 0.0 {
                let p = origin + dir * voxel.distance;
                let f = edge_factor(p, voxel.voxel, self.grid.voxel_dx(), edges);
                color *= 1.3 - 1.2 * f;
            }
            if self.highlight == Some(voxel.voxel) {
                color = HIGHLIGHT_COLOR;
                emissive = !emissive;
            }
            SurfaceHit {
                distance: voxel.distance,
                normal: voxel.normal,
                color,
                emissive,
            }
        });
        let limit = |c: &Option<SurfaceHit>| c.map_or(INF, |h| h.distance);

        if let Some(backdrop) = self.config.backdrop {
            if dir.z != 0.0 {
                let t = (backdrop.z - origin.z) / dir.z;
                if t > 0.0 && t < limit(&closest) {
                    closest = Some(SurfaceHit {
                        distance: t,
                        normal: Vec3::Z,
                        color: backdrop.color,
                        emissive: false,
                    });
                }
            }
        }

        let floor_dist = self.config.floor.ray_march(origin, dir);
        if floor_dist < DIS_LIMIT && floor_dist < limit(&closest) {
            let p = origin + dir * floor_dist;
            closest = Some(SurfaceHit {
                distance: floor_dist,
                normal: self.config.floor.normal(p),
                color: self.config.floor_color,
                emissive: false,
            });
        }
        closest
    }

    /// Distance to the first occluder, `INF` when the ray escapes.
    fn occlusion(&self, origin: Vec3, dir: Vec3) -> f32 {
        self.next_hit(origin, dir).map_or(INF, |h| h.distance)
    }

    /// Radiance carried back along `ray`.
    pub fn trace_path(&self, ray: Ray, rng: &mut PathRng) -> Vec3 {
        let light = &self.config.light;
        let mut contrib = Vec3::ZERO;
        let mut throughput = Vec3::ONE;
        let mut pos = ray.origin;
        let mut dir = ray.dir;

        for _ in 0..MAX_DEPTH {
            let Some(hit) = self.next_hit(pos, dir) else {
                contrib += throughput * self.config.background;
                break;
            };
            if hit.emissive {
                contrib += throughput * hit.color;
                break;
            }

            throughput *= hit.color;
            pos = spawn_point(pos + dir * hit.distance, hit.normal);

            let to_light = (light.direction + rng.centered_vec3() * light.noise).normalize_or_zero();
            let cos = to_light.dot(hit.normal);
            if cos > 0.0 && self.occlusion(pos, to_light) > DIS_LIMIT {
                contrib += throughput * light.color * cos;
            }

            dir = cosine_hemisphere(hit.normal, rng);
            match russian_roulette(throughput, rng.next_f32()) {
                Some(t) => throughput = t,
                None => break,
            }
        }

        if contrib.is_finite() {
            contrib
        } else {
            tracing::trace!(?contrib, "dropping non-finite sample");
            Vec3::ZERO
        }
    }

    /// One jittered camera sample for `pixel` in pass `pass`.
    pub fn sample_pixel(&self, camera: &Camera, resolution: UVec2, pixel: UVec2, pass: u64) -> Vec3 {
        let mut rng = PathRng::for_path(self.config.seed, pixel.x, pixel.y, pass);
        let jitter = Vec2::new(rng.next_f32(), rng.next_f32());
        let ray = camera.primary_ray(pixel, jitter, resolution);
        self.trace_path(ray, &mut rng)
    }
}

/// Origin for rays leaving a surface at `p`.
///
/// Lifted well past the floor's march epsilon so shadow and bounce rays do not
/// rediscover the surface they start on.
#[inline]
pub fn spawn_point(p: Vec3, normal: Vec3) -> Vec3 {
    p + normal * SURFACE_OFFSET
}

/// Cosine-weighted direction about `normal`: the normal plus a uniform unit vector.
pub fn cosine_hemisphere(normal: Vec3, rng: &mut PathRng) -> Vec3 {
    let z = 1.0 - 2.0 * rng.next_f32();
    let r = (1.0 - z * z).max(0.0).sqrt();
    let phi = TAU * rng.next_f32();
    let unit = Vec3::new(r * phi.cos(), r * phi.sin(), z);
    (normal + unit).normalize_or(normal)
}

/// Survive with probability `max(throughput)`, rescaled so the estimate stays unbiased.
///
/// `u` is uniform in [0, 1). Returns `None` when the path ends.
pub fn russian_roulette(throughput: Vec3, u: f32) -> Option<Vec3> {
    let p = throughput.max_element();
    if p <= 0.0 || !p.is_finite() || u > p {
        return None;
    }
    Some(throughput / p)
}
