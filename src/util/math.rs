//! Math type re-exports and ray/box primitives shared by the tracer.

pub use glam::{IVec3, UVec2, Vec2, Vec3};

/// Small offset used to step off surfaces and past box entry points.
pub const EPS: f32 = 1e-4;

/// Stand-in for "no hit" distances.
pub const INF: f32 = f32::INFINITY;

/// Direction components closer to zero than this are nudged before DDA setup.
pub const DIR_EPS: f32 = 1e-6;

/// World-space axis-aligned bounding box.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    /// Degenerate box at the origin, used when there is no geometry.
    pub const ZERO: Self = Self {
        min: Vec3::ZERO,
        max: Vec3::ZERO,
    };

    #[inline]
    pub const fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// True when `min <= max` on every axis.
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.min.cmple(self.max).all()
    }

    /// True when the box has no volume on at least one axis.
    #[inline]
    pub fn is_degenerate(&self) -> bool {
        self.min.cmpge(self.max).any()
    }

    #[inline]
    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    #[inline]
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    #[inline]
    pub fn contains(&self, p: Vec3) -> bool {
        p.cmpge(self.min).all() && p.cmple(self.max).all()
    }
}

/// A ray with a unit-length direction.
#[derive(Clone, Copy, Debug)]
pub struct Ray {
    pub origin: Vec3,
    pub dir: Vec3,
}

impl Ray {
    /// Build a ray, normalizing `dir`.
    #[inline]
    pub fn new(origin: Vec3, dir: Vec3) -> Self {
        Self {
            origin,
            dir: dir.normalize_or(Vec3::Y),
        }
    }

    #[inline]
    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.dir * t
    }
}

/// Replace near-zero direction components by `±DIR_EPS` so `1 / d` stays finite.
#[inline]
pub fn nudge_direction(dir: Vec3) -> Vec3 {
    let fix = |c: f32| {
        if c.abs() < DIR_EPS {
            if c.is_sign_negative() { -DIR_EPS } else { DIR_EPS }
        } else {
            c
        }
    };
    Vec3::new(fix(dir.x), fix(dir.y), fix(dir.z))
}

/// Result of a ray/box slab test.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SlabHit {
    pub hit: bool,
    pub t_near: f32,
    pub t_far: f32,
    /// Axis whose slab produced `t_near`, if any axis was tested.
    pub entry_axis: Option<usize>,
}

/// Slab-method ray/AABB test.
///
/// Axes where `dir` is exactly zero are treated as parallel: the test fails if the
/// origin lies outside that slab, otherwise the axis is skipped. `hit` is true when the
/// entry/exit interval is non-empty and reaches the positive half of the ray.
pub fn ray_aabb(box_min: Vec3, box_max: Vec3, origin: Vec3, dir: Vec3) -> SlabHit {
    let mut t_near = -INF;
    let mut t_far = INF;
    let mut entry_axis = None;
    let mut parallel_miss = false;

    for axis in 0..3 {
        let (o, d) = (origin[axis], dir[axis]);
        if d == 0.0 {
            if o < box_min[axis] || o > box_max[axis] {
                parallel_miss = true;
            }
            continue;
        }
        let i1 = (box_min[axis] - o) / d;
        let i2 = (box_max[axis] - o) / d;
        let (lo, hi) = if i1 < i2 { (i1, i2) } else { (i2, i1) };
        if lo > t_near {
            t_near = lo;
            entry_axis = Some(axis);
        }
        t_far = t_far.min(hi);
    }

    SlabHit {
        hit: !parallel_miss && t_near <= t_far && t_far >= 0.0,
        t_near,
        t_far,
        entry_axis,
    }
}
