//! Ray/grid traversal (Amanatides–Woo DDA).

use crate::grid::{split_index, Block, Material, VoxelGrid};
use crate::util::{nudge_direction, ray_aabb, IVec3, Vec3, EPS, INF};

/// Outcome of [`dda_traverse`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DdaHit {
    pub hit: bool,
    /// World distance along the ray to the hit cell's entry face, `INF` on miss.
    pub distance: f32,
    /// Face normal of the entered face, pointing back toward the ray origin.
    pub normal: Vec3,
    pub material: Material,
    /// Stored cell color in [0, 1].
    pub color: Vec3,
    /// Index of the hit cell.
    pub voxel: IVec3,
    /// Last empty cell visited before the hit.
    pub previous: IVec3,
}

impl DdaHit {
    pub const MISS: Self = Self {
        hit: false,
        distance: INF,
        normal: Vec3::ZERO,
        material: Material::Empty,
        color: Vec3::ZERO,
        voxel: IVec3::ZERO,
        previous: IVec3::ZERO,
    };
}

/// Axis-aligned unit vector `±e_axis`.
#[inline]
fn axis_vec(axis: usize, sign: f32) -> Vec3 {
    let mut v = Vec3::ZERO;
    v[axis] = sign;
    v
}

/// Axis with the largest absolute component, x first on ties.
#[inline]
fn dominant_axis(d: Vec3) -> usize {
    let a = d.abs();
    if a.x >= a.y && a.x >= a.z {
        0
    } else if a.y >= a.z {
        1
    } else {
        2
    }
}

/// Walk the grid cell by cell along a ray and report the first non-empty cell.
///
/// The grid's bounding box must be current. Rays that miss it return
/// [`DdaHit::MISS`] before any stepping happens.
pub fn dda_traverse(origin: Vec3, dir: Vec3, grid: &VoxelGrid) -> DdaHit {
    debug_assert!(!grid.is_bbox_dirty(), "tracing against a stale bounding box");

    let Some((lo, hi)) = grid.index_bounds() else {
        return DdaHit::MISS;
    };
    if !origin.is_finite() || !dir.is_finite() {
        return DdaHit::MISS;
    }

    let d = nudge_direction(dir);
    let bbox = grid.bounding_box();
    let slab = ray_aabb(bbox.min, bbox.max, origin, d);
    if !slab.hit {
        return DdaHit::MISS;
    }

    let near = slab.t_near.max(0.0);
    let start_t = near + 5.0 * EPS;
    let dx = grid.voxel_dx();

    // Traversal runs in voxel units; the ray parameter scales by 1/dx
    let o = (origin + d * start_t) / dx;
    let mut ipos = o.floor().as_ivec3();
    let sign = d.signum();
    let step = sign.as_ivec3();
    let rinv = d.recip();
    let t_delta = rinv.abs();
    let mut t_max = (ipos.as_vec3() - o + 0.5 + sign * 0.5) * rinv;

    // Face the ray enters the first cell through
    let mut normal = match slab.entry_axis {
        Some(axis) if slab.t_near >= 0.0 => axis_vec(axis, -sign[axis]),
        _ => {
            let axis = dominant_axis(d);
            axis_vec(axis, -sign[axis])
        }
    };
    let mut previous = ipos + normal.as_ivec3();
    let mut t_cell: Option<f32> = None;

    // Cells outside the geometry bounds are empty; one extra layer keeps the
    // boundary faces reachable.
    let loose_lo = lo - IVec3::ONE;
    let loose_hi = hi + IVec3::ONE;
    let max_steps = 3 * (grid.resolution() as usize + 4);

    let mut cached_key = IVec3::MAX;
    let mut cached: Option<&Block> = None;

    for _ in 0..max_steps {
        if ipos.cmplt(loose_lo).any() || ipos.cmpgt(loose_hi).any() {
            break;
        }

        if grid.in_domain(ipos) {
            let (key, linear) = split_index(ipos);
            if key != cached_key {
                cached_key = key;
                cached = grid.block(key).filter(|b| b.is_active());
            }
            if let Some(block) = cached {
                let material = block.material(linear);
                if !material.is_empty() {
                    let distance = match t_cell {
                        Some(t) => start_t + t * dx,
                        None => near,
                    };
                    return DdaHit {
                        hit: true,
                        distance,
                        normal,
                        material,
                        color: crate::grid::dequantize(block.color(linear)),
                        voxel: ipos,
                        previous,
                    };
                }
            }
        }

        // Advance every axis tied for the nearest boundary together
        let t_next = t_max.min_element();
        let mut first_axis = None;
        previous = ipos;
        for axis in 0..3 {
            if t_max[axis] == t_next {
                ipos[axis] += step[axis];
                t_max[axis] += t_delta[axis];
                first_axis.get_or_insert(axis);
            }
        }
        let Some(axis) = first_axis else {
            break;
        };
        normal = axis_vec(axis, -sign[axis]);
        t_cell = Some(t_next);
    }

    DdaHit::MISS
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Material;

    fn single_voxel(cell: IVec3) -> VoxelGrid {
        let mut g = VoxelGrid::default();
        g.set_voxel(cell, Material::Diffuse, Vec3::new(0.2, 0.4, 0.6));
        g.recompute_bounding_box();
        g
    }

    fn center(g: &VoxelGrid, cell: IVec3) -> Vec3 {
        (cell.as_vec3() + 0.5) * g.voxel_dx()
    }

    #[test]
    fn test_empty_grid_misses() {
        let mut g = VoxelGrid::default();
        g.recompute_bounding_box();
        let h = dda_traverse(Vec3::new(0.0, 0.0, 5.0), -Vec3::Z, &g);
        assert!(!h.hit);
        assert_eq!(h.distance, INF);
    }

    #[test]
    fn test_ray_missing_bbox_is_rejected() {
        let g = single_voxel(IVec3::new(0, 0, 0));
        for (o, d) in [
            (Vec3::new(0.0, 2.0, 0.0), Vec3::X),
            (Vec3::new(3.0, 0.0, 0.0), Vec3::X),
            (Vec3::new(-3.0, 0.5, 0.0), Vec3::new(1.0, 0.0, 0.0)),
        ] {
            let h = dda_traverse(o, d, &g);
            assert!(!h.hit);
            assert_eq!(h.distance, INF);
        }
    }

    #[test]
    fn test_hit_along_negative_x() {
        let v = IVec3::new(5, -3, 7);
        let g = single_voxel(v);
        let c = center(&g, v);
        let origin = Vec3::new(3.0, c.y, c.z);
        let h = dda_traverse(origin, -Vec3::X, &g);
        assert!(h.hit);
        assert_eq!(h.voxel, v);
        assert_eq!(h.normal, Vec3::X);
        assert_eq!(h.previous, v + IVec3::X);
        assert_eq!(h.material, Material::Diffuse);
        let face = (v.x + 1) as f32 * g.voxel_dx();
        assert!((h.distance - (origin.x - face)).abs() < 1e-3);
        assert!((h.color.y - 0.4).abs() < 1.0 / 255.0);
    }

    #[test]
    fn test_hit_after_stepping_inside_bbox() {
        // Two voxels far apart: the ray enters the box through empty space first
        let mut g = VoxelGrid::default();
        let target = IVec3::new(0, 0, 0);
        g.set_voxel(target, Material::Emissive, Vec3::ONE);
        g.set_voxel(IVec3::new(0, 0, 20), Material::Diffuse, Vec3::ONE);
        g.recompute_bounding_box();

        let c = center(&g, target);
        let origin = Vec3::new(c.x, c.y, 0.3);
        let h = dda_traverse(origin, -Vec3::Z, &g);
        assert!(h.hit);
        assert_eq!(h.voxel, target);
        assert_eq!(h.normal, Vec3::Z);
        assert_eq!(h.previous, IVec3::new(0, 0, 1));
        assert_eq!(h.material, Material::Emissive);
        let face = g.voxel_dx();
        assert!((h.distance - (0.3 - face)).abs() < 1e-3);
    }

    #[test]
    fn test_origin_inside_box_hits_forward() {
        let mut g = VoxelGrid::default();
        g.set_voxel(IVec3::new(-10, 0, 0), Material::Diffuse, Vec3::ONE);
        g.set_voxel(IVec3::new(10, 0, 0), Material::Diffuse, Vec3::ONE);
        g.recompute_bounding_box();
        let dx = g.voxel_dx();
        let origin = Vec3::new(0.5 * dx, 0.5 * dx, 0.5 * dx);
        let h = dda_traverse(origin, Vec3::X, &g);
        assert!(h.hit);
        assert_eq!(h.voxel, IVec3::new(10, 0, 0));
        assert_eq!(h.normal, -Vec3::X);
    }

    #[test]
    fn test_diagonal_tie_steps_both_axes() {
        // Ray through cell corners: x and y boundaries are crossed at the same t
        let mut g = VoxelGrid::new(16, 1.0);
        g.set_voxel(IVec3::new(3, 3, 0), Material::Diffuse, Vec3::ONE);
        g.set_voxel(IVec3::new(-3, -3, 0), Material::Diffuse, Vec3::ONE);
        g.recompute_bounding_box();
        let origin = Vec3::new(0.5, 0.5, 0.5);
        let h = dda_traverse(origin, Vec3::new(1.0, 1.0, 0.0).normalize(), &g);
        assert!(h.hit);
        assert_eq!(h.voxel, IVec3::new(3, 3, 0));
        assert_eq!(h.previous, IVec3::new(2, 2, 0));
        // First tied axis wins
        assert_eq!(h.normal, -Vec3::X);
    }

    #[test]
    fn test_non_finite_input_misses() {
        let g = single_voxel(IVec3::ZERO);
        assert!(!dda_traverse(Vec3::NAN, Vec3::X, &g).hit);
        assert!(!dda_traverse(Vec3::ZERO, Vec3::new(f32::NAN, 0.0, 0.0), &g).hit);
    }
}
