//! Single-ray voxel picking for interactive edits.

use super::{dda_traverse, Camera};
use crate::grid::VoxelGrid;
use crate::util::{IVec3, UVec2};

/// Cast the pixel-center ray of `pixel` into the grid.
///
/// With `solid` the occupied cell that was hit is returned; otherwise the empty cell
/// in front of it, where a new voxel would sit against the surface. `None` when
/// nothing is hit or the empty cell lies outside the domain.
pub fn raycast_voxel_grid(
    grid: &VoxelGrid,
    camera: &Camera,
    resolution: UVec2,
    pixel: UVec2,
    solid: bool,
) -> Option<IVec3> {
    let ray = camera.center_ray(pixel, resolution);
    let hit = dda_traverse(ray.origin, ray.dir, grid);
    if !hit.hit {
        return None;
    }
    if solid {
        Some(hit.voxel)
    } else {
        grid.in_domain(hit.previous).then_some(hit.previous)
    }
}
