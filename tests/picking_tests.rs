//! Picking and editing through the renderer.

use std::sync::Arc;

use voxtrace::prelude::*;

const RES: u32 = 21;

/// Renderer looking straight down -Z at the center of `cell`.
fn facing(cell: IVec3) -> Renderer {
    let grid = Arc::new(SharedGrid::default());
    let dx = grid.read().voxel_dx();
    let target = (cell.as_vec3() + 0.5) * dx;
    let camera = Camera::new(target + Vec3::new(0.0, 0.0, 0.1), target);
    Renderer::new(grid, RES, RES).with_camera(camera)
}

fn center() -> UVec2 {
    UVec2::splat(RES / 2)
}

#[test]
fn test_pick_then_stack_voxels() {
    let base = IVec3::new(4, 4, -3);
    let mut r = facing(base);
    assert_eq!(r.raycast_voxel_grid(center(), true), None);

    r.set_voxel(base, Material::Diffuse, Vec3::ONE);
    assert_eq!(r.raycast_voxel_grid(center(), true), Some(base));

    // Place into the empty neighbour facing the camera, twice
    for step in 1..=2 {
        let spot = r.raycast_voxel_grid(center(), false).expect("empty neighbour");
        assert_eq!(spot, base + IVec3::Z * step);
        r.set_voxel(spot, Material::Diffuse, Vec3::ONE);
    }
    assert_eq!(r.raycast_voxel_grid(center(), true), Some(base + IVec3::Z * 2));
    assert_eq!(r.grid().read().non_empty_count(), 3);
}

#[test]
fn test_pick_delete_and_recolor() {
    let cell = IVec3::new(-2, 0, 5);
    let mut r = facing(cell);
    r.set_voxel(cell, Material::Emissive, Vec3::new(1.0, 0.5, 0.0));
    r.accumulate();

    let hit = r.raycast_voxel_grid(center(), true).unwrap();
    r.set_voxel_color(hit, Vec3::new(0.0, 0.0, 1.0));
    assert_eq!(r.samples(), 0);
    assert_eq!(r.get_voxel_color(hit), Vec3::new(0.0, 0.0, 1.0));

    r.delete_voxel(hit);
    assert_eq!(r.raycast_voxel_grid(center(), true), None);
    // Color survives deletion
    assert_eq!(r.get_voxel_color(hit), Vec3::new(0.0, 0.0, 1.0));
}

#[test]
fn test_highlight_changes_image() {
    let cell = IVec3::ZERO;
    let mut r = facing(cell);
    r.set_voxel(cell, Material::Diffuse, Vec3::splat(0.5));
    r.accumulate();
    let plain = r.fetch_image();

    r.set_highlight(Some(cell));
    r.accumulate();
    let lit = r.fetch_image();

    // Highlight is drawn as an orange light with no blue
    let c = center();
    assert!(plain.pixel(c.x, c.y).z > 0.0);
    assert_eq!(lit.pixel(c.x, c.y).z, 0.0);
    assert!(lit.pixel(c.x, c.y).x > 0.9);
}

#[test]
fn test_grid_built_before_wrapping_is_visible() {
    let cell = IVec3::ZERO;
    let mut grid = VoxelGrid::default();
    grid.set_voxel(cell, Material::Emissive, Vec3::ONE);
    let dx = grid.voxel_dx();

    let target = (cell.as_vec3() + 0.5) * dx;
    let camera = Camera::new(target + Vec3::new(0.0, 0.0, 0.1), target);
    let mut r = Renderer::new(Arc::new(SharedGrid::new(grid)), RES, RES).with_camera(camera);

    assert_eq!(r.raycast_voxel_grid(center(), true), Some(cell));
    r.accumulate();
    let c = center();
    // White emitter fills the center pixel
    assert!(r.fetch_image().pixel(c.x, c.y).min_element() > 0.9);
}
