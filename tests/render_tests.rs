//! Integration tests for progressive rendering and the adaptive frame loop.

use std::sync::Arc;
use std::time::Duration;

use voxtrace::prelude::*;
use voxtrace::render::MAX_SPP;

/// Small lit slab: diffuse voxels under the default directional light.
fn lit_scene() -> Renderer {
    let mut grid = VoxelGrid::new(32, 1.0 / 16.0);
    for i in -4..4 {
        for k in -4..4 {
            grid.set_voxel(IVec3::new(i, 0, k), Material::Diffuse, Vec3::new(0.7, 0.7, 0.7));
        }
    }
    grid.set_voxel(IVec3::new(0, 1, 0), Material::Diffuse, Vec3::new(0.9, 0.2, 0.2));
    let shared = Arc::new(SharedGrid::new(grid));
    let camera = Camera::new(Vec3::new(0.6, 0.7, 0.9), Vec3::new(0.0, 0.05, 0.0));
    let config = SceneConfig {
        seed: 1234,
        ..SceneConfig::default()
    };
    Renderer::new(shared, 24, 16)
        .with_camera(camera)
        .with_config(config)
}

#[test]
fn test_sample_count_never_decreases() {
    let mut r = lit_scene();
    let mut last = r.samples();
    for _ in 0..10 {
        r.accumulate();
        assert!(r.samples() > last);
        last = r.samples();
        // Fetching is read-only
        let _ = r.fetch_image();
        assert_eq!(r.samples(), last);
    }
}

#[test]
fn test_image_converges() {
    let mut r = lit_scene();
    r.accumulate();
    let first = r.fetch_image();
    r.accumulate();
    let early_delta = r.fetch_image().mean_abs_diff(&first);

    for _ in 2..48 {
        r.accumulate();
    }
    let before = r.fetch_image();
    r.accumulate();
    let late_delta = r.fetch_image().mean_abs_diff(&before);

    assert!(early_delta > 0.0, "noise expected between the first passes");
    assert!(
        late_delta < early_delta * 0.5,
        "late delta {late_delta} should be well below early delta {early_delta}"
    );
    assert!(r.fetch_image().pixels.iter().any(|p| p.max_element() > 0.0));
}

#[test]
fn test_rendering_is_reproducible() {
    let mut a = lit_scene();
    let mut b = lit_scene();
    for _ in 0..3 {
        a.accumulate();
        b.accumulate();
    }
    assert_eq!(a.fetch_image(), b.fetch_image());
}

#[test]
fn test_reset_then_accumulate_matches_fresh_render() {
    let mut a = lit_scene();
    a.accumulate();
    a.accumulate();
    a.reset_framebuffer();
    a.accumulate();

    let mut b = lit_scene();
    b.accumulate();
    assert_eq!(a.samples(), 1);
    assert_eq!(a.fetch_image(), b.fetch_image());
}

#[test]
fn test_empty_grid_renders_floor_and_sky() {
    let shared = Arc::new(SharedGrid::default());
    let mut r = Renderer::new(shared, 16, 16);
    r.accumulate();
    let img = r.fetch_image();
    assert!(img.pixels.iter().all(|p| p.is_finite()));
    // Default camera looks down onto the lit floor
    assert!(img.pixels.iter().any(|p| p.max_element() > 0.0));
}

#[test]
fn test_frame_loop_adapts_within_bounds() {
    let mut r = lit_scene();
    let mut ctl = SppController::new(30.0);
    let mut total = 0;
    for _ in 0..5 {
        let stats = r.render_frame(&mut ctl);
        total += stats.spp as u64;
        assert!(stats.spp >= 1 && stats.spp <= MAX_SPP);
        assert!(stats.next_spp >= 1 && stats.next_spp <= MAX_SPP);
        assert_eq!(stats.total_samples, total);
    }
}

#[test]
fn test_controller_direction() {
    let mut ctl = SppController::new(30.0);
    let mut prev = ctl.spp();
    // Cheap frames grow the batch
    for _ in 0..6 {
        let next = ctl.update(Duration::from_micros(100));
        assert!(next > prev || next == MAX_SPP);
        prev = next;
    }
    // Expensive frames shrink it, never below one
    for _ in 0..20 {
        let next = ctl.update(Duration::from_millis(500));
        assert!(next < prev || next == 1);
        prev = next;
    }
    assert_eq!(ctl.spp(), 1);
}
