//! Built-in scenes used by the CLI and tests.

use std::fmt;
use std::str::FromStr;

use crate::grid::{Material, VoxelGrid};
use crate::trace::{Camera, Floor};
use crate::util::{Error, IVec3, Vec3};

use super::{Backdrop, SceneConfig};

/// Named starting scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Preset {
    /// Striped light wall over a checkered floor with a glowing bar.
    Wall,
    /// Red/green box with a ceiling light and a wavy blue ramp.
    CornellBox,
    /// Nothing but the floor.
    Empty,
}

impl Preset {
    pub const ALL: [Preset; 3] = [Preset::Wall, Preset::CornellBox, Preset::Empty];

    pub fn name(self) -> &'static str {
        match self {
            Self::Wall => "wall",
            Self::CornellBox => "cornell",
            Self::Empty => "empty",
        }
    }

    /// Write the scene's voxels into `grid` (existing contents are kept).
    #[tracing::instrument(skip(grid), fields(preset = self.name()))]
    pub fn populate(self, grid: &mut VoxelGrid) {
        match self {
            Self::Wall => populate_wall(grid),
            Self::CornellBox => populate_cornell(grid),
            Self::Empty => {}
        }
        grid.recompute_bounding_box();
        tracing::debug!(voxels = grid.non_empty_count(), "preset populated");
    }

    /// Fresh default-sized grid holding the scene.
    pub fn build(self) -> VoxelGrid {
        let mut grid = VoxelGrid::default();
        self.populate(&mut grid);
        grid
    }

    pub fn camera(self) -> Camera {
        match self {
            Self::Wall | Self::Empty => Camera::default(),
            Self::CornellBox => {
                let c = Vec3::splat(CORNELL_N as f32 * 0.5 / 64.0);
                Camera::new(Vec3::new(c.x, c.y, 2.2), c)
            }
        }
    }

    pub fn config(self) -> SceneConfig {
        match self {
            Self::Wall => SceneConfig {
                backdrop: Some(Backdrop::default()),
                ..SceneConfig::default()
            },
            Self::Empty => SceneConfig::default(),
            Self::CornellBox => {
                let mut config = SceneConfig {
                    floor: Floor::Plane { height: 0.0 },
                    floor_color: Vec3::ONE,
                    exposure: 30.0,
                    voxel_edges: 0.0,
                    ..SceneConfig::default()
                };
                // Lit only by the ceiling patch
                config.light.color = Vec3::ZERO;
                config
            }
        }
    }
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Preset {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "wall" => Ok(Self::Wall),
            "cornell" | "cornell-box" | "cornell_box" => Ok(Self::CornellBox),
            "empty" => Ok(Self::Empty),
            other => Err(Error::other(format!(
                "unknown preset '{other}' (expected wall, cornell or empty)"
            ))),
        }
    }
}

fn populate_wall(grid: &mut VoxelGrid) {
    for i in 0..31 {
        for j in 0..31 {
            let material = if j % 10 != 0 {
                Material::Emissive
            } else {
                Material::Diffuse
            };
            grid.set_voxel(IVec3::new(j, i, -30), material, Vec3::ONE);
        }
    }
    for i in 0..31 {
        for j in 0..31 {
            let c = ((i + j) % 2) as f32;
            let color = Vec3::new(c * 55.0 + 200.0, (1.0 - c) * 55.0 + 200.0, 255.0) / 255.0;
            grid.set_voxel(IVec3::new(i, 0, j - 30), Material::Diffuse, color);
        }
    }
    for i in 0..31 {
        grid.set_voxel(IVec3::new(i, 1, 6), Material::Emissive, Vec3::ONE);
    }
}

const CORNELL_N: i32 = 50;

fn populate_cornell(grid: &mut VoxelGrid) {
    let n = CORNELL_N;
    let red = Vec3::new(0.9, 0.3, 0.3);
    let green = Vec3::new(0.3, 0.9, 0.3);
    for i in 0..n {
        for j in 0..n {
            grid.set_voxel(IVec3::new(0, i, j), Material::Diffuse, red);
            grid.set_voxel(IVec3::new(n, i, j), Material::Diffuse, green);
            grid.set_voxel(IVec3::new(i, n, j), Material::Diffuse, Vec3::ONE);
            grid.set_voxel(IVec3::new(i, 0, j), Material::Diffuse, Vec3::ONE);
            grid.set_voxel(IVec3::new(i, j, 0), Material::Diffuse, Vec3::ONE);
        }
    }

    let half = n / 2;
    let patch = n / 8;
    for i in -patch - 1..patch {
        for j in -patch - 1..patch {
            grid.set_voxel(IVec3::new(i + half, n, j + half), Material::Emissive, Vec3::ONE);
        }
    }

    let blue = Vec3::new(0.3, 0.3, 0.9);
    let span = n / 4 * 3;
    for i in (0..span).step_by(2) {
        for j in 0..span {
            let wave = ((i + j) as f32 / n as f32 * 30.0).sin() * 0.05 * n as f32;
            let y = (n / 4) as f32 + wave + i as f32 / 10.0;
            grid.set_voxel(
                IVec3::new(j + n / 8, y as i32, n / 8 * 7 - i),
                Material::Diffuse,
                blue,
            );
        }
    }
}
