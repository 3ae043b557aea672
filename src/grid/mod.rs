//! Sparse voxel grid.
//!
//! The grid covers a cubic domain of `R` cells per axis, indices in `[-R/2, R/2)`.
//! Cells live in dense 8x8x8 [`Block`]s keyed by block coordinate; blocks appear on
//! first write and are dropped again once they hold nothing.
//!
//! ```text
//! cell (i,j,k) ──div 8──► block key ──HashMap──► Box<Block> ──[local]──► (material, rgb8)
//! ```

mod block;
mod shared;

pub use block::{Block, BLOCK_CELLS, BLOCK_EDGE};
pub use shared::SharedGrid;

use std::collections::HashMap;

use crate::util::{Aabb, IVec3, Vec3};
pub(crate) use block::{join_index, split_index};

/// Default cells per axis.
pub const DEFAULT_RESOLUTION: u32 = 128;

/// Default world-space edge of one voxel.
pub const DEFAULT_VOXEL_DX: f32 = 1.0 / 64.0;

/// Surface kind stored per cell.
#[repr(u8)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Material {
    #[default]
    Empty = 0,
    Diffuse = 1,
    Emissive = 2,
}

impl Material {
    /// Wire id used by snapshots and the edit API.
    #[inline]
    pub fn id(self) -> u8 {
        self as u8
    }

    pub fn from_id(id: u8) -> Option<Self> {
        match id {
            0 => Some(Self::Empty),
            1 => Some(Self::Diffuse),
            2 => Some(Self::Emissive),
            _ => None,
        }
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self == Self::Empty
    }
}

/// One cell as seen by readers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Voxel {
    pub material: Material,
    pub color: [u8; 3],
}

impl Voxel {
    pub const EMPTY: Self = Self {
        material: Material::Empty,
        color: [0; 3],
    };

    /// Stored color as floats in [0, 1].
    #[inline]
    pub fn color_f32(&self) -> Vec3 {
        dequantize(self.color)
    }
}

/// Clamp to [0, 1] and quantize with `round(c * 255)`.
#[inline]
pub fn quantize(color: Vec3) -> [u8; 3] {
    let c = (color.clamp(Vec3::ZERO, Vec3::ONE) * 255.0).round();
    [c.x as u8, c.y as u8, c.z as u8]
}

#[inline]
pub fn dequantize(color: [u8; 3]) -> Vec3 {
    Vec3::new(color[0] as f32, color[1] as f32, color[2] as f32) / 255.0
}

/// Sparse voxel grid with a lazily recomputed bounding box.
#[derive(Clone)]
pub struct VoxelGrid {
    resolution: u32,
    voxel_dx: f32,
    blocks: HashMap<IVec3, Box<Block>>,
    occupied: usize,
    /// Inclusive index bounds of non-empty cells, `None` when empty.
    index_bounds: Option<(IVec3, IVec3)>,
    bbox: Aabb,
    bbox_dirty: bool,
}

impl VoxelGrid {
    /// Create an empty grid.
    ///
    /// `resolution` is rounded up to a multiple of the block edge (minimum one block)
    /// and a non-positive `voxel_dx` falls back to the default.
    pub fn new(resolution: u32, voxel_dx: f32) -> Self {
        let edge = BLOCK_EDGE as u32;
        let fixed_res = resolution.max(edge).div_ceil(edge) * edge;
        if fixed_res != resolution {
            tracing::warn!(resolution, fixed_res, "grid resolution rounded to block multiple");
        }
        let fixed_dx = if voxel_dx.is_finite() && voxel_dx > 0.0 {
            voxel_dx
        } else {
            tracing::warn!(voxel_dx, "invalid voxel size, using default");
            DEFAULT_VOXEL_DX
        };
        Self {
            resolution: fixed_res,
            voxel_dx: fixed_dx,
            blocks: HashMap::new(),
            occupied: 0,
            index_bounds: None,
            bbox: Aabb::ZERO,
            bbox_dirty: false,
        }
    }

    #[inline]
    pub fn resolution(&self) -> u32 {
        self.resolution
    }

    #[inline]
    pub fn voxel_dx(&self) -> f32 {
        self.voxel_dx
    }

    /// Total number of cells, `R³`.
    #[inline]
    pub fn cell_count(&self) -> usize {
        (self.resolution as usize).pow(3)
    }

    /// Lowest valid index on each axis, `-R/2`.
    #[inline]
    pub fn domain_min(&self) -> IVec3 {
        IVec3::splat(-(self.resolution as i32) / 2)
    }

    /// Highest valid index on each axis, `R/2 - 1`.
    #[inline]
    pub fn domain_max(&self) -> IVec3 {
        IVec3::splat(self.resolution as i32 / 2 - 1)
    }

    #[inline]
    pub fn in_domain(&self, cell: IVec3) -> bool {
        cell.cmpge(self.domain_min()).all() && cell.cmple(self.domain_max()).all()
    }

    /// Cell containing a world-space point.
    #[inline]
    pub fn world_to_index(&self, p: Vec3) -> IVec3 {
        (p / self.voxel_dx).floor().as_ivec3()
    }

    /// Block lookup used by traversal.
    #[inline]
    pub(crate) fn block(&self, key: IVec3) -> Option<&Block> {
        self.blocks.get(&key).map(|b| b.as_ref())
    }

    /// All allocated blocks, including ones that only hold painted empty cells.
    pub(crate) fn blocks(&self) -> impl Iterator<Item = (IVec3, &Block)> + '_ {
        self.blocks.iter().map(|(&key, b)| (key, b.as_ref()))
    }

    pub fn get(&self, cell: IVec3) -> Voxel {
        if !self.in_domain(cell) {
            return Voxel::EMPTY;
        }
        let (key, linear) = split_index(cell);
        match self.blocks.get(&key) {
            Some(b) => Voxel {
                material: b.material(linear),
                color: b.color(linear),
            },
            None => Voxel::EMPTY,
        }
    }

    #[inline]
    pub fn material(&self, cell: IVec3) -> Material {
        self.get(cell).material
    }

    /// Write a cell. Out-of-domain cells are ignored; `Material::Empty` clears.
    pub fn set(&mut self, cell: IVec3, material: Material, color: Vec3) {
        if !self.in_domain(cell) {
            return;
        }
        let (key, linear) = split_index(cell);
        let block = self.blocks.entry(key).or_default();
        let old = block.set_material(linear, material);
        block.set_color(linear, quantize(color));
        self.after_material_change(key, old, material);
    }

    /// Mark a cell empty. Its stored color is kept.
    pub fn clear(&mut self, cell: IVec3) {
        if !self.in_domain(cell) {
            return;
        }
        let (key, linear) = split_index(cell);
        let Some(block) = self.blocks.get_mut(&key) else {
            return;
        };
        let old = block.set_material(linear, Material::Empty);
        self.after_material_change(key, old, Material::Empty);
    }

    fn after_material_change(&mut self, key: IVec3, old: Material, new: Material) {
        match (old.is_empty(), new.is_empty()) {
            (true, false) => self.occupied += 1,
            (false, true) => self.occupied -= 1,
            _ => {}
        }
        if old.is_empty() != new.is_empty() {
            self.bbox_dirty = true;
        }
        if self.blocks.get(&key).is_some_and(|b| b.is_blank()) {
            self.blocks.remove(&key);
        }
    }

    /// Edit API: place a voxel.
    pub fn set_voxel(&mut self, cell: IVec3, material: Material, color: Vec3) {
        self.set(cell, material, color);
    }

    /// Edit API: remove a voxel.
    pub fn delete_voxel(&mut self, cell: IVec3) {
        self.clear(cell);
    }

    /// Edit API: recolor a cell without touching its material.
    pub fn set_voxel_color(&mut self, cell: IVec3, color: Vec3) {
        if !self.in_domain(cell) {
            return;
        }
        let (key, linear) = split_index(cell);
        let q = quantize(color);
        match self.blocks.get_mut(&key) {
            Some(block) => {
                block.set_color(linear, q);
                if block.is_blank() {
                    self.blocks.remove(&key);
                }
            }
            None if q != [0; 3] => {
                let mut block = Box::<Block>::default();
                block.set_color(linear, q);
                self.blocks.insert(key, block);
            }
            None => {}
        }
    }

    /// Edit API: stored color of a cell in [0, 1].
    pub fn get_voxel_color(&self, cell: IVec3) -> Vec3 {
        self.get(cell).color_f32()
    }

    /// Raw cell write used by snapshot loading; ids are validated by the caller.
    pub(crate) fn put_raw(&mut self, cell: IVec3, material: Material, color: [u8; 3]) {
        let (key, linear) = split_index(cell);
        let block = self.blocks.entry(key).or_default();
        let old = block.set_material(linear, material);
        block.set_color(linear, color);
        self.after_material_change(key, old, material);
    }

    /// Drop every cell.
    pub fn clear_all(&mut self) {
        self.blocks.clear();
        self.occupied = 0;
        self.bbox_dirty = true;
    }

    /// Number of non-empty cells.
    #[inline]
    pub fn non_empty_count(&self) -> usize {
        self.occupied
    }

    /// Number of allocated blocks.
    #[inline]
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    #[inline]
    pub fn is_bbox_dirty(&self) -> bool {
        self.bbox_dirty
    }

    /// Bounding box as of the last [`recompute_bounding_box`](Self::recompute_bounding_box).
    #[inline]
    pub fn bounding_box(&self) -> Aabb {
        self.bbox
    }

    /// Inclusive index bounds of the geometry, as of the last recompute.
    #[inline]
    pub fn index_bounds(&self) -> Option<(IVec3, IVec3)> {
        self.index_bounds
    }

    /// Rebuild the bounding box by scanning active blocks.
    #[tracing::instrument(level = "debug", skip_all, fields(blocks = self.blocks.len()))]
    pub fn recompute_bounding_box(&mut self) {
        let mut bounds: Option<(IVec3, IVec3)> = None;
        for (&key, block) in self.blocks.iter().filter(|(_, b)| b.is_active()) {
            for (linear, _, _) in block.occupied_cells() {
                let cell = join_index(key, linear);
                bounds = Some(match bounds {
                    Some((lo, hi)) => (lo.min(cell), hi.max(cell)),
                    None => (cell, cell),
                });
            }
        }
        self.index_bounds = bounds;
        self.bbox = match bounds {
            Some((lo, hi)) => Aabb::new(
                lo.as_vec3() * self.voxel_dx,
                (hi + IVec3::ONE).as_vec3() * self.voxel_dx,
            ),
            None => Aabb::ZERO,
        };
        self.bbox_dirty = false;
    }

    /// Iterate non-empty cells in no particular order.
    pub fn iter_occupied(&self) -> impl Iterator<Item = (IVec3, Voxel)> + '_ {
        self.blocks.iter().flat_map(|(&key, block)| {
            block
                .occupied_cells()
                .map(move |(linear, material, color)| (join_index(key, linear), Voxel { material, color }))
        })
    }

    /// Count of non-empty cells per material: (diffuse, emissive).
    pub fn material_counts(&self) -> (usize, usize) {
        self.iter_occupied()
            .fold((0, 0), |(d, e), (_, v)| match v.material {
                Material::Diffuse => (d + 1, e),
                Material::Emissive => (d, e + 1),
                Material::Empty => (d, e),
            })
    }
}

impl Default for VoxelGrid {
    fn default() -> Self {
        Self::new(DEFAULT_RESOLUTION, DEFAULT_VOXEL_DX)
    }
}

impl std::fmt::Debug for VoxelGrid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VoxelGrid")
            .field("resolution", &self.resolution)
            .field("voxel_dx", &self.voxel_dx)
            .field("blocks", &self.blocks.len())
            .field("occupied", &self.occupied)
            .field("bbox", &self.bbox)
            .finish()
    }
}
