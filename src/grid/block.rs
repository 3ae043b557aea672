//! Dense fixed-size storage blocks of the sparse voxel arena.

use glam::IVec3;

use super::Material;

/// Edge length of a block in cells.
pub const BLOCK_EDGE: i32 = 8;

/// Cells per block.
pub const BLOCK_CELLS: usize = (BLOCK_EDGE * BLOCK_EDGE * BLOCK_EDGE) as usize;

/// Split a cell index into (block key, linear index inside the block).
#[inline]
pub fn split_index(cell: IVec3) -> (IVec3, usize) {
    let key = cell.div_euclid(IVec3::splat(BLOCK_EDGE));
    let local = cell.rem_euclid(IVec3::splat(BLOCK_EDGE));
    let linear = ((local.x * BLOCK_EDGE + local.y) * BLOCK_EDGE + local.z) as usize;
    (key, linear)
}

/// Inverse of [`split_index`].
#[inline]
pub fn join_index(key: IVec3, linear: usize) -> IVec3 {
    let linear = linear as i32;
    let local = IVec3::new(
        linear / (BLOCK_EDGE * BLOCK_EDGE),
        (linear / BLOCK_EDGE) % BLOCK_EDGE,
        linear % BLOCK_EDGE,
    );
    key * BLOCK_EDGE + local
}

/// One dense 8x8x8 block of cells.
///
/// Colors are kept for empty cells as well so snapshots round-trip exactly.
#[derive(Clone)]
pub struct Block {
    materials: [Material; BLOCK_CELLS],
    colors: [[u8; 3]; BLOCK_CELLS],
    occupied: u16,
    painted: u16,
}

impl Block {
    pub fn new() -> Self {
        Self {
            materials: [Material::Empty; BLOCK_CELLS],
            colors: [[0; 3]; BLOCK_CELLS],
            occupied: 0,
            painted: 0,
        }
    }

    /// Block holds at least one non-empty cell; traversal skips inactive blocks.
    #[inline]
    pub fn is_active(&self) -> bool {
        self.occupied > 0
    }

    /// Nothing worth keeping: no geometry and no stored colors.
    #[inline]
    pub fn is_blank(&self) -> bool {
        self.occupied == 0 && self.painted == 0
    }

    #[inline]
    pub fn occupied(&self) -> usize {
        self.occupied as usize
    }

    #[inline]
    pub fn material(&self, linear: usize) -> Material {
        self.materials[linear]
    }

    #[inline]
    pub fn color(&self, linear: usize) -> [u8; 3] {
        self.colors[linear]
    }

    /// Store a material, returning the previous one.
    pub fn set_material(&mut self, linear: usize, material: Material) -> Material {
        let old = std::mem::replace(&mut self.materials[linear], material);
        match (old.is_empty(), material.is_empty()) {
            (true, false) => self.occupied += 1,
            (false, true) => self.occupied -= 1,
            _ => {}
        }
        old
    }

    pub fn set_color(&mut self, linear: usize, color: [u8; 3]) {
        let was_painted = self.colors[linear] != [0; 3];
        let is_painted = color != [0; 3];
        self.colors[linear] = color;
        match (was_painted, is_painted) {
            (false, true) => self.painted += 1,
            (true, false) => self.painted -= 1,
            _ => {}
        }
    }

    /// Iterate non-empty cells as (linear index, material, color).
    pub fn occupied_cells(&self) -> impl Iterator<Item = (usize, Material, [u8; 3])> + '_ {
        self.materials
            .iter()
            .enumerate()
            .filter(|(_, m)| !m.is_empty())
            .map(|(i, &m)| (i, m, self.colors[i]))
    }
}

impl Default for Block {
    fn default() -> Self {
        Self::new()
    }
}
