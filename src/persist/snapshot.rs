//! Whole-grid snapshots and their byte encoding.
//!
//! Layout (little-endian):
//!
//! ```text
//! "VXTS" | version: u16 | resolution: u32 | voxel_dx: f32 | zlib( materials[R³] | colors[R³ * 3] )
//! ```
//!
//! Cells are stored row-major over (i, j, k), starting at index `-R/2` on every axis.

use std::io::{Cursor, Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;

use crate::grid::{join_index, Material, VoxelGrid, BLOCK_CELLS};
use crate::util::{Error, IVec3, Result};

/// File magic.
pub const MAGIC: [u8; 4] = *b"VXTS";

/// Current format version.
pub const FORMAT_VERSION: u16 = 1;

/// Largest resolution accepted when decoding.
const MAX_RESOLUTION: u32 = 1024;

/// Dense copy of every cell of a grid.
#[derive(Clone, Debug, PartialEq)]
pub struct Snapshot {
    pub resolution: u32,
    pub voxel_dx: f32,
    /// Material id per cell.
    pub materials: Vec<u8>,
    pub colors: Vec<[u8; 3]>,
}

/// Row-major position of `cell` in a snapshot of resolution `res`.
#[inline]
fn flat_index(cell: IVec3, res: u32) -> usize {
    let r = res as i64;
    let c = cell.as_i64vec3() + r / 2;
    ((c.x * r + c.y) * r + c.z) as usize
}

/// Inverse of [`flat_index`].
#[inline]
fn cell_at(index: usize, res: u32) -> IVec3 {
    let r = res as usize;
    let half = (res / 2) as i32;
    IVec3::new(
        (index / (r * r)) as i32,
        ((index / r) % r) as i32,
        (index % r) as i32,
    ) - half
}

fn read_header(cur: &mut Cursor<&[u8]>) -> std::io::Result<(u16, u32, f32)> {
    Ok((
        cur.read_u16::<LittleEndian>()?,
        cur.read_u32::<LittleEndian>()?,
        cur.read_f32::<LittleEndian>()?,
    ))
}

impl Snapshot {
    /// Copy every cell of `grid`, including colors of empty cells.
    #[tracing::instrument(level = "debug", skip_all, fields(res = grid.resolution()))]
    pub fn capture(grid: &VoxelGrid) -> Self {
        let res = grid.resolution();
        let n = grid.cell_count();
        let mut materials = vec![Material::Empty.id(); n];
        let mut colors = vec![[0u8; 3]; n];
        for (key, block) in grid.blocks() {
            for linear in 0..BLOCK_CELLS {
                let cell = join_index(key, linear);
                if !grid.in_domain(cell) {
                    continue;
                }
                let i = flat_index(cell, res);
                materials[i] = block.material(linear).id();
                colors[i] = block.color(linear);
            }
        }
        Self {
            resolution: res,
            voxel_dx: grid.voxel_dx(),
            materials,
            colors,
        }
    }

    /// Number of cells the arrays must hold.
    #[inline]
    pub fn cell_count(&self) -> usize {
        (self.resolution as usize).pow(3)
    }

    /// Check the snapshot fits `grid` without touching it.
    pub fn validate(&self, grid: &VoxelGrid) -> Result<()> {
        if self.resolution != grid.resolution() {
            return Err(Error::ResolutionMismatch {
                expected: grid.resolution(),
                actual: self.resolution,
            });
        }
        let n = grid.cell_count();
        for len in [self.materials.len(), self.colors.len()] {
            if len != n {
                return Err(Error::ShapeMismatch {
                    expected: n,
                    actual: len,
                });
            }
        }
        if let Some((cell, &id)) = self
            .materials
            .iter()
            .enumerate()
            .find(|&(_, &id)| Material::from_id(id).is_none())
        {
            return Err(Error::UnknownMaterial { id, cell });
        }
        Ok(())
    }

    /// Overwrite `grid` with the snapshot. On error the grid is left as it was.
    #[tracing::instrument(level = "debug", skip_all, fields(res = self.resolution))]
    pub fn apply(&self, grid: &mut VoxelGrid) -> Result<()> {
        self.validate(grid)?;
        if self.voxel_dx != grid.voxel_dx() {
            tracing::warn!(
                snapshot = self.voxel_dx,
                grid = grid.voxel_dx(),
                "snapshot voxel size differs, keeping grid's"
            );
        }
        grid.clear_all();
        for (i, (&id, &color)) in self.materials.iter().zip(&self.colors).enumerate() {
            if id == 0 && color == [0; 3] {
                continue;
            }
            let material = Material::from_id(id).unwrap_or_default();
            grid.put_raw(cell_at(i, self.resolution), material, color);
        }
        grid.recompute_bounding_box();
        Ok(())
    }

    /// Serialize to the binary format.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(64 * 1024);
        out.write_all(&MAGIC)?;
        out.write_u16::<LittleEndian>(FORMAT_VERSION)?;
        out.write_u32::<LittleEndian>(self.resolution)?;
        out.write_f32::<LittleEndian>(self.voxel_dx)?;

        let mut encoder = ZlibEncoder::new(out, Compression::default());
        encoder.write_all(&self.materials)?;
        encoder.write_all(bytemuck::cast_slice(&self.colors))?;
        Ok(encoder.finish()?)
    }

    /// Parse the binary format. Shape is checked against the header; grid fit is
    /// checked by [`apply`](Self::apply).
    pub fn decode(blob: &[u8]) -> Result<Self> {
        let mut cur = Cursor::new(blob);
        let mut magic = [0u8; 4];
        cur.read_exact(&mut magic)
            .map_err(|_| Error::invalid("truncated header"))?;
        if magic != MAGIC {
            return Err(Error::invalid("bad magic"));
        }
        let (version, resolution, voxel_dx) =
            read_header(&mut cur).map_err(|_| Error::invalid("truncated header"))?;
        if version != FORMAT_VERSION {
            return Err(Error::invalid(format!("unsupported version {version}")));
        }
        if resolution == 0 || resolution > MAX_RESOLUTION {
            return Err(Error::invalid(format!("bad resolution {resolution}")));
        }
        if !(voxel_dx.is_finite() && voxel_dx > 0.0) {
            return Err(Error::invalid(format!("bad voxel size {voxel_dx}")));
        }

        let n = (resolution as usize).pow(3);
        let expected = n * 4;
        // Sized by what actually decodes, not by the header
        let mut body = Vec::new();
        let pos = cur.position() as usize;
        ZlibDecoder::new(&blob[pos..])
            .take(expected as u64 + 1)
            .read_to_end(&mut body)
            .map_err(|e| Error::invalid(format!("corrupt body: {e}")))?;
        if body.len() != expected {
            return Err(Error::ShapeMismatch {
                expected: n,
                actual: body.len() / 4,
            });
        }

        let colors = body[n..]
            .chunks_exact(3)
            .map(|c| [c[0], c[1], c[2]])
            .collect();
        body.truncate(n);
        Ok(Self {
            resolution,
            voxel_dx,
            materials: body,
            colors,
        })
    }
}
