//! Saving and loading grids.
//!
//! [`save`] and [`load`] work on in-memory blobs; [`SaveSlots`] manages a directory
//! of timestamped blobs on disk.

mod slots;
mod snapshot;

pub use slots::{SaveSlots, SLOT_EXT, SLOT_PREFIX};
pub use snapshot::{Snapshot, FORMAT_VERSION, MAGIC};

use crate::grid::VoxelGrid;
use crate::util::Result;

/// Encode the whole grid.
pub fn save(grid: &VoxelGrid) -> Result<Vec<u8>> {
    Snapshot::capture(grid).encode()
}

/// Replace the grid contents from a blob produced by [`save`].
///
/// Nothing is modified unless the blob decodes and matches the grid's shape.
pub fn load(blob: &[u8], grid: &mut VoxelGrid) -> Result<()> {
    Snapshot::decode(blob)?.apply(grid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Material;
    use crate::util::{Error, IVec3, Vec3};

    #[test]
    fn test_save_load_blob() {
        let mut g = VoxelGrid::new(16, 0.05);
        g.set_voxel(IVec3::new(3, -4, 5), Material::Emissive, Vec3::new(0.9, 0.8, 0.1));
        let blob = save(&g).unwrap();

        let mut other = VoxelGrid::new(16, 0.05);
        load(&blob, &mut other).unwrap();
        assert_eq!(other.get(IVec3::new(3, -4, 5)), g.get(IVec3::new(3, -4, 5)));
        assert_eq!(other.non_empty_count(), 1);
        assert!(!other.is_bbox_dirty());
    }

    #[test]
    fn test_load_into_wrong_resolution_fails_cleanly() {
        let blob = save(&VoxelGrid::new(16, 0.05)).unwrap();
        let mut g = VoxelGrid::new(32, 0.05);
        g.set_voxel(IVec3::ONE, Material::Diffuse, Vec3::ONE);
        let err = load(&blob, &mut g).unwrap_err();
        assert!(matches!(err, Error::ResolutionMismatch { .. }));
        assert_eq!(g.non_empty_count(), 1);
    }
}
