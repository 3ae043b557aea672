//! Versioned grid shared between the render loop and editors.
//!
//! Render passes hold the read lock for their whole duration; edits take the
//! write lock, so a batch of edits is only ever applied between passes.

use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::{RwLock, RwLockReadGuard};

use super::{Material, VoxelGrid};
use crate::util::{IVec3, Vec3};

/// [`VoxelGrid`] behind a single-writer/many-reader lock plus an edit counter.
///
/// The version increases once per edit batch. Renderers remember the version their
/// accumulated samples were produced with and reset when it moves.
pub struct SharedGrid {
    grid: RwLock<VoxelGrid>,
    version: AtomicU64,
}

impl SharedGrid {
    /// Wrap `grid`, bringing its bounding box up to date first.
    pub fn new(mut grid: VoxelGrid) -> Self {
        if grid.is_bbox_dirty() {
            grid.recompute_bounding_box();
        }
        Self {
            grid: RwLock::new(grid),
            version: AtomicU64::new(0),
        }
    }

    /// Current edit version.
    #[inline]
    pub fn version(&self) -> u64 {
        self.version.load(Ordering::Acquire)
    }

    /// Shared access for tracing passes and queries.
    #[inline]
    pub fn read(&self) -> RwLockReadGuard<'_, VoxelGrid> {
        self.grid.read()
    }

    /// Apply a batch of edits under the write lock.
    ///
    /// The bounding box is recomputed before the lock is released, so readers never
    /// observe a stale box.
    pub fn edit<R>(&self, f: impl FnOnce(&mut VoxelGrid) -> R) -> R {
        let mut grid = self.grid.write();
        let out = f(&mut grid);
        if grid.is_bbox_dirty() {
            grid.recompute_bounding_box();
        }
        self.version.fetch_add(1, Ordering::AcqRel);
        out
    }

    /// Like [`edit`](Self::edit), but the version only moves when `f` succeeds.
    ///
    /// `f` must leave the grid unchanged when it fails.
    pub fn try_edit<T, E>(&self, f: impl FnOnce(&mut VoxelGrid) -> Result<T, E>) -> Result<T, E> {
        let mut grid = self.grid.write();
        let out = f(&mut grid)?;
        if grid.is_bbox_dirty() {
            grid.recompute_bounding_box();
        }
        self.version.fetch_add(1, Ordering::AcqRel);
        Ok(out)
    }

    /// Replace the whole grid (e.g. after loading a snapshot).
    pub fn replace(&self, mut grid: VoxelGrid) {
        if grid.is_bbox_dirty() {
            grid.recompute_bounding_box();
        }
        *self.grid.write() = grid;
        self.version.fetch_add(1, Ordering::AcqRel);
    }

    pub fn set_voxel(&self, cell: IVec3, material: Material, color: Vec3) {
        self.edit(|g| g.set_voxel(cell, material, color));
    }

    pub fn delete_voxel(&self, cell: IVec3) {
        self.edit(|g| g.delete_voxel(cell));
    }

    pub fn set_voxel_color(&self, cell: IVec3, color: Vec3) {
        self.edit(|g| g.set_voxel_color(cell, color));
    }

    pub fn get_voxel_color(&self, cell: IVec3) -> Vec3 {
        self.read().get_voxel_color(cell)
    }
}

impl Default for SharedGrid {
    fn default() -> Self {
        Self::new(VoxelGrid::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_edit_bumps_version_and_bbox() {
        let shared = SharedGrid::default();
        assert_eq!(shared.version(), 0);
        shared.set_voxel(IVec3::new(1, 2, 3), Material::Diffuse, Vec3::ONE);
        assert_eq!(shared.version(), 1);
        let g = shared.read();
        assert!(!g.is_bbox_dirty());
        assert!(!g.bounding_box().is_degenerate());
    }

    #[test]
    fn test_new_refreshes_dirty_bbox() {
        let mut grid = VoxelGrid::default();
        grid.set_voxel(IVec3::new(-3, 0, 5), Material::Emissive, Vec3::ONE);
        assert!(grid.is_bbox_dirty());

        let shared = SharedGrid::new(grid);
        let g = shared.read();
        assert!(!g.is_bbox_dirty());
        assert_eq!(
            g.index_bounds(),
            Some((IVec3::new(-3, 0, 5), IVec3::new(-3, 0, 5)))
        );
        assert_eq!(shared.version(), 0);
    }

    #[test]
    fn test_batch_is_one_version() {
        let shared = SharedGrid::default();
        shared.edit(|g| {
            for i in 0..10 {
                g.set_voxel(IVec3::new(i, 0, 0), Material::Diffuse, Vec3::ONE);
            }
        });
        assert_eq!(shared.version(), 1);
        assert_eq!(shared.read().non_empty_count(), 10);
    }

    #[test]
    fn test_failed_try_edit_keeps_version() {
        let shared = SharedGrid::default();
        let res: Result<(), &str> = shared.try_edit(|_| Err("rejected"));
        assert!(res.is_err());
        assert_eq!(shared.version(), 0);
        let ok: Result<usize, &str> = shared.try_edit(|g| Ok(g.non_empty_count()));
        assert_eq!(ok, Ok(0));
        assert_eq!(shared.version(), 1);
    }

    #[test]
    fn test_concurrent_readers_and_writer() {
        let shared = Arc::new(SharedGrid::default());
        let writer = {
            let shared = Arc::clone(&shared);
            std::thread::spawn(move || {
                for i in 0..32 {
                    shared.set_voxel(IVec3::new(i, 0, 0), Material::Diffuse, Vec3::ONE);
                }
            })
        };
        for _ in 0..32 {
            let g = shared.read();
            // Box is always consistent with the visible geometry
            assert_eq!(g.index_bounds().is_some(), g.non_empty_count() > 0);
        }
        writer.join().expect("writer thread panicked");
        assert_eq!(shared.read().non_empty_count(), 32);
        assert_eq!(shared.version(), 32);
    }
}
