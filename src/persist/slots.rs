//! Timestamped snapshot files in a directory.

use std::path::{Path, PathBuf};

use time::macros::format_description;
use time::OffsetDateTime;

use super::{load, save};
use crate::grid::VoxelGrid;
use crate::util::{Error, Result};

/// File name prefix of every slot.
pub const SLOT_PREFIX: &str = "voxtrace_";

/// File extension of every slot.
pub const SLOT_EXT: &str = "vxs";

/// Directory of save slots named `voxtrace_YYYYMMDD_HHMMSS.vxs`.
#[derive(Debug, Clone)]
pub struct SaveSlots {
    dir: PathBuf,
}

impl SaveSlots {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// `<home>/voxtrace_saveslots`, or the working directory when there is no home.
    pub fn default_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("voxtrace_saveslots")
    }

    #[inline]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Slot name for a timestamp.
    pub fn slot_name(when: OffsetDateTime) -> Result<String> {
        let fmt = format_description!("[year][month][day]_[hour][minute][second]");
        let stamp = when
            .format(&fmt)
            .map_err(|e| Error::other(format!("timestamp: {e}")))?;
        Ok(format!("{SLOT_PREFIX}{stamp}"))
    }

    /// Save `grid` into a new slot stamped with the current time.
    pub fn save(&self, grid: &VoxelGrid) -> Result<PathBuf> {
        self.save_at(grid, OffsetDateTime::now_utc())
    }

    /// Save `grid` into a new slot stamped with `when`.
    ///
    /// The blob goes to a temporary file first and is renamed into place, so an
    /// interrupted save never leaves a truncated slot behind. Slots saved within the
    /// same second get a numeric suffix.
    #[tracing::instrument(skip_all, fields(dir = %self.dir.display()))]
    pub fn save_at(&self, grid: &VoxelGrid, when: OffsetDateTime) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.dir)?;
        let stem = Self::slot_name(when)?;
        let mut path = self.dir.join(format!("{stem}.{SLOT_EXT}"));
        let mut n = 1;
        while path.exists() {
            path = self.dir.join(format!("{stem}_{n}.{SLOT_EXT}"));
            n += 1;
        }

        let blob = save(grid)?;
        let tmp = path.with_extension(format!("{SLOT_EXT}.tmp"));
        if let Err(e) = std::fs::write(&tmp, &blob) {
            let _ = std::fs::remove_file(&tmp);
            return Err(e.into());
        }
        std::fs::rename(&tmp, &path)?;
        tracing::info!(path = %path.display(), bytes = blob.len(), "saved slot");
        Ok(path)
    }

    /// Existing slots, newest first.
    pub fn list(&self) -> Result<Vec<PathBuf>> {
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let mut slots: Vec<PathBuf> = entries
            .filter_map(|e| e.ok().map(|e| e.path()))
            .filter(|p| is_slot(p))
            .collect();
        // Fixed-width timestamps sort lexically
        slots.sort_by(|a, b| b.file_name().cmp(&a.file_name()));
        Ok(slots)
    }

    /// Most recent slot, if any.
    pub fn latest(&self) -> Result<Option<PathBuf>> {
        Ok(self.list()?.into_iter().next())
    }

    /// Load a slot file into `grid`. On error the grid is untouched.
    pub fn load(path: impl AsRef<Path>, grid: &mut VoxelGrid) -> Result<()> {
        let blob = std::fs::read(path.as_ref())?;
        load(&blob, grid)
    }
}

fn is_slot(path: &Path) -> bool {
    path.is_file()
        && path.extension().is_some_and(|e| e == SLOT_EXT)
        && path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with(SLOT_PREFIX))
}
