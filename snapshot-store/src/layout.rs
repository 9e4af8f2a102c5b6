//! Owns the `snapshots/` and `pending/` directories under a partition root
//! and performs the only two operations allowed to cross that boundary:
//! atomic rename-in and best-effort purge.
//!
//! Note: when creating a snapshot directory we always write into a `pending/`
//! subdirectory first, then do an atomic rename. No chunk is ever written
//! into `snapshots/` directly (I5).

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::config::FsyncLevel;
use crate::fs_helpers;
use crate::metadata::SnapshotId;

#[derive(Clone)]
pub struct Layout {
    root: PathBuf,
    fsync: FsyncLevel,
}

impl Layout {
    pub fn new(root: impl Into<PathBuf>, fsync: FsyncLevel) -> Self {
        Self {
            root: root.into(),
            fsync,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn snapshots_dir(&self) -> PathBuf {
        self.root.join(snapshot_buildcfg::SNAPSHOTS_DIR)
    }

    pub fn pending_dir(&self) -> PathBuf {
        self.root.join(snapshot_buildcfg::PENDING_DIR)
    }

    pub fn snapshot_path(&self, id: &SnapshotId) -> PathBuf {
        self.snapshots_dir().join(id.to_string())
    }

    pub fn checksum_sidecar_path(dir: &Path, id: &SnapshotId) -> PathBuf {
        dir.join(format!("{id}.checksum"))
    }

    /// Creates `snapshots/` and `pending/` if absent.
    pub fn ensure_dirs(&self) -> io::Result<()> {
        fs_helpers::create_dir_all(self.snapshots_dir())?;
        fs_helpers::create_dir_all(self.pending_dir())
    }

    /// Returns `pending/<id>-<n>` for the smallest positive `n` whose path
    /// does not yet exist, and creates it.
    pub fn allocate_pending_path(&self, id: &SnapshotId) -> io::Result<PathBuf> {
        let pending = self.pending_dir();
        let mut n: u32 = 1;
        loop {
            let path = pending.join(format!("{id}-{n}"));
            match fs::create_dir(&path) {
                Ok(()) => return Ok(path),
                Err(err) if err.kind() == io::ErrorKind::AlreadyExists => n += 1,
                Err(err) => return Err(err),
            }
        }
    }

    /// Fsyncs `pending_path` (recursively), renames it to
    /// `snapshots/<final_name>`, then fsyncs the `snapshots/` parent.
    ///
    /// On any error the pending directory is left intact so the caller can
    /// retry or inspect it.
    pub fn commit(&self, pending_path: &Path, final_name: &str) -> io::Result<PathBuf> {
        if self.fsync == FsyncLevel::Always {
            fs_helpers::fsync_tree(pending_path)?;
        }

        let target = self.snapshots_dir().join(final_name);
        fs::rename(pending_path, &target)?;

        if self.fsync == FsyncLevel::Always {
            fs_helpers::fsync_dir(self.snapshots_dir())?;
        }

        Ok(target)
    }

    /// Recursive, best-effort delete; failures are logged, never returned.
    pub fn purge(&self, path: &Path) {
        fs_helpers::purge_best_effort(path);
    }

    /// Every subdirectory currently under `pending/`.
    pub fn list_pending(&self) -> io::Result<Vec<PathBuf>> {
        let mut entries = Vec::new();
        for entry in fs::read_dir(self.pending_dir())? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                entries.push(entry.path());
            }
        }
        Ok(entries)
    }

    /// Every subdirectory currently under `snapshots/`.
    pub fn list_snapshots(&self) -> io::Result<Vec<PathBuf>> {
        let mut entries = Vec::new();
        for entry in fs::read_dir(self.snapshots_dir())? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                entries.push(entry.path());
            }
        }
        Ok(entries)
    }
}
