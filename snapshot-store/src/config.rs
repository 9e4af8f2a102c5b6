//! Construction-time knobs for a [`crate::store::StoreHandle`], mirroring
//! the reference datastore's fsync-level switch: production wants every
//! commit durable, tests want speed.

use std::path::PathBuf;

/// Controls whether [`crate::layout::Layout::commit`] actually fsyncs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FsyncLevel {
    /// fsync the snapshot's files and both directory entries before
    /// returning from persist. Safe default.
    #[default]
    Always,
    /// Skip fsync entirely. Only meant for tests exercising the state
    /// machine, where durability across a real crash is not being tested.
    Never,
}

/// Per-partition construction parameters for a snapshot store.
#[derive(Debug, Clone)]
pub struct SnapshotStoreConfig {
    pub root: PathBuf,
    pub fsync: FsyncLevel,
}

impl SnapshotStoreConfig {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            fsync: FsyncLevel::Always,
        }
    }

    pub fn with_fsync(mut self, fsync: FsyncLevel) -> Self {
        self.fsync = fsync;
        self
    }
}
