//! Immutable handle onto a committed snapshot directory.

use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use crate::chunk::Chunk;
use crate::fs_helpers::sorted_file_names;
use crate::metadata::SnapshotId;

#[derive(Debug, Clone)]
pub struct PersistedSnapshot {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    id: SnapshotId,
    path: PathBuf,
    checksum: u64,
}

impl PersistedSnapshot {
    pub(crate) fn new(id: SnapshotId, path: PathBuf, checksum: u64) -> Self {
        Self {
            inner: Arc::new(Inner { id, path, checksum }),
        }
    }

    pub fn id(&self) -> SnapshotId {
        self.inner.id
    }

    pub fn path(&self) -> &std::path::Path {
        &self.inner.path
    }

    pub fn checksum(&self) -> u64 {
        self.inner.checksum
    }

    /// Yields the snapshot's state files, each as a single whole-file
    /// [`Chunk`], in ascending filename order — the same order the
    /// aggregate checksum was computed over.
    pub fn new_chunk_reader(&self) -> io::Result<ChunkReader> {
        let names = sorted_file_names(&self.inner.path)?
            .into_iter()
            .filter(|name| !name.ends_with(".checksum"))
            .collect::<Vec<_>>();

        Ok(ChunkReader {
            dir: self.inner.path.clone(),
            snapshot_id: self.inner.id.to_string(),
            snapshot_checksum: self.inner.checksum,
            total_count: names.len() as u32,
            names: names.into_iter(),
        })
    }
}

impl PartialEq for PersistedSnapshot {
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id && self.inner.checksum == other.inner.checksum
    }
}

impl Eq for PersistedSnapshot {}

pub struct ChunkReader {
    dir: PathBuf,
    snapshot_id: String,
    snapshot_checksum: u64,
    total_count: u32,
    names: std::vec::IntoIter<String>,
}

impl Iterator for ChunkReader {
    type Item = io::Result<Chunk>;

    fn next(&mut self) -> Option<Self::Item> {
        let name = self.names.next()?;
        Some(fs::read(self.dir.join(&name)).map(|content| Chunk {
            snapshot_id: self.snapshot_id.clone(),
            total_count: self.total_count,
            chunk_name: name,
            checksum: crc32c::crc32c(&content) as u64,
            content,
            snapshot_checksum: self.snapshot_checksum,
        }))
    }
}

/// Observer notified whenever the store promotes a new committed snapshot.
pub trait PersistedSnapshotListener: Send + Sync {
    fn on_new_snapshot(&self, snapshot: &PersistedSnapshot);
}
