//! Creates one store per partition, resolves paths under a node-scoped
//! root, and hands out the restricted capability views.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

use crate::config::FsyncLevel;
use crate::error::Result;
use crate::store::StoreHandle;
use crate::views::{ConstructableSnapshotStore, ReceivableSnapshotStore};

pub struct FileBasedSnapshotStoreFactory {
    node_id: String,
    data_root: PathBuf,
    fsync: FsyncLevel,
    stores: Mutex<HashMap<u32, StoreHandle>>,
}

impl FileBasedSnapshotStoreFactory {
    pub fn new(node_id: impl Into<String>, data_root: impl Into<PathBuf>) -> Self {
        Self {
            node_id: node_id.into(),
            data_root: data_root.into(),
            fsync: FsyncLevel::Always,
            stores: Mutex::new(HashMap::new()),
        }
    }

    /// Builds a factory that skips fsyncs on every store it opens. Meant for
    /// tests exercising the state machine, not for anything that needs to
    /// survive a crash.
    pub fn new_without_fsync(node_id: impl Into<String>, data_root: impl Into<PathBuf>) -> Self {
        Self {
            fsync: FsyncLevel::Never,
            ..Self::new(node_id, data_root)
        }
    }

    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    fn partition_root(&self, partition_id: u32) -> PathBuf {
        self.data_root.join(format!("partition-{partition_id}"))
    }

    /// Materializes `snapshots/`/`pending/` for `partition_id` (under
    /// `data_root/partition-<id>`), binds a store to a fresh partition task,
    /// and returns the follower-facing view. Idempotent per partition.
    pub fn create_receivable_snapshot_store(
        &self,
        partition_id: u32,
    ) -> Result<ReceivableSnapshotStore> {
        let handle = self.open_or_reuse(partition_id)?;
        Ok(ReceivableSnapshotStore { handle })
    }

    /// Returns the leader-facing view for an already-created store.
    pub fn get_constructable_snapshot_store(
        &self,
        partition_id: u32,
    ) -> Result<ConstructableSnapshotStore> {
        let handle = self.open_or_reuse(partition_id)?;
        Ok(ConstructableSnapshotStore { handle })
    }

    fn open_or_reuse(&self, partition_id: u32) -> Result<StoreHandle> {
        let mut stores = self.stores.lock().unwrap();
        if let Some(handle) = stores.get(&partition_id) {
            return Ok(handle.clone());
        }
        let config = crate::config::SnapshotStoreConfig::new(self.partition_root(partition_id))
            .with_fsync(self.fsync);
        let handle = StoreHandle::open_with_config(config)?;
        stores.insert(partition_id, handle.clone());
        Ok(handle)
    }
}
