//! Restricted capability views onto a [`StoreHandle`], returned by
//! [`crate::factory`] instead of the raw handle so callers can only reach
//! the operations appropriate to their role.

use std::sync::Arc;

use crate::metadata::SnapshotId;
use crate::persisted::{PersistedSnapshot, PersistedSnapshotListener};
use crate::received::ReceivedSnapshot;
use crate::store::StoreHandle;
use crate::transient::TransientSnapshot;

/// Leader view: produce and promote local snapshots.
#[derive(Clone)]
pub struct ConstructableSnapshotStore {
    pub(crate) handle: StoreHandle,
}

impl ConstructableSnapshotStore {
    pub async fn current_snapshot(&self) -> Option<PersistedSnapshot> {
        self.handle.current_snapshot().await
    }

    /// Returns `None` when `(index, term, proc, exp)` is not newer than the
    /// currently committed snapshot.
    pub async fn new_transient_snapshot(
        &self,
        index: u64,
        term: u64,
        processed_position: u64,
        exported_position: u64,
    ) -> Option<TransientSnapshot> {
        let id = SnapshotId::new(index, term, processed_position, exported_position);
        let reception = self.handle.new_transient_snapshot(id).await?;
        Some(TransientSnapshot::new(self.handle.clone(), reception))
    }

    pub async fn add_snapshot_listener(&self, listener: Arc<dyn PersistedSnapshotListener>) -> u64 {
        self.handle.add_snapshot_listener(listener).await
    }

    pub async fn remove_snapshot_listener(&self, id: u64) {
        self.handle.remove_snapshot_listener(id).await
    }

    pub async fn close(&self) {
        self.handle.close().await
    }
}

/// Follower view: receive and promote remote snapshots.
#[derive(Clone)]
pub struct ReceivableSnapshotStore {
    pub(crate) handle: StoreHandle,
}

impl ReceivableSnapshotStore {
    pub async fn current_snapshot(&self) -> Option<PersistedSnapshot> {
        self.handle.current_snapshot().await
    }

    pub async fn new_received_snapshot(&self, id: SnapshotId) -> ReceivedSnapshot {
        let reception = self.handle.new_received_snapshot(id).await;
        ReceivedSnapshot::new(self.handle.clone(), reception)
    }

    /// Removes every subdirectory of `pending/` whose id does not match the
    /// currently committed snapshot. Never touches `snapshots/`.
    pub async fn purge_pending_snapshots(&self) {
        self.handle.purge_pending_snapshots().await
    }

    pub async fn add_snapshot_listener(&self, listener: Arc<dyn PersistedSnapshotListener>) -> u64 {
        self.handle.add_snapshot_listener(listener).await
    }

    pub async fn remove_snapshot_listener(&self, id: u64) {
        self.handle.remove_snapshot_listener(id).await
    }

    pub async fn close(&self) {
        self.handle.close().await
    }
}
