//! A writable, uncommitted snapshot produced locally by a state-machine
//! callback. Becomes a [`PersistedSnapshot`] on successful promotion.

use std::path::Path;

use crate::error::Result;
use crate::persisted::PersistedSnapshot;
use crate::store::{ReceptionId, StoreHandle};

pub struct TransientSnapshot {
    store: StoreHandle,
    reception: ReceptionId,
}

impl TransientSnapshot {
    pub(crate) fn new(store: StoreHandle, reception: ReceptionId) -> Self {
        Self { store, reception }
    }

    /// Schedules `writer` on the store's partition task. If `writer`
    /// returns `false`, the pending directory is purged.
    pub async fn take(&self, writer: impl FnOnce(&Path) -> bool + Send + 'static) {
        self.store
            .take_transient(self.reception, Box::new(writer))
            .await
    }

    /// Computes the aggregate checksum, writes the checksum sidecar, and
    /// atomically renames the snapshot into `snapshots/`.
    pub async fn persist(self) -> Result<PersistedSnapshot> {
        self.store.persist_transient(self.reception).await
    }
}
