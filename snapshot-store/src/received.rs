//! A writable, uncommitted snapshot populated chunk-by-chunk from a remote
//! sender. State machine: `Empty -> Writing -> (Persisted | Aborted)`,
//! driven exclusively by [`apply`](ReceivedSnapshot::apply),
//! [`persist`](ReceivedSnapshot::persist) and
//! [`abort`](ReceivedSnapshot::abort).

use crate::chunk::Chunk;
use crate::error::Result;
use crate::persisted::PersistedSnapshot;
use crate::store::{ReceptionId, StoreHandle};

pub struct ReceivedSnapshot {
    store: StoreHandle,
    reception: ReceptionId,
}

impl ReceivedSnapshot {
    pub(crate) fn new(store: StoreHandle, reception: ReceptionId) -> Self {
        Self { store, reception }
    }

    /// Validates and applies one chunk. Returns `false` (without touching
    /// disk beyond what prior chunks already wrote) when the chunk is
    /// unacceptable; the caller may retry or eventually [`abort`](Self::abort).
    pub async fn apply(&self, chunk: Chunk) -> bool {
        self.store.apply_chunk(self.reception, chunk).await
    }

    /// Verifies completeness and the aggregate checksum, then commits. Fails
    /// with `CorruptedSnapshot` if the reception is partial or the aggregate
    /// checksum disagrees, leaving the pending directory in place so a
    /// subsequent [`abort`](Self::abort) on this same handle can clear it.
    pub async fn persist(&self) -> Result<PersistedSnapshot> {
        self.store.persist_received(self.reception).await
    }

    /// Purges the pending directory unconditionally. Idempotent, and valid
    /// to call after a failed [`persist`](Self::persist).
    pub async fn abort(&self) {
        self.store.abort_received(self.reception).await
    }
}
