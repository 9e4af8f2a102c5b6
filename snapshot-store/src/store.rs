//! The partition-scoped facade.
//!
//! All state-mutating operations — `apply`, `persist`, `abort`,
//! `purge_pending_snapshots`, listener (de)registration and notification —
//! are dispatched as messages onto a single task bound to this store, so
//! nothing in this module ever runs concurrently with itself for a given
//! partition. Readers (`current_snapshot`) read `current_committed` directly
//! off a shared `Mutex` instead of going through the mailbox, so they never
//! queue up behind a pending `persist`/`apply`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::Context;
use tokio::sync::{mpsc, oneshot};

use crate::checksum::{aggregate_checksum, verify_chunk};
use crate::chunk::Chunk;
use crate::config::SnapshotStoreConfig;
use crate::error::{Result, SnapshotError};
use crate::layout::Layout;
use crate::metadata::{self, SnapshotId};
use crate::persisted::{PersistedSnapshot, PersistedSnapshotListener};

pub(crate) type ReceptionId = u64;

enum ReceptionPhase {
    Empty,
    Writing,
    Persisted(PersistedSnapshot),
    Aborted,
}

struct ReceivedState {
    declared_id: SnapshotId,
    pending_path: Option<PathBuf>,
    expected_total: Option<u32>,
    expected_checksum: Option<u64>,
    phase: ReceptionPhase,
}

enum Command {
    NewTransientSnapshot {
        id: SnapshotId,
        reply: oneshot::Sender<Option<ReceptionId>>,
    },
    TakeTransient {
        reception: ReceptionId,
        writer: Box<dyn FnOnce(&Path) -> bool + Send>,
        reply: oneshot::Sender<()>,
    },
    PersistTransient {
        reception: ReceptionId,
        reply: oneshot::Sender<Result<PersistedSnapshot>>,
    },

    NewReceivedSnapshot {
        id: SnapshotId,
        reply: oneshot::Sender<ReceptionId>,
    },
    ApplyChunk {
        reception: ReceptionId,
        chunk: Chunk,
        reply: oneshot::Sender<bool>,
    },
    PersistReceived {
        reception: ReceptionId,
        reply: oneshot::Sender<Result<PersistedSnapshot>>,
    },
    AbortReceived {
        reception: ReceptionId,
        reply: oneshot::Sender<()>,
    },

    PurgePendingSnapshots {
        reply: oneshot::Sender<()>,
    },

    AddListener {
        listener: Arc<dyn PersistedSnapshotListener>,
        reply: oneshot::Sender<u64>,
    },
    RemoveListener {
        id: u64,
        reply: oneshot::Sender<()>,
    },

    Close {
        reply: oneshot::Sender<()>,
    },
}

/// A cheap, cloneable reference to a running store's mailbox, plus a
/// lock-free read path onto the current committed snapshot shared with the
/// `Actor` task.
#[derive(Clone)]
pub struct StoreHandle {
    tx: mpsc::UnboundedSender<Command>,
    current_committed: Arc<Mutex<Option<PersistedSnapshot>>>,
}

struct Actor {
    layout: Layout,
    current_committed: Arc<Mutex<Option<PersistedSnapshot>>>,
    transients: HashMap<ReceptionId, PathBuf>,
    receptions: HashMap<ReceptionId, ReceivedState>,
    next_reception_id: ReceptionId,
    listeners: Vec<(u64, Arc<dyn PersistedSnapshotListener>)>,
    next_listener_id: u64,
}

impl Actor {
    fn notify_listeners(&self, snapshot: &PersistedSnapshot) {
        for (_, listener) in &self.listeners {
            listener.on_new_snapshot(snapshot);
        }
    }

    fn set_committed(&mut self, snapshot: PersistedSnapshot) {
        *self.current_committed.lock().unwrap() = Some(snapshot.clone());
        self.notify_listeners(&snapshot);
    }

    fn committed(&self) -> Option<PersistedSnapshot> {
        self.current_committed.lock().unwrap().clone()
    }

    fn handle_new_transient(&mut self, id: SnapshotId) -> Option<ReceptionId> {
        if let Some(current) = self.committed() {
            if !id.is_newer_than(&current.id()) {
                return None;
            }
        }

        let pending_path = match self.layout.allocate_pending_path(&id) {
            Ok(path) => path,
            Err(err) => {
                log::error!("failed to allocate pending path for {id}: {err}");
                return None;
            }
        };

        let reception = self.next_reception_id;
        self.next_reception_id += 1;
        self.transients.insert(reception, pending_path);
        Some(reception)
    }

    fn handle_take_transient(&mut self, reception: ReceptionId, writer: Box<dyn FnOnce(&Path) -> bool + Send>) {
        let Some(path) = self.transients.get(&reception) else {
            return;
        };
        let ok = writer(path);
        if !ok {
            let path = self.transients.remove(&reception).unwrap();
            self.layout.purge(&path);
        }
    }

    fn handle_persist_transient(&mut self, reception: ReceptionId) -> Result<PersistedSnapshot> {
        let Some(path) = self.transients.remove(&reception) else {
            return Err(SnapshotError::corrupted("unknown transient snapshot"));
        };

        let id = match path
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(metadata::parse_pending_name)
        {
            Some((id, _seq)) => id,
            None => return Err(SnapshotError::corrupted("pending path has no valid id")),
        };

        let checksum = aggregate_checksum(&path).map_err(SnapshotError::Io)?;
        self.finish_persist(path, id, checksum)
    }

    fn handle_new_received(&mut self, id: SnapshotId) -> ReceptionId {
        let reception = self.next_reception_id;
        self.next_reception_id += 1;
        self.receptions.insert(
            reception,
            ReceivedState {
                declared_id: id,
                pending_path: None,
                expected_total: None,
                expected_checksum: None,
                phase: ReceptionPhase::Empty,
            },
        );
        reception
    }

    fn handle_apply_chunk(&mut self, reception: ReceptionId, chunk: Chunk) -> bool {
        let Some(state) = self.receptions.get_mut(&reception) else {
            return false;
        };

        if matches!(state.phase, ReceptionPhase::Persisted(_) | ReceptionPhase::Aborted) {
            return false;
        }

        if matches!(state.phase, ReceptionPhase::Empty) {
            let declared = state.declared_id.to_string();
            if declared != chunk.snapshot_id {
                return false;
            }

            let pending_path = match self.layout.allocate_pending_path(&state.declared_id) {
                Ok(path) => path,
                Err(err) => {
                    log::error!("failed to allocate pending path for {}: {err}", state.declared_id);
                    return false;
                }
            };

            state.pending_path = Some(pending_path);
            state.expected_total = Some(chunk.total_count);
            state.expected_checksum = Some(chunk.snapshot_checksum);
            state.phase = ReceptionPhase::Writing;
        }

        if state.declared_id.to_string() != chunk.snapshot_id
            || state.expected_total != Some(chunk.total_count)
            || state.expected_checksum != Some(chunk.snapshot_checksum)
        {
            return false;
        }

        if !verify_chunk(&chunk) {
            return false;
        }

        let pending_path = state.pending_path.as_ref().unwrap();
        let target = pending_path.join(&chunk.chunk_name);
        match std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&target)
        {
            Ok(mut file) => {
                use std::io::Write;
                if let Err(err) = file.write_all(&chunk.content) {
                    log::error!("failed writing chunk {:?}: {err}", target);
                    return false;
                }
                true
            }
            Err(err) if err.kind() == std::io::ErrorKind::AlreadyExists => true,
            Err(err) => {
                log::error!("failed writing chunk {:?}: {err}", target);
                false
            }
        }
    }

    fn handle_persist_received(&mut self, reception: ReceptionId) -> Result<PersistedSnapshot> {
        let Some(state) = self.receptions.get(&reception) else {
            return Err(SnapshotError::corrupted("unknown received snapshot"));
        };

        if let ReceptionPhase::Persisted(existing) = &state.phase {
            return Ok(existing.clone());
        }

        let Some(pending_path) = state.pending_path.clone() else {
            return Err(SnapshotError::corrupted("Snapshot is partial"));
        };

        let expected_total = state.expected_total.unwrap_or(0);
        let expected_checksum = state.expected_checksum.unwrap_or(0);
        let id = state.declared_id;

        let file_count = crate::fs_helpers::sorted_file_names(&pending_path)
            .map_err(SnapshotError::Io)?
            .len() as u32;
        if file_count != expected_total {
            return Err(SnapshotError::corrupted("Snapshot is partial"));
        }

        let checksum = aggregate_checksum(&pending_path).map_err(SnapshotError::Io)?;
        if checksum != expected_checksum {
            return Err(SnapshotError::corrupted("Snapshot is corrupted"));
        }

        let result = self.finish_persist(pending_path, id, checksum);

        let state = self
            .receptions
            .get_mut(&reception)
            .expect("reception removed while persisting");
        match result {
            Ok(persisted) => {
                state.phase = ReceptionPhase::Persisted(persisted.clone());
                Ok(persisted)
            }
            Err(err) => Err(err),
        }
    }

    /// Shared tail of transient and received persist: write the sidecar,
    /// commit via rename, and reconcile against whatever is already
    /// committed (supersession / concurrent-reception convergence).
    fn finish_persist(
        &mut self,
        pending_path: PathBuf,
        id: SnapshotId,
        checksum: u64,
    ) -> Result<PersistedSnapshot> {
        if let Some(current) = self.committed() {
            if id < current.id() {
                self.layout.purge(&pending_path);
                return Err(SnapshotError::Superseded);
            }
            if id == current.id() {
                self.layout.purge(&pending_path);
                return Ok(current);
            }
        }

        let sidecar = Layout::checksum_sidecar_path(&pending_path, &id);
        std::fs::write(&sidecar, checksum.to_be_bytes()).map_err(SnapshotError::Io)?;

        let final_name = id.to_string();
        let final_path = match self.layout.commit(&pending_path, &final_name) {
            Ok(path) => path,
            Err(err) if err.kind() == std::io::ErrorKind::AlreadyExists => {
                // Another reception of the same id won the race.
                self.layout.purge(&pending_path);
                self.layout.snapshots_dir().join(&final_name)
            }
            Err(err) => return Err(SnapshotError::Io(err)),
        };

        let previous = self.committed();
        let persisted = PersistedSnapshot::new(id, final_path, checksum);
        self.set_committed(persisted.clone());

        if let Some(previous) = previous {
            if previous.id() < id {
                self.layout.purge(previous.path());
            }
        }

        Ok(persisted)
    }

    fn handle_abort_received(&mut self, reception: ReceptionId) {
        let Some(state) = self.receptions.get_mut(&reception) else {
            return;
        };
        if let Some(path) = state.pending_path.take() {
            self.layout.purge(&path);
        }
        state.phase = ReceptionPhase::Aborted;
    }

    fn handle_purge_pending(&mut self) {
        let keep = self.committed().map(|s| s.id());
        let Ok(entries) = self.layout.list_pending() else {
            return;
        };
        for path in entries {
            let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
            let matches_current = metadata::parse_pending_name(name)
                .map(|(id, _)| Some(id) == keep)
                .unwrap_or(false);
            if !matches_current {
                self.layout.purge(&path);
            }
        }
    }

    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<Command>) {
        while let Some(command) = rx.recv().await {
            match command {
                Command::NewTransientSnapshot { id, reply } => {
                    let _ = reply.send(self.handle_new_transient(id));
                }
                Command::TakeTransient {
                    reception,
                    writer,
                    reply,
                } => {
                    self.handle_take_transient(reception, writer);
                    let _ = reply.send(());
                }
                Command::PersistTransient { reception, reply } => {
                    let _ = reply.send(self.handle_persist_transient(reception));
                }
                Command::NewReceivedSnapshot { id, reply } => {
                    let _ = reply.send(self.handle_new_received(id));
                }
                Command::ApplyChunk {
                    reception,
                    chunk,
                    reply,
                } => {
                    let _ = reply.send(self.handle_apply_chunk(reception, chunk));
                }
                Command::PersistReceived { reception, reply } => {
                    let _ = reply.send(self.handle_persist_received(reception));
                }
                Command::AbortReceived { reception, reply } => {
                    self.handle_abort_received(reception);
                    let _ = reply.send(());
                }
                Command::PurgePendingSnapshots { reply } => {
                    self.handle_purge_pending();
                    let _ = reply.send(());
                }
                Command::AddListener { listener, reply } => {
                    let id = self.next_listener_id;
                    self.next_listener_id += 1;
                    self.listeners.push((id, listener));
                    let _ = reply.send(id);
                }
                Command::RemoveListener { id, reply } => {
                    self.listeners.retain(|(lid, _)| *lid != id);
                    let _ = reply.send(());
                }
                Command::Close { reply } => {
                    let _ = reply.send(());
                    break;
                }
            }
        }
    }
}

impl StoreHandle {
    /// Opens (recovering from a prior run) or creates a fresh store rooted
    /// at `root`, and spawns its partition task on the current tokio runtime.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        Self::open_with_config(SnapshotStoreConfig::new(root.into()))
    }

    /// Same as [`StoreHandle::open`] but with explicit construction
    /// parameters (currently just the fsync level).
    pub fn open_with_config(config: SnapshotStoreConfig) -> Result<Self> {
        let layout = Layout::new(config.root, config.fsync);
        layout.ensure_dirs().map_err(SnapshotError::Io)?;

        let current_committed = Arc::new(Mutex::new(recover(&layout)?));

        let actor = Actor {
            layout,
            current_committed: Arc::clone(&current_committed),
            transients: HashMap::new(),
            receptions: HashMap::new(),
            next_reception_id: 0,
            listeners: Vec::new(),
            next_listener_id: 0,
        };

        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(actor.run(rx));

        Ok(StoreHandle {
            tx,
            current_committed,
        })
    }

    async fn call<T>(&self, make: impl FnOnce(oneshot::Sender<T>) -> Command) -> T {
        let (tx, rx) = oneshot::channel();
        let command = make(tx);
        self.tx
            .send(command)
            .unwrap_or_else(|_| panic!("snapshot store task has shut down"));
        rx.await.expect("snapshot store task dropped reply sender")
    }

    /// Reads the current committed snapshot directly off the shared cell,
    /// without going through the mailbox — never blocks behind a queued
    /// writer.
    pub async fn current_snapshot(&self) -> Option<PersistedSnapshot> {
        self.current_committed.lock().unwrap().clone()
    }

    pub(crate) async fn new_transient_snapshot(&self, id: SnapshotId) -> Option<ReceptionId> {
        self.call(|reply| Command::NewTransientSnapshot { id, reply })
            .await
    }

    pub(crate) async fn take_transient(
        &self,
        reception: ReceptionId,
        writer: Box<dyn FnOnce(&Path) -> bool + Send>,
    ) {
        self.call(|reply| Command::TakeTransient {
            reception,
            writer,
            reply,
        })
        .await
    }

    pub(crate) async fn persist_transient(&self, reception: ReceptionId) -> Result<PersistedSnapshot> {
        self.call(|reply| Command::PersistTransient { reception, reply })
            .await
    }

    pub(crate) async fn new_received_snapshot(&self, id: SnapshotId) -> ReceptionId {
        self.call(|reply| Command::NewReceivedSnapshot { id, reply })
            .await
    }

    pub(crate) async fn apply_chunk(&self, reception: ReceptionId, chunk: Chunk) -> bool {
        self.call(|reply| Command::ApplyChunk {
            reception,
            chunk,
            reply,
        })
        .await
    }

    pub(crate) async fn persist_received(&self, reception: ReceptionId) -> Result<PersistedSnapshot> {
        self.call(|reply| Command::PersistReceived { reception, reply })
            .await
    }

    pub(crate) async fn abort_received(&self, reception: ReceptionId) {
        self.call(|reply| Command::AbortReceived { reception, reply })
            .await
    }

    pub async fn purge_pending_snapshots(&self) {
        self.call(|reply| Command::PurgePendingSnapshots { reply })
            .await
    }

    pub async fn add_snapshot_listener(&self, listener: Arc<dyn PersistedSnapshotListener>) -> u64 {
        self.call(|reply| Command::AddListener { listener, reply })
            .await
    }

    pub async fn remove_snapshot_listener(&self, id: u64) {
        self.call(|reply| Command::RemoveListener { id, reply })
            .await
    }

    pub async fn close(&self) {
        self.call(|reply| Command::Close { reply }).await
    }
}

/// Enumerates `snapshots/`, picks the directory with the greatest parsable
/// id, verifies its checksum sidecar, and purges everything else under
/// `snapshots/` and all of `pending/`.
fn recover(layout: &Layout) -> Result<Option<PersistedSnapshot>> {
    let mut candidates: Vec<(SnapshotId, PathBuf)> = layout
        .list_snapshots()
        .map_err(SnapshotError::Io)?
        .into_iter()
        .filter_map(|path| {
            let name = path.file_name()?.to_str()?;
            metadata::parse(name).ok().map(|id| (id, path))
        })
        .collect();

    candidates.sort_by_key(|(id, _)| *id);

    let winner = candidates.pop();

    for (_, path) in &candidates {
        log::info!("recovery: purging stale snapshot directory {:?}", path);
        layout.purge(path);
    }

    for path in layout.list_pending().map_err(SnapshotError::Io)? {
        layout.purge(&path);
    }

    let Some((id, path)) = winner else {
        return Ok(None);
    };

    let stored = read_sidecar_checksum(&path, &id)
        .map_err(|err| SnapshotError::corrupted(err.to_string()))?;

    let recomputed = aggregate_checksum(&path).map_err(SnapshotError::Io)?;
    if recomputed != stored {
        return Err(SnapshotError::corrupted(format!(
            "checksum mismatch recovering snapshot {id}: stored {stored}, recomputed {recomputed}"
        )));
    }

    log::info!("recovery: resuming from committed snapshot {id}");
    Ok(Some(PersistedSnapshot::new(id, path, stored)))
}

/// Reads and validates the checksum sidecar for a recovered snapshot
/// directory. Internal plumbing: errors carry `anyhow` context describing
/// what went wrong during recovery and are converted into the public
/// `SnapshotError::Corrupted` variant at `recover`'s boundary.
fn read_sidecar_checksum(path: &Path, id: &SnapshotId) -> anyhow::Result<u64> {
    let sidecar = Layout::checksum_sidecar_path(path, id);
    let stored = std::fs::read(&sidecar)
        .with_context(|| format!("reading checksum sidecar at {sidecar:?}"))?;
    let stored: [u8; 8] = stored
        .try_into()
        .map_err(|_| anyhow::anyhow!("malformed checksum sidecar for {id}: expected 8 bytes"))?;
    Ok(u64::from_be_bytes(stored))
}
