//! Snapshot transfer and persistence engine for a partitioned workflow
//! broker.
//!
//! # Data formats
//!
//! A snapshot is an opaque directory of application-defined state files,
//! named by its canonical [`SnapshotId`] (see [`metadata`]). Every file in a
//! committed snapshot directory participates in a single aggregate CRC32C
//! checksum, stored in a `<id>.checksum` sidecar next to it.
//!
//! Snapshots arrive either locally, as a [`TransientSnapshot`] populated by
//! a synchronous writer callback, or remotely, as a [`ReceivedSnapshot`]
//! populated chunk-by-chunk over an unspecified transport (see [`chunk`]).
//! Both become an immutable [`PersistedSnapshot`] on successful promotion.
//!
//! # On-disk layout
//!
//! ```text
//! <partition-root>/
//!   snapshots/
//!     <id>/
//!       <state files...>
//!       <id>.checksum
//!   pending/
//!     <id>-<seq>/
//!       <chunk files...>
//! ```
//!
//! Writes are never made directly under `snapshots/`; a pending directory
//! is always populated first, then atomically renamed in by
//! [`layout::Layout::commit`]. This is the only mechanism that can make a
//! new snapshot visible, so a crash at any point leaves `snapshots/` holding
//! either the previous committed snapshot or the new one, never a partial
//! write.
//!
//! # Concurrency
//!
//! All mutating operations on a [`SnapshotStore`](store::StoreHandle) are
//! dispatched onto a single task per partition (see [`store`]), so nothing
//! in this crate runs concurrently with itself for a given store. Two
//! receivers racing to persist the same id converge on exactly one
//! committed directory: whichever rename lands first wins, and the loser
//! detects the winner and discards its own pending copy.

pub mod checksum;
pub mod chunk;
pub mod config;
pub mod error;
pub mod factory;
pub mod fs_helpers;
pub mod layout;
pub mod metadata;
pub mod persisted;
pub mod received;
pub mod store;
pub mod transient;
pub mod views;

pub use chunk::Chunk;
pub use config::{FsyncLevel, SnapshotStoreConfig};
pub use error::{Result, SnapshotError};
pub use factory::FileBasedSnapshotStoreFactory;
pub use metadata::SnapshotId;
pub use persisted::{PersistedSnapshot, PersistedSnapshotListener};
pub use received::ReceivedSnapshot;
pub use transient::TransientSnapshot;
pub use views::{ConstructableSnapshotStore, ReceivableSnapshotStore};
