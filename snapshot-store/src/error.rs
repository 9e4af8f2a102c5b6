//! Caller-facing error taxonomy for the snapshot store.
//!
//! Internal helpers bubble up `anyhow::Error` (the reference crate's own
//! convention); only the public API boundary converts into this closed enum,
//! which callers are expected to match on.

use std::io;

#[derive(thiserror::Error, Debug)]
pub enum SnapshotError {
    #[error("snapshot is corrupted: {reason}")]
    Corrupted { reason: String },

    #[error("io error: {0}")]
    Io(#[from] io::Error),

    #[error("invalid snapshot id '{0}'")]
    InvalidId(String),

    #[error("snapshot superseded by a newer committed snapshot")]
    Superseded,
}

impl SnapshotError {
    pub fn corrupted(reason: impl Into<String>) -> Self {
        SnapshotError::Corrupted {
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SnapshotError>;
