//! Wire-stable chunk record. Field order is immaterial; the set and types
//! are fixed by the transport, so this is kept a plain `serde`-derivable
//! struct rather than anything transport-specific.

use serde::{Deserialize, Serialize};

/// One chunk of a snapshot transfer.
///
/// `checksum` is the CRC32C of `content` alone; `snapshot_checksum` is the
/// aggregate CRC32C of the whole snapshot and is identical across every
/// chunk belonging to the same `snapshot_id`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Chunk {
    pub snapshot_id: String,
    pub total_count: u32,
    pub chunk_name: String,
    pub content: Vec<u8>,
    pub checksum: u64,
    pub snapshot_checksum: u64,
}
