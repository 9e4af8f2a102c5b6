//! Aggregate and per-chunk CRC32C (Castagnoli) integrity checks.
//!
//! The aggregate checksum is the only cross-node canonicalization in the
//! whole protocol: both sides must visit files in ascending
//! byte-lexicographic filename order and prefix each file's content with its
//! length, big-endian, before feeding it to the hasher.

use std::fs;
use std::io;
use std::path::Path;

use crate::chunk::Chunk;
use crate::fs_helpers::sorted_file_names;

/// Computes the aggregate CRC32C over every regular file directly inside
/// `dir`, in ascending filename order, each prefixed by its length as a
/// 4-byte big-endian integer.
pub fn aggregate_checksum(dir: impl AsRef<Path>) -> io::Result<u64> {
    let dir = dir.as_ref();
    let mut crc: u32 = 0;
    for name in sorted_file_names(dir)? {
        let content = fs::read(dir.join(&name))?;
        crc = crc32c::crc32c_append(crc, &(content.len() as u32).to_be_bytes());
        crc = crc32c::crc32c_append(crc, &content);
    }
    Ok(crc as u64)
}

/// `true` iff `CRC32C(chunk.content) == chunk.checksum`.
pub fn verify_chunk(chunk: &Chunk) -> bool {
    crc32c::crc32c(&chunk.content) as u64 == chunk.checksum
}
