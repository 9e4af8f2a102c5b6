//! Canonical snapshot identifier: `index-term-processedPosition-exportedPosition`.
//!
//! Total order is lexicographic on the four-tuple, which is exactly the
//! derived `Ord` on a struct of four `u64` fields in field order.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::error::SnapshotError;

/// A point-in-time snapshot identity.
///
/// `processed_position` and `exported_position` are `0` when unused by the
/// caller; they still participate in ordering so two snapshots at the same
/// `(index, term)` but different processed/exported progress are distinct
/// and totally ordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SnapshotId {
    pub index: u64,
    pub term: u64,
    pub processed_position: u64,
    pub exported_position: u64,
}

impl SnapshotId {
    pub fn new(index: u64, term: u64, processed_position: u64, exported_position: u64) -> Self {
        Self {
            index,
            term,
            processed_position,
            exported_position,
        }
    }

    fn as_tuple(&self) -> (u64, u64, u64, u64) {
        (
            self.index,
            self.term,
            self.processed_position,
            self.exported_position,
        )
    }

    /// True iff `self` is strictly newer than `other`.
    pub fn is_newer_than(&self, other: &SnapshotId) -> bool {
        self.as_tuple() > other.as_tuple()
    }
}

impl PartialOrd for SnapshotId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SnapshotId {
    fn cmp(&self, other: &Self) -> Ordering {
        self.as_tuple().cmp(&other.as_tuple())
    }
}

impl fmt::Display for SnapshotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{}-{}-{}",
            self.index, self.term, self.processed_position, self.exported_position
        )
    }
}

impl FromStr for SnapshotId {
    type Err = SnapshotError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        parse(name)
    }
}

/// Parses a canonical snapshot id, rejecting anything but four dash-separated
/// unsigned decimal fields.
pub fn parse(name: &str) -> Result<SnapshotId, SnapshotError> {
    let fields: Vec<&str> = name.split('-').collect();
    if fields.len() != 4 {
        return Err(SnapshotError::InvalidId(name.to_string()));
    }

    let mut values = [0u64; 4];
    for (value, field) in values.iter_mut().zip(fields.iter()) {
        *value = field
            .parse::<u64>()
            .map_err(|_| SnapshotError::InvalidId(name.to_string()))?;
    }

    Ok(SnapshotId {
        index: values[0],
        term: values[1],
        processed_position: values[2],
        exported_position: values[3],
    })
}

/// Formats a snapshot id back into its canonical textual form.
pub fn format(id: &SnapshotId) -> String {
    id.to_string()
}

/// Parses the `<id>-<seq>` form used for pending directories, returning the
/// id and the sequence number.
pub fn parse_pending_name(name: &str) -> Option<(SnapshotId, u32)> {
    let (id_part, seq_part) = name.rsplit_once('-')?;
    let seq = seq_part.parse::<u32>().ok()?;
    let id = parse(id_part).ok()?;
    Some((id, seq))
}
