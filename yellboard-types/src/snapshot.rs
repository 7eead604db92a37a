//! Library snapshots and their diff.

use crate::error::TypesResult;
use crate::sound::SoundEntry;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Point-in-time set of the clips a peer holds for a group.
///
/// Built once and never mutated. Iteration (and therefore serialization)
/// follows [`SoundEntry`]'s case-insensitive ordering regardless of the order
/// entries were discovered in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LibrarySnapshot {
    entries: BTreeSet<SoundEntry>,
}

impl LibrarySnapshot {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, entry: &SoundEntry) -> bool {
        self.entries.contains(entry)
    }

    pub fn contains_path(&self, path: &str) -> bool {
        self.entries.contains(&SoundEntry::new(path))
    }

    pub fn iter(&self) -> impl Iterator<Item = &SoundEntry> {
        self.entries.iter()
    }

    /// Encodes the snapshot as a JSON array of `{"Path": ...}` objects in
    /// ascending case-insensitive order.
    pub fn to_json_vec(&self) -> TypesResult<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Parses a JSON array of entries. Duplicate paths collapse to one entry.
    pub fn from_json_slice(bytes: &[u8]) -> TypesResult<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

impl FromIterator<SoundEntry> for LibrarySnapshot {
    fn from_iter<I: IntoIterator<Item = SoundEntry>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a LibrarySnapshot {
    type Item = &'a SoundEntry;
    type IntoIter = std::collections::btree_set::Iter<'a, SoundEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Entries announced by a remote peer that the local peer does not hold.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MissingSet {
    entries: Vec<SoundEntry>,
}

impl MissingSet {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SoundEntry> {
        self.entries.iter()
    }
}

impl IntoIterator for MissingSet {
    type Item = SoundEntry;
    type IntoIter = std::vec::IntoIter<SoundEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// `remote \ local`.
pub fn missing(local: &LibrarySnapshot, remote: &LibrarySnapshot) -> MissingSet {
    MissingSet {
        entries: remote.entries.difference(&local.entries).cloned().collect(),
    }
}
