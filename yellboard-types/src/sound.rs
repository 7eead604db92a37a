//! A single clip entry.

use crate::error::{TypesError, TypesResult};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Prefix of in-progress fetch files. Never a valid clip name.
pub const PARTIAL_PREFIX: &str = ".partial-";

/// One clip file within a group, identified by its file name.
///
/// Equality is an exact string match. Ordering is case-insensitive with ties
/// broken by the exact bytes, which keeps `Ord` consistent with `Eq` and makes
/// any sorted sequence of entries fully deterministic.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SoundEntry {
    #[serde(rename = "Path", alias = "path")]
    path: String,
}

impl SoundEntry {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }

    /// Builds an entry, rejecting anything that is not a plain file name.
    pub fn parse(path: impl Into<String>) -> TypesResult<Self> {
        let entry = Self::new(path);
        if entry.is_plain_file_name() {
            Ok(entry)
        } else {
            Err(TypesError::InvalidPath(entry.path))
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn into_path(self) -> String {
        self.path
    }

    /// True when the path names a file directly inside a group directory
    /// that a scan would list.
    pub fn is_plain_file_name(&self) -> bool {
        let p = self.path.as_str();
        !p.is_empty()
            && p != "."
            && p != ".."
            && !p.starts_with(PARTIAL_PREFIX)
            && !p.contains(['/', '\\', '\0'])
    }
}

impl Ord for SoundEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        let lhs = self.path.chars().flat_map(char::to_lowercase);
        let rhs = other.path.chars().flat_map(char::to_lowercase);
        lhs.cmp(rhs).then_with(|| self.path.cmp(&other.path))
    }
}

impl PartialOrd for SoundEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for SoundEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path)
    }
}

impl From<&str> for SoundEntry {
    fn from(path: &str) -> Self {
        Self::new(path)
    }
}

impl From<String> for SoundEntry {
    fn from(path: String) -> Self {
        Self::new(path)
    }
}
