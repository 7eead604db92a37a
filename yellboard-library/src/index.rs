//! Directory scanning, listing encoding and clip file access.

use crate::error::{LibraryError, LibraryResult};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use yellboard_types::{GroupId, LibrarySnapshot, SoundEntry, PARTIAL_PREFIX};

/// Scans and maintains the clip directories under one storage root.
#[derive(Debug, Clone)]
pub struct LibraryIndex {
    root: PathBuf,
}

impl LibraryIndex {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding the clips of `group`.
    pub fn group_dir(&self, group: &GroupId) -> PathBuf {
        self.root.join(group.as_str())
    }

    /// Location of a clip on disk. Rejects anything but a plain file name so a
    /// peer cannot reach outside the group directory.
    pub fn resolve(&self, group: &GroupId, entry: &SoundEntry) -> LibraryResult<PathBuf> {
        if !entry.is_plain_file_name() {
            return Err(LibraryError::InvalidPath(entry.path().to_string()));
        }
        Ok(self.group_dir(group).join(entry.path()))
    }

    /// Creates the group directory (owner-only on unix) if it does not exist.
    pub async fn ensure_group_dir(&self, group: &GroupId) -> LibraryResult<PathBuf> {
        let dir = self.group_dir(group);
        let mut builder = tokio::fs::DirBuilder::new();
        builder.recursive(true);
        #[cfg(unix)]
        builder.mode(0o700);
        builder
            .create(&dir)
            .await
            .map_err(|e| LibraryError::io(&dir, e))?;
        Ok(dir)
    }

    /// Enumerates the regular files directly inside the group directory.
    pub async fn try_scan(&self, group: &GroupId) -> LibraryResult<LibrarySnapshot> {
        let dir = self.ensure_group_dir(group).await?;
        let mut read_dir = tokio::fs::read_dir(&dir)
            .await
            .map_err(|e| LibraryError::io(&dir, e))?;

        let mut entries = Vec::new();
        while let Some(item) = read_dir
            .next_entry()
            .await
            .map_err(|e| LibraryError::io(&dir, e))?
        {
            let name = match item.file_name().into_string() {
                Ok(name) => name,
                Err(raw) => {
                    debug!("skipping non UTF-8 file name {raw:?} in {}", dir.display());
                    continue;
                }
            };
            // Only names peers could fetch back are listed. This also hides
            // in-progress partial files.
            let entry = SoundEntry::new(name);
            if !entry.is_plain_file_name() {
                debug!("not listing {entry} in {}", dir.display());
                continue;
            }
            // Follows symlinks so linked clips are listed like regular ones.
            match tokio::fs::metadata(item.path()).await {
                Ok(meta) if meta.is_file() => entries.push(entry),
                Ok(_) => {}
                Err(e) => debug!("skipping {entry}: {e}"),
            }
        }

        Ok(entries.into_iter().collect())
    }

    /// Like [`try_scan`](Self::try_scan), but never fails: errors are logged
    /// and produce an empty snapshot.
    pub async fn scan(&self, group: &GroupId) -> LibrarySnapshot {
        match self.try_scan(group).await {
            Ok(snapshot) => {
                debug!(group = %group, count = snapshot.len(), "scanned library");
                snapshot
            }
            Err(e) => {
                warn!(group = %group, "library scan failed: {e}");
                LibrarySnapshot::empty()
            }
        }
    }

    /// Listing payload for the `{group}.sounds` topic.
    pub fn serialize(snapshot: &LibrarySnapshot) -> LibraryResult<Vec<u8>> {
        Ok(snapshot.to_json_vec()?)
    }

    pub fn deserialize(bytes: &[u8]) -> LibraryResult<LibrarySnapshot> {
        Ok(LibrarySnapshot::from_json_slice(bytes)?)
    }

    /// Reads a whole clip.
    pub async fn read(&self, group: &GroupId, entry: &SoundEntry) -> LibraryResult<Vec<u8>> {
        let path = self.resolve(group, entry)?;
        let meta = tokio::fs::metadata(&path)
            .await
            .map_err(|e| LibraryError::io(&path, e))?;
        if !meta.is_file() {
            return Err(LibraryError::NotAFile(path));
        }
        tokio::fs::read(&path)
            .await
            .map_err(|e| LibraryError::io(&path, e))
    }

    /// Writes a clip through a temporary file renamed into place, so a
    /// concurrent reader sees either the old file or the complete new one.
    pub async fn write_atomic(
        &self,
        group: &GroupId,
        entry: &SoundEntry,
        bytes: &[u8],
    ) -> LibraryResult<PathBuf> {
        let target = self.resolve(group, entry)?;
        let dir = self.ensure_group_dir(group).await?;
        // Fixed length, so any name that fits the directory also fits here.
        let tmp = dir.join(format!("{PARTIAL_PREFIX}{}", uuid::Uuid::new_v4().simple()));

        if let Err(e) = tokio::fs::write(&tmp, bytes).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(LibraryError::io(&tmp, e));
        }
        if let Err(e) = tokio::fs::rename(&tmp, &target).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(LibraryError::io(&target, e));
        }
        Ok(target)
    }
}
