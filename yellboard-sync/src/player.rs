//! Audio player capability.

use crate::error::{SyncError, SyncResult};
use async_trait::async_trait;
use std::path::Path;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::debug;

type TokioMutex<T> = tokio::sync::Mutex<T>;

/// Accepts "load this file" commands.
#[async_trait]
pub trait PlayerAdapter: Send + Sync {
    async fn load(&self, path: &Path) -> SyncResult<()>;
}

/// Slave-mode command for loading `path`, quotes and backslashes escaped.
pub fn loadfile_command(path: &Path) -> String {
    let raw = path.to_string_lossy();
    let mut escaped = String::with_capacity(raw.len() + 2);
    for c in raw.chars() {
        if matches!(c, '"' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    format!("loadfile \"{escaped}\"\n")
}

/// Drives an mplayer-compatible player through its slave-mode command
/// stream, typically the stdin of an already started player process.
pub struct SlaveCommandPlayer<W> {
    writer: TokioMutex<W>,
}

impl<W> SlaveCommandPlayer<W>
where
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(writer: W) -> Self {
        Self {
            writer: TokioMutex::new(writer),
        }
    }

    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }
}

#[async_trait]
impl<W> PlayerAdapter for SlaveCommandPlayer<W>
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    async fn load(&self, path: &Path) -> SyncResult<()> {
        let command = loadfile_command(path);
        let mut writer = self.writer.lock().await;
        writer
            .write_all(command.as_bytes())
            .await
            .map_err(|e| SyncError::Player(format!("write failed: {e}")))?;
        writer
            .flush()
            .await
            .map_err(|e| SyncError::Player(format!("flush failed: {e}")))?;
        debug!(path = %path.display(), "player loaded clip");
        Ok(())
    }
}

/// Player for peers without audio output. Loads are only logged.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullPlayer;

#[async_trait]
impl PlayerAdapter for NullPlayer {
    async fn load(&self, path: &Path) -> SyncResult<()> {
        debug!(path = %path.display(), "no player attached, ignoring load");
        Ok(())
    }
}
