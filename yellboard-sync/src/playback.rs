//! Group-wide playback relay.
//!
//! Play requests are published on `{group}.playback` and delivered to every
//! subscriber, the publishing peer included. Each peer loads the clip into
//! its own player and tells its local clients what is playing.

use crate::broker::{handler_fn, MessageBroker, Subscription};
use crate::connections::ConnectionRegistry;
use crate::error::{SyncError, SyncResult};
use crate::player::PlayerAdapter;
use std::sync::Arc;
use tracing::{debug, info, warn};
use yellboard_library::LibraryIndex;
use yellboard_types::{GroupId, ServerFrame, SoundEntry};

pub struct PlaybackRelay {
    group: GroupId,
    topic: String,
    index: Arc<LibraryIndex>,
    broker: Arc<dyn MessageBroker>,
    player: Arc<dyn PlayerAdapter>,
    registry: Arc<ConnectionRegistry>,
}

impl PlaybackRelay {
    pub fn new(
        group: GroupId,
        index: Arc<LibraryIndex>,
        broker: Arc<dyn MessageBroker>,
        player: Arc<dyn PlayerAdapter>,
        registry: Arc<ConnectionRegistry>,
    ) -> Self {
        Self {
            topic: group.topics().playback,
            group,
            index,
            broker,
            player,
            registry,
        }
    }

    /// Asks every peer of the group to play `path`.
    pub async fn request_playback(&self, path: &str) -> SyncResult<()> {
        let entry = SoundEntry::parse(path).map_err(|_| SyncError::InvalidPath(path.to_string()))?;
        self.broker
            .publish(&self.topic, entry.into_path().into_bytes())
            .await?;
        Ok(())
    }

    /// Handles one playback event: load the clip, then notify local clients.
    ///
    /// Clients are notified even if the player rejects the load; the load
    /// error is still returned.
    pub async fn on_playback_event(&self, payload: &[u8]) -> SyncResult<()> {
        let path = std::str::from_utf8(payload)
            .map_err(|_| SyncError::InvalidPath(String::from_utf8_lossy(payload).into_owned()))?;
        let entry = SoundEntry::parse(path).map_err(|_| SyncError::InvalidPath(path.to_string()))?;
        let file = self.index.resolve(&self.group, &entry)?;

        let loaded = self.player.load(&file).await;
        match &loaded {
            Ok(()) => info!(group = %self.group, path, "playing"),
            Err(e) => warn!(group = %self.group, path, "player rejected clip: {e}"),
        }

        let notified = self
            .registry
            .broadcast_frame(&ServerFrame::Playing(entry.into_path()))
            .await?;
        debug!(group = %self.group, notified, "playback pushed to clients");
        loaded
    }

    /// Subscribes to `{group}.playback`.
    pub async fn subscribe(self: &Arc<Self>) -> SyncResult<Subscription> {
        let relay = Arc::clone(self);
        let subscription = self
            .broker
            .subscribe(
                &self.topic,
                handler_fn(move |message| {
                    let relay = relay.clone();
                    async move {
                        if let Err(e) = relay.on_playback_event(&message.payload).await {
                            warn!(group = %relay.group, "playback event dropped: {e}");
                        }
                    }
                }),
            )
            .await?;
        Ok(subscription)
    }
}
