//! One group session: the wiring of engine, transfer, relay and registry.
//!
//! A process serves exactly one group, fixed at startup by
//! [`SessionConfig::group_id`]. Every subscription the session makes is owned
//! by it and released on [`GroupSession::shutdown`] or drop.

use crate::broker::{MessageBroker, Subscription};
use crate::config::SessionConfig;
use crate::connections::{
    ClientSink, ClientSource, ConnectionId, ConnectionListener, ConnectionRegistry,
};
use crate::engine::{EngineHandle, SyncEngine};
use crate::error::SyncResult;
use crate::playback::PlaybackRelay;
use crate::player::PlayerAdapter;
use crate::transfer::TransferService;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, warn};
use yellboard_library::LibraryIndex;
use yellboard_types::GroupId;

pub struct GroupSession {
    group: GroupId,
    index: Arc<LibraryIndex>,
    engine: Arc<SyncEngine>,
    relay: Arc<PlaybackRelay>,
    registry: Arc<ConnectionRegistry>,
    engine_handle: EngineHandle,
    playback_subscription: Subscription,
}

impl GroupSession {
    /// Validates `config`, subscribes the group's topics and starts the
    /// broadcast loop. Broker failures here are fatal to the session.
    pub async fn start(
        config: &SessionConfig,
        broker: Arc<dyn MessageBroker>,
        player: Arc<dyn PlayerAdapter>,
    ) -> SyncResult<Self> {
        config.validate()?;
        let group = config.group()?;
        let index = Arc::new(LibraryIndex::new(&config.storage_root));
        index.ensure_group_dir(&group).await?;

        let registry = Arc::new(ConnectionRegistry::new(config.greeting(&group)));
        let transfer = Arc::new(TransferService::new(
            group.clone(),
            index.clone(),
            broker.clone(),
        ));
        let relay = Arc::new(PlaybackRelay::new(
            group.clone(),
            index.clone(),
            broker.clone(),
            player,
            registry.clone(),
        ));
        let engine = Arc::new(SyncEngine::new(
            group.clone(),
            index.clone(),
            broker,
            registry.clone(),
            config,
        ));

        let playback_subscription = relay.subscribe().await?;
        let engine_handle = engine.start(transfer).await?;

        info!(group = %group, root = %config.storage_root.display(), "group session started");
        Ok(Self {
            group,
            index,
            engine,
            relay,
            registry,
            engine_handle,
            playback_subscription,
        })
    }

    pub fn group(&self) -> &GroupId {
        &self.group
    }

    pub fn index(&self) -> &Arc<LibraryIndex> {
        &self.index
    }

    pub fn engine(&self) -> &Arc<SyncEngine> {
        &self.engine
    }

    pub fn relay(&self) -> &Arc<PlaybackRelay> {
        &self.relay
    }

    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    /// Topics the session is currently subscribed to.
    pub fn subscribed_topics(&self) -> Vec<&str> {
        let mut topics = self.engine_handle.topics();
        topics.push(self.playback_subscription.topic());
        topics
    }

    /// Asks the engine loop for an immediate broadcast.
    pub async fn broadcast_now(&self) -> SyncResult<()> {
        self.engine_handle.broadcast_now().await
    }

    /// Serves one realtime client until it disconnects. Every frame the
    /// client sends is a clip path, republished as a group playback request.
    pub async fn connect<S>(&self, sink: Arc<dyn ClientSink>, source: S)
    where
        S: ClientSource,
    {
        let listener = SessionListener {
            engine: self.engine.clone(),
            relay: self.relay.clone(),
        };
        self.registry.serve(sink, source, &listener).await;
    }

    /// Releases all subscriptions and stops the broadcast loop.
    pub async fn shutdown(self) {
        let Self {
            group,
            engine_handle,
            playback_subscription,
            ..
        } = self;
        playback_subscription.unsubscribe();
        engine_handle.shutdown().await;
        info!(group = %group, "group session stopped");
    }
}

struct SessionListener {
    engine: Arc<SyncEngine>,
    relay: Arc<PlaybackRelay>,
}

#[async_trait]
impl ConnectionListener for SessionListener {
    async fn on_registered(&self, id: ConnectionId) {
        // Full broadcast: peers and every local client get a fresh listing.
        if let Err(e) = self.engine.broadcast().await {
            debug!(connection = %id, "broadcast on connect incomplete: {e}");
        }
    }

    async fn on_frame(&self, id: ConnectionId, frame: String) {
        if let Err(e) = self.relay.request_playback(&frame).await {
            warn!(connection = %id, "play request dropped: {e}");
        }
    }
}
