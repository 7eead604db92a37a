//! Registry of locally connected realtime clients.
//!
//! The registry owns every live client link for the session. Membership only
//! changes under its lock, and broadcasts hold the same lock for the whole
//! send loop so every member sees the same sequence of frames.

use crate::error::{ConnectionError, SyncResult};
use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;
use yellboard_types::ServerFrame;

type TokioMutex<T> = tokio::sync::Mutex<T>;

/// Unique identifier of one registered client link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(pub Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Outbound half of a realtime client link.
#[async_trait]
pub trait ClientSink: Send + Sync {
    async fn send_text(&self, frame: &str) -> Result<(), ConnectionError>;
}

/// Inbound half of a realtime client link.
#[async_trait]
pub trait ClientSource: Send {
    /// Next frame from the client. `None` or an error ends the link.
    async fn next_text(&mut self) -> Option<Result<String, ConnectionError>>;
}

/// Session hooks driven by [`ConnectionRegistry::serve`].
#[async_trait]
pub trait ConnectionListener: Send + Sync {
    /// Called once the link is greeted and registered.
    async fn on_registered(&self, id: ConnectionId);

    /// Called for every frame read from the link.
    async fn on_frame(&self, id: ConnectionId, frame: String);
}

/// Thread-safe set of connected realtime clients.
pub struct ConnectionRegistry {
    salutation: String,
    connections: TokioMutex<HashMap<ConnectionId, Arc<dyn ClientSink>>>,
}

impl ConnectionRegistry {
    /// `salutation` is the text of the greeting frame each new link receives.
    pub fn new(salutation: impl Into<String>) -> Self {
        Self {
            salutation: salutation.into(),
            connections: TokioMutex::new(HashMap::new()),
        }
    }

    /// Greets `sink` and adds it to the registry.
    pub async fn register(&self, sink: Arc<dyn ClientSink>) -> ConnectionId {
        let id = ConnectionId::new();
        match ServerFrame::Salutation(self.salutation.clone()).to_json() {
            Ok(frame) => {
                if let Err(e) = sink.send_text(&frame).await {
                    warn!(connection = %id, "greeting failed: {e}");
                }
            }
            Err(e) => warn!("could not encode greeting: {e}"),
        }

        let mut connections = self.connections.lock().await;
        connections.insert(id, sink);
        info!(connection = %id, total = connections.len(), "client registered");
        id
    }

    /// Removes a link. Returns false if it was not registered.
    pub async fn unregister(&self, id: ConnectionId) -> bool {
        let mut connections = self.connections.lock().await;
        let removed = connections.remove(&id).is_some();
        if removed {
            info!(connection = %id, total = connections.len(), "client unregistered");
        }
        removed
    }

    pub async fn len(&self) -> usize {
        self.connections.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.connections.lock().await.is_empty()
    }

    pub async fn contains(&self, id: ConnectionId) -> bool {
        self.connections.lock().await.contains_key(&id)
    }

    /// Sends `frame` to every registered link. A failed write is logged and
    /// the link stays registered until its own read fails. Returns the number
    /// of successful sends.
    pub async fn broadcast_local(&self, frame: &str) -> usize {
        let connections = self.connections.lock().await;
        let mut delivered = 0;
        for (id, sink) in connections.iter() {
            match sink.send_text(frame).await {
                Ok(()) => delivered += 1,
                Err(e) => warn!(connection = %id, "write to client failed: {e}"),
            }
        }
        debug!(delivered, total = connections.len(), "local broadcast");
        delivered
    }

    /// Encodes `frame` once and broadcasts it.
    pub async fn broadcast_frame(&self, frame: &ServerFrame) -> SyncResult<usize> {
        let text = frame.to_json()?;
        Ok(self.broadcast_local(&text).await)
    }

    /// Sends `frame` to a single link.
    pub async fn send_to(&self, id: ConnectionId, frame: &str) -> Result<(), ConnectionError> {
        let connections = self.connections.lock().await;
        match connections.get(&id) {
            Some(sink) => sink.send_text(frame).await,
            None => Err(ConnectionError::Closed),
        }
    }

    /// Runs one client link to completion: register, notify the listener,
    /// forward every inbound frame, and unregister once a read fails or the
    /// client goes away.
    pub async fn serve<S>(
        &self,
        sink: Arc<dyn ClientSink>,
        mut source: S,
        listener: &dyn ConnectionListener,
    ) where
        S: ClientSource,
    {
        let id = self.register(sink).await;
        listener.on_registered(id).await;

        loop {
            match source.next_text().await {
                Some(Ok(frame)) => {
                    debug!(connection = %id, "client frame: {frame}");
                    listener.on_frame(id, frame).await;
                }
                Some(Err(e)) => {
                    warn!(connection = %id, "read from client failed: {e}");
                    break;
                }
                None => {
                    debug!(connection = %id, "client went away");
                    break;
                }
            }
        }

        self.unregister(id).await;
    }
}

/// Server-side outbound half of an in-process link.
#[derive(Clone)]
pub struct ChannelSink {
    tx: mpsc::Sender<String>,
}

#[async_trait]
impl ClientSink for ChannelSink {
    async fn send_text(&self, frame: &str) -> Result<(), ConnectionError> {
        self.tx
            .send(frame.to_owned())
            .await
            .map_err(|_| ConnectionError::Closed)
    }
}

/// Server-side inbound half of an in-process link.
pub struct ChannelSource {
    rx: mpsc::Receiver<String>,
}

#[async_trait]
impl ClientSource for ChannelSource {
    async fn next_text(&mut self) -> Option<Result<String, ConnectionError>> {
        self.rx.recv().await.map(Ok)
    }
}

/// Client side of an in-process link.
pub struct ClientEnd {
    outbound: mpsc::Sender<String>,
    inbound: mpsc::Receiver<String>,
}

impl ClientEnd {
    /// Sends a clip path, i.e. a play request.
    pub async fn send(&self, path: impl Into<String>) -> Result<(), ConnectionError> {
        self.outbound
            .send(path.into())
            .await
            .map_err(|_| ConnectionError::Closed)
    }

    /// Next raw frame from the server.
    pub async fn recv(&mut self) -> Option<String> {
        self.inbound.recv().await
    }

    /// Next frame from the server, decoded. Undecodable frames end the stream.
    pub async fn recv_frame(&mut self) -> Option<ServerFrame> {
        let text = self.inbound.recv().await?;
        serde_json::from_str(&text).ok()
    }
}

/// Builds an in-process client link with `buffer` frames of capacity in
/// each direction. Hand the sink and source to
/// [`GroupSession::connect`](crate::GroupSession::connect) and drive the
/// [`ClientEnd`] from the UI side. Dropping the `ClientEnd` ends the link.
pub fn channel_connection(buffer: usize) -> (Arc<ChannelSink>, ChannelSource, ClientEnd) {
    let (to_client, from_server) = mpsc::channel(buffer);
    let (to_server, from_client) = mpsc::channel(buffer);
    (
        Arc::new(ChannelSink { tx: to_client }),
        ChannelSource { rx: from_client },
        ClientEnd {
            outbound: to_server,
            inbound: from_server,
        },
    )
}
