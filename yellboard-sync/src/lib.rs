//! Group library sync and playback relay for yellboard.
//!
//! A [`GroupSession`] ties together, for the single group a process serves:
//! - [`SyncEngine`]: periodic listing broadcast, diffing of remote listings,
//!   and fetching of missing clips over request/reply
//! - [`TransferService`]: answers peers' clip requests with raw bytes
//! - [`PlaybackRelay`]: group-wide playback requests driving the local player
//! - [`ConnectionRegistry`]: fan-out to locally connected realtime clients
//!
//! The broker and the audio player are capabilities injected through the
//! [`MessageBroker`] and [`PlayerAdapter`] traits.

pub mod broker;
pub mod config;
pub mod connections;
pub mod engine;
pub mod error;
mod logging;
pub mod memory_broker;
pub mod playback;
pub mod player;
pub mod session;
pub mod transfer;

pub use broker::{handler_fn, BrokerMessage, MessageBroker, MessageHandler, Subscription};
pub use config::SessionConfig;
pub use connections::{
    channel_connection, ChannelSink, ChannelSource, ClientEnd, ClientSink, ClientSource,
    ConnectionId, ConnectionListener, ConnectionRegistry,
};
pub use engine::{EngineCommand, EngineHandle, FetchReport, SyncEngine};
pub use error::{BrokerError, BrokerResult, ConnectionError, SyncError, SyncResult};
pub use logging::init_logging;
pub use memory_broker::MemoryBroker;
pub use playback::PlaybackRelay;
pub use player::{loadfile_command, NullPlayer, PlayerAdapter, SlaveCommandPlayer};
pub use session::GroupSession;
pub use transfer::TransferService;
