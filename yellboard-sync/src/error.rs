//! Sync error types.

use std::time::Duration;
use thiserror::Error;
use yellboard_library::LibraryError;
use yellboard_types::TypesError;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Result type for broker operations.
pub type BrokerResult<T> = Result<T, BrokerError>;

/// Failures reported by a [`MessageBroker`](crate::MessageBroker).
#[derive(Debug, Error)]
pub enum BrokerError {
    #[error("broker connection failed: {0}")]
    Connect(String),

    #[error("subscribe to {topic} failed: {reason}")]
    Subscribe { topic: String, reason: String },

    #[error("publish to {topic} failed: {reason}")]
    Publish { topic: String, reason: String },

    #[error("request on {topic} timed out after {timeout:?}")]
    Timeout { topic: String, timeout: Duration },

    #[error("no responders on {0}")]
    NoResponders(String),

    #[error("broker connection closed")]
    Closed,
}

/// Failures on a realtime client link.
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("connection closed")]
    Closed,

    #[error("transport error: {0}")]
    Transport(String),
}

/// Errors that can occur while running a group session.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("broker error: {0}")]
    Broker(#[from] BrokerError),

    #[error("transfer of {path} failed: {source}")]
    Transfer {
        path: String,
        #[source]
        source: BrokerError,
    },

    #[error("library error: {0}")]
    Library(#[from] LibraryError),

    #[error("invalid value: {0}")]
    Types(#[from] TypesError),

    #[error("connection error: {0}")]
    Connection(#[from] ConnectionError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("player error: {0}")]
    Player(String),

    #[error("invalid clip path: {0:?}")]
    InvalidPath(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("session channel closed")]
    ChannelClosed,
}
