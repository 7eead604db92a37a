//! Serves clip bytes to peers.
//!
//! A request whose clip is absent, unreadable or not a plain file name gets
//! no reply at all. The requester sees a timeout, never a negative answer.

use crate::broker::{BrokerMessage, MessageBroker};
use std::sync::Arc;
use tracing::{debug, warn};
use yellboard_library::LibraryIndex;
use yellboard_types::{GroupId, SoundEntry};

pub struct TransferService {
    group: GroupId,
    index: Arc<LibraryIndex>,
    broker: Arc<dyn MessageBroker>,
}

impl TransferService {
    pub fn new(group: GroupId, index: Arc<LibraryIndex>, broker: Arc<dyn MessageBroker>) -> Self {
        Self {
            group,
            index,
            broker,
        }
    }

    /// Bytes of the requested clip, if this peer can serve it.
    pub async fn lookup(&self, request: &[u8]) -> Option<Vec<u8>> {
        let path = match std::str::from_utf8(request) {
            Ok(path) => path,
            Err(_) => {
                debug!(group = %self.group, "clip request is not UTF-8");
                return None;
            }
        };
        let entry = match SoundEntry::parse(path) {
            Ok(entry) => entry,
            Err(_) => {
                warn!(
                    group = %self.group,
                    path,
                    "refusing clip request outside the group directory"
                );
                return None;
            }
        };

        match self.index.read(&self.group, &entry).await {
            Ok(bytes) => Some(bytes),
            Err(e) if e.is_not_found() => {
                debug!(group = %self.group, path, "requested clip not held here");
                None
            }
            Err(e) => {
                warn!(group = %self.group, path, "cannot read requested clip: {e}");
                None
            }
        }
    }

    /// Handler for `{group}.sounds.payload`.
    pub async fn on_payload_request(&self, message: BrokerMessage) {
        if message.reply_to.is_none() {
            debug!(group = %self.group, "clip request without reply subject");
            return;
        }
        let Some(bytes) = self.lookup(&message.payload).await else {
            return;
        };
        let size = bytes.len();
        match self.broker.reply(&message, bytes).await {
            Ok(()) => debug!(group = %self.group, size, "served clip"),
            Err(e) => warn!(group = %self.group, "clip reply failed: {e}"),
        }
    }
}
