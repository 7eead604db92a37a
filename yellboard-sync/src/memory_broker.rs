//! In-process broker.
//!
//! Implements [`MessageBroker`] on top of a topic table. Several sessions can
//! share one `MemoryBroker` to form a group inside a single process. Every
//! delivery runs on its own tokio task, so a slow handler never delays
//! another.

use crate::broker::{BrokerMessage, MessageBroker, MessageHandler, Subscription};
use crate::error::{BrokerError, BrokerResult};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock, Weak};
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{debug, trace};

const INBOX_PREFIX: &str = "_INBOX.";

type HandlerTable = HashMap<String, Vec<(u64, Arc<dyn MessageHandler>)>>;

#[derive(Default)]
struct Inner {
    handlers: RwLock<HandlerTable>,
    next_id: AtomicU64,
    closed: AtomicBool,
}

impl Inner {
    fn remove(&self, topic: &str, id: u64) {
        let mut table = self.handlers.write().unwrap_or_else(|p| p.into_inner());
        if let Some(list) = table.get_mut(topic) {
            list.retain(|(sid, _)| *sid != id);
            if list.is_empty() {
                table.remove(topic);
            }
        }
    }
}

/// Broker whose subscribers all live in the current process.
#[derive(Clone, Default)]
pub struct MemoryBroker {
    inner: Arc<Inner>,
}

impl MemoryBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live subscriptions on `topic`.
    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.inner
            .handlers
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .get(topic)
            .map_or(0, Vec::len)
    }

    /// Closes the broker. Later operations fail with [`BrokerError::Closed`].
    pub fn close(&self) {
        self.inner.closed.store(true, Ordering::SeqCst);
        self.inner
            .handlers
            .write()
            .unwrap_or_else(|p| p.into_inner())
            .clear();
    }

    fn ensure_open(&self) -> BrokerResult<()> {
        if self.inner.closed.load(Ordering::SeqCst) {
            Err(BrokerError::Closed)
        } else {
            Ok(())
        }
    }

    fn register(&self, topic: &str, handler: Arc<dyn MessageHandler>) -> Subscription {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner
            .handlers
            .write()
            .unwrap_or_else(|p| p.into_inner())
            .entry(topic.to_string())
            .or_default()
            .push((id, handler));

        let weak: Weak<Inner> = Arc::downgrade(&self.inner);
        let owned_topic = topic.to_string();
        Subscription::new(topic, move || {
            if let Some(inner) = weak.upgrade() {
                inner.remove(&owned_topic, id);
            }
        })
    }

    /// Hands `message` to every subscriber of its topic. Returns how many.
    fn deliver(&self, message: BrokerMessage) -> usize {
        let targets: Vec<Arc<dyn MessageHandler>> = self
            .inner
            .handlers
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .get(&message.topic)
            .map(|list| list.iter().map(|(_, h)| h.clone()).collect())
            .unwrap_or_default();

        trace!(topic = %message.topic, subscribers = targets.len(), "delivering");
        for handler in &targets {
            let handler = handler.clone();
            let message = message.clone();
            tokio::spawn(async move { handler.handle(message).await });
        }
        targets.len()
    }
}

struct ReplySlot(Mutex<Option<oneshot::Sender<Vec<u8>>>>);

#[async_trait]
impl MessageHandler for ReplySlot {
    async fn handle(&self, message: BrokerMessage) {
        let sender = self.0.lock().unwrap_or_else(|p| p.into_inner()).take();
        if let Some(sender) = sender {
            let _ = sender.send(message.payload);
        }
    }
}

#[async_trait]
impl MessageBroker for MemoryBroker {
    async fn publish(&self, topic: &str, payload: Vec<u8>) -> BrokerResult<()> {
        self.ensure_open()?;
        self.deliver(BrokerMessage::new(topic, payload));
        Ok(())
    }

    async fn subscribe(
        &self,
        topic: &str,
        handler: Arc<dyn MessageHandler>,
    ) -> BrokerResult<Subscription> {
        self.ensure_open()
            .map_err(|e| BrokerError::Subscribe {
                topic: topic.to_string(),
                reason: e.to_string(),
            })?;
        debug!(topic, "subscribed");
        Ok(self.register(topic, handler))
    }

    async fn request(
        &self,
        topic: &str,
        payload: Vec<u8>,
        timeout: Duration,
    ) -> BrokerResult<Vec<u8>> {
        self.ensure_open()?;

        let inbox = format!("{INBOX_PREFIX}{}", uuid::Uuid::new_v4().simple());
        let (tx, rx) = oneshot::channel();
        let _inbox_sub = self.register(&inbox, Arc::new(ReplySlot(Mutex::new(Some(tx)))));

        let delivered = self.deliver(BrokerMessage::new(topic, payload).with_reply_to(&inbox));
        if delivered == 0 {
            return Err(BrokerError::NoResponders(topic.to_string()));
        }

        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(reply)) => Ok(reply),
            Ok(Err(_)) => Err(BrokerError::Closed),
            Err(_) => Err(BrokerError::Timeout {
                topic: topic.to_string(),
                timeout,
            }),
        }
    }
}
