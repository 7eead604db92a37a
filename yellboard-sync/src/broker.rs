//! Message broker capability.
//!
//! The broker itself is an external collaborator. The session only needs
//! topic-scoped publish, subscribe and request/reply, expressed by
//! [`MessageBroker`]. Delivery is assumed at-most-once and unordered across
//! publishers.

use crate::error::BrokerResult;
use async_trait::async_trait;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// A message delivered to a subscriber.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokerMessage {
    pub topic: String,
    pub payload: Vec<u8>,
    /// Reply subject when the sender issued a request.
    pub reply_to: Option<String>,
}

impl BrokerMessage {
    pub fn new(topic: impl Into<String>, payload: Vec<u8>) -> Self {
        Self {
            topic: topic.into(),
            payload,
            reply_to: None,
        }
    }

    pub fn with_reply_to(mut self, reply_to: impl Into<String>) -> Self {
        self.reply_to = Some(reply_to.into());
        self
    }
}

/// Callback invoked for each message on a subscribed topic.
///
/// Invocations may overlap with each other and with any other handler.
#[async_trait]
pub trait MessageHandler: Send + Sync {
    async fn handle(&self, message: BrokerMessage);
}

struct FnHandler<F>(F);

#[async_trait]
impl<F, Fut> MessageHandler for FnHandler<F>
where
    F: Fn(BrokerMessage) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    async fn handle(&self, message: BrokerMessage) {
        (self.0)(message).await
    }
}

/// Wraps an async closure as a [`MessageHandler`].
pub fn handler_fn<F, Fut>(f: F) -> Arc<dyn MessageHandler>
where
    F: Fn(BrokerMessage) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    Arc::new(FnHandler(f))
}

/// Publish/subscribe/request-reply primitives scoped by topic string.
#[async_trait]
pub trait MessageBroker: Send + Sync {
    /// Fire-and-forget publish.
    async fn publish(&self, topic: &str, payload: Vec<u8>) -> BrokerResult<()>;

    /// Registers `handler` for `topic`. The registration lives as long as the
    /// returned [`Subscription`].
    async fn subscribe(
        &self,
        topic: &str,
        handler: Arc<dyn MessageHandler>,
    ) -> BrokerResult<Subscription>;

    /// Sends `payload` on `topic` and waits up to `timeout` for one reply.
    async fn request(
        &self,
        topic: &str,
        payload: Vec<u8>,
        timeout: Duration,
    ) -> BrokerResult<Vec<u8>>;

    /// Answers a request. Messages without a reply subject are ignored.
    async fn reply(&self, request: &BrokerMessage, payload: Vec<u8>) -> BrokerResult<()> {
        match &request.reply_to {
            Some(reply_to) => self.publish(reply_to, payload).await,
            None => Ok(()),
        }
    }
}

type Release = Box<dyn FnOnce() + Send + Sync>;

/// Handle to a live subscription. Dropping it unsubscribes.
pub struct Subscription {
    topic: String,
    release: Option<Release>,
}

impl Subscription {
    /// `release` runs exactly once, on [`unsubscribe`](Self::unsubscribe) or drop.
    pub fn new(topic: impl Into<String>, release: impl FnOnce() + Send + Sync + 'static) -> Self {
        Self {
            topic: topic.into(),
            release: Some(Box::new(release)),
        }
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn unsubscribe(mut self) {
        self.release_now();
    }

    fn release_now(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release_now();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("topic", &self.topic)
            .field("active", &self.release.is_some())
            .finish()
    }
}
