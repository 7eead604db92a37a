//! Shared test doubles for the sync integration tests.
#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use yellboard_sync::{
    BrokerError, BrokerResult, ClientSink, ConnectionError, MessageBroker, MessageHandler,
    PlayerAdapter, Subscription, SyncError, SyncResult,
};
use yellboard_types::{LibrarySnapshot, SoundEntry};

// ── Recording broker ────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    pub topic: String,
    pub payload: Vec<u8>,
    pub timeout: Duration,
}

/// Broker that records traffic and answers requests from a fixed table.
/// Requests for paths without an entry fail with a timeout.
#[derive(Default)]
pub struct RecordingBroker {
    published: Mutex<Vec<(String, Vec<u8>)>>,
    requests: Mutex<Vec<RecordedRequest>>,
    replies: HashMap<String, Vec<u8>>,
    delay: Duration,
    fail_publish: bool,
    active: AtomicUsize,
    peak: AtomicUsize,
}

impl RecordingBroker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_reply(mut self, path: &str, bytes: &[u8]) -> Self {
        self.replies.insert(path.to_string(), bytes.to_vec());
        self
    }

    /// Every request takes `delay` before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn failing_publish(mut self) -> Self {
        self.fail_publish = true;
        self
    }

    pub fn published(&self) -> Vec<(String, Vec<u8>)> {
        self.published.lock().unwrap().clone()
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Highest number of requests observed in flight at once.
    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MessageBroker for RecordingBroker {
    async fn publish(&self, topic: &str, payload: Vec<u8>) -> BrokerResult<()> {
        if self.fail_publish {
            return Err(BrokerError::Publish {
                topic: topic.to_string(),
                reason: "broker unavailable".to_string(),
            });
        }
        self.published
            .lock()
            .unwrap()
            .push((topic.to_string(), payload));
        Ok(())
    }

    async fn subscribe(
        &self,
        topic: &str,
        _handler: Arc<dyn MessageHandler>,
    ) -> BrokerResult<Subscription> {
        Ok(Subscription::new(topic, || {}))
    }

    async fn request(
        &self,
        topic: &str,
        payload: Vec<u8>,
        timeout: Duration,
    ) -> BrokerResult<Vec<u8>> {
        self.requests.lock().unwrap().push(RecordedRequest {
            topic: topic.to_string(),
            payload: payload.clone(),
            timeout,
        });

        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.active.fetch_sub(1, Ordering::SeqCst);

        let path = String::from_utf8(payload).unwrap();
        self.replies
            .get(&path)
            .cloned()
            .ok_or_else(|| BrokerError::Timeout {
                topic: topic.to_string(),
                timeout,
            })
    }
}

// ── Recording player ────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingPlayer {
    loads: Mutex<Vec<PathBuf>>,
    fail: bool,
}

impl RecordingPlayer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn loads(&self) -> Vec<PathBuf> {
        self.loads.lock().unwrap().clone()
    }
}

#[async_trait]
impl PlayerAdapter for RecordingPlayer {
    async fn load(&self, path: &Path) -> SyncResult<()> {
        self.loads.lock().unwrap().push(path.to_path_buf());
        if self.fail {
            return Err(SyncError::Player("player process is gone".to_string()));
        }
        Ok(())
    }
}

// ── Client sinks ────────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    frames: Mutex<Vec<String>>,
}

impl RecordingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn frames(&self) -> Vec<String> {
        self.frames.lock().unwrap().clone()
    }

    pub fn last(&self) -> Option<String> {
        self.frames.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl ClientSink for RecordingSink {
    async fn send_text(&self, frame: &str) -> Result<(), ConnectionError> {
        self.frames.lock().unwrap().push(frame.to_string());
        Ok(())
    }
}

pub struct FailingSink;

#[async_trait]
impl ClientSink for FailingSink {
    async fn send_text(&self, _frame: &str) -> Result<(), ConnectionError> {
        Err(ConnectionError::Transport("broken pipe".to_string()))
    }
}

// ── Helpers ─────────────────────────────────────────────────────

pub fn listing(paths: &[&str]) -> Vec<u8> {
    let snapshot: LibrarySnapshot = paths.iter().map(|p| SoundEntry::new(*p)).collect();
    snapshot.to_json_vec().unwrap()
}

/// Polls `cond` every 10ms for up to five seconds.
pub async fn eventually(what: &str, cond: impl Fn() -> bool) {
    for _ in 0..500 {
        if cond() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("timed out waiting for {what}");
}
