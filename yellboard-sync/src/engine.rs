//! Library sync engine.
//!
//! For the session's group the engine:
//! - broadcasts the local listing on `{group}.sounds`, once at start and then
//!   on a fixed interval, and mirrors it to local clients
//! - diffs every remote listing against a fresh local scan
//! - fetches each missing clip over request/reply on `{group}.sounds.payload`
//!
//! A failed fetch is logged and abandoned. The next broadcast cycle of the
//! peer holding the clip is the only retry.

use crate::broker::{handler_fn, MessageBroker, Subscription};
use crate::config::SessionConfig;
use crate::connections::ConnectionRegistry;
use crate::error::{SyncError, SyncResult};
use crate::transfer::TransferService;
use futures::future::join_all;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};
use yellboard_library::LibraryIndex;
use yellboard_types::{missing, GroupId, LibrarySnapshot, ServerFrame, SoundEntry, Topics};

/// Commands accepted by a running engine loop.
#[derive(Debug)]
pub enum EngineCommand {
    /// Broadcast the local listing now, outside the regular interval.
    Broadcast,
    /// Stop the loop.
    Shutdown,
}

/// Outcome of processing one remote listing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchReport {
    /// Entries of the remote listing missing locally.
    pub requested: usize,
    pub fetched: usize,
    pub failed: usize,
    /// Invalid names and paths already being fetched.
    pub skipped: usize,
}

enum FetchOutcome {
    Fetched,
    Failed,
    Skipped,
}

/// Removes a path from the in-flight set when the fetch ends, however it ends.
struct InFlightGuard<'a> {
    set: &'a Mutex<HashSet<SoundEntry>>,
    entry: SoundEntry,
}

impl<'a> InFlightGuard<'a> {
    fn acquire(set: &'a Mutex<HashSet<SoundEntry>>, entry: &SoundEntry) -> Option<Self> {
        let inserted = set
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .insert(entry.clone());
        inserted.then(|| Self {
            set,
            entry: entry.clone(),
        })
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.set
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .remove(&self.entry);
    }
}

/// Keeps the local clip library of one group converging with its peers.
pub struct SyncEngine {
    group: GroupId,
    topics: Topics,
    index: Arc<LibraryIndex>,
    broker: Arc<dyn MessageBroker>,
    registry: Arc<ConnectionRegistry>,
    /// Last scanned local snapshot.
    local: RwLock<Arc<LibrarySnapshot>>,
    broadcast_interval: Duration,
    fetch_timeout: Duration,
    fetch_slots: Semaphore,
    in_flight: Mutex<HashSet<SoundEntry>>,
}

impl SyncEngine {
    pub fn new(
        group: GroupId,
        index: Arc<LibraryIndex>,
        broker: Arc<dyn MessageBroker>,
        registry: Arc<ConnectionRegistry>,
        config: &SessionConfig,
    ) -> Self {
        Self {
            topics: group.topics(),
            group,
            index,
            broker,
            registry,
            local: RwLock::new(Arc::new(LibrarySnapshot::empty())),
            broadcast_interval: config.broadcast_interval(),
            fetch_timeout: config.fetch_timeout(),
            fetch_slots: Semaphore::new(config.max_concurrent_fetches.max(1)),
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    pub fn group(&self) -> &GroupId {
        &self.group
    }

    /// The snapshot taken by the most recent scan.
    pub fn local_snapshot(&self) -> Arc<LibrarySnapshot> {
        self.local.read().unwrap_or_else(|p| p.into_inner()).clone()
    }

    async fn rescan(&self) -> Arc<LibrarySnapshot> {
        let snapshot = Arc::new(self.index.scan(&self.group).await);
        *self.local.write().unwrap_or_else(|p| p.into_inner()) = snapshot.clone();
        snapshot
    }

    /// Scans, publishes the listing to peers and pushes it to local clients.
    ///
    /// Local clients are refreshed even when the publish fails; the publish
    /// error is still returned.
    pub async fn broadcast(&self) -> SyncResult<()> {
        let snapshot = self.rescan().await;
        let listing = LibraryIndex::serialize(&snapshot)?;

        let published = self.broker.publish(&self.topics.listing, listing).await;
        if let Err(e) = &published {
            warn!(group = %self.group, "listing publish failed: {e}");
        } else {
            debug!(group = %self.group, count = snapshot.len(), "listing published");
        }

        self.registry
            .broadcast_frame(&ServerFrame::Sounds((*snapshot).clone()))
            .await?;

        published.map_err(SyncError::from)
    }

    /// Handles a listing announced by a peer (or by ourselves).
    ///
    /// Returns once every fetch triggered by this listing has finished.
    /// Malformed listings fail without touching local state.
    pub async fn on_remote_listing(&self, bytes: &[u8]) -> SyncResult<FetchReport> {
        let remote = LibraryIndex::deserialize(bytes)?;
        let local = self.rescan().await;
        let gaps = missing(&local, &remote);

        let mut report = FetchReport {
            requested: gaps.len(),
            ..FetchReport::default()
        };
        if gaps.is_empty() {
            return Ok(report);
        }
        info!(group = %self.group, missing = gaps.len(), "remote listing has clips we lack");

        let outcomes = join_all(gaps.into_iter().map(|entry| self.fetch(entry))).await;
        for outcome in outcomes {
            match outcome {
                FetchOutcome::Fetched => report.fetched += 1,
                FetchOutcome::Failed => report.failed += 1,
                FetchOutcome::Skipped => report.skipped += 1,
            }
        }
        Ok(report)
    }

    async fn fetch(&self, entry: SoundEntry) -> FetchOutcome {
        if !entry.is_plain_file_name() {
            warn!(
                group = %self.group,
                path = entry.path(),
                "ignoring listed clip with invalid name"
            );
            return FetchOutcome::Skipped;
        }
        let Some(_guard) = InFlightGuard::acquire(&self.in_flight, &entry) else {
            debug!(path = entry.path(), "fetch already in flight");
            return FetchOutcome::Skipped;
        };
        let Ok(_permit) = self.fetch_slots.acquire().await else {
            return FetchOutcome::Failed;
        };

        match self.request_missing(&entry).await {
            Ok(path) => {
                info!(group = %self.group, path = %path.display(), "fetched clip");
                FetchOutcome::Fetched
            }
            Err(e) => {
                warn!(group = %self.group, "fetch abandoned: {e}");
                FetchOutcome::Failed
            }
        }
    }

    /// Requests one clip from the group and stores the reply.
    ///
    /// Single attempt, bounded by the configured fetch timeout.
    pub async fn request_missing(&self, entry: &SoundEntry) -> SyncResult<PathBuf> {
        if !entry.is_plain_file_name() {
            return Err(SyncError::InvalidPath(entry.path().to_string()));
        }
        let bytes = self
            .broker
            .request(
                &self.topics.payload,
                entry.path().as_bytes().to_vec(),
                self.fetch_timeout,
            )
            .await
            .map_err(|source| SyncError::Transfer {
                path: entry.path().to_string(),
                source,
            })?;

        Ok(self.index.write_atomic(&self.group, entry, &bytes).await?)
    }

    /// Subscribes to remote listings and to clip requests (served by
    /// `transfer`).
    pub async fn subscribe(
        self: &Arc<Self>,
        transfer: Arc<TransferService>,
    ) -> SyncResult<Vec<Subscription>> {
        let engine = Arc::clone(self);
        let listing = self
            .broker
            .subscribe(
                &self.topics.listing,
                handler_fn(move |message| {
                    let engine = engine.clone();
                    async move {
                        match engine.on_remote_listing(&message.payload).await {
                            Ok(report) if report.requested > 0 => {
                                info!(group = %engine.group, ?report, "remote listing processed")
                            }
                            Ok(_) => {}
                            Err(e) => warn!(group = %engine.group, "dropping remote listing: {e}"),
                        }
                    }
                }),
            )
            .await?;

        let payload = self
            .broker
            .subscribe(
                &self.topics.payload,
                handler_fn(move |message| {
                    let transfer = transfer.clone();
                    async move { transfer.on_payload_request(message).await }
                }),
            )
            .await?;

        Ok(vec![listing, payload])
    }

    /// Subscribes and spawns the broadcast loop. The first broadcast happens
    /// immediately.
    pub async fn start(
        self: &Arc<Self>,
        transfer: Arc<TransferService>,
    ) -> SyncResult<EngineHandle> {
        let subscriptions = self.subscribe(transfer).await?;
        let (command_tx, command_rx) = mpsc::channel(16);
        let task = tokio::spawn(Arc::clone(self).run(command_rx));
        info!(group = %self.group, "sync engine started");
        Ok(EngineHandle {
            command_tx,
            task,
            subscriptions,
        })
    }

    /// Broadcast loop. Runs until [`EngineCommand::Shutdown`] or until every
    /// command sender is gone.
    pub async fn run(self: Arc<Self>, mut command_rx: mpsc::Receiver<EngineCommand>) {
        let mut ticker = tokio::time::interval(self.broadcast_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.broadcast().await {
                        debug!(group = %self.group, "periodic broadcast incomplete: {e}");
                    }
                }
                cmd = command_rx.recv() => match cmd {
                    Some(EngineCommand::Broadcast) => {
                        if let Err(e) = self.broadcast().await {
                            debug!(group = %self.group, "triggered broadcast incomplete: {e}");
                        }
                    }
                    Some(EngineCommand::Shutdown) | None => break,
                },
            }
        }
        info!(group = %self.group, "sync engine stopped");
    }
}

/// Handle to a started engine. Owns the engine's subscriptions; dropping the
/// handle releases them and ends the loop.
pub struct EngineHandle {
    command_tx: mpsc::Sender<EngineCommand>,
    task: JoinHandle<()>,
    subscriptions: Vec<Subscription>,
}

impl EngineHandle {
    pub async fn broadcast_now(&self) -> SyncResult<()> {
        self.command_tx
            .send(EngineCommand::Broadcast)
            .await
            .map_err(|_| SyncError::ChannelClosed)
    }

    /// Topics this engine is subscribed to.
    pub fn topics(&self) -> Vec<&str> {
        self.subscriptions.iter().map(Subscription::topic).collect()
    }

    /// Releases the subscriptions and waits for the loop to exit.
    pub async fn shutdown(self) {
        let Self {
            command_tx,
            task,
            subscriptions,
        } = self;
        for subscription in subscriptions {
            subscription.unsubscribe();
        }
        let _ = command_tx.send(EngineCommand::Shutdown).await;
        if let Err(e) = task.await {
            warn!("sync engine task ended abnormally: {e}");
        }
    }
}
