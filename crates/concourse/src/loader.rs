//! Cache-first asset loading with synthesized progress.
//!
//! The loader is split in two halves:
//!
//! - [`run_pipeline`] is the async half. It reads the cache, falls back to
//!   the network, parses the payload and re-caches it, reporting
//!   [`PipelineEvent`]s over a channel. It never touches shared state, so it
//!   can run on any executor.
//! - [`AssetLoader`] is the main-thread half. It owns one [`LoadSession`] per
//!   URL, turns pipeline events into a smooth, monotonic progress stream and
//!   publishes [`LoadUpdate`]s when the owner calls [`AssetLoader::update`]
//!   from its frame loop.
//!
//! ## Progress budget
//!
//! ```text
//! cache hit:  0 ──────────────── 100   (800 ms ramp)
//! network:    0 ── bytes ── 90 ─ 95 ─ 100
//!                              300ms 200ms
//! ```
//!
//! If the transfer size is unknown, progress holds at 0 until the download
//! completes and then jumps to 90.

use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::asset::{Asset, AssetSource};
use crate::cache::Cache;
use crate::error::{Error, Result};
use crate::progress::{PROGRESS_COMPLETE, ProgressAnimator, ProgressTracker};
use crate::transport::Transport;

/// Progress ceiling for the byte transfer; the rest is reserved for setup.
pub const TRANSFER_PROGRESS_CEILING: u8 = 90;
/// Intermediate milestone of the post-transfer tail.
pub const TAIL_MILESTONE: u8 = 95;
/// Maximum wait for a cache read.
pub const CACHE_READ_TIMEOUT: Duration = Duration::from_secs(5);

const CACHE_HIT_RAMP: Duration = Duration::from_millis(800);
const TAIL_FIRST_RAMP: Duration = Duration::from_millis(300);
const TAIL_SECOND_RAMP: Duration = Duration::from_millis(200);

/// Map a byte count onto the transfer share of the progress range.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn transfer_progress(received: u64, total: Option<u64>) -> u8 {
    match total {
        Some(total) if total > 0 => {
            let fraction = (received as f64 / total as f64).clamp(0.0, 1.0);
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let value = (fraction * f64::from(TRANSFER_PROGRESS_CEILING)).round() as u8;
            value
        }
        _ => 0,
    }
}

/// Shared collaborators of every load.
#[derive(Clone)]
pub struct LoadServices {
    /// Persistent blob store.
    pub cache: Arc<dyn Cache>,
    /// Network transport.
    pub transport: Arc<dyn Transport>,
}

/// Events reported by the async half of a load.
#[derive(Debug, Clone)]
pub enum PipelineEvent {
    /// Transfer progress in `[0, 90]`.
    Transfer(u8),
    /// A cached payload parsed successfully.
    CacheHit(Asset),
    /// A downloaded payload parsed successfully.
    Downloaded(Asset),
    /// The network path failed irrecoverably.
    Failed(Error),
}

/// A pipeline event tagged with the load it belongs to.
#[derive(Debug, Clone)]
pub struct LoadMessage {
    /// The URL being loaded.
    pub url: String,
    /// Identifies the load attempt; events from abandoned attempts are dropped.
    pub ticket: u64,
    /// The event itself.
    pub event: PipelineEvent,
}

/// Read the cache without waiting forever.
async fn read_cache(cache: &dyn Cache, url: &str) -> Result<Option<Vec<u8>>> {
    #[cfg(not(target_family = "wasm"))]
    {
        tokio::time::timeout(CACHE_READ_TIMEOUT, cache.get(url))
            .await
            .map_err(|_| Error::Timeout {
                operation: "cache read",
            })?
    }
    #[cfg(target_family = "wasm")]
    {
        cache.get(url).await
    }
}

/// Try to satisfy a load from the cache.
///
/// Every failure here is absorbed: the caller falls through to the network.
async fn load_from_cache(cache: &dyn Cache, url: &str) -> Option<Asset> {
    let data = match read_cache(cache, url).await {
        Ok(Some(data)) => data,
        Ok(None) => return None,
        Err(e) => {
            tracing::warn!(url, "cache read failed, using network: {e}");
            return None;
        }
    };

    tracing::info!(url, bytes = data.len(), "loading asset from cache");
    match Asset::parse(url, data) {
        Ok(asset) => Some(asset),
        Err(e) => {
            tracing::warn!(url, "cached asset is corrupt, using network: {e}");
            if let Err(e) = cache.remove(url).await {
                tracing::warn!(url, "failed to drop corrupt cache entry: {e}");
            }
            None
        }
    }
}

/// Download and parse an asset, forwarding transfer progress.
async fn load_from_network(
    transport: &dyn Transport,
    url: &str,
    ticket: u64,
    tx: &async_channel::Sender<LoadMessage>,
) -> Result<Asset> {
    tracing::info!(url, "downloading asset from network");

    let mut last = 0;
    let mut on_progress = |received: u64, total: Option<u64>| {
        let value = transfer_progress(received, total);
        if value > last {
            last = value;
            // Unbounded channel: only fails once the loader is gone.
            let _ = tx.try_send(LoadMessage {
                url: url.to_string(),
                ticket,
                event: PipelineEvent::Transfer(value),
            });
        }
    };

    let data = transport.fetch(url, &mut on_progress).await?;
    Asset::parse(url, data)
}

/// Re-download `url` and store it for future sessions.
///
/// Failures are logged and swallowed.
pub async fn recache(transport: &dyn Transport, cache: &dyn Cache, url: &str) {
    let data = match transport.fetch(url, &mut |_, _| {}).await {
        Ok(data) => data,
        Err(e) => {
            tracing::warn!(url, "re-cache fetch failed: {e}");
            return;
        }
    };

    match cache.put(url, data).await {
        Ok(()) => tracing::info!(url, "asset cached for future sessions"),
        Err(e) => tracing::warn!(url, "re-cache write failed: {e}"),
    }
}

/// The async half of a load.
///
/// Reports at most one terminal event (`CacheHit`, `Downloaded` or
/// `Failed`). After a successful download it re-caches the asset; that work
/// shares no progress channel with the load.
pub async fn run_pipeline(
    services: LoadServices,
    url: String,
    ticket: u64,
    tx: async_channel::Sender<LoadMessage>,
) {
    let send = |event| {
        let _ = tx.try_send(LoadMessage {
            url: url.clone(),
            ticket,
            event,
        });
    };

    if let Some(asset) = load_from_cache(services.cache.as_ref(), &url).await {
        send(PipelineEvent::CacheHit(asset));
        return;
    }

    match load_from_network(services.transport.as_ref(), &url, ticket, &tx).await {
        Ok(asset) => {
            send(PipelineEvent::Downloaded(asset));
            recache(services.transport.as_ref(), services.cache.as_ref(), &url).await;
        }
        Err(e) => {
            tracing::error!(url, "asset load failed: {e}");
            send(PipelineEvent::Failed(e));
        }
    }
}

/// Lifecycle of a single load.
#[derive(Debug, Clone)]
pub enum LoadPhase {
    /// Waiting on the cache or the network.
    Fetching,
    /// Parsed; the progress tail is animating.
    Finishing {
        /// Where the bytes came from.
        source: AssetSource,
    },
    /// Terminal success.
    Ready {
        /// The loaded asset.
        asset: Asset,
        /// Where the bytes came from.
        source: AssetSource,
    },
    /// Terminal failure; re-invoke `load` to retry.
    Failed(Error),
    /// Torn down before completion.
    Cancelled,
}

impl LoadPhase {
    /// Whether a pipeline is still running for this load.
    #[must_use]
    pub fn is_active(&self) -> bool {
        matches!(self, LoadPhase::Fetching | LoadPhase::Finishing { .. })
    }
}

/// Updates published to the UI shell.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadUpdate {
    /// Progress changed.
    Progress(u8),
    /// The asset is ready.
    Ready(Asset),
    /// The load failed.
    Failed(Error),
}

/// Main-thread state of one load.
#[derive(Debug)]
pub struct LoadSession {
    ticket: u64,
    phase: LoadPhase,
    progress: ProgressTracker,
    ramps: VecDeque<ProgressAnimator>,
    pending: Option<Asset>,
    updates: Vec<LoadUpdate>,
}

impl LoadSession {
    fn new(ticket: u64) -> Self {
        Self {
            ticket,
            phase: LoadPhase::Fetching,
            progress: ProgressTracker::default(),
            ramps: VecDeque::new(),
            pending: None,
            updates: Vec::new(),
        }
    }

    /// Current lifecycle phase.
    #[must_use]
    pub fn phase(&self) -> &LoadPhase {
        &self.phase
    }

    /// Last published progress value.
    #[must_use]
    pub fn progress(&self) -> u8 {
        self.progress.current()
    }

    fn publish(&mut self, value: u8) {
        if let Some(value) = self.progress.offer(value) {
            self.updates.push(LoadUpdate::Progress(value));
        }
    }

    fn handle(&mut self, event: PipelineEvent) {
        if !matches!(self.phase, LoadPhase::Fetching) {
            return;
        }

        match event {
            PipelineEvent::Transfer(value) => {
                self.publish(value.min(TRANSFER_PROGRESS_CEILING));
            }
            PipelineEvent::CacheHit(asset) => {
                let from = self.progress.current();
                self.ramps.push_back(ProgressAnimator::new(
                    from,
                    PROGRESS_COMPLETE,
                    CACHE_HIT_RAMP,
                ));
                self.pending = Some(asset);
                self.phase = LoadPhase::Finishing {
                    source: AssetSource::Cache,
                };
            }
            PipelineEvent::Downloaded(asset) => {
                self.publish(TRANSFER_PROGRESS_CEILING);
                self.ramps.push_back(ProgressAnimator::new(
                    TRANSFER_PROGRESS_CEILING,
                    TAIL_MILESTONE,
                    TAIL_FIRST_RAMP,
                ));
                self.ramps.push_back(ProgressAnimator::new(
                    TAIL_MILESTONE,
                    PROGRESS_COMPLETE,
                    TAIL_SECOND_RAMP,
                ));
                self.pending = Some(asset);
                self.phase = LoadPhase::Finishing {
                    source: AssetSource::Network,
                };
            }
            PipelineEvent::Failed(error) => {
                if let Some(value) = self.progress.reset() {
                    self.updates.push(LoadUpdate::Progress(value));
                }
                self.updates.push(LoadUpdate::Failed(error.clone()));
                self.phase = LoadPhase::Failed(error);
            }
        }
    }

    fn tick(&mut self, delta: Duration) {
        let LoadPhase::Finishing { source } = self.phase else {
            return;
        };

        let mut remaining = delta;
        while let Some(ramp) = self.ramps.front_mut() {
            let mut values = Vec::new();
            remaining = ramp.advance(remaining, |v| values.push(v));
            let finished = ramp.is_finished();
            for value in values {
                self.publish(value);
            }
            if !finished {
                return;
            }
            self.ramps.pop_front();
        }

        if let Some(asset) = self.pending.take() {
            self.publish(PROGRESS_COMPLETE);
            tracing::info!(url = asset.url(), ?source, "asset ready");
            self.updates.push(LoadUpdate::Ready(asset.clone()));
            self.phase = LoadPhase::Ready { asset, source };
        }
    }

    fn cancel(&mut self) {
        for ramp in &mut self.ramps {
            ramp.cancel();
        }
        self.ramps.clear();
        self.pending = None;
        self.updates.clear();
        self.phase = LoadPhase::Cancelled;
    }
}

/// Owns every load of a viewer session.
///
/// At most one load per URL is active at a time; requesting an active URL
/// again does not start a second transfer.
pub struct AssetLoader {
    services: LoadServices,
    sessions: HashMap<String, LoadSession>,
    next_ticket: u64,
    tx: async_channel::Sender<LoadMessage>,
    rx: async_channel::Receiver<LoadMessage>,
}

impl AssetLoader {
    /// Create a loader over the given cache and transport.
    #[must_use]
    pub fn new(services: LoadServices) -> Self {
        let (tx, rx) = async_channel::unbounded();
        Self {
            services,
            sessions: HashMap::new(),
            next_ticket: 0,
            tx,
            rx,
        }
    }

    /// Start loading `url`.
    ///
    /// Returns the pipeline future for the caller to spawn on its executor,
    /// or `None` if the URL is already loading or loaded.
    pub fn load(&mut self, url: &str) -> Option<impl Future<Output = ()> + use<>> {
        if let Some(session) = self.sessions.get(url) {
            if session.phase.is_active() {
                tracing::debug!(url, "load already in flight");
                return None;
            }
            if matches!(session.phase, LoadPhase::Ready { .. }) {
                tracing::debug!(url, "asset already loaded");
                return None;
            }
        }

        self.next_ticket += 1;
        let ticket = self.next_ticket;
        self.sessions
            .insert(url.to_string(), LoadSession::new(ticket));

        Some(run_pipeline(
            self.services.clone(),
            url.to_string(),
            ticket,
            self.tx.clone(),
        ))
    }

    /// Abandon the load of `url`.
    ///
    /// Pending progress ramps are dropped and any late pipeline result is
    /// ignored. An in-flight transfer may still finish in the background.
    pub fn cancel(&mut self, url: &str) {
        if let Some(session) = self.sessions.get_mut(url)
            && session.phase.is_active()
        {
            tracing::info!(url, "load cancelled");
            session.cancel();
        }
    }

    /// Abandon every active load (session teardown).
    pub fn cancel_all(&mut self) {
        let urls: Vec<String> = self.sessions.keys().cloned().collect();
        for url in urls {
            self.cancel(&url);
        }
    }

    /// The session for `url`, if a load was ever started.
    #[must_use]
    pub fn session(&self, url: &str) -> Option<&LoadSession> {
        self.sessions.get(url)
    }

    /// Last published progress for `url` (0 if unknown).
    #[must_use]
    pub fn progress(&self, url: &str) -> u8 {
        self.sessions.get(url).map_or(0, LoadSession::progress)
    }

    /// Drain pipeline events, advance progress ramps by `delta`, and return
    /// the updates published since the last call.
    pub fn update(&mut self, delta: Duration) -> Vec<(String, LoadUpdate)> {
        while let Ok(message) = self.rx.try_recv() {
            match self.sessions.get_mut(&message.url) {
                Some(session) if session.ticket == message.ticket => {
                    session.handle(message.event);
                }
                _ => tracing::debug!(url = %message.url, "dropping event from abandoned load"),
            }
        }

        let mut out = Vec::new();
        for (url, session) in &mut self.sessions {
            session.tick(delta);
            out.extend(session.updates.drain(..).map(|u| (url.clone(), u)));
        }
        out
    }
}
