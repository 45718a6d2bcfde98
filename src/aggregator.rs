// Sampler scheduling and snapshot publishing.
// One loop per sampler writes into the latest-result table; a separate publish loop
// composes snapshots from it on its own cadence.

use std::collections::{HashMap, HashSet};
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::JoinSet;
use tokio::time::{Instant, MissedTickBehavior, interval, interval_at};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::models::{DomainSample, Snapshot};
use crate::samplers::{SampleError, Sampler};

const DEFAULT_PUBLISH_INTERVAL: Duration = Duration::from_millis(500);

/// Snapshots buffered per subscriber before a slow one starts lagging.
const BROADCAST_CAPACITY: usize = 16;

#[derive(Debug, Clone)]
pub struct AggregatorConfig {
    pub publish_interval: Duration,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            publish_interval: DEFAULT_PUBLISH_INTERVAL,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AggregatorError {
    #[error("aggregator already started")]
    AlreadyStarted,
    #[error("at least one sampler is required")]
    NoSamplers,
    #[error("duplicate sampler name {0:?}")]
    DuplicateSampler(String),
    #[error("{0} interval must be non-zero")]
    ZeroInterval(String),
}

pub type SnapshotCallback = Arc<dyn Fn(&Snapshot) + Send + Sync>;

/// Handle returned by [`Aggregator::register_snapshot_callback`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CallbackId(u64);

type LatestTable = Arc<RwLock<HashMap<String, DomainSample>>>;
type CallbackList = Arc<RwLock<Vec<(CallbackId, SnapshotCallback)>>>;

pub struct Aggregator {
    samplers: Vec<Arc<dyn Sampler>>,
    config: AggregatorConfig,
    latest: LatestTable,
    callbacks: CallbackList,
    next_callback: AtomicU64,
    tx: broadcast::Sender<Snapshot>,
    cancel: CancellationToken,
    started: AtomicBool,
    stopped: AtomicBool,
    tracker: TaskTracker,
}

impl Aggregator {
    pub fn new(
        samplers: Vec<Arc<dyn Sampler>>,
        config: AggregatorConfig,
    ) -> Result<Self, AggregatorError> {
        if samplers.is_empty() {
            return Err(AggregatorError::NoSamplers);
        }
        let mut seen = HashSet::new();
        for s in &samplers {
            if !seen.insert(s.name().to_string()) {
                return Err(AggregatorError::DuplicateSampler(s.name().to_string()));
            }
            if s.interval().is_zero() {
                return Err(AggregatorError::ZeroInterval(s.name().to_string()));
            }
        }
        if config.publish_interval.is_zero() {
            return Err(AggregatorError::ZeroInterval("publish".into()));
        }
        let (tx, _) = broadcast::channel(BROADCAST_CAPACITY);
        Ok(Self {
            samplers,
            config,
            latest: Arc::new(RwLock::new(HashMap::new())),
            callbacks: Arc::new(RwLock::new(Vec::new())),
            next_callback: AtomicU64::new(0),
            tx,
            cancel: CancellationToken::new(),
            started: AtomicBool::new(false),
            stopped: AtomicBool::new(false),
            tracker: TaskTracker::new(),
        })
    }

    /// Spawns every sampler loop and the publish loop. Must run inside a tokio runtime.
    pub fn start(&self) -> Result<(), AggregatorError> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(AggregatorError::AlreadyStarted);
        }
        for sampler in &self.samplers {
            self.tracker.spawn(sampler_loop(
                sampler.clone(),
                self.latest.clone(),
                self.cancel.clone(),
            ));
        }
        self.tracker.spawn(publish_loop(
            self.config.publish_interval,
            self.latest.clone(),
            self.callbacks.clone(),
            self.tx.clone(),
            self.cancel.clone(),
        ));
        tracing::info!(
            samplers = self.samplers.len(),
            publish_interval_ms = self.config.publish_interval.as_millis() as u64,
            "Aggregator started"
        );
        Ok(())
    }

    /// Cancels every loop and waits for all of them to exit. Safe to call more
    /// than once, including concurrently; every caller waits for the loops.
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        self.tracker.close();
        self.tracker.wait().await;
        if self.started.load(Ordering::SeqCst) && !self.stopped.swap(true, Ordering::SeqCst) {
            tracing::info!("Aggregator stopped");
        }
    }

    /// Loop tasks that have not exited yet.
    pub fn active_loops(&self) -> usize {
        self.tracker.len()
    }

    pub fn is_running(&self) -> bool {
        self.started.load(Ordering::SeqCst) && !self.cancel.is_cancelled()
    }

    /// Most recent successful result for `domain`.
    pub fn latest(&self, domain: &str) -> Option<DomainSample> {
        read_table(&self.latest).get(domain).cloned()
    }

    /// Composes a snapshot from the current table, outside the publish cadence.
    pub fn snapshot(&self) -> Snapshot {
        compose(&self.latest)
    }

    pub fn domain_names(&self) -> Vec<String> {
        self.samplers.iter().map(|s| s.name().to_string()).collect()
    }

    pub fn sampler_interval(&self, domain: &str) -> Option<Duration> {
        self.samplers
            .iter()
            .find(|s| s.name() == domain)
            .map(|s| s.interval())
    }

    pub fn register_snapshot_callback<F>(&self, f: F) -> CallbackId
    where
        F: Fn(&Snapshot) + Send + Sync + 'static,
    {
        let id = CallbackId(self.next_callback.fetch_add(1, Ordering::Relaxed));
        self.callbacks
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push((id, Arc::new(f)));
        id
    }

    /// Returns false when `id` was not registered.
    pub fn unregister_snapshot_callback(&self, id: CallbackId) -> bool {
        let mut callbacks = self.callbacks.write().unwrap_or_else(|e| e.into_inner());
        let before = callbacks.len();
        callbacks.retain(|(cid, _)| *cid != id);
        callbacks.len() != before
    }

    /// Receiver of every published snapshot; drop it to unsubscribe.
    pub fn subscribe(&self) -> broadcast::Receiver<Snapshot> {
        self.tx.subscribe()
    }

    /// Runs every sampler once concurrently, stores the successes and returns
    /// each domain's outcome in sampler order.
    pub async fn collect_once(&self) -> Vec<(String, Result<DomainSample, SampleError>)> {
        let mut set = JoinSet::new();
        for (idx, sampler) in self.samplers.iter().enumerate() {
            let sampler = sampler.clone();
            let cancel = self.cancel.clone();
            set.spawn(async move { (idx, sampler.collect(&cancel).await) });
        }

        let mut results: Vec<Option<Result<DomainSample, SampleError>>> =
            (0..self.samplers.len()).map(|_| None).collect();
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((idx, result)) => results[idx] = Some(result),
                Err(e) => tracing::warn!(error = %e, operation = "collect_once", "sampler task failed"),
            }
        }

        let mut out = Vec::with_capacity(results.len());
        for (sampler, result) in self.samplers.iter().zip(results) {
            let name = sampler.name().to_string();
            let result = result.unwrap_or_else(|| {
                Err(SampleError::unavailable(format!("{name} (task aborted)")))
            });
            if let Ok(sample) = &result {
                store(&self.latest, &name, sample.clone());
            }
            out.push((name, result));
        }
        out
    }
}

impl Drop for Aggregator {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

fn read_table(
    latest: &RwLock<HashMap<String, DomainSample>>,
) -> std::sync::RwLockReadGuard<'_, HashMap<String, DomainSample>> {
    latest.read().unwrap_or_else(|e| e.into_inner())
}

fn store(latest: &RwLock<HashMap<String, DomainSample>>, name: &str, sample: DomainSample) {
    latest
        .write()
        .unwrap_or_else(|e| e.into_inner())
        .insert(name.to_string(), sample);
}

fn compose(latest: &RwLock<HashMap<String, DomainSample>>) -> Snapshot {
    let table = read_table(latest);
    Snapshot::compose(&table, chrono::Utc::now())
}

async fn sampler_loop(sampler: Arc<dyn Sampler>, latest: LatestTable, cancel: CancellationToken) {
    let name = sampler.name().to_string();
    let mut tick = interval(sampler.interval());
    tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = tick.tick() => {}
        }
        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            r = sampler.collect(&cancel) => r,
        };
        match result {
            Ok(sample) => {
                tracing::trace!(
                    sampler = %name,
                    kind = sample.kind(),
                    last_update = %sample.last_update(),
                    "sample stored"
                );
                store(&latest, &name, sample);
            }
            Err(SampleError::Cancelled) => break,
            Err(e) => {
                let kept = read_table(&latest).get(&name).map(|s| s.last_update());
                tracing::warn!(
                    sampler = %name,
                    error = %e,
                    kept_from = ?kept,
                    "collection failed; keeping previous value"
                );
            }
        }
    }
    tracing::debug!(sampler = %name, "Sampler loop exiting");
}

async fn publish_loop(
    every: Duration,
    latest: LatestTable,
    callbacks: CallbackList,
    tx: broadcast::Sender<Snapshot>,
    cancel: CancellationToken,
) {
    let mut tick = interval_at(Instant::now() + every, every);
    tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = tick.tick() => {}
        }
        let snapshot = compose(&latest);

        let sinks: Vec<SnapshotCallback> = callbacks
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .map(|(_, cb)| cb.clone())
            .collect();
        for cb in sinks {
            if std::panic::catch_unwind(AssertUnwindSafe(|| cb(&snapshot))).is_err() {
                tracing::warn!(operation = "publish", "snapshot callback panicked");
            }
        }
        // No subscribers is the common case for the callback-only setup.
        let _ = tx.send(snapshot);
    }
    tracing::debug!("Publish loop exiting");
}
