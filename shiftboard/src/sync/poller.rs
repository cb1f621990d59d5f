//! Snapshot poller
//!
//! Re-reads the latest snapshot on a fixed interval and delivers it to every
//! subscriber on every tick, changed or not. Each delivery carries the
//! content fingerprint and a `changed` flag for consumers that want to skip
//! identical reloads.

use super::loader::{LoadOutcome, SnapshotLoader};
use super::{Callback, Subscribers};
use crate::model::Report;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

#[derive(Debug, Clone)]
pub struct SnapshotDelivery {
    pub report: Arc<Report>,
    /// `None` when there was no snapshot and the empty default is delivered
    pub path: Option<PathBuf>,
    pub fingerprint: Option<String>,
    /// Differs from the previous delivery
    pub changed: bool,
}

/// Tracks what the previous tick delivered
#[derive(Debug, Default)]
struct PollCycle {
    delivered: bool,
    last_fingerprint: Option<String>,
}

impl PollCycle {
    async fn tick(&mut self, loader: &SnapshotLoader) -> Option<SnapshotDelivery> {
        let (report, path, fingerprint) = match loader.load_latest().await {
            LoadOutcome::Loaded(snapshot) => (
                snapshot.report,
                Some(snapshot.path),
                Some(snapshot.fingerprint),
            ),
            LoadOutcome::NoData => (Report::empty(), None, None),
            LoadOutcome::Deferred { .. } => return None,
        };

        let changed = !self.delivered || self.last_fingerprint != fingerprint;
        self.delivered = true;
        self.last_fingerprint = fingerprint.clone();

        Some(SnapshotDelivery {
            report: Arc::new(report),
            path,
            fingerprint,
            changed,
        })
    }
}

pub struct SnapshotPoller {
    loader: SnapshotLoader,
    interval: Duration,
    subscribers: Arc<Subscribers<SnapshotDelivery>>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl SnapshotPoller {
    pub fn new(loader: SnapshotLoader, interval: Duration) -> Self {
        Self {
            loader,
            interval,
            subscribers: Arc::new(Subscribers::new()),
            task: Mutex::new(None),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Register a callback for every delivery
    pub async fn on_report<F>(&self, callback: F)
    where
        F: Fn(&SnapshotDelivery) + Send + Sync + 'static,
    {
        let callback: Callback<SnapshotDelivery> = Arc::new(callback);
        self.subscribers.register(callback).await;
    }

    /// Receive deliveries on a channel instead of a callback.
    ///
    /// Deliveries are dropped while the receiver is full.
    pub async fn subscribe(&self, buffer: usize) -> mpsc::Receiver<SnapshotDelivery> {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        self.on_report(move |delivery| {
            if let Err(e) = tx.try_send(delivery.clone()) {
                tracing::debug!("Snapshot delivery dropped: {}", e);
            }
        })
        .await;
        rx
    }

    /// Spawn the polling task. The first tick runs immediately.
    ///
    /// Returns `false` if already running or stopped.
    pub async fn start(&self) -> bool {
        let mut task = self.task.lock().await;
        if task.is_some() || self.subscribers.is_stopped().await {
            return false;
        }

        let loader = self.loader.clone();
        let subscribers = self.subscribers.clone();
        let period = self.interval;

        *task = Some(tokio::spawn(async move {
            tracing::info!(
                "Starting snapshot poller on {:?} every {:?}",
                loader.locator().reports_dir(),
                period
            );

            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut cycle = PollCycle::default();

            loop {
                interval.tick().await;

                let Some(delivery) = cycle.tick(&loader).await else {
                    continue;
                };
                if !subscribers.dispatch(&delivery).await {
                    tracing::debug!("Poller stopped, delivery suppressed");
                    break;
                }
            }
        }));
        true
    }

    /// Read once and deliver outside the timer
    pub async fn poll_now(&self) -> Option<SnapshotDelivery> {
        let delivery = PollCycle::default().tick(&self.loader).await?;
        self.subscribers.dispatch(&delivery).await.then_some(delivery)
    }

    pub async fn is_running(&self) -> bool {
        self.task.lock().await.is_some() && !self.subscribers.is_stopped().await
    }

    /// Cancel the timer. No callback runs after this returns.
    pub async fn stop(&self) {
        self.subscribers.stop().await;
        if let Some(task) = self.task.lock().await.take() {
            task.abort();
        }
        tracing::info!("Snapshot poller stopped");
    }
}
