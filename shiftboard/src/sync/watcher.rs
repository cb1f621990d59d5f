//! Debounced file watcher
//!
//! Watches one file and reloads it after a quiet period, so a burst of
//! partial writes for one logical save produces a single reload. Changes
//! are detected by sampling the file's metadata; in-process writers can
//! also report a change directly through [`DebouncedWatcher::notify_changed`].

use super::retry::RetryPolicy;
use super::{Callback, Subscribers};
use crate::config::{DEFAULT_DEBOUNCE_MS, DEFAULT_WATCH_SAMPLE_MS};
use crate::error::Result;
use crate::storage::snapshot_file;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::sync::{mpsc, Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchState {
    Idle,
    PendingReload { deadline: Instant },
    Reloading,
}

/// Quiet-period state machine, driven by the caller's clock
#[derive(Debug, Clone)]
pub struct Debouncer {
    quiet: Duration,
    state: WatchState,
    /// A change arrived while reloading
    dirty: bool,
}

impl Debouncer {
    pub fn new(quiet: Duration) -> Self {
        Self {
            quiet,
            state: WatchState::Idle,
            dirty: false,
        }
    }

    pub fn state(&self) -> WatchState {
        self.state
    }

    /// A change event; (re)starts the quiet period
    pub fn on_change(&mut self, now: Instant) {
        match self.state {
            WatchState::Idle | WatchState::PendingReload { .. } => {
                self.state = WatchState::PendingReload {
                    deadline: now + self.quiet,
                };
            }
            WatchState::Reloading => self.dirty = true,
        }
    }

    pub fn deadline(&self) -> Option<Instant> {
        match self.state {
            WatchState::PendingReload { deadline } => Some(deadline),
            _ => None,
        }
    }

    /// Enter `Reloading` if the quiet period is over
    pub fn fire(&mut self, now: Instant) -> bool {
        match self.state {
            WatchState::PendingReload { deadline } if now >= deadline => {
                self.state = WatchState::Reloading;
                true
            }
            _ => false,
        }
    }

    /// Reload done; a change seen meanwhile schedules another one
    pub fn finish(&mut self, now: Instant) {
        if self.state != WatchState::Reloading {
            return;
        }
        self.state = WatchState::Idle;
        if std::mem::take(&mut self.dirty) {
            self.on_change(now);
        }
    }

    /// Drop any pending reload
    pub fn cancel(&mut self) {
        self.state = WatchState::Idle;
        self.dirty = false;
    }
}

#[derive(Debug, Clone, Copy)]
pub struct WatchConfig {
    pub debounce: Duration,
    /// Metadata sampling period; `None` relies on `notify_changed` only
    pub sample_interval: Option<Duration>,
    pub retry: RetryPolicy,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(DEFAULT_DEBOUNCE_MS),
            sample_interval: Some(Duration::from_millis(DEFAULT_WATCH_SAMPLE_MS)),
            retry: RetryPolicy::default(),
        }
    }
}

type Parser<T> = Arc<dyn Fn(&Path, &str) -> Result<T> + Send + Sync>;

/// (mtime, length) of the watched file
type FileStamp = (Option<SystemTime>, u64);

async fn stamp(path: &Path) -> Option<FileStamp> {
    tokio::fs::metadata(path)
        .await
        .ok()
        .map(|meta| (meta.modified().ok(), meta.len()))
}

pub struct DebouncedWatcher<T> {
    path: PathBuf,
    config: WatchConfig,
    parser: Parser<T>,
    latest: Arc<RwLock<Option<Arc<T>>>>,
    subscribers: Arc<Subscribers<T>>,
    events: mpsc::UnboundedSender<()>,
    receiver: Mutex<Option<mpsc::UnboundedReceiver<()>>>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl<T> DebouncedWatcher<T>
where
    T: Send + Sync + 'static,
{
    pub fn new<F>(path: PathBuf, config: WatchConfig, parser: F) -> Self
    where
        F: Fn(&Path, &str) -> Result<T> + Send + Sync + 'static,
    {
        let (events, receiver) = mpsc::unbounded_channel();
        Self {
            path,
            config,
            parser: Arc::new(parser),
            latest: Arc::new(RwLock::new(None)),
            subscribers: Arc::new(Subscribers::new()),
            events,
            receiver: Mutex::new(Some(receiver)),
            tasks: Mutex::new(Vec::new()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn on_reload<F>(&self, callback: F)
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let callback: Callback<T> = Arc::new(callback);
        self.subscribers.register(callback).await;
    }

    /// Last successfully loaded value
    pub async fn latest(&self) -> Option<Arc<T>> {
        self.latest.read().await.clone()
    }

    /// Report a change made by this process
    pub fn notify_changed(&self) {
        if self.events.send(()).is_err() {
            tracing::debug!("Watcher for {:?} is not running", self.path);
        }
    }

    /// Load the file once without waiting for a change
    pub async fn reload_now(&self) -> Option<Arc<T>> {
        Reload {
            path: &self.path,
            retry: self.config.retry,
            parser: &self.parser,
            latest: &self.latest,
            subscribers: &self.subscribers,
        }
        .run()
        .await
    }

    /// Spawn the detection and debounce tasks. `false` if already started.
    pub async fn start(&self) -> bool {
        let Some(mut receiver) = self.receiver.lock().await.take() else {
            return false;
        };
        let mut tasks = self.tasks.lock().await;

        if let Some(sample) = self.config.sample_interval {
            let path = self.path.clone();
            let events = self.events.clone();
            tasks.push(tokio::spawn(async move {
                let mut interval = tokio::time::interval(sample);
                interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
                let mut last = stamp(&path).await;
                loop {
                    interval.tick().await;
                    let current = stamp(&path).await;
                    if current != last && current.is_some() {
                        tracing::debug!("Change detected on {:?}", path);
                        if events.send(()).is_err() {
                            break;
                        }
                    }
                    last = current;
                }
            }));
        }

        let path = self.path.clone();
        let retry = self.config.retry;
        let parser = self.parser.clone();
        let latest = self.latest.clone();
        let subscribers = self.subscribers.clone();
        let mut debouncer = Debouncer::new(self.config.debounce);

        tasks.push(tokio::spawn(async move {
            tracing::info!("Watching {:?} (quiet period {:?})", path, debouncer.quiet);
            loop {
                let deadline = debouncer.deadline();
                tokio::select! {
                    event = receiver.recv() => match event {
                        Some(()) => debouncer.on_change(Instant::now()),
                        None => break,
                    },
                    _ = sleep_until(deadline), if deadline.is_some() => {
                        if !debouncer.fire(Instant::now()) {
                            continue;
                        }
                        Reload {
                            path: &path,
                            retry,
                            parser: &parser,
                            latest: &latest,
                            subscribers: &subscribers,
                        }
                        .run()
                        .await;
                        if subscribers.is_stopped().await {
                            break;
                        }
                        debouncer.finish(Instant::now());
                    }
                }
            }
        }));
        true
    }

    /// Cancel pending reloads and detection. No callback runs after this
    /// returns.
    pub async fn stop(&self) {
        self.subscribers.stop().await;
        for task in self.tasks.lock().await.drain(..) {
            task.abort();
        }
        tracing::info!("Stopped watching {:?}", self.path);
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

/// One reload attempt with its shared state borrowed
struct Reload<'a, T> {
    path: &'a Path,
    retry: RetryPolicy,
    parser: &'a Parser<T>,
    latest: &'a RwLock<Option<Arc<T>>>,
    subscribers: &'a Subscribers<T>,
}

impl<T> Reload<'_, T> {
    async fn run(self) -> Option<Arc<T>> {
        let (path, parser) = (self.path, self.parser);
        let loaded = self
            .retry
            .retry_on_lock("config reload", || async move {
                let bytes = snapshot_file::read_text(path).await?;
                parser(path, &bytes.content)
            })
            .await;

        let value = match loaded {
            Ok(value) => Arc::new(value),
            Err(e) if e.is_transient() => {
                tracing::warn!(
                    "{:?} still locked after {} attempts, waiting for the next change",
                    self.path,
                    self.retry.max_attempts
                );
                return None;
            }
            Err(e) => {
                tracing::warn!("Failed to reload {:?}: {}", self.path, e);
                return None;
            }
        };

        *self.latest.write().await = Some(value.clone());
        if self.subscribers.dispatch(&value).await {
            tracing::debug!("Reloaded {:?}", self.path);
        }
        Some(value)
    }
}
