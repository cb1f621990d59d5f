//! Sync engine
//!
//! Two background engines keep a reader process current: a fixed-interval
//! snapshot poller and a debounced watcher for a single config file. Both
//! deliver results through registered callbacks and both guarantee that no
//! callback runs once `stop` has returned.

pub mod loader;
pub mod poller;
pub mod retry;
pub mod watcher;

pub use loader::{LoadOutcome, LoadedSnapshot, SnapshotLoader};
pub use poller::{SnapshotDelivery, SnapshotPoller};
pub use retry::RetryPolicy;
pub use watcher::{Debouncer, DebouncedWatcher, WatchConfig, WatchState};

use std::sync::Arc;
use tokio::sync::RwLock;

/// Callback invoked with each delivered value; must not block
pub type Callback<T> = Arc<dyn Fn(&T) + Send + Sync>;

struct SubscriberState<T> {
    stopped: bool,
    callbacks: Vec<Callback<T>>,
}

/// Callback list shared between an engine handle and its tasks.
///
/// Dispatch holds the read lock while callbacks run and `stop` takes the
/// write lock, so an in-flight dispatch finishes before `stop` returns and
/// later ones are suppressed.
pub(crate) struct Subscribers<T> {
    state: RwLock<SubscriberState<T>>,
}

impl<T> Subscribers<T> {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(SubscriberState {
                stopped: false,
                callbacks: Vec::new(),
            }),
        }
    }

    pub async fn register(&self, callback: Callback<T>) {
        self.state.write().await.callbacks.push(callback);
    }

    /// Run every callback; `false` if the engine is stopped
    pub async fn dispatch(&self, value: &T) -> bool {
        let state = self.state.read().await;
        if state.stopped {
            return false;
        }
        for callback in &state.callbacks {
            callback(value);
        }
        true
    }

    pub async fn stop(&self) {
        let mut state = self.state.write().await;
        state.stopped = true;
        state.callbacks.clear();
    }

    pub async fn is_stopped(&self) -> bool {
        self.state.read().await.stopped
    }

    #[cfg(test)]
    pub async fn len(&self) -> usize {
        self.state.read().await.callbacks.len()
    }
}
