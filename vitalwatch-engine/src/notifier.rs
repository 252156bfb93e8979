//! Delivery of published snapshots to observers.
//!
//! Two surfaces are offered: synchronous callbacks invoked on the model
//! context right after a recompute, and a watch channel that any thread or
//! task can read or await without touching the engine.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::watch;
use vitalwatch_types::AlarmSnapshot;

type Callback = Arc<dyn Fn(&AlarmSnapshot) + Send + Sync>;

/// Identifies a registered callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

struct Inner {
    observers: Mutex<Vec<(ObserverId, Callback)>>,
    next_id: AtomicU64,
    latest: watch::Sender<Arc<AlarmSnapshot>>,
}

/// Fan-out of snapshots to observers.
///
/// Cloning yields another handle to the same observer set, so callbacks can
/// be registered from outside the model context.
#[derive(Clone)]
pub struct ChangeNotifier {
    inner: Arc<Inner>,
}

impl ChangeNotifier {
    /// Create a notifier whose latest snapshot is the default (quiet) one.
    pub fn new() -> Self {
        let (latest, _) = watch::channel(Arc::new(AlarmSnapshot::default()));
        Self {
            inner: Arc::new(Inner {
                observers: Mutex::new(Vec::new()),
                next_id: AtomicU64::new(0),
                latest,
            }),
        }
    }

    /// Register a callback invoked with every published snapshot.
    pub fn on_change<F>(&self, callback: F) -> ObserverId
    where
        F: Fn(&AlarmSnapshot) + Send + Sync + 'static,
    {
        let id = ObserverId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        self.inner.observers.lock().push((id, Arc::new(callback)));
        id
    }

    /// Remove a callback. Returns false if it was not registered.
    pub fn remove(&self, id: ObserverId) -> bool {
        let mut observers = self.inner.observers.lock();
        let before = observers.len();
        observers.retain(|(observer, _)| *observer != id);
        observers.len() != before
    }

    pub fn observer_count(&self) -> usize {
        self.inner.observers.lock().len()
    }

    /// Subscribe to the latest published snapshot.
    pub fn subscribe(&self) -> watch::Receiver<Arc<AlarmSnapshot>> {
        self.inner.latest.subscribe()
    }

    /// The most recently published snapshot.
    pub fn latest(&self) -> Arc<AlarmSnapshot> {
        self.inner.latest.borrow().clone()
    }

    /// Publish a snapshot: swap it into the watch channel, then run callbacks.
    pub(crate) fn publish(&self, snapshot: Arc<AlarmSnapshot>) {
        self.inner.latest.send_replace(snapshot.clone());

        // Callbacks run without the lock held so they may register or remove observers.
        let callbacks: Vec<Callback> = self
            .inner
            .observers
            .lock()
            .iter()
            .map(|(_, callback)| callback.clone())
            .collect();
        for callback in callbacks {
            callback(&snapshot);
        }
    }
}

impl Default for ChangeNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ChangeNotifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeNotifier")
            .field("observers", &self.observer_count())
            .field("receivers", &self.inner.latest.receiver_count())
            .finish()
    }
}
