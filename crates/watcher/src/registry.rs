//! Per-root watch subscriptions

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::debug;
use upsync_core::ConfigRoot;

/// Handle to an event-source subscription
///
/// Dropping it (or calling [`Subscription::dispose`]) releases the underlying
/// watch resources.
pub struct Subscription {
    guard: Option<Box<dyn Send>>,
}

impl Subscription {
    /// Wrap whatever keeps the source alive (a `notify` watcher, a test guard)
    pub fn new(guard: impl Send + 'static) -> Self {
        Self {
            guard: Some(Box::new(guard)),
        }
    }

    pub fn dispose(mut self) {
        self.guard.take();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.guard.is_some())
            .finish()
    }
}

/// Subscription plus the liveness flag its sink checks
///
/// Sources may still deliver a few queued events after disposal; the flag
/// makes sure those never reach the queues.
pub(crate) struct ActiveWatch {
    subscription: Subscription,
    live: Arc<AtomicBool>,
}

impl ActiveWatch {
    pub(crate) fn new(subscription: Subscription, live: Arc<AtomicBool>) -> Self {
        Self { subscription, live }
    }

    pub(crate) fn dispose(self) {
        self.live.store(false, Ordering::SeqCst);
        self.subscription.dispose();
    }
}

/// Map from config root to its single active subscription
#[derive(Default)]
pub(crate) struct WatcherRegistry {
    watches: HashMap<ConfigRoot, ActiveWatch>,
}

impl WatcherRegistry {
    /// Dispose the root's subscription, if any
    pub(crate) fn remove(&mut self, root: &ConfigRoot) -> bool {
        match self.watches.remove(root) {
            Some(watch) => {
                watch.dispose();
                debug!(%root, "Disposed watcher");
                true
            }
            None => false,
        }
    }

    /// Install a subscription; an existing one for the same root is disposed first
    pub(crate) fn insert(&mut self, root: ConfigRoot, watch: ActiveWatch) {
        self.remove(&root);
        self.watches.insert(root, watch);
    }

    /// Dispose everything; returns how many subscriptions were active
    pub(crate) fn clear(&mut self) -> usize {
        let count = self.watches.len();
        for (_, watch) in self.watches.drain() {
            watch.dispose();
        }
        count
    }

    pub(crate) fn roots(&self) -> Vec<ConfigRoot> {
        let mut roots: Vec<_> = self.watches.keys().cloned().collect();
        roots.sort();
        roots
    }
}
