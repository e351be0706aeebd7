//! Watch session: the public surface of the watcher core
//!
//! All mutable state (suppression gate, per-root subscriptions, the two
//! coalescing queues and the save subscription) lives here and is owned by
//! the host. Subscriptions hold only a weak reference back to the session, so
//! dropping the last `WatchSession` handle tears everything down.

use crate::classify::{self, Bindings, Intake};
use crate::debounce::CoalescingQueue;
use crate::dispatch::{BatchReport, Dispatcher};
use crate::error::WatchError;
use crate::ports::{Collaborators, EventSink, SaveSink};
use crate::registry::{ActiveWatch, WatcherRegistry};
use crate::save::SaveHandlers;
use crate::suppress::SuppressionGate;
use crate::WatchEvent;
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::time::Instant;
use tracing::{debug, info, trace, warn};
use upsync_core::{fill_glob_pattern, ConfigRoot, SyncConfig};

/// Timing knobs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchSettings {
    /// Quiet interval between the first queued event and its flush
    pub flush_interval: Duration,
    /// Delay before `enable_watcher` actually re-opens intake
    pub reenable_delay: Duration,
}

impl Default for WatchSettings {
    fn default() -> Self {
        Self {
            flush_interval: Duration::from_millis(500),
            reenable_delay: Duration::from_millis(2000),
        }
    }
}

/// Result of `watch_files`
#[derive(Debug, Default)]
pub struct WatchSummary {
    /// Roots with an active subscription
    pub watching: Vec<ConfigRoot>,
    /// Roots left unwatched by their config
    pub unwatched: Vec<ConfigRoot>,
    /// Roots whose subscription could not be created
    pub failed: Vec<(ConfigRoot, WatchError)>,
}

struct Inner {
    collab: Collaborators,
    gate: Arc<SuppressionGate>,
    uploads: Mutex<CoalescingQueue>,
    deletes: Mutex<CoalescingQueue>,
    registry: Mutex<WatcherRegistry>,
    save_watch: Mutex<Option<ActiveWatch>>,
    dispatcher: Dispatcher,
    runtime: Handle,
}

/// Shared handle to the watcher core
#[derive(Clone)]
pub struct WatchSession {
    inner: Arc<Inner>,
}

impl WatchSession {
    /// Create a session bound to the current tokio runtime
    pub fn new(collab: Collaborators, settings: WatchSettings) -> Result<Self, WatchError> {
        let runtime = Handle::try_current()?;
        let dispatcher = Dispatcher::new(
            Arc::clone(&collab.resolver),
            Arc::clone(&collab.backend),
            Arc::clone(&collab.reporter),
            runtime.clone(),
        );

        Ok(Self {
            inner: Arc::new(Inner {
                collab,
                gate: Arc::new(SuppressionGate::new(settings.reenable_delay)),
                uploads: Mutex::new(CoalescingQueue::new(settings.flush_interval)),
                deletes: Mutex::new(CoalescingQueue::new(settings.flush_interval)),
                registry: Mutex::new(WatcherRegistry::default()),
                save_watch: Mutex::new(None),
                dispatcher,
                runtime,
            }),
        })
    }

    /// Stop accepting filesystem events immediately
    pub fn disable_watcher(&self) {
        self.inner.gate.disable();
    }

    /// Accept filesystem events again once the cool-down has passed
    pub fn enable_watcher(&self) {
        self.inner.gate.enable(&self.inner.runtime);
    }

    pub fn is_suppressed(&self) -> bool {
        self.inner.gate.is_suppressed()
    }

    /// Install the single save subscription, replacing any previous one
    pub fn watch_workspace(&self, handlers: SaveHandlers) -> Result<(), WatchError> {
        let mut slot = self.inner.save_watch.lock();
        if let Some(previous) = slot.take() {
            previous.dispose();
        }

        let weak = Arc::downgrade(&self.inner);
        let live = Arc::new(AtomicBool::new(true));
        let sink_live = Arc::clone(&live);
        let sink: SaveSink = Arc::new(move |path: PathBuf| {
            if !sink_live.load(Ordering::SeqCst) {
                return;
            }
            if let Some(inner) = weak.upgrade() {
                let suppressed = inner.gate.is_suppressed();
                let route = handlers.handle(inner.collab.filter.as_ref(), suppressed, path);
                trace!(?route, "Save routed");
            }
        });

        let subscription = self.inner.collab.saves.subscribe_saves(sink)?;
        *slot = Some(ActiveWatch::new(subscription, live));
        debug!("Save watcher installed");
        Ok(())
    }

    /// Install (or replace) the watch for one config root
    ///
    /// Returns whether the root is now watched.
    pub fn watch_file(&self, config: &SyncConfig) -> Result<bool, WatchError> {
        let root = config.config_root.clone();
        let mut registry = self.inner.registry.lock();

        // Old subscription goes first, even if the new config disables watching
        registry.remove(&root);

        let plan = match classify::plan(&config.watcher) {
            Some(plan) => plan,
            None => {
                debug!(%root, "Watching disabled by config");
                return Ok(false);
            }
        };

        let pattern = fill_glob_pattern(plan.files, &root).map_err(|source| WatchError::Pattern {
            root: root.clone(),
            source,
        })?;

        let live = Arc::new(AtomicBool::new(true));
        let sink = event_sink(Arc::downgrade(&self.inner), plan.bindings, Arc::clone(&live));
        let subscription = self.inner.collab.events.subscribe(&pattern, sink)?;

        registry.insert(root.clone(), ActiveWatch::new(subscription, live));
        info!(
            %root,
            pattern = %pattern,
            upload = plan.bindings.upload,
            delete = plan.bindings.delete,
            "Watching"
        );
        Ok(true)
    }

    /// Install watches for many roots; roots are independent and one failure does not stop the rest
    pub fn watch_files<'a>(
        &self,
        configs: impl IntoIterator<Item = &'a SyncConfig>,
    ) -> WatchSummary {
        let mut summary = WatchSummary::default();
        for config in configs {
            let root = config.config_root.clone();
            match self.watch_file(config) {
                Ok(true) => summary.watching.push(root),
                Ok(false) => summary.unwatched.push(root),
                Err(error) => {
                    warn!(%root, %error, "Failed to install watcher");
                    summary.failed.push((root, error));
                }
            }
        }
        summary
    }

    /// Drop the watch for one root
    pub fn unwatch(&self, root: &ConfigRoot) -> bool {
        self.inner.registry.lock().remove(root)
    }

    /// Dispose every subscription, including the save watcher
    pub fn clear_all_watchers(&self) {
        let count = self.inner.registry.lock().clear();
        if let Some(save_watch) = self.inner.save_watch.lock().take() {
            save_watch.dispose();
        }
        info!(count, "Cleared all watchers");
    }

    /// Flush the upload queue now
    pub fn flush_uploads(&self) -> BatchReport {
        self.inner.flush(Intake::Upload)
    }

    /// Flush the delete queue now
    pub fn flush_deletes(&self) -> BatchReport {
        self.inner.flush(Intake::Delete)
    }

    pub fn pending_uploads(&self) -> usize {
        self.inner.uploads.lock().len()
    }

    pub fn pending_deletes(&self) -> usize {
        self.inner.deletes.lock().len()
    }

    pub fn watched_roots(&self) -> Vec<ConfigRoot> {
        self.inner.registry.lock().roots()
    }

    pub fn has_save_watch(&self) -> bool {
        self.inner.save_watch.lock().is_some()
    }
}

fn event_sink(inner: Weak<Inner>, bindings: Bindings, live: Arc<AtomicBool>) -> EventSink {
    Arc::new(move |event: WatchEvent| {
        if !live.load(Ordering::SeqCst) {
            return;
        }
        let Some(intake) = bindings.route(event.kind) else {
            return;
        };
        if let Some(inner) = inner.upgrade() {
            inner.intake(intake, event.path);
        }
    })
}

impl Inner {
    fn queue(&self, intake: Intake) -> &Mutex<CoalescingQueue> {
        match intake {
            Intake::Upload => &self.uploads,
            Intake::Delete => &self.deletes,
        }
    }

    fn intake(self: &Arc<Self>, intake: Intake, path: PathBuf) {
        if self.gate.is_suppressed() {
            trace!(%intake, path = %path.display(), "Suppressed");
            return;
        }
        if !self.collab.filter.is_valid_file(&path) {
            trace!(%intake, path = %path.display(), "Filtered");
            return;
        }

        debug!(%intake, path = %path.display(), "Queued");
        let deadline = self.queue(intake).lock().enqueue(path, Instant::now());
        if let Some(deadline) = deadline {
            self.schedule_flush(intake, deadline);
        }
    }

    fn schedule_flush(self: &Arc<Self>, intake: Intake, deadline: Instant) {
        let weak = Arc::downgrade(self);
        self.runtime.spawn(async move {
            tokio::time::sleep_until(deadline).await;
            if let Some(inner) = weak.upgrade() {
                // Report is dropped: calls keep running detached
                inner.flush_due(intake, deadline);
            }
        });
    }

    fn flush_due(&self, intake: Intake, deadline: Instant) {
        let files = self.queue(intake).lock().drain_due(deadline);
        if let Some(files) = files {
            self.dispatch(intake, files);
        }
    }

    fn flush(&self, intake: Intake) -> BatchReport {
        let files = self.queue(intake).lock().drain();
        self.dispatch(intake, files)
    }

    fn dispatch(&self, intake: Intake, files: Vec<PathBuf>) -> BatchReport {
        match intake {
            Intake::Upload => self.dispatcher.dispatch_uploads(files),
            Intake::Delete => self.dispatcher.dispatch_deletes(files),
        }
    }
}
