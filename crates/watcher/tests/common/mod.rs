//! In-memory collaborators for driving a `WatchSession`

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::time::Instant;
use upsync_core::{ConfigError, ConfigSet, GlobPattern, ResolvedConfig, SyncConfig, CONFIG_FILENAME};
use watcher::{
    Collaborators, ConfigResolver, ErrorReporter, EventSink, EventSource, IgnoreConfig,
    IgnoreRules, OperationFailure, OperationKind, SaveHandlers, SaveSink, SaveSource,
    Subscription, SyncBackend, Trigger, WatchError, WatchEvent, WatchSession, WatchSettings,
};

/// Config rooted at `root` syncing to `/remote`, watching every file
pub fn config(root: &str, auto_upload: bool, auto_delete: bool) -> SyncConfig {
    let text = format!(
        "remote_path = \"/remote\"\n\n[watcher]\nfiles = true\nauto_upload = {}\nauto_delete = {}\n",
        auto_upload, auto_delete
    );
    SyncConfig::parse(&text, &Path::new(root).join(CONFIG_FILENAME)).unwrap()
}

/// Save handlers that record what they were called with
pub fn recording_handlers() -> (SaveHandlers, Arc<Mutex<Vec<PathBuf>>>, Arc<Mutex<Vec<PathBuf>>>) {
    let files = Arc::new(Mutex::new(Vec::new()));
    let configs = Arc::new(Mutex::new(Vec::new()));
    let file_log = Arc::clone(&files);
    let config_log = Arc::clone(&configs);
    let handlers = SaveHandlers::new(
        move |path| file_log.lock().push(path),
        move |path| config_log.lock().push(path),
    );
    (handlers, files, configs)
}

/// Flips to dead when the subscription holding it is dropped
struct Guard(Arc<AtomicBool>);

impl Drop for Guard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Event source that remembers every sink it ever handed out
///
/// `emit` delivers to disposed subscriptions as well, the way a real
/// notifier can still fire after being asked to stop.
#[derive(Default)]
pub struct FakeEvents {
    subscriptions: Mutex<Vec<(PathBuf, EventSink, Arc<AtomicBool>)>>,
}

impl FakeEvents {
    pub fn emit(&self, event: WatchEvent) {
        let sinks: Vec<EventSink> = self
            .subscriptions
            .lock()
            .iter()
            .filter(|(base, _, _)| event.path.starts_with(base))
            .map(|(_, sink, _)| Arc::clone(sink))
            .collect();
        for sink in sinks {
            sink(event.clone());
        }
    }

    /// Subscriptions on `base` that have not been disposed
    pub fn active_for(&self, base: &str) -> usize {
        self.subscriptions
            .lock()
            .iter()
            .filter(|(b, _, alive)| b == Path::new(base) && alive.load(Ordering::SeqCst))
            .count()
    }
}

impl EventSource for FakeEvents {
    fn subscribe(
        &self,
        pattern: &GlobPattern,
        sink: EventSink,
    ) -> Result<Subscription, WatchError> {
        let alive = Arc::new(AtomicBool::new(true));
        self.subscriptions
            .lock()
            .push((pattern.base().to_path_buf(), sink, Arc::clone(&alive)));
        Ok(Subscription::new(Guard(alive)))
    }
}

#[derive(Default)]
pub struct FakeSaves {
    subscriptions: Mutex<Vec<(SaveSink, Arc<AtomicBool>)>>,
}

impl FakeSaves {
    pub fn emit(&self, path: &str) {
        let sinks: Vec<SaveSink> = self
            .subscriptions
            .lock()
            .iter()
            .map(|(sink, _)| Arc::clone(sink))
            .collect();
        for sink in sinks {
            sink(PathBuf::from(path));
        }
    }

    pub fn active(&self) -> usize {
        self.subscriptions
            .lock()
            .iter()
            .filter(|(_, alive)| alive.load(Ordering::SeqCst))
            .count()
    }
}

impl SaveSource for FakeSaves {
    fn subscribe_saves(&self, sink: SaveSink) -> Result<Subscription, WatchError> {
        let alive = Arc::new(AtomicBool::new(true));
        self.subscriptions.lock().push((sink, Arc::clone(&alive)));
        Ok(Subscription::new(Guard(alive)))
    }
}

/// One recorded backend call
#[derive(Debug, Clone)]
pub enum Call {
    Upload {
        path: PathBuf,
        watcher: bool,
        at: Instant,
    },
    Remove {
        remote: String,
        skip_dir: bool,
        watcher: bool,
        at: Instant,
    },
}

impl Call {
    pub fn path(&self) -> &Path {
        match self {
            Call::Upload { path, .. } => path,
            Call::Remove { remote, .. } => Path::new(remote),
        }
    }

    pub fn at(&self) -> Instant {
        match self {
            Call::Upload { at, .. } | Call::Remove { at, .. } => *at,
        }
    }
}

#[derive(Default)]
pub struct FakeBackend {
    calls: Mutex<Vec<Call>>,
    failing: Mutex<HashSet<String>>,
}

impl FakeBackend {
    /// Fail uploads of this local path, or removals of this remote path
    pub fn fail_for(&self, target: &str) {
        self.failing.lock().insert(target.to_string());
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    fn outcome(&self, target: &str) -> anyhow::Result<()> {
        if self.failing.lock().contains(target) {
            anyhow::bail!("remote refused {}", target);
        }
        Ok(())
    }
}

#[async_trait]
impl SyncBackend for FakeBackend {
    async fn upload(
        &self,
        local_path: &Path,
        _config: &ResolvedConfig,
        trigger: Trigger,
    ) -> anyhow::Result<()> {
        self.calls.lock().push(Call::Upload {
            path: local_path.to_path_buf(),
            watcher: trigger.is_watcher(),
            at: Instant::now(),
        });
        self.outcome(&local_path.display().to_string())
    }

    async fn remove_remote(
        &self,
        remote_path: &str,
        config: &ResolvedConfig,
        trigger: Trigger,
    ) -> anyhow::Result<()> {
        self.calls.lock().push(Call::Remove {
            remote: remote_path.to_string(),
            skip_dir: config.skip_dir,
            watcher: trigger.is_watcher(),
            at: Instant::now(),
        });
        self.outcome(remote_path)
    }
}

/// Resolves through a real `ConfigSet`, with per-path failures on demand
pub struct FakeResolver {
    set: ConfigSet,
    failing: Mutex<HashSet<PathBuf>>,
}

impl FakeResolver {
    pub fn fail_for(&self, path: &str) {
        self.failing.lock().insert(PathBuf::from(path));
    }
}

impl ConfigResolver for FakeResolver {
    fn get_config(&self, path: &Path) -> Result<ResolvedConfig, ConfigError> {
        if self.failing.lock().contains(path) {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        self.set.resolve(path)
    }
}

#[derive(Default)]
pub struct FakeReporter {
    config_errors: Mutex<Vec<PathBuf>>,
    failures: Mutex<Vec<(OperationKind, String, bool)>>,
}

impl FakeReporter {
    pub fn config_errors(&self) -> Vec<PathBuf> {
        self.config_errors.lock().clone()
    }

    pub fn failures(&self) -> Vec<(OperationKind, String, bool)> {
        self.failures.lock().clone()
    }
}

impl ErrorReporter for FakeReporter {
    fn config_error(&self, path: &Path, _error: &ConfigError) {
        self.config_errors.lock().push(path.to_path_buf());
    }

    fn operation_failed(&self, failure: &OperationFailure) {
        self.failures
            .lock()
            .push((failure.kind, failure.target.clone(), failure.surface));
    }
}

pub struct Harness {
    pub session: WatchSession,
    pub events: Arc<FakeEvents>,
    pub saves: Arc<FakeSaves>,
    pub backend: Arc<FakeBackend>,
    pub resolver: Arc<FakeResolver>,
    pub reporter: Arc<FakeReporter>,
}

impl Harness {
    /// Session over a single `/ws` config; must run inside a tokio runtime
    pub fn new() -> Self {
        let events = Arc::new(FakeEvents::default());
        let saves = Arc::new(FakeSaves::default());
        let backend = Arc::new(FakeBackend::default());
        let reporter = Arc::new(FakeReporter::default());
        let resolver = Arc::new(FakeResolver {
            set: ConfigSet::new([config("/ws", true, true)]).unwrap(),
            failing: Mutex::new(HashSet::new()),
        });
        let filter = IgnoreRules::new(Path::new("/ws"), IgnoreConfig::default()).unwrap();

        let collab = Collaborators {
            filter: Arc::new(filter),
            resolver: resolver.clone(),
            backend: backend.clone(),
            reporter: reporter.clone(),
            events: events.clone(),
            saves: saves.clone(),
        };
        let session = WatchSession::new(collab, WatchSettings::default()).unwrap();

        Self {
            session,
            events,
            saves,
            backend,
            resolver,
            reporter,
        }
    }
}
