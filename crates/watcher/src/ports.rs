//! Collaborator traits the watch session is wired to
//!
//! The session owns no I/O of its own: events come from an [`EventSource`],
//! saves from a [`SaveSource`], transfers go to a [`SyncBackend`] and every
//! failure ends up at one [`ErrorReporter`].

use crate::dispatch::OperationFailure;
use crate::error::WatchError;
use crate::registry::Subscription;
use crate::WatchEvent;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use upsync_core::{ConfigError, GlobPattern, ResolvedConfig};

/// Receives events for one subscription
pub type EventSink = Arc<dyn Fn(WatchEvent) + Send + Sync>;

/// Receives saved document paths
pub type SaveSink = Arc<dyn Fn(PathBuf) + Send + Sync>;

/// Who initiated a backend operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// Explicit user action (save, command)
    User,
    /// Passive observation by a file watcher
    Watcher,
}

impl Trigger {
    pub fn is_watcher(self) -> bool {
        matches!(self, Trigger::Watcher)
    }
}

/// Decides whether a path is eligible for syncing at all
pub trait PathFilter: Send + Sync {
    fn is_valid_file(&self, path: &Path) -> bool;
}

/// Resolves a local path to the config covering it
pub trait ConfigResolver: Send + Sync {
    fn get_config(&self, path: &Path) -> Result<ResolvedConfig, ConfigError>;
}

/// Remote transfer engine
#[async_trait]
pub trait SyncBackend: Send + Sync {
    async fn upload(
        &self,
        local_path: &Path,
        config: &ResolvedConfig,
        trigger: Trigger,
    ) -> anyhow::Result<()>;

    async fn remove_remote(
        &self,
        remote_path: &str,
        config: &ResolvedConfig,
        trigger: Trigger,
    ) -> anyhow::Result<()>;
}

/// Single sink for every path-scoped failure
pub trait ErrorReporter: Send + Sync {
    /// A queued path had no usable config
    fn config_error(&self, path: &Path, error: &ConfigError);

    /// A dispatched backend operation failed
    fn operation_failed(&self, failure: &OperationFailure);
}

/// Delivers create/change/delete events for files matching a glob
pub trait EventSource: Send + Sync {
    fn subscribe(&self, pattern: &GlobPattern, sink: EventSink) -> Result<Subscription, WatchError>;
}

/// Delivers explicit "document saved" notifications
pub trait SaveSource: Send + Sync {
    fn subscribe_saves(&self, sink: SaveSink) -> Result<Subscription, WatchError>;
}

/// Everything a [`WatchSession`](crate::WatchSession) talks to
#[derive(Clone)]
pub struct Collaborators {
    pub filter: Arc<dyn PathFilter>,
    pub resolver: Arc<dyn ConfigResolver>,
    pub backend: Arc<dyn SyncBackend>,
    pub reporter: Arc<dyn ErrorReporter>,
    pub events: Arc<dyn EventSource>,
    pub saves: Arc<dyn SaveSource>,
}
