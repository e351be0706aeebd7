//! File watching and batched dispatch for upsync
//!
//! This crate turns filesystem notifications into remote sync operations:
//! - Per-root watch subscriptions, replaced on reconfigure
//! - Suppression window for the sync engine's own writes
//! - Coalescing upload/delete queues with a debounced flush
//! - Batched dispatch with per-path failure isolation
//! - Save watcher that tells config saves apart from regular saves

pub mod classify;
pub mod debounce;
pub mod dispatch;
pub mod error;
pub mod filter;
pub mod ports;
pub mod registry;
pub mod save;
pub mod session;
pub mod source;
pub mod suppress;

pub use classify::{Bindings, Intake};
pub use dispatch::{BatchReport, OperationFailure, OperationKind};
pub use error::WatchError;
pub use filter::{IgnoreConfig, IgnoreRules};
pub use ports::{
    Collaborators, ConfigResolver, ErrorReporter, EventSink, EventSource, PathFilter, SaveSink,
    SaveSource, SyncBackend, Trigger,
};
pub use registry::Subscription;
pub use save::{SaveHandlers, SaveRoute};
pub use session::{WatchSession, WatchSettings, WatchSummary};
pub use source::NotifySource;
pub use suppress::SuppressionGate;

use std::path::PathBuf;

/// File system event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchEvent {
    /// Path that changed
    pub path: PathBuf,
    /// Type of change
    pub kind: EventKind,
}

impl WatchEvent {
    pub fn new(path: impl Into<PathBuf>, kind: EventKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }
}

/// Type of file system event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// File created
    Create,
    /// File contents changed
    Change,
    /// File deleted
    Delete,
}
