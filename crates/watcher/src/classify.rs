//! Event classification
//!
//! Decides, per watch config, whether a root is watched at all and which
//! queue each raw event kind feeds.

use crate::EventKind;
use upsync_core::{FilesPattern, WatcherConfig};

/// Queue an accepted event is routed to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Intake {
    Upload,
    Delete,
}

impl std::fmt::Display for Intake {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Intake::Upload => f.write_str("upload"),
            Intake::Delete => f.write_str("delete"),
        }
    }
}

/// Event classes a subscription is bound to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bindings {
    /// Create and change feed the upload queue
    pub upload: bool,
    /// Delete feeds the delete queue
    pub delete: bool,
}

impl Bindings {
    pub fn route(&self, kind: EventKind) -> Option<Intake> {
        match kind {
            EventKind::Create | EventKind::Change if self.upload => Some(Intake::Upload),
            EventKind::Delete if self.delete => Some(Intake::Delete),
            _ => None,
        }
    }
}

/// What to subscribe to for one root
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchPlan<'a> {
    pub files: &'a str,
    pub bindings: Bindings,
}

/// Returns `None` when the root must stay unwatched
pub fn plan(watcher: &WatcherConfig) -> Option<WatchPlan<'_>> {
    let files = match &watcher.files {
        FilesPattern::Disabled => return None,
        FilesPattern::Glob(files) => files.as_str(),
    };
    if !watcher.should_listen() {
        return None;
    }

    Some(WatchPlan {
        files,
        bindings: Bindings {
            upload: watcher.auto_upload,
            delete: watcher.auto_delete,
        },
    })
}
