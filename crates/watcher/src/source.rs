//! `notify`-backed event and save sources

use crate::error::WatchError;
use crate::ports::{EventSink, EventSource, SaveSink, SaveSource};
use crate::registry::Subscription;
use crate::{EventKind, WatchEvent};
use notify::event::{CreateKind, ModifyKind, RenameMode};
use notify::{Config as NotifyConfig, Event, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use tracing::warn;
use upsync_core::GlobPattern;

/// Real filesystem source
///
/// Each glob subscription gets its own recursive watcher on the glob's base
/// directory; the save subscription watches the whole workspace.
#[derive(Debug, Clone)]
pub struct NotifySource {
    workspace_root: PathBuf,
}

impl NotifySource {
    pub fn new(workspace_root: impl Into<PathBuf>) -> Self {
        Self {
            workspace_root: workspace_root.into(),
        }
    }
}

impl EventSource for NotifySource {
    fn subscribe(
        &self,
        pattern: &GlobPattern,
        sink: EventSink,
    ) -> Result<Subscription, WatchError> {
        let glob = pattern.clone();
        let watcher = start_watcher(pattern.base(), move |result: notify::Result<Event>| {
            match result {
                Ok(event) => {
                    for watch_event in translate(&event) {
                        if glob.matches(&watch_event.path) {
                            sink(watch_event);
                        }
                    }
                }
                Err(error) => warn!(%error, "File watcher error"),
            }
        })?;
        Ok(Subscription::new(watcher))
    }
}

impl SaveSource for NotifySource {
    fn subscribe_saves(&self, sink: SaveSink) -> Result<Subscription, WatchError> {
        let watcher = start_watcher(&self.workspace_root, move |result: notify::Result<Event>| {
            match result {
                Ok(event) => {
                    for path in saved_paths(&event) {
                        sink(path);
                    }
                }
                Err(error) => warn!(%error, "Save watcher error"),
            }
        })?;
        Ok(Subscription::new(watcher))
    }
}

fn start_watcher<F>(path: &Path, handler: F) -> Result<RecommendedWatcher, WatchError>
where
    F: FnMut(notify::Result<Event>) + Send + 'static,
{
    let subscribe_error = |source| WatchError::Subscribe {
        path: path.to_path_buf(),
        source,
    };

    let mut watcher =
        RecommendedWatcher::new(handler, NotifyConfig::default()).map_err(subscribe_error)?;
    watcher
        .watch(path, RecursiveMode::Recursive)
        .map_err(subscribe_error)?;
    Ok(watcher)
}

/// Map a raw notification onto create/change/delete events
///
/// Renames become a delete of the old name and a create of the new one.
/// Directory creations and metadata-only changes produce nothing.
pub fn translate(event: &Event) -> Vec<WatchEvent> {
    let files = |kind: EventKind| -> Vec<WatchEvent> {
        event
            .paths
            .iter()
            .filter(|path| !path.is_dir())
            .map(|path| WatchEvent::new(path.clone(), kind))
            .collect()
    };
    let all = |kind: EventKind| -> Vec<WatchEvent> {
        event
            .paths
            .iter()
            .map(|path| WatchEvent::new(path.clone(), kind))
            .collect()
    };

    match event.kind {
        notify::EventKind::Create(CreateKind::Folder) => Vec::new(),
        notify::EventKind::Create(_) => files(EventKind::Create),
        notify::EventKind::Modify(ModifyKind::Metadata(_)) => Vec::new(),
        notify::EventKind::Modify(ModifyKind::Name(RenameMode::From)) => all(EventKind::Delete),
        notify::EventKind::Modify(ModifyKind::Name(RenameMode::To)) => files(EventKind::Create),
        notify::EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
            let mut events = Vec::with_capacity(2);
            if let Some(from) = event.paths.first() {
                events.push(WatchEvent::new(from.clone(), EventKind::Delete));
            }
            if let Some(to) = event.paths.get(1).filter(|to| !to.is_dir()) {
                events.push(WatchEvent::new(to.clone(), EventKind::Create));
            }
            events
        }
        // Platform could not tell which side of the rename this is
        notify::EventKind::Modify(ModifyKind::Name(_)) => event
            .paths
            .iter()
            .filter(|path| !path.is_dir())
            .map(|path| {
                let kind = if path.exists() {
                    EventKind::Create
                } else {
                    EventKind::Delete
                };
                WatchEvent::new(path.clone(), kind)
            })
            .collect(),
        notify::EventKind::Modify(_) => files(EventKind::Change),
        notify::EventKind::Remove(_) => all(EventKind::Delete),
        _ => Vec::new(),
    }
}

/// Paths a raw notification reports as saved
pub fn saved_paths(event: &Event) -> Vec<PathBuf> {
    let paths: Vec<&PathBuf> = match event.kind {
        notify::EventKind::Modify(ModifyKind::Name(RenameMode::To)) => event.paths.iter().collect(),
        // Atomic save: temp file renamed over the target
        notify::EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
            event.paths.get(1).into_iter().collect()
        }
        _ if is_write_finished(&event.kind) => event.paths.iter().collect(),
        _ => Vec::new(),
    };

    paths
        .into_iter()
        .filter(|path| !path.is_dir())
        .cloned()
        .collect()
}

#[cfg(target_os = "linux")]
fn is_write_finished(kind: &notify::EventKind) -> bool {
    use notify::event::{AccessKind, AccessMode};
    matches!(kind, notify::EventKind::Access(AccessKind::Close(AccessMode::Write)))
}

#[cfg(not(target_os = "linux"))]
fn is_write_finished(kind: &notify::EventKind) -> bool {
    matches!(
        kind,
        notify::EventKind::Modify(ModifyKind::Data(_)) | notify::EventKind::Modify(ModifyKind::Any)
    )
}
