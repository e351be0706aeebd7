//! Document-save routing

use crate::ports::PathFilter;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use upsync_core::is_config_file;

type SaveCallback = Arc<dyn Fn(PathBuf) + Send + Sync>;

/// Host callbacks for saved documents
#[derive(Clone)]
pub struct SaveHandlers {
    pub on_saved_file: SaveCallback,
    pub on_saved_config: SaveCallback,
}

impl SaveHandlers {
    pub fn new(
        on_saved_file: impl Fn(PathBuf) + Send + Sync + 'static,
        on_saved_config: impl Fn(PathBuf) + Send + Sync + 'static,
    ) -> Self {
        Self {
            on_saved_file: Arc::new(on_saved_file),
            on_saved_config: Arc::new(on_saved_config),
        }
    }

    /// Route a save and invoke the matching callback
    ///
    /// While `suppressed`, file saves are the watcher's own writes and are dropped.
    /// Config saves still reach the host.
    pub fn handle(&self, filter: &dyn PathFilter, suppressed: bool, path: PathBuf) -> SaveRoute {
        let route = match route_save(filter, &path) {
            SaveRoute::File if suppressed => SaveRoute::Suppressed,
            route => route,
        };
        match route {
            SaveRoute::Ignored | SaveRoute::Suppressed => {}
            SaveRoute::Config => (self.on_saved_config)(path),
            SaveRoute::File => (self.on_saved_file)(path),
        }
        route
    }
}

/// Where a save goes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveRoute {
    /// Rejected by the path filter
    Ignored,
    /// The sync config itself; reload instead of upload
    Config,
    /// Regular project file
    File,
    /// Regular file saved while the watcher was disabled
    Suppressed,
}

pub fn route_save(filter: &dyn PathFilter, path: &Path) -> SaveRoute {
    if !filter.is_valid_file(path) {
        SaveRoute::Ignored
    } else if is_config_file(path) {
        SaveRoute::Config
    } else {
        SaveRoute::File
    }
}
