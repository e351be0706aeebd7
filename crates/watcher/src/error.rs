//! Watcher errors

use std::path::PathBuf;
use thiserror::Error;
use upsync_core::{ConfigError, ConfigRoot};

#[derive(Debug, Error)]
pub enum WatchError {
    /// Session created outside a tokio runtime
    #[error("watch session requires a tokio runtime")]
    NoRuntime(#[from] tokio::runtime::TryCurrentError),

    /// The root's watch glob could not be built
    #[error("invalid watch pattern for {root}: {source}")]
    Pattern {
        root: ConfigRoot,
        #[source]
        source: ConfigError,
    },

    /// The event source refused the subscription
    #[error("failed to watch {}: {source}", .path.display())]
    Subscribe {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },
}
