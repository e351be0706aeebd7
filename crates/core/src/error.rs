//! Configuration errors

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading configs or resolving a path to its config
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No config context covers the path
    #[error("Config not found for {}", .0.display())]
    NotFound(PathBuf),

    /// The path matches the covering config's ignore patterns
    #[error("{} is ignored by {}", .path.display(), .config.display())]
    Ignored { path: PathBuf, config: PathBuf },

    #[error("Failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid config {}: {reason}", .path.display())]
    Invalid { path: PathBuf, reason: String },

    /// A watch glob or ignore pattern failed to compile
    #[error("Invalid pattern '{pattern}': {source}")]
    Glob {
        pattern: String,
        #[source]
        source: ignore::Error,
    },

    #[error("Failed to scan {}: {source}", .path.display())]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },
}
