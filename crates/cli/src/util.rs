//! Shared utilities for CLI commands

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};
use upsync_core::{CONFIG_FILENAME, DEPRECATED_CONFIG_FILENAME};

/// Find the workspace root by walking up from `start` to the nearest
/// directory holding a config file; falls back to `start` itself
pub fn find_workspace_root(start: &Path) -> PathBuf {
    start
        .ancestors()
        .find(|dir| {
            dir.join(CONFIG_FILENAME).is_file() || dir.join(DEPRECATED_CONFIG_FILENAME).is_file()
        })
        .unwrap_or(start)
        .to_path_buf()
}

/// Workspace root for the current directory
pub fn current_workspace_root() -> Result<PathBuf> {
    let current = std::env::current_dir().context("Failed to get current directory")?;
    Ok(find_workspace_root(&current))
}

/// Make a command-line path absolute against the current directory
pub fn absolute_path(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    let current = std::env::current_dir().context("Failed to get current directory")?;
    Ok(current.join(path))
}

/// Default filter directive for a `-v` count
fn default_level(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

/// Install the global subscriber: stderr always, plus a log file if asked
///
/// `RUST_LOG` overrides the `-v` level. The returned guard must be kept
/// alive for the file writer to flush.
pub fn init_logging(verbose: u8, log_file: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level(verbose)));

    let (file_layer, guard) = match log_file {
        Some(path) => {
            let dir = path
                .parent()
                .filter(|parent| !parent.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let file_name = path
                .file_name()
                .with_context(|| format!("Log file path has no file name: {}", path.display()))?;
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create log directory {}", dir.display()))?;

            let appender = tracing_appender::rolling::never(dir, file_name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_ansi(false).with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .try_init()
        .context("Failed to install log subscriber")?;

    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_find_workspace_root_walks_up() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        let nested = root.join("a/b/c");
        fs::create_dir_all(&nested).unwrap();
        fs::write(root.join("a").join(CONFIG_FILENAME), "remote_path = \"/r\"").unwrap();

        assert_eq!(find_workspace_root(&nested), root.join("a"));
    }

    #[test]
    fn test_find_workspace_root_accepts_legacy_name() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::create_dir_all(root.join("sub")).unwrap();
        fs::write(root.join(DEPRECATED_CONFIG_FILENAME), "remote_path = \"/r\"").unwrap();

        assert_eq!(find_workspace_root(&root.join("sub")), root);
    }

    #[test]
    fn test_find_workspace_root_falls_back_to_start() {
        let temp_dir = TempDir::new().unwrap();
        let start = temp_dir.path().join("empty");
        fs::create_dir_all(&start).unwrap();

        // No config anywhere under the temp dir; an ancestor outside it could
        // still hold one, so only check we get an ancestor-or-self
        let found = find_workspace_root(&start);
        assert!(start.starts_with(&found));
    }

    #[test]
    fn test_default_level() {
        assert_eq!(default_level(0), "warn");
        assert_eq!(default_level(1), "info");
        assert_eq!(default_level(2), "debug");
        assert_eq!(default_level(9), "trace");
    }
}
