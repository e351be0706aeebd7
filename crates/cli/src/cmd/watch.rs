//! Run the watcher in the foreground

use crate::daemon::{self, WatchOptions};
use crate::util;
use anyhow::Result;
use std::time::Duration;
use watcher::WatchSettings;

pub async fn run(
    flush_ms: u64,
    cooldown_ms: u64,
    dry_run: bool,
    pull: bool,
    excludes: Vec<String>,
) -> Result<()> {
    let workspace_root = util::current_workspace_root()?;

    let options = WatchOptions {
        settings: WatchSettings {
            flush_interval: Duration::from_millis(flush_ms),
            reenable_delay: Duration::from_millis(cooldown_ms),
        },
        dry_run,
        pull,
        excludes,
    };

    daemon::run(workspace_root, options).await
}
