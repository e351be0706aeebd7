//! Local-directory remote
//!
//! The "remote" is a directory reachable on the local filesystem, e.g. a
//! mounted share. A relative `remote_path` is taken relative to the config
//! root.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use upsync_core::{ResolvedConfig, SyncConfig};
use walkdir::WalkDir;
use watcher::{SyncBackend, Trigger};

/// Copies files into the mirror directory and removes them from it
#[derive(Debug, Clone, Default)]
pub struct MirrorBackend;

impl MirrorBackend {
    pub fn new() -> Self {
        Self
    }

    /// Filesystem location of a remote path
    pub fn locate(remote: &str, config_root: &Path) -> PathBuf {
        let remote = Path::new(remote);
        if remote.is_absolute() {
            remote.to_path_buf()
        } else {
            config_root.join(remote)
        }
    }

    /// Copy a config's whole remote into its local context
    ///
    /// Blocking; returns the number of files copied.
    pub fn pull(&self, config: &SyncConfig) -> Result<usize> {
        let source = Self::locate(&config.remote_path, config.config_root.path());
        if !source.is_dir() {
            anyhow::bail!("Remote {} is not a directory", source.display());
        }

        let mut copied = 0;
        for entry in WalkDir::new(&source).follow_links(false) {
            let entry = entry.with_context(|| format!("Failed to scan {}", source.display()))?;
            if !entry.file_type().is_file() {
                continue;
            }

            let relative = entry
                .path()
                .strip_prefix(&source)
                .context("Remote entry outside the remote root")?;
            let destination = config.context.join(relative);
            if let Some(parent) = destination.parent() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
            std::fs::copy(entry.path(), &destination).with_context(|| {
                format!("Failed to copy {} to {}", entry.path().display(), destination.display())
            })?;
            copied += 1;
        }

        info!(
            remote = %source.display(),
            local = %config.context.display(),
            copied,
            "Pulled remote"
        );
        Ok(copied)
    }
}

/// Watcher-driven traffic stays at debug; explicit user actions are logged at info
fn log_operation(trigger: Trigger, action: &str, target: &Path) {
    if trigger.is_watcher() {
        debug!(action, target = %target.display(), "Remote updated");
    } else {
        info!(action, target = %target.display(), "Remote updated");
    }
}

#[async_trait]
impl SyncBackend for MirrorBackend {
    async fn upload(
        &self,
        local_path: &Path,
        config: &ResolvedConfig,
        trigger: Trigger,
    ) -> Result<()> {
        let target = Self::locate(&config.remote_path, config.config_root.path());
        let metadata = tokio::fs::metadata(local_path)
            .await
            .with_context(|| format!("Failed to read {}", local_path.display()))?;

        if metadata.is_dir() {
            tokio::fs::create_dir_all(&target)
                .await
                .with_context(|| format!("Failed to create {}", target.display()))?;
            log_operation(trigger, "mkdir", &target);
            return Ok(());
        }

        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        tokio::fs::copy(local_path, &target)
            .await
            .with_context(|| {
                format!("Failed to copy {} to {}", local_path.display(), target.display())
            })?;
        log_operation(trigger, "upload", &target);
        Ok(())
    }

    async fn remove_remote(
        &self,
        remote_path: &str,
        config: &ResolvedConfig,
        trigger: Trigger,
    ) -> Result<()> {
        let target = Self::locate(remote_path, config.config_root.path());
        let metadata = tokio::fs::symlink_metadata(&target)
            .await
            .with_context(|| format!("Remote path not found: {}", target.display()))?;

        if metadata.is_dir() {
            if config.skip_dir {
                debug!(target = %target.display(), "Skipped remote directory");
                return Ok(());
            }
            tokio::fs::remove_dir_all(&target)
                .await
                .with_context(|| format!("Failed to remove {}", target.display()))?;
        } else {
            tokio::fs::remove_file(&target)
                .await
                .with_context(|| format!("Failed to remove {}", target.display()))?;
        }
        log_operation(trigger, "remove", &target);
        Ok(())
    }
}

/// Logs what would happen and touches nothing
#[derive(Debug, Clone, Default)]
pub struct DryRunBackend;

#[async_trait]
impl SyncBackend for DryRunBackend {
    async fn upload(
        &self,
        local_path: &Path,
        config: &ResolvedConfig,
        trigger: Trigger,
    ) -> Result<()> {
        info!(?trigger, from = %local_path.display(), to = %config.remote_path, "Would upload");
        Ok(())
    }

    async fn remove_remote(
        &self,
        remote_path: &str,
        config: &ResolvedConfig,
        trigger: Trigger,
    ) -> Result<()> {
        info!(?trigger, target = %remote_path, skip_dir = config.skip_dir, "Would remove");
        Ok(())
    }
}
