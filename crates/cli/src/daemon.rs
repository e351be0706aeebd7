//! Foreground watch loop
//!
//! Wires the host collaborators into a `WatchSession`, then serves saves and
//! Ctrl-C until shutdown.

use crate::host::{ConsoleReporter, SharedConfigs, SharedFilter};
use crate::mirror::{DryRunBackend, MirrorBackend};
use anyhow::{Context, Result};
use owo_colors::OwoColorize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use upsync_core::ConfigSet;
use watcher::{
    Collaborators, ConfigResolver, ErrorReporter, NotifySource, OperationFailure, OperationKind,
    SaveHandlers, SyncBackend, Trigger, WatchSession, WatchSettings, WatchSummary,
};

/// Options for `upsync watch`
#[derive(Debug, Clone)]
pub struct WatchOptions {
    pub settings: WatchSettings,
    pub dry_run: bool,
    pub pull: bool,
    pub excludes: Vec<String>,
}

/// Save notifications forwarded from the session's save handlers
#[derive(Debug)]
enum SaveMessage {
    File(PathBuf),
    Config(PathBuf),
}

/// Everything the loop needs besides the session itself
struct Host {
    workspace_root: PathBuf,
    configs: Arc<SharedConfigs>,
    filter: Arc<SharedFilter>,
    backend: Arc<dyn SyncBackend>,
    reporter: Arc<ConsoleReporter>,
}

/// Run until Ctrl-C
pub async fn run(workspace_root: PathBuf, options: WatchOptions) -> Result<()> {
    let set = ConfigSet::load(&workspace_root)
        .with_context(|| format!("Failed to load configs under {}", workspace_root.display()))?;
    if set.is_empty() {
        anyhow::bail!(
            "No upsync.toml found under {} (run 'upsync init' first)",
            workspace_root.display()
        );
    }

    let configs = Arc::new(SharedConfigs::new(set));
    let filter = Arc::new(SharedFilter::new(
        &workspace_root,
        options.excludes.clone(),
        &configs.configs(),
    )?);
    let backend: Arc<dyn SyncBackend> = if options.dry_run {
        Arc::new(DryRunBackend)
    } else {
        Arc::new(MirrorBackend::new())
    };
    let reporter = Arc::new(ConsoleReporter);
    let source = Arc::new(NotifySource::new(&workspace_root));

    let session = WatchSession::new(
        Collaborators {
            filter: filter.clone(),
            resolver: configs.clone(),
            backend: backend.clone(),
            reporter: reporter.clone(),
            events: source.clone(),
            saves: source,
        },
        options.settings,
    )?;

    let host = Host {
        workspace_root,
        configs,
        filter,
        backend,
        reporter,
    };

    let summary = session.watch_files(&host.configs.configs());
    print_summary(&summary);

    let (tx, mut rx) = mpsc::unbounded_channel();
    let file_tx = tx.clone();
    session.watch_workspace(SaveHandlers::new(
        move |path| {
            let _ = file_tx.send(SaveMessage::File(path));
        },
        move |path| {
            let _ = tx.send(SaveMessage::Config(path));
        },
    ))?;

    if options.pull {
        host.pull_all(&session).await;
    }

    println!(
        "{} Watching {} (Ctrl-C to stop)",
        "●".green(),
        host.workspace_root.display().to_string().cyan()
    );

    loop {
        tokio::select! {
            message = rx.recv() => match message {
                Some(SaveMessage::File(path)) => host.upload_saved(path),
                Some(SaveMessage::Config(path)) => host.reload(&session, &path),
                None => break,
            },
            signal = tokio::signal::ctrl_c() => {
                signal.context("Failed to listen for Ctrl-C")?;
                break;
            }
        }
    }

    session.clear_all_watchers();
    println!("{}", "Stopped".dimmed());
    Ok(())
}

impl Host {
    /// Mirror every remote into its context without the copies being uploaded back
    async fn pull_all(&self, session: &WatchSession) {
        session.disable_watcher();

        let mirror = MirrorBackend::new();
        for config in self.configs.configs() {
            let label = config.label();
            let mirror = mirror.clone();
            match tokio::task::spawn_blocking(move || mirror.pull(&config)).await {
                Ok(Ok(copied)) => {
                    println!("{} Pulled {} file(s) for {}", "✓".green(), copied, label)
                }
                Ok(Err(error)) => {
                    warn!(config = %label, error = %format!("{:#}", error), "Pull failed");
                    eprintln!("{} Pull failed for {}: {:#}", "✗".red(), label, error);
                }
                Err(error) => warn!(config = %label, %error, "Pull task failed"),
            }
        }

        session.enable_watcher();
    }

    /// Upload an explicitly saved file when its config asks for it
    fn upload_saved(&self, path: PathBuf) {
        let config = match self.configs.get_config(&path) {
            Ok(config) => config,
            Err(error) => {
                self.reporter.config_error(&path, &error);
                return;
            }
        };
        if !config.upload_on_save {
            debug!(path = %path.display(), "upload_on_save is off");
            return;
        }

        let backend = Arc::clone(&self.backend);
        let reporter = Arc::clone(&self.reporter);
        tokio::spawn(async move {
            if let Err(error) = backend.upload(&path, &config, Trigger::User).await {
                reporter.operation_failed(&OperationFailure {
                    kind: OperationKind::Upload,
                    target: path.display().to_string(),
                    error,
                    surface: OperationKind::Upload.surfaces_to_user(),
                });
            }
        });
    }

    /// Reload every config after one of them was saved
    fn reload(&self, session: &WatchSession, saved: &Path) {
        info!(config = %saved.display(), "Config saved, reloading");

        let set = match ConfigSet::load(&self.workspace_root) {
            Ok(set) => set,
            Err(error) => {
                self.reporter.config_error(saved, &error);
                eprintln!("{} {}", "✗".red(), error);
                return;
            }
        };

        let dropped = self.configs.replace(set);
        let current = self.configs.configs();
        if let Err(error) = self.filter.refresh(&current) {
            warn!(error = %format!("{:#}", error), "Failed to refresh path validator");
        }

        for root in &dropped {
            session.unwatch(root);
        }
        let summary = session.watch_files(&current);
        print_summary(&summary);
        if !dropped.is_empty() {
            println!("  {} {} root(s) no longer configured", "-".dimmed(), dropped.len());
        }
    }
}

fn print_summary(summary: &WatchSummary) {
    for root in &summary.watching {
        println!("  {} {}", "✓".green(), root);
    }
    for root in &summary.unwatched {
        println!("  {} {} {}", "-".dimmed(), root, "(not watched)".dimmed());
    }
    for (root, error) in &summary.failed {
        println!("  {} {} {}", "✗".red(), root, error.to_string().red());
    }
}
