//! Batch dispatch to the sync backend
//!
//! One backend call per path, fired without waiting for the previous one.
//! Every call gets the same failure handler, which tags the failure with the
//! operation kind, its target and whether it should be surfaced to the user,
//! and hands it to the [`ErrorReporter`].

use crate::ports::{ConfigResolver, ErrorReporter, SyncBackend, Trigger};
use futures::future::BoxFuture;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Backend operation kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    Upload,
    Delete,
}

impl OperationKind {
    /// Upload failures are surfaced; delete failures are usually remote races and stay in the log
    pub fn surfaces_to_user(self) -> bool {
        matches!(self, OperationKind::Upload)
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperationKind::Upload => f.write_str("upload"),
            OperationKind::Delete => f.write_str("delete"),
        }
    }
}

/// A failed backend operation
#[derive(Debug)]
pub struct OperationFailure {
    pub kind: OperationKind,
    /// Local path for uploads, remote path for deletes
    pub target: String,
    pub error: anyhow::Error,
    /// Whether the host should bring its output to the user's attention
    pub surface: bool,
}

/// One in-flight backend call
#[derive(Debug)]
pub struct Dispatched {
    pub path: PathBuf,
    pub target: String,
    handle: JoinHandle<()>,
}

/// Outcome of one flush
#[derive(Debug)]
pub struct BatchReport {
    pub kind: OperationKind,
    pub dispatched: Vec<Dispatched>,
    /// Paths dropped because no config could be resolved
    pub unresolved: Vec<PathBuf>,
}

impl BatchReport {
    fn new(kind: OperationKind) -> Self {
        Self {
            kind,
            dispatched: Vec::new(),
            unresolved: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.dispatched.is_empty() && self.unresolved.is_empty()
    }

    /// Paths that reached the backend, in dispatch order
    pub fn paths(&self) -> Vec<PathBuf> {
        self.dispatched.iter().map(|d| d.path.clone()).collect()
    }

    /// Wait until every dispatched call has finished (failures are already reported)
    pub async fn wait(self) {
        for dispatched in self.dispatched {
            let _ = dispatched.handle.await;
        }
    }
}

/// Turns drained batches into backend calls
pub struct Dispatcher {
    resolver: Arc<dyn ConfigResolver>,
    backend: Arc<dyn SyncBackend>,
    reporter: Arc<dyn ErrorReporter>,
    runtime: Handle,
}

impl Dispatcher {
    pub fn new(
        resolver: Arc<dyn ConfigResolver>,
        backend: Arc<dyn SyncBackend>,
        reporter: Arc<dyn ErrorReporter>,
        runtime: Handle,
    ) -> Self {
        Self {
            resolver,
            backend,
            reporter,
            runtime,
        }
    }

    /// Upload each path with its resolved config
    pub fn dispatch_uploads(&self, files: Vec<PathBuf>) -> BatchReport {
        let mut report = BatchReport::new(OperationKind::Upload);

        for file in files {
            let config = match self.resolver.get_config(&file) {
                Ok(config) => config,
                Err(error) => {
                    self.reporter.config_error(&file, &error);
                    report.unresolved.push(file);
                    continue;
                }
            };

            let backend = Arc::clone(&self.backend);
            let local = file.clone();
            let operation: BoxFuture<'static, anyhow::Result<()>> = Box::pin(async move {
                backend.upload(&local, &config, Trigger::Watcher).await
            });

            let target = file.display().to_string();
            let handle = self.spawn_tracked(OperationKind::Upload, target.clone(), operation);
            report.dispatched.push(Dispatched { path: file, target, handle });
        }

        log_batch(&report);
        report
    }

    /// Remove each path's remote counterpart; directories are never removed recursively
    pub fn dispatch_deletes(&self, files: Vec<PathBuf>) -> BatchReport {
        let mut report = BatchReport::new(OperationKind::Delete);

        for file in files {
            let config = match self.resolver.get_config(&file) {
                Ok(config) => config.with_skip_dir(),
                Err(error) => {
                    self.reporter.config_error(&file, &error);
                    report.unresolved.push(file);
                    continue;
                }
            };

            let backend = Arc::clone(&self.backend);
            let remote = config.remote_path.clone();
            let operation: BoxFuture<'static, anyhow::Result<()>> = Box::pin(async move {
                backend
                    .remove_remote(&config.remote_path, &config, Trigger::Watcher)
                    .await
            });

            let handle = self.spawn_tracked(OperationKind::Delete, remote.clone(), operation);
            report.dispatched.push(Dispatched {
                path: file,
                target: remote,
                handle,
            });
        }

        log_batch(&report);
        report
    }

    fn spawn_tracked(
        &self,
        kind: OperationKind,
        target: String,
        operation: BoxFuture<'static, anyhow::Result<()>>,
    ) -> JoinHandle<()> {
        let reporter = Arc::clone(&self.reporter);
        self.runtime.spawn(async move {
            match operation.await {
                Ok(()) => debug!(%kind, %target, "Operation finished"),
                Err(error) => reporter.operation_failed(&OperationFailure {
                    kind,
                    target,
                    error,
                    surface: kind.surfaces_to_user(),
                }),
            }
        })
    }
}

fn log_batch(report: &BatchReport) {
    if report.is_empty() {
        return;
    }
    info!(
        kind = %report.kind,
        dispatched = report.dispatched.len(),
        unresolved = report.unresolved.len(),
        "Flushed batch"
    );
}
