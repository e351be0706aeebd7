//! Host-side collaborators shared between the session and the save loop

use anyhow::Result;
use owo_colors::OwoColorize;
use parking_lot::RwLock;
use std::path::Path;
use tracing::{debug, error, warn};
use upsync_core::{ConfigError, ConfigRoot, ConfigSet, ResolvedConfig, SyncConfig};
use watcher::{
    ConfigResolver, ErrorReporter, IgnoreConfig, IgnoreRules, OperationFailure, PathFilter,
};

/// Current config set; swapped wholesale on reload
pub struct SharedConfigs {
    set: RwLock<ConfigSet>,
}

impl SharedConfigs {
    pub fn new(set: ConfigSet) -> Self {
        Self {
            set: RwLock::new(set),
        }
    }

    /// Install a freshly loaded set, returning the roots it no longer has
    pub fn replace(&self, set: ConfigSet) -> Vec<ConfigRoot> {
        let current = set.roots();
        let previous = std::mem::replace(&mut *self.set.write(), set);
        previous
            .roots()
            .into_iter()
            .filter(|root| !current.contains(root))
            .collect()
    }

    /// Owned copy of every config, for passing to the session without holding the lock
    pub fn configs(&self) -> Vec<SyncConfig> {
        self.set.read().configs().cloned().collect()
    }
}

impl ConfigResolver for SharedConfigs {
    fn get_config(&self, path: &Path) -> Result<ResolvedConfig, ConfigError> {
        self.set.read().resolve(path)
    }
}

/// Path validator that can be recompiled in place
pub struct SharedFilter {
    rules: RwLock<IgnoreRules>,
    excludes: Vec<String>,
}

impl SharedFilter {
    pub fn new(
        workspace_root: &Path,
        excludes: Vec<String>,
        configs: &[SyncConfig],
    ) -> Result<Self> {
        let config = IgnoreConfig {
            additional_patterns: validator_patterns(workspace_root, &excludes, configs),
        };
        Ok(Self {
            rules: RwLock::new(IgnoreRules::new(workspace_root, config)?),
            excludes,
        })
    }

    /// Recompile against a reloaded config set
    pub fn refresh(&self, configs: &[SyncConfig]) -> Result<()> {
        let mut rules = self.rules.write();
        let patterns = validator_patterns(rules.root(), &self.excludes, configs);
        debug!(patterns = patterns.len(), "Refreshing path validator");
        rules.update_config(IgnoreConfig {
            additional_patterns: patterns,
        })?;
        Ok(())
    }
}

impl PathFilter for SharedFilter {
    fn is_valid_file(&self, path: &Path) -> bool {
        self.rules.read().is_valid_file(path)
    }
}

/// `--exclude` flags plus the ignore list of the config covering the workspace root itself
fn validator_patterns(
    workspace_root: &Path,
    excludes: &[String],
    configs: &[SyncConfig],
) -> Vec<String> {
    let mut patterns = excludes.to_vec();
    for config in configs.iter().filter(|config| config.context == workspace_root) {
        patterns.extend(config.ignore.iter().cloned());
    }
    patterns
}

/// Logs every failure; surfaced ones are also printed for the user
#[derive(Debug, Default)]
pub struct ConsoleReporter;

impl ErrorReporter for ConsoleReporter {
    fn config_error(&self, path: &Path, error: &ConfigError) {
        match error {
            ConfigError::Ignored { .. } => {
                debug!(path = %path.display(), %error, "Skipped ignored path")
            }
            _ => warn!(path = %path.display(), %error, "No usable config"),
        }
    }

    fn operation_failed(&self, failure: &OperationFailure) {
        let error = format!("{:#}", failure.error);
        if failure.surface {
            error!(
                kind = %failure.kind,
                target = %failure.target,
                %error,
                "Operation failed"
            );
            eprintln!("{} {} {}: {}", "✗".red(), failure.kind, failure.target, error);
        } else {
            warn!(
                kind = %failure.kind,
                target = %failure.target,
                %error,
                "Operation failed"
            );
        }
    }
}
