//! Config discovery and path → config resolution

use crate::config::{
    ConfigRoot, SyncConfig, WatcherConfig, CONFIG_FILENAME, DEPRECATED_CONFIG_FILENAME,
};
use crate::error::ConfigError;
use crate::glob::compile_ignore;
use ignore::gitignore::Gitignore;
use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Directories never descended into while looking for config files
const SKIP_DIRS: &[&str] = &[".git", ".hg", ".svn", "node_modules", "target"];

/// A config resolved for one specific local path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedConfig {
    pub config_root: ConfigRoot,
    pub name: Option<String>,
    /// Local directory the config covers
    pub context: PathBuf,
    /// Remote target of the resolved path itself
    pub remote_path: String,
    pub upload_on_save: bool,
    pub skip_dir: bool,
    pub watcher: WatcherConfig,
}

impl ResolvedConfig {
    /// Same config with `skip_dir` forced on
    pub fn with_skip_dir(mut self) -> Self {
        self.skip_dir = true;
        self
    }
}

struct Entry {
    config: SyncConfig,
    ignore: Gitignore,
}

/// All sync configs known to a workspace
#[derive(Default)]
pub struct ConfigSet {
    entries: Vec<Entry>,
}

impl std::fmt::Debug for ConfigSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigSet")
            .field("roots", &self.entries.iter().map(|e| &e.config.config_root).collect::<Vec<_>>())
            .finish()
    }
}

impl ConfigSet {
    /// Build from already-loaded configs; a later config for the same root replaces an earlier one
    pub fn new(configs: impl IntoIterator<Item = SyncConfig>) -> Result<Self, ConfigError> {
        let mut by_root: BTreeMap<ConfigRoot, SyncConfig> = BTreeMap::new();
        for config in configs {
            by_root.insert(config.config_root.clone(), config);
        }

        let entries = by_root
            .into_values()
            .map(|config| {
                let ignore = compile_ignore(&config.context, &config.ignore)?;
                Ok(Entry { config, ignore })
            })
            .collect::<Result<Vec<_>, ConfigError>>()?;

        Ok(Self { entries })
    }

    /// Discover and load every config file below `workspace_root`
    pub fn load(workspace_root: &Path) -> Result<Self, ConfigError> {
        let mut found: BTreeMap<PathBuf, PathBuf> = BTreeMap::new();

        let walker = WalkDir::new(workspace_root)
            .follow_links(false)
            .into_iter()
            .filter_entry(|entry| {
                entry.depth() == 0
                    || !entry.file_type().is_dir()
                    || !SKIP_DIRS.iter().any(|skip| entry.file_name() == *skip)
            });

        for entry in walker {
            let entry = entry.map_err(|source| ConfigError::Walk {
                path: workspace_root.to_path_buf(),
                source,
            })?;
            if !entry.file_type().is_file() {
                continue;
            }

            let name = entry.file_name();
            let is_current = name == CONFIG_FILENAME;
            if !is_current && name != DEPRECATED_CONFIG_FILENAME {
                continue;
            }

            let dir = entry.path().parent().unwrap_or(workspace_root).to_path_buf();
            // Current file name wins over the legacy one
            match found.get(&dir) {
                Some(existing) if !is_current => {
                    warn!(
                        "Ignoring {} (superseded by {})",
                        entry.path().display(),
                        existing.display()
                    );
                }
                Some(existing) => {
                    warn!(
                        "Ignoring {} (superseded by {})",
                        existing.display(),
                        entry.path().display()
                    );
                    found.insert(dir, entry.path().to_path_buf());
                }
                None => {
                    found.insert(dir, entry.path().to_path_buf());
                }
            }
        }

        let configs = found
            .values()
            .map(|path| SyncConfig::load(path))
            .collect::<Result<Vec<_>, _>>()?;

        debug!("Loaded {} config(s) from {}", configs.len(), workspace_root.display());
        Self::new(configs)
    }

    pub fn configs(&self) -> impl Iterator<Item = &SyncConfig> {
        self.entries.iter().map(|entry| &entry.config)
    }

    pub fn roots(&self) -> Vec<ConfigRoot> {
        self.configs().map(|config| config.config_root.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Resolve a local path to its config and remote target
    ///
    /// The config whose context is the longest prefix of `path` wins.
    pub fn resolve(&self, path: &Path) -> Result<ResolvedConfig, ConfigError> {
        let entry = self
            .entries
            .iter()
            .filter(|entry| path.starts_with(&entry.config.context))
            .max_by_key(|entry| entry.config.context.components().count())
            .ok_or_else(|| ConfigError::NotFound(path.to_path_buf()))?;

        let config = &entry.config;
        let relative = path
            .strip_prefix(&config.context)
            .map_err(|_| ConfigError::NotFound(path.to_path_buf()))?;

        if !relative.as_os_str().is_empty()
            && entry.ignore.matched_path_or_any_parents(relative, false).is_ignore()
        {
            return Err(ConfigError::Ignored {
                path: path.to_path_buf(),
                config: config.source.clone(),
            });
        }

        Ok(ResolvedConfig {
            config_root: config.config_root.clone(),
            name: config.name.clone(),
            context: config.context.clone(),
            remote_path: remote_join(&config.remote_path, relative),
            upload_on_save: config.upload_on_save,
            skip_dir: config.skip_dir,
            watcher: config.watcher.clone(),
        })
    }
}

/// Join a `/`-separated remote root with a local relative path
pub fn remote_join(remote_root: &str, relative: &Path) -> String {
    let mut remote = remote_root.to_string();
    for component in relative.components() {
        if let Component::Normal(part) = component {
            if !remote.ends_with('/') {
                remote.push('/');
            }
            remote.push_str(&part.to_string_lossy());
        }
    }
    remote
}
