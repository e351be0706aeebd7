//! Sync configuration model and config file loading

use crate::error::ConfigError;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Current config file name
pub const CONFIG_FILENAME: &str = "upsync.toml";

/// Legacy config file name, still loaded and still treated as a config file
pub const DEPRECATED_CONFIG_FILENAME: &str = ".upsync.toml";

/// Glob used when `files = true`
pub const DEFAULT_FILES_GLOB: &str = "**/*";

/// Returns true if the path's file name is a current or legacy config file name
pub fn is_config_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(|name| name == CONFIG_FILENAME || name == DEPRECATED_CONFIG_FILENAME)
        .unwrap_or(false)
}

/// Identifier of a configuration root (the directory holding the config file)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConfigRoot(PathBuf);

impl ConfigRoot {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self(path.into())
    }

    pub fn path(&self) -> &Path {
        &self.0
    }
}

impl fmt::Display for ConfigRoot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

/// Which files a root's watcher observes
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FilesPattern {
    /// Watching explicitly turned off (`files = false`)
    #[default]
    Disabled,
    /// Glob relative to the config root
    Glob(String),
}

impl<'de> Deserialize<'de> for FilesPattern {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Flag(bool),
            Glob(String),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Flag(false) => FilesPattern::Disabled,
            Raw::Flag(true) => FilesPattern::Glob(DEFAULT_FILES_GLOB.to_string()),
            Raw::Glob(glob) if glob.trim().is_empty() => FilesPattern::Disabled,
            Raw::Glob(glob) => FilesPattern::Glob(glob),
        })
    }
}

/// `[watcher]` section of a sync config
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct WatcherConfig {
    /// Files to observe
    pub files: FilesPattern,
    /// Upload on create/change
    pub auto_upload: bool,
    /// Remove the remote copy on delete
    pub auto_delete: bool,
}

impl WatcherConfig {
    /// Whether any event class is enabled at all
    pub fn should_listen(&self) -> bool {
        self.auto_upload || self.auto_delete
    }
}

/// On-disk shape of a config file
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    name: Option<String>,
    #[serde(default = "default_context")]
    context: PathBuf,
    remote_path: String,
    #[serde(default)]
    ignore: Vec<String>,
    #[serde(default)]
    upload_on_save: bool,
    #[serde(default)]
    skip_dir: bool,
    #[serde(default)]
    watcher: WatcherConfig,
}

fn default_context() -> PathBuf {
    PathBuf::from(".")
}

/// A loaded sync configuration, one per config root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    /// Unique key: directory containing the config file
    pub config_root: ConfigRoot,
    /// File the config was loaded from
    pub source: PathBuf,
    /// Optional human label
    pub name: Option<String>,
    /// Absolute local directory mapped onto `remote_path`
    pub context: PathBuf,
    /// Remote root (always `/`-separated)
    pub remote_path: String,
    /// gitignore-style patterns that are never synced
    pub ignore: Vec<String>,
    /// Upload explicitly saved files
    pub upload_on_save: bool,
    /// Skip directories on remote removal
    pub skip_dir: bool,
    /// File watcher settings
    pub watcher: WatcherConfig,
}

impl SyncConfig {
    /// Load a config file; its parent directory becomes the config root
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text, path)
    }

    /// Parse config text as if it had been read from `path`
    pub fn parse(text: &str, path: &Path) -> Result<Self, ConfigError> {
        let raw: RawConfig = toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        let root = path
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));

        if raw.remote_path.trim().is_empty() {
            return Err(ConfigError::Invalid {
                path: path.to_path_buf(),
                reason: "remote_path must not be empty".to_string(),
            });
        }
        if raw.context.is_absolute() {
            return Err(ConfigError::Invalid {
                path: path.to_path_buf(),
                reason: "context must be relative to the config directory".to_string(),
            });
        }

        let context = if raw.context == Path::new(".") {
            root.clone()
        } else {
            root.join(&raw.context)
        };

        Ok(Self {
            config_root: ConfigRoot::new(root),
            source: path.to_path_buf(),
            name: raw.name,
            context,
            remote_path: normalize_remote(&raw.remote_path),
            ignore: raw.ignore,
            upload_on_save: raw.upload_on_save,
            skip_dir: raw.skip_dir,
            watcher: raw.watcher,
        })
    }

    /// Display label: name if set, otherwise the root
    pub fn label(&self) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => self.config_root.to_string(),
        }
    }
}

/// Convert separators to `/` and strip a trailing slash (except for `/` itself)
pub fn normalize_remote(remote: &str) -> String {
    let mut normalized = remote.trim().replace('\\', "/");
    while normalized.len() > 1 && normalized.ends_with('/') {
        normalized.pop();
    }
    normalized
}

/// Example config written by `upsync init`
pub fn example_config(remote_path: &str, files: &str) -> String {
    format!(
        r#"# upsync configuration
# name = "staging"
context = "."
remote_path = "{remote_path}"
ignore = [".vscode", "*.log"]
upload_on_save = true
skip_dir = false

[watcher]
files = "{files}"
auto_upload = true
auto_delete = false
"#
    )
}
