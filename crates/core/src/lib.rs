//! Configuration model for upsync
//!
//! This crate provides:
//! - Sync config files (`upsync.toml`, legacy `.upsync.toml`)
//! - Config discovery across a workspace
//! - Path → config resolution with remote path mapping
//! - Watch glob construction

pub mod config;
pub mod error;
pub mod glob;
pub mod resolve;

pub use config::{
    is_config_file, ConfigRoot, FilesPattern, SyncConfig, WatcherConfig, CONFIG_FILENAME,
    DEPRECATED_CONFIG_FILENAME,
};
pub use error::ConfigError;
pub use glob::{fill_glob_pattern, GlobPattern};
pub use resolve::{ConfigSet, ResolvedConfig};
