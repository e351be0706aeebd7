//! Path validity rules
//!
//! Decides which paths are worth syncing at all:
//! 1. Built-in rules (VCS metadata, editor temp files, OS litter), always active
//! 2. Extra gitignore-style patterns supplied by the host
//!
//! Per-config `ignore` lists are applied at resolution time instead, since
//! they depend on which config covers the path.

use crate::ports::PathFilter;
use ignore::gitignore::{Gitignore, GitignoreBuilder};
use std::path::{Component, Path, PathBuf};

/// Directories whose contents are never synced
const VCS_DIRS: &[&str] = &[".git", ".hg", ".svn"];

/// Ignore rule set
pub struct IgnoreRules {
    /// Workspace root the extra patterns are relative to
    root: PathBuf,

    /// Extra patterns (optional)
    extra: Option<Gitignore>,

    /// Configuration
    config: IgnoreConfig,
}

impl IgnoreRules {
    /// Build rules for a workspace
    pub fn new(root: &Path, config: IgnoreConfig) -> Result<Self, ignore::Error> {
        let mut rules = Self {
            root: root.to_path_buf(),
            extra: None,
            config,
        };
        rules.rebuild()?;
        Ok(rules)
    }

    /// Recompile extra patterns
    fn rebuild(&mut self) -> Result<(), ignore::Error> {
        if self.config.additional_patterns.is_empty() {
            self.extra = None;
            return Ok(());
        }

        let mut builder = GitignoreBuilder::new(&self.root);
        for pattern in &self.config.additional_patterns {
            builder.add_line(None, pattern)?;
        }
        self.extra = Some(builder.build()?);
        Ok(())
    }

    /// Check if path should be ignored
    pub fn should_ignore(&self, path: &Path) -> bool {
        if path.as_os_str().is_empty() {
            return true;
        }

        // 1. Built-in patterns (always enforced)
        if self.is_builtin_ignored(path) {
            return true;
        }

        // 2. Extra patterns, only for paths under the workspace
        if let Some(ref extra) = self.extra {
            if let Ok(relative) = path.strip_prefix(&self.root) {
                if !relative.as_os_str().is_empty()
                    && extra.matched_path_or_any_parents(relative, false).is_ignore()
                {
                    return true;
                }
            }
        }

        false
    }

    /// VCS metadata anywhere in the path, or an editor/OS temp file name
    fn is_builtin_ignored(&self, path: &Path) -> bool {
        let in_vcs_dir = path.components().any(|component| match component {
            Component::Normal(name) => VCS_DIRS.iter().any(|dir| name == *dir),
            _ => false,
        });
        if in_vcs_dir {
            return true;
        }

        path.file_name()
            .and_then(|name| name.to_str())
            .map(is_temp_file_name)
            .unwrap_or(false)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Update configuration and recompile
    pub fn update_config(&mut self, config: IgnoreConfig) -> Result<(), ignore::Error> {
        self.config = config;
        self.rebuild()
    }
}

impl PathFilter for IgnoreRules {
    fn is_valid_file(&self, path: &Path) -> bool {
        !self.should_ignore(path)
    }
}

/// Editor swap/backup/lock files and OS metadata files
///
/// Covers: Vim, Emacs, JetBrains safe-write, macOS and Windows system files
fn is_temp_file_name(filename: &str) -> bool {
    // Vim swap files (.swp, .swo, .swn, .swm)
    if filename.ends_with(".swp")
        || filename.ends_with(".swo")
        || filename.ends_with(".swn")
        || filename.ends_with(".swm")
    {
        return true;
    }

    // Vim/Emacs backup files
    if filename.ends_with('~') {
        return true;
    }

    // Emacs auto-save (#file#) and lock files (.#file)
    if (filename.len() > 1 && filename.starts_with('#') && filename.ends_with('#'))
        || filename.starts_with(".#")
    {
        return true;
    }

    // JetBrains safe-write temp files
    if filename.ends_with("___jb_tmp___") || filename.ends_with("___jb_old___") {
        return true;
    }

    // MacOS system files
    if filename == ".DS_Store" || filename.starts_with("._") {
        return true;
    }

    // Windows system files
    filename == "Thumbs.db" || filename == "desktop.ini"
}

/// Ignore configuration
#[derive(Debug, Clone, Default)]
pub struct IgnoreConfig {
    /// Additional gitignore-style patterns, relative to the workspace root
    pub additional_patterns: Vec<String>,
}
