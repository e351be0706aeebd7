//! Watch glob construction
//!
//! A watch glob is always relative to its config root. Matching follows
//! gitignore glob rules (`*.js` matches at any depth, `src/**` is anchored,
//! `{a,b}` alternation is supported).

use crate::config::ConfigRoot;
use crate::error::ConfigError;
use ignore::gitignore::{Gitignore, GitignoreBuilder};
use ignore::overrides::{Override, OverrideBuilder};
use std::path::{Path, PathBuf};

/// A glob anchored at a base directory
#[derive(Debug, Clone)]
pub struct GlobPattern {
    base: PathBuf,
    pattern: String,
    matcher: Override,
}

/// Merge a `files` glob with its config root
pub fn fill_glob_pattern(
    files: &str,
    config_root: &ConfigRoot,
) -> Result<GlobPattern, ConfigError> {
    GlobPattern::new(config_root.path(), files)
}

impl GlobPattern {
    pub fn new(base: &Path, pattern: &str) -> Result<Self, ConfigError> {
        let glob_error = |source| ConfigError::Glob {
            pattern: pattern.to_string(),
            source,
        };

        let mut builder = OverrideBuilder::new(base);
        builder.add(pattern).map_err(glob_error)?;
        let matcher = builder.build().map_err(glob_error)?;

        Ok(Self {
            base: base.to_path_buf(),
            pattern: pattern.to_string(),
            matcher,
        })
    }

    /// Directory the glob is relative to
    pub fn base(&self) -> &Path {
        &self.base
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Check whether a file path falls under the glob
    pub fn matches(&self, path: &Path) -> bool {
        let relative = match path.strip_prefix(&self.base) {
            Ok(relative) if !relative.as_os_str().is_empty() => relative,
            _ => return false,
        };
        self.matcher.matched(relative, false).is_whitelist()
    }
}

impl std::fmt::Display for GlobPattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.base.display(), self.pattern)
    }
}

/// Compile gitignore-style patterns rooted at `root`
pub fn compile_ignore(root: &Path, patterns: &[String]) -> Result<Gitignore, ConfigError> {
    let mut builder = GitignoreBuilder::new(root);
    for pattern in patterns {
        builder
            .add_line(None, pattern)
            .map_err(|source| ConfigError::Glob {
                pattern: pattern.clone(),
                source,
            })?;
    }
    builder.build().map_err(|source| ConfigError::Glob {
        pattern: patterns.join(", "),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn root() -> ConfigRoot {
        ConfigRoot::new("/ws/site")
    }

    #[test]
    fn test_match_everything() {
        let glob = fill_glob_pattern("**/*", &root()).unwrap();
        assert!(glob.matches(Path::new("/ws/site/index.html")));
        assert!(glob.matches(Path::new("/ws/site/a/b/c.txt")));
        assert!(!glob.matches(Path::new("/ws/other/index.html")));
        assert!(!glob.matches(Path::new("/ws/site")));
    }

    #[test]
    fn test_extension_and_alternation() {
        let glob = fill_glob_pattern("*.{js,css}", &root()).unwrap();
        assert!(glob.matches(Path::new("/ws/site/app.js")));
        assert!(glob.matches(Path::new("/ws/site/styles/main.css")));
        assert!(!glob.matches(Path::new("/ws/site/index.html")));
    }

    #[test]
    fn test_anchored_directory_glob() {
        let glob = fill_glob_pattern("src/**/*.rs", &root()).unwrap();
        assert!(glob.matches(Path::new("/ws/site/src/main.rs")));
        assert!(glob.matches(Path::new("/ws/site/src/a/b.rs")));
        assert!(!glob.matches(Path::new("/ws/site/tests/a.rs")));
    }

    #[test]
    fn test_invalid_glob() {
        assert!(matches!(
            fill_glob_pattern("src/[", &root()),
            Err(ConfigError::Glob { .. })
        ));
    }

    #[test]
    fn test_compile_ignore() {
        let rules = compile_ignore(
            Path::new("/ws/site"),
            &["*.log".to_string(), "tmp/".to_string()],
        )
        .unwrap();
        assert!(rules
            .matched_path_or_any_parents("/ws/site/debug.log", false)
            .is_ignore());
        assert!(rules
            .matched_path_or_any_parents("/ws/site/tmp/cache.bin", false)
            .is_ignore());
        assert!(!rules
            .matched_path_or_any_parents("/ws/site/index.html", false)
            .is_ignore());
    }
}
