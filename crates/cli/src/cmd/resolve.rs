//! Show where a local path is synced to

use crate::util;
use anyhow::{Context, Result};
use owo_colors::OwoColorize;
use std::path::Path;
use upsync_core::{ConfigError, ConfigSet};

pub async fn run(path: &Path) -> Result<()> {
    let path = util::absolute_path(path)?;
    let workspace_root = util::current_workspace_root()?;
    let set = ConfigSet::load(&workspace_root)
        .with_context(|| format!("Failed to load configs under {}", workspace_root.display()))?;

    match set.resolve(&path) {
        Ok(resolved) => {
            println!("{}", path.display().to_string().cyan());
            println!("  Remote:         {}", resolved.remote_path.green());
            println!("  Config root:    {}", resolved.config_root);
            if let Some(name) = &resolved.name {
                println!("  Name:           {}", name);
            }
            println!("  Upload on save: {}", resolved.upload_on_save);
            Ok(())
        }
        Err(ConfigError::Ignored { config, .. }) => {
            println!(
                "{} {} {}",
                "-".dimmed(),
                path.display(),
                format!("(ignored by {})", config.display()).dimmed()
            );
            Ok(())
        }
        Err(error) => Err(error.into()),
    }
}
