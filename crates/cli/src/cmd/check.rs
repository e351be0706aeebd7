//! Show every config in the workspace and its watch plan

use crate::util;
use anyhow::{Context, Result};
use owo_colors::OwoColorize;
use upsync_core::{fill_glob_pattern, ConfigSet, SyncConfig};
use watcher::classify;

pub async fn run() -> Result<()> {
    let workspace_root = util::current_workspace_root()?;
    let set = ConfigSet::load(&workspace_root)
        .with_context(|| format!("Failed to load configs under {}", workspace_root.display()))?;

    println!("{}", "Workspace".bold());
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("Root:     {}", workspace_root.display().to_string().cyan());
    println!("Configs:  {}", set.len());
    println!();

    if set.is_empty() {
        println!("{}", "No upsync.toml found".yellow());
        println!("  {}", "Tip: Create one with 'upsync init'".dimmed());
        return Ok(());
    }

    let mut invalid = 0;
    for config in set.configs() {
        if !print_config(config) {
            invalid += 1;
        }
    }

    if invalid > 0 {
        anyhow::bail!("{} config(s) have an invalid watch pattern", invalid);
    }
    Ok(())
}

/// Returns false when the watch glob does not compile
fn print_config(config: &SyncConfig) -> bool {
    println!("{}", config.label().bold());
    println!("  Source:   {}", config.source.display());
    println!("  Context:  {}", config.context.display());
    println!("  Remote:   {}", config.remote_path);
    if !config.ignore.is_empty() {
        println!("  Ignore:   {}", config.ignore.join(", "));
    }

    let valid = match classify::plan(&config.watcher) {
        None => {
            println!("  Watch:    {}", "not watched".dimmed());
            true
        }
        Some(plan) => match fill_glob_pattern(plan.files, &config.config_root) {
            Ok(pattern) => {
                let mut events = Vec::new();
                if plan.bindings.upload {
                    events.push("upload");
                }
                if plan.bindings.delete {
                    events.push("delete");
                }
                println!("  Watch:    {} ({})", pattern.pattern().green(), events.join(", "));
                true
            }
            Err(error) => {
                println!("  Watch:    {}", error.to_string().red());
                false
            }
        },
    };
    println!();
    valid
}
