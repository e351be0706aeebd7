//! Write an example config into the current directory

use anyhow::{Context, Result};
use owo_colors::OwoColorize;
use std::env;
use upsync_core::config::example_config;
use upsync_core::{SyncConfig, CONFIG_FILENAME, DEPRECATED_CONFIG_FILENAME};

pub async fn run(remote: &str, files: &str, force: bool) -> Result<()> {
    let current_dir = env::current_dir().context("Failed to get current directory")?;
    let path = current_dir.join(CONFIG_FILENAME);

    if path.exists() && !force {
        anyhow::bail!("{} already exists (use --force to overwrite)", path.display());
    }

    std::fs::write(&path, example_config(remote, files))
        .with_context(|| format!("Failed to write {}", path.display()))?;

    // Catch a bad --remote/--files before the user starts watching
    let config = SyncConfig::load(&path)?;

    println!("{} Created {}", "✓".green(), path.display().to_string().cyan());
    println!();
    println!("  Remote:  {}", config.remote_path);
    println!("  Watch:   {}", files);

    if current_dir.join(DEPRECATED_CONFIG_FILENAME).exists() {
        println!();
        println!(
            "{} {} is also present and will be ignored in favor of {}",
            "!".yellow(),
            DEPRECATED_CONFIG_FILENAME,
            CONFIG_FILENAME
        );
    }

    println!();
    println!("Next steps:");
    println!("  - Run 'upsync check' to review what will be watched");
    println!("  - Run 'upsync watch' to start syncing");
    Ok(())
}
