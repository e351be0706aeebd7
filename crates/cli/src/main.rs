//! upsync CLI - upsync command

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

mod cmd;
mod daemon;
mod host;
mod mirror;
mod util;

/// upsync - Mirror local edits to a remote as you work
#[derive(Parser)]
#[command(name = "upsync")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Also write logs to this file
    #[arg(long, value_name = "PATH", global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write an example upsync.toml into the current directory
    Init {
        /// Remote root the directory maps to
        #[arg(long, default_value = "../remote")]
        remote: String,
        /// Files the watcher observes
        #[arg(long, default_value = "**/*")]
        files: String,
        /// Overwrite an existing config
        #[arg(long)]
        force: bool,
    },
    /// Show every config in the workspace and what it watches
    Check,
    /// Show where a local path is synced to
    Resolve {
        /// Local file or directory
        path: PathBuf,
    },
    /// Watch the workspace and sync changes until Ctrl-C
    Watch {
        /// Quiet interval before a batch is flushed (milliseconds)
        #[arg(long, default_value = "500")]
        flush_ms: u64,
        /// Delay before events are accepted again after a pull (milliseconds)
        #[arg(long, default_value = "2000")]
        cooldown_ms: u64,
        /// Log operations instead of performing them
        #[arg(long)]
        dry_run: bool,
        /// Copy every remote into its local context before watching
        #[arg(long)]
        pull: bool,
        /// Extra gitignore-style pattern that is never synced (repeatable)
        #[arg(long, value_name = "GLOB")]
        exclude: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Held until exit so buffered file logs are flushed
    let _log_guard = util::init_logging(cli.verbose, cli.log_file.as_deref())?;

    match cli.command {
        Commands::Init { remote, files, force } => cmd::init::run(&remote, &files, force).await,
        Commands::Check => cmd::check::run().await,
        Commands::Resolve { path } => cmd::resolve::run(&path).await,
        Commands::Watch { flush_ms, cooldown_ms, dry_run, pull, exclude } => {
            cmd::watch::run(flush_ms, cooldown_ms, dry_run, pull, exclude).await
        }
    }
}
