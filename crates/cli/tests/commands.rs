//! End-to-end tests for the `upsync` commands

mod common;

use anyhow::Result;
use common::UpsyncCommand;
use std::fs;
use tempfile::TempDir;

/// Workspace with a site directory and a sibling mirror directory
fn workspace() -> Result<(TempDir, std::path::PathBuf)> {
    let temp_dir = TempDir::new()?;
    let site = temp_dir.path().join("site");
    fs::create_dir_all(site.join("css"))?;
    fs::create_dir_all(temp_dir.path().join("remote"))?;
    Ok((temp_dir, site))
}

#[test]
fn test_init_writes_loadable_config() -> Result<()> {
    let (_temp, site) = workspace()?;

    let result = UpsyncCommand::new(&site)
        .args(&["init", "--remote", "../remote", "--files", "**/*.css"])
        .assert_success()?;
    assert!(result.contains_stdout("Created"));

    let text = fs::read_to_string(site.join("upsync.toml"))?;
    assert!(text.contains("remote_path = \"../remote\""));
    assert!(text.contains("files = \"**/*.css\""));
    Ok(())
}

#[test]
fn test_init_refuses_to_overwrite() -> Result<()> {
    let (_temp, site) = workspace()?;
    fs::write(site.join("upsync.toml"), "remote_path = \"/keep\"")?;

    let result = UpsyncCommand::new(&site).args(&["init"]).assert_failure()?;
    assert!(result.contains_stderr("already exists"));
    assert_eq!(fs::read_to_string(site.join("upsync.toml"))?, "remote_path = \"/keep\"");

    UpsyncCommand::new(&site).args(&["init", "--force"]).assert_success()?;
    assert!(fs::read_to_string(site.join("upsync.toml"))?.contains("[watcher]"));
    Ok(())
}

#[test]
fn test_check_reports_watch_plans() -> Result<()> {
    let (_temp, site) = workspace()?;
    fs::write(
        site.join("upsync.toml"),
        "name = \"site\"\nremote_path = \"../remote\"\n\n[watcher]\nfiles = \"**/*.css\"\nauto_upload = true\n",
    )?;
    fs::create_dir_all(site.join("docs"))?;
    fs::write(site.join("docs/upsync.toml"), "remote_path = \"../../docs-remote\"\n")?;

    let result = UpsyncCommand::new(site.join("css"))
        .args(&["check"])
        .env("RUST_LOG", "upsync_core=debug")
        .assert_success()?;
    assert!(result.contains_stderr("Loaded 2 config(s)"));
    assert!(result.contains_stdout("Configs:  2"));
    assert!(result.contains_stdout("**/*.css (upload)"));
    assert!(result.contains_stdout("not watched"));
    Ok(())
}

#[test]
fn test_check_fails_on_bad_config() -> Result<()> {
    let (_temp, site) = workspace()?;
    fs::write(site.join("upsync.toml"), "remote_path = \"\"\n")?;

    let result = UpsyncCommand::new(&site).args(&["check"]).assert_failure()?;
    assert!(result.contains_stderr("remote_path must not be empty"));
    Ok(())
}

#[test]
fn test_resolve_maps_to_remote() -> Result<()> {
    let (_temp, site) = workspace()?;
    fs::write(
        site.join("upsync.toml"),
        "remote_path = \"/srv/www\"\nignore = [\"*.log\"]\n",
    )?;

    let result = UpsyncCommand::new(&site)
        .args(&["resolve", "css/site.css"])
        .assert_success()?;
    assert!(result.contains_stdout("/srv/www/css/site.css"));

    let ignored = UpsyncCommand::new(&site)
        .args(&["resolve", "debug.log"])
        .assert_success()?;
    assert!(ignored.contains_stdout("ignored by"));
    Ok(())
}

#[test]
fn test_resolve_outside_any_config_fails() -> Result<()> {
    let (_temp, site) = workspace()?;

    let result = UpsyncCommand::new(&site)
        .args(&["resolve", "index.html"])
        .assert_failure()?;
    assert!(result.contains_stderr("Config not found"));
    Ok(())
}

#[test]
fn test_watch_without_config_fails_fast() -> Result<()> {
    let (_temp, site) = workspace()?;

    let result = UpsyncCommand::new(&site).args(&["watch"]).assert_failure()?;
    assert!(result.contains_stderr("upsync init"));
    assert!(result.duration.as_secs() < 10);
    Ok(())
}
