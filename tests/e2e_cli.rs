//! CLI end-to-end tests
//!
//! Tests for the playfit command-line interface. None of these need the
//! external media tools to be installed.

use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::process::Command;
use tempfile::{tempdir, TempDir};

/// Get a command for the playfit binary
#[allow(deprecated)]
fn playfit_cmd() -> Command {
    Command::cargo_bin("playfit").unwrap()
}

/// Config file keeping the lock and audit logs inside `dir`.
fn sandbox_config(dir: &TempDir) -> std::path::PathBuf {
    let path = dir.path().join("playfit.toml");
    let body = format!(
        "[paths]\nlog_dir = \"{}\"\nlock_file = \"{}\"\n",
        dir.path().join("logs").display(),
        dir.path().join("playfit.lock").display()
    );
    fs::write(&path, body).unwrap();
    path
}

#[test]
fn test_cli_no_args_shows_help() {
    playfit_cmd()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn test_cli_help_flag() {
    playfit_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("playfit"))
        .stdout(predicate::str::contains("process"))
        .stdout(predicate::str::contains("import"));
}

#[test]
fn test_cli_version_command() {
    playfit_cmd()
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains(format!(
            "playfit {}",
            env!("CARGO_PKG_VERSION")
        )));
}

#[test]
fn test_cli_check_tools_lists_every_tool() {
    playfit_cmd()
        .arg("check-tools")
        .assert()
        .success()
        .stdout(predicate::str::contains("ffmpeg"))
        .stdout(predicate::str::contains("ffprobe"))
        .stdout(predicate::str::contains("mediainfo"))
        .stdout(predicate::str::contains("pgsrip"));
}

#[test]
fn test_cli_validate_config_valid() {
    let dir = tempdir().unwrap();
    let config = sandbox_config(&dir);

    playfit_cmd()
        .arg("validate-config")
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration is valid"));
}

#[test]
fn test_cli_validate_config_rejects_zero_timeout() {
    let dir = tempdir().unwrap();
    let config = dir.path().join("bad.toml");
    fs::write(&config, "[subtitles]\nocr_timeout_secs = 0\n").unwrap();

    playfit_cmd()
        .arg("validate-config")
        .arg(&config)
        .assert()
        .failure()
        .stderr(predicate::str::contains("ocr_timeout_secs"));
}

#[test]
fn test_cli_validate_config_missing_file() {
    playfit_cmd()
        .args(["validate-config", "/nonexistent/playfit.toml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read config file"));
}

#[test]
fn test_cli_scan_missing_path() {
    playfit_cmd()
        .args(["scan", "/nonexistent/library"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Path does not exist"));
}

#[test]
fn test_cli_scan_empty_directory() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("notes.txt"), "not media").unwrap();

    playfit_cmd()
        .arg("scan")
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("SCAN SUMMARY"))
        .stdout(predicate::str::contains("Total files:           0"));
}

#[test]
fn test_cli_process_nothing_found_exits_nonzero() {
    let dir = tempdir().unwrap();
    let config = sandbox_config(&dir);
    let library = dir.path().join("library");
    fs::create_dir(&library).unwrap();

    playfit_cmd()
        .arg("--config")
        .arg(&config)
        .arg("process")
        .arg(&library)
        .assert()
        .failure()
        .stdout(predicate::str::contains("No media files found"));

    assert!(!dir.path().join("playfit.lock").exists());
}

#[test]
fn test_cli_process_skips_samples_and_derived_files() {
    let dir = tempdir().unwrap();
    let config = sandbox_config(&dir);
    let library = dir.path().join("library");
    fs::create_dir_all(library.join("Sample")).unwrap();
    fs::write(library.join("Sample/clip.mkv"), "x").unwrap();
    fs::write(library.join("Movie.playfit.mkv"), "x").unwrap();
    fs::write(library.join("Movie.HDR10.mkv"), "x").unwrap();

    playfit_cmd()
        .arg("--config")
        .arg(&config)
        .arg("process")
        .arg(&library)
        .assert()
        .failure()
        .stdout(predicate::str::contains("No media files found"));
}

#[test]
fn test_cli_import_missing_root() {
    let dir = tempdir().unwrap();
    let config = sandbox_config(&dir);
    let source = dir.path().join("incoming");
    fs::create_dir(&source).unwrap();

    playfit_cmd()
        .arg("--config")
        .arg(&config)
        .arg("import")
        .arg(&source)
        .arg("--root")
        .arg(dir.path().join("missing-root"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Library root does not exist"));
}

#[test]
fn test_cli_import_empty_source() {
    let dir = tempdir().unwrap();
    let config = sandbox_config(&dir);
    let source = dir.path().join("incoming");
    let root = dir.path().join("media");
    fs::create_dir(&source).unwrap();
    fs::create_dir(&root).unwrap();

    playfit_cmd()
        .arg("--config")
        .arg(&config)
        .args(["import", "--library", "tv"])
        .arg(&source)
        .arg("--root")
        .arg(&root)
        .assert()
        .failure()
        .stdout(predicate::str::contains("will create"))
        .stdout(predicate::str::contains("No media files found"));

    assert!(!root.join("tv").exists());
}

#[test]
fn test_cli_probe_missing_file() {
    playfit_cmd()
        .args(["probe", "/nonexistent/movie.mkv"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("File does not exist"));
}

#[test]
fn test_cli_plex_needs_a_target() {
    let dir = tempdir().unwrap();
    let config = sandbox_config(&dir);

    playfit_cmd()
        .arg("--config")
        .arg(&config)
        .arg("plex")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Nothing to scan"));
}

#[test]
fn test_cli_plex_without_token_fails() {
    let dir = tempdir().unwrap();
    let config = dir.path().join("playfit.toml");
    fs::write(
        &config,
        format!(
            "[plex]\nprefs_path = \"{}\"\n",
            dir.path().join("Preferences.xml").display()
        ),
    )
    .unwrap();

    playfit_cmd()
        .arg("--config")
        .arg(&config)
        .args(["plex", "--list"])
        .env_remove("PLEX_TOKEN")
        .env_remove("PLAYFIT_PLEX_TOKEN")
        .assert()
        .failure()
        .stderr(predicate::str::contains("No Plex token found"));
}
