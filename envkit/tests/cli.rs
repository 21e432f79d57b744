//! Integration tests for the envkit binaries.
//!
//! The binaries run against stub `conda` / `pip` / `pre-commit` / `conda-lock`
//! / `pytest` scripts placed first on PATH; every stub appends its argv to a
//! log file the tests inspect.

#![cfg(unix)]

use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::ffi::OsStr;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::Command;

const CONDA_STUB: &str = r#"#!/bin/sh
echo "conda $*" >> "$STUB_LOG"
if [ "$1" = "info" ] && [ "$2" = "--base" ]; then
  echo /tmp
elif [ "$1" = "info" ] && [ "$2" = "--envs" ]; then
  echo "$ENVKIT_ENV_PATH *"
fi
exit 0
"#;

struct Sandbox {
    dir: tempfile::TempDir,
}

impl Sandbox {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let sb = Self { dir };
        let setup = sb.project().join("setup");
        fs::create_dir_all(&setup).unwrap();
        fs::write(setup.join("environment.yml"), "name: base\n").unwrap();
        fs::write(setup.join("environment-dev.yml"), "name: dev\n").unwrap();
        fs::create_dir_all(sb.root().join("home")).unwrap();

        let bin = sb.root().join("bin");
        fs::create_dir_all(&bin).unwrap();
        write_stub(&bin.join("conda"), CONDA_STUB);
        for tool in ["pip", "pre-commit", "conda-lock", "pytest"] {
            let script = format!("#!/bin/sh\necho \"{tool} $*\" >> \"$STUB_LOG\"\nexit 0\n");
            write_stub(&bin.join(tool), &script);
        }
        sb
    }

    fn root(&self) -> &Path {
        self.dir.path()
    }

    fn project(&self) -> PathBuf {
        self.root().join("project")
    }

    fn prefix(&self) -> PathBuf {
        self.root().join("envs").join("demo")
    }

    fn log(&self) -> String {
        fs::read_to_string(self.root().join("stub.log")).unwrap_or_default()
    }

    fn cmd(&self, bin: impl AsRef<OsStr>) -> Command {
        let path = format!(
            "{}:{}",
            self.root().join("bin").display(),
            std::env::var("PATH").unwrap_or_default()
        );
        let mut cmd = Command::new(bin);
        cmd.current_dir(self.project())
            .env("PATH", path)
            .env("HOME", self.root().join("home"))
            .env("STUB_LOG", self.root().join("stub.log"))
            .env("ENVKIT_ENV_PATH", self.prefix())
            .env("ENVKIT_CACHE_DIR", self.root().join("cache"))
            .env("ENVKIT_QUIET", "1")
            .env_remove("CONDA_PREFIX")
            .env_remove("ENVKIT_SOURCED")
            .env_remove("ENVKIT_PROJECT_SLUG")
            .env_remove("ENVKIT_AUDIT_LOG")
            .env_remove("MODULESHOME")
            .env_remove("RUST_LOG");
        cmd
    }

    fn setup_env(&self) -> Command {
        self.cmd(assert_cmd::cargo::cargo_bin!("setup-env"))
    }

    fn envkit(&self) -> Command {
        self.cmd(assert_cmd::cargo::cargo_bin!("envkit"))
    }
}

fn write_stub(path: &Path, body: &str) {
    fs::write(path, body).unwrap();
    fs::set_permissions(path, fs::Permissions::from_mode(0o755)).unwrap();
}

#[test]
fn help_exits_zero_with_usage() {
    let sb = Sandbox::new();
    for args in [
        vec!["--help"],
        vec!["-h"],
        vec!["--clean-install", "--help"],
        vec!["--skip-conda", "-h"],
        vec!["-v", "--help"],
    ] {
        sb.setup_env()
            .args(&args)
            .assert()
            .success()
            .stdout(predicate::str::contains("Usage"));
    }
    assert!(sb.log().is_empty());
}

#[test]
fn unknown_flag_fails() {
    let sb = Sandbox::new();
    sb.setup_env().arg("--unknown").assert().failure();
    sb.envkit().args(["setup", "--unknown"]).assert().failure();
}

#[test]
fn dev_flag_selects_dev_file() {
    let sb = Sandbox::new();
    sb.setup_env()
        .args(["--dev", "--verbose", "--force"])
        .assert()
        .success()
        .stderr(predicate::str::contains("Using development environment file"))
        .stderr(predicate::str::contains("Environment setup completed"))
        .stderr(predicate::str::contains("conda run -p"));
    let log = sb.log();
    assert!(log.contains("conda env create --prefix"));
    assert!(log.contains("environment-dev.yml"));
}

#[test]
fn prod_is_default() {
    let sb = Sandbox::new();
    sb.envkit()
        .args(["setup", "--skip-lock"])
        .assert()
        .success()
        .stderr(predicate::str::contains("Using base environment file"));
    assert!(!sb.log().contains("conda-lock"));
}

#[test]
fn existing_env_is_updated_without_deleting_files() {
    let sb = Sandbox::new();
    fs::create_dir_all(sb.prefix()).unwrap();
    fs::write(sb.prefix().join("keep.txt"), "data").unwrap();

    sb.setup_env()
        .assert()
        .success()
        .stderr(predicate::str::contains("Updating existing conda environment"));
    assert!(sb.prefix().join("keep.txt").exists());
    assert!(sb.log().contains("conda env update --prefix"));
}

#[test]
fn clean_install_removes_everything_first() {
    let sb = Sandbox::new();
    fs::create_dir_all(sb.prefix().join("lib")).unwrap();
    fs::write(sb.prefix().join("lib").join("old.txt"), "stale").unwrap();
    let artifact = sb.root().join("envs").join("demo.tmp");
    fs::write(&artifact, "").unwrap();

    sb.setup_env()
        .args(["--clean-install", "--force"])
        .assert()
        .success()
        .stderr(predicate::str::contains("Creating conda environment"));
    assert!(!sb.prefix().join("lib").join("old.txt").exists());
    assert!(!artifact.exists());
}

#[test]
fn active_env_is_refused_unless_skip_checks() {
    let sb = Sandbox::new();
    fs::create_dir_all(sb.prefix()).unwrap();

    sb.setup_env()
        .env("CONDA_PREFIX", sb.prefix())
        .assert()
        .failure()
        .stderr(predicate::str::contains("active"));
    assert!(!sb.log().contains("env update"));

    sb.setup_env()
        .env("CONDA_PREFIX", sb.prefix())
        .arg("--skip-checks")
        .assert()
        .success();
}

#[test]
fn sourced_mode_requires_run_setup() {
    let sb = Sandbox::new();
    sb.setup_env()
        .env("ENVKIT_SOURCED", "1")
        .assert()
        .success()
        .stderr(predicate::str::contains("Environment setup completed").not());

    sb.setup_env()
        .env("ENVKIT_SOURCED", "1")
        .args(["--run-setup", "--verbose"])
        .assert()
        .success()
        .stderr(predicate::str::contains("Environment setup completed"));
}

#[test]
fn tests_run_inside_env_unless_disabled() {
    let sb = Sandbox::new();
    fs::create_dir_all(sb.project().join("tests")).unwrap();

    sb.setup_env().arg("--skip-lock").assert().success();
    assert!(sb.log().contains("run -p"));
    assert!(sb.log().contains("pytest -q tests"));

    fs::remove_file(sb.root().join("stub.log")).unwrap();
    sb.setup_env().args(["--skip-lock", "--no-tests"]).assert().success();
    assert!(!sb.log().contains("pytest"));
}

#[test]
fn missing_env_file_fails() {
    let sb = Sandbox::new();
    fs::remove_file(sb.project().join("setup").join("environment-dev.yml")).unwrap();
    sb.setup_env()
        .arg("--dev")
        .assert()
        .failure()
        .stderr(predicate::str::contains("environment-dev.yml"));
}

#[test]
fn seed_json_reports_state() {
    let sb = Sandbox::new();
    let output = sb
        .envkit()
        .args(["seed", "--seed", "4321", "--library", "numpy", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let body: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(body["state"]["seed"], 4321);
    assert_eq!(body["state"]["libraries"]["numpy"], true);
    assert_eq!(body["state"]["libraries"]["python"], false);
    assert_eq!(body["seeded"], serde_json::json!({ "numpy": true }));
    assert_eq!(body["key"], serde_json::json!([0, 4321]));
}

#[test]
fn seed_runs_with_same_seed_draw_same_sample() {
    let sb = Sandbox::new();
    let sample = |seed: &str| {
        let output = sb
            .envkit()
            .args(["seed", "--seed", seed, "--json"])
            .output()
            .unwrap();
        assert!(output.status.success());
        let body: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
        body["sample"].clone()
    };
    let first = sample("2024");
    assert_eq!(first.as_array().map(Vec::len), Some(4));
    assert_eq!(first, sample("2024"));
    assert_ne!(first, sample("2025"));

    let output = sb
        .envkit()
        .args(["seed", "--seed", "1", "--library", "numpy", "--json"])
        .output()
        .unwrap();
    let body: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert!(body["sample"].is_null());
}

#[test]
fn seed_display_format() {
    let sb = Sandbox::new();
    sb.envkit()
        .args(["seed", "--seed", "42"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("<SeedManager(seed=42, libraries={python:✓"));
}

#[test]
fn validate_rejects_bad_parameters() {
    let sb = Sandbox::new();
    sb.envkit()
        .args(["validate", "--slug", "9lives", "--email", "a@b.co"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid project parameters"));

    sb.envkit()
        .args(["validate", "--slug", "project", "--email", "a@b.co"])
        .arg("--parent")
        .arg(sb.root())
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));

    sb.envkit()
        .args(["validate", "--slug", "fresh_one", "--email", "a@b.co", "--python-version", "3.12.1"])
        .arg("--parent")
        .arg(sb.root())
        .assert()
        .success();
}
