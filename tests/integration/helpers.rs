//! Test helpers for integration tests

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

/// CI inputs cleared from every child so the host runner's values never leak in
const CI_VARS: &[&str] = &[
  "GITHUB_REF",
  "GITHUB_TOKEN",
  "GITHUB_REPOSITORY",
  "GITHUB_API_URL",
  "RUNNER_OS",
  "RUST_LOG",
  "CARGO_TARGET_DIR",
];

/// A throwaway binary crate
pub struct TestProject {
  _root: TempDir,
  pub path: PathBuf,
}

impl TestProject {
  /// Create a binary crate named `name` that compiles
  pub fn new(name: &str) -> Result<Self> {
    let root = TempDir::new()?;
    let path = root.path().to_path_buf();

    std::fs::write(
      path.join("Cargo.toml"),
      format!(
        r#"[package]
name = "{}"
version = "0.0.0"
edition = "2021"
authors = ["Ops Team <ops@example.com>"]
description = "Synchronizes devices between two inventories"

[dependencies]
"#,
        name
      ),
    )?;
    std::fs::create_dir_all(path.join("src"))?;
    std::fs::write(path.join("src/main.rs"), "fn main() {\n    println!(\"hello\");\n}\n")?;
    std::fs::write(path.join("Cargo.lock"), "# This file is automatically @generated by Cargo.\nversion = 4\n")?;

    Ok(Self { _root: root, path })
  }

  /// Write ship.toml
  pub fn ship_toml(&self, content: &str) -> Result<()> {
    std::fs::write(self.path.join("ship.toml"), content)?;
    Ok(())
  }

  /// Replace src/main.rs
  pub fn main_rs(&self, content: &str) -> Result<()> {
    std::fs::write(self.path.join("src/main.rs"), content)?;
    Ok(())
  }

  /// Read a file
  pub fn read_file(&self, path: &str) -> Result<String> {
    Ok(std::fs::read_to_string(self.path.join(path))?)
  }

  /// Write a file
  pub fn write_file(&self, path: &str, content: &str) -> Result<()> {
    std::fs::write(self.path.join(path), content)?;
    Ok(())
  }
}

/// Run cargo-ship with extra environment, whatever its exit status
pub fn run_cargo_ship_env(cwd: &Path, args: &[&str], envs: &[(&str, &str)]) -> Result<Output> {
  let cargo_ship_bin = env!("CARGO_BIN_EXE_cargo-ship");

  let mut cmd = Command::new(cargo_ship_bin);
  cmd.current_dir(cwd).arg("ship").args(args);
  for var in CI_VARS {
    cmd.env_remove(var);
  }
  cmd.envs(envs.iter().copied());

  cmd.output().context("Failed to run cargo-ship")
}

/// Run cargo-ship CLI command, failing on a non-zero exit
pub fn run_cargo_ship(cwd: &Path, args: &[&str]) -> Result<Output> {
  let output = run_cargo_ship_env(cwd, args, &[])?;

  if !output.status.success() {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let stdout = String::from_utf8_lossy(&output.stdout);
    anyhow::bail!(
      "cargo-ship command failed: cargo ship {}\nstdout: {}\nstderr: {}",
      args.join(" "),
      stdout,
      stderr
    );
  }

  Ok(output)
}

pub fn stdout(output: &Output) -> String {
  String::from_utf8_lossy(&output.stdout).to_string()
}

pub fn stderr(output: &Output) -> String {
  String::from_utf8_lossy(&output.stderr).to_string()
}
