//! Release compilation via `cargo build`

use crate::cargo::runner::{CommandRunner, Invocation};
use crate::core::error::{BuildError, ShipResult};
use crate::release::assets::BuildArtifact;
use std::path::{Path, PathBuf};

/// Lines of compiler stderr kept in a build error
const STDERR_TAIL: usize = 40;

pub struct Builder<'a> {
  runner: &'a dyn CommandRunner,
  workspace_root: PathBuf,
  target_dir: PathBuf,
  target: Option<String>,
  locked: bool,
}

impl<'a> Builder<'a> {
  pub fn new(runner: &'a dyn CommandRunner, workspace_root: &Path, target_dir: &Path) -> Self {
    Self {
      runner,
      workspace_root: workspace_root.to_path_buf(),
      target_dir: target_dir.to_path_buf(),
      target: None,
      locked: false,
    }
  }

  pub fn with_target(mut self, target: Option<String>) -> Self {
    self.target = target;
    self
  }

  pub fn locked(mut self, locked: bool) -> Self {
    self.locked = locked;
    self
  }

  /// The `cargo build` invocation this builder runs
  pub fn invocation(&self) -> Invocation {
    let mut inv = Invocation::new("cargo", &self.workspace_root).args(["build", "--release"]);
    if self.locked {
      inv = inv.arg("--locked");
    }
    if let Some(target) = &self.target {
      inv = inv.args(["--target", target.as_str()]);
    }
    inv
      .arg("--target-dir")
      .arg(self.target_dir.to_string_lossy())
      .streamed()
  }

  /// Compile the release binary and check it landed at `expected_binary`
  pub fn build(&self, expected_binary: &Path) -> ShipResult<BuildArtifact> {
    let target_triple = match &self.target {
      Some(t) => t.clone(),
      None => self.host_triple()?,
    };

    let inv = self.invocation();
    tracing::info!(command = %inv, target = %target_triple, "building release binary");

    let output = self.runner.run(&inv).map_err(|e| BuildError::Spawn {
      program: "cargo".to_string(),
      reason: e.to_string(),
    })?;

    if !output.success {
      return Err(
        BuildError::Failed {
          code: output.code,
          stderr: output.stderr_tail(STDERR_TAIL),
        }
        .into(),
      );
    }

    if !expected_binary.is_file() {
      return Err(
        BuildError::MissingBinary {
          path: expected_binary.to_path_buf(),
        }
        .into(),
      );
    }

    tracing::info!(binary = %expected_binary.display(), "build finished");
    Ok(BuildArtifact {
      binary_path: expected_binary.to_path_buf(),
      target_triple,
    })
  }

  /// Host triple from `rustc -vV`
  pub fn host_triple(&self) -> ShipResult<String> {
    let inv = Invocation::new("rustc", &self.workspace_root).arg("-vV");
    let output = self.runner.run(&inv).map_err(|e| BuildError::Spawn {
      program: "rustc".to_string(),
      reason: e.to_string(),
    })?;

    if !output.success {
      return Err(
        BuildError::HostTriple {
          reason: format!("rustc -vV exited with {}", output.code.unwrap_or(-1)),
        }
        .into(),
      );
    }

    parse_host_triple(&output.stdout).ok_or_else(|| {
      BuildError::HostTriple {
        reason: "no `host:` line in rustc -vV output".to_string(),
      }
      .into()
    })
  }
}

fn parse_host_triple(verbose_version: &str) -> Option<String> {
  verbose_version
    .lines()
    .find_map(|line| line.strip_prefix("host:"))
    .map(|h| h.trim().to_string())
    .filter(|h| !h.is_empty())
}
