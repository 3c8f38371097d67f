//! Best-effort installation of the cargo packaging plugins

use crate::cargo::runner::{CommandRunner, Invocation};
use crate::core::error::{ShipError, ShipResult};
use std::path::{Path, PathBuf};

/// What the install step did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PluginStatus {
  /// At least one plugin was installed
  Installed(Vec<String>),
  /// Every plugin was already available
  AlreadyPresent,
}

pub struct PluginInstaller<'a> {
  runner: &'a dyn CommandRunner,
  cwd: PathBuf,
  plugins: Vec<String>,
}

impl<'a> PluginInstaller<'a> {
  pub fn new(runner: &'a dyn CommandRunner, cwd: &Path, plugins: Vec<String>) -> Self {
    Self {
      runner,
      cwd: cwd.to_path_buf(),
      plugins,
    }
  }

  /// Whether `cargo <sub> --version` succeeds for a plugin crate
  pub fn is_available(&self, plugin: &str) -> bool {
    let inv = Invocation::new("cargo", &self.cwd).args([subcommand(plugin), "--version"]);
    matches!(self.runner.run(&inv), Ok(out) if out.success)
  }

  /// Install every plugin that is not yet available
  ///
  /// Every plugin is attempted; failures are reported together. Errors here are
  /// never fatal to a run, the caller downgrades them to warnings.
  pub fn ensure(&self) -> ShipResult<PluginStatus> {
    let mut installed = Vec::new();
    let mut failures = Vec::new();

    for plugin in &self.plugins {
      if self.is_available(plugin) {
        tracing::debug!(plugin = %plugin, "plugin already available");
        continue;
      }

      let inv = Invocation::new("cargo", &self.cwd).args(["install", plugin.as_str()]).streamed();
      tracing::info!(command = %inv, "installing plugin");
      match self.runner.run(&inv) {
        Ok(output) if output.success => installed.push(plugin.clone()),
        Ok(output) => {
          tracing::warn!(plugin = %plugin, code = ?output.code, "plugin install failed");
          failures.push(format!("cargo install {} exited with {}", plugin, output.code.unwrap_or(-1)));
        }
        Err(e) => {
          tracing::warn!(plugin = %plugin, error = %e, "plugin install could not start");
          failures.push(format!("Failed to run cargo install {}: {}", plugin, e));
        }
      }
    }

    if !failures.is_empty() {
      return Err(ShipError::message(failures.join("; ")));
    }

    if installed.is_empty() {
      Ok(PluginStatus::AlreadyPresent)
    } else {
      Ok(PluginStatus::Installed(installed))
    }
  }
}

/// `cargo-deb` is invoked as `cargo deb`
pub fn subcommand(plugin: &str) -> &str {
  plugin.strip_prefix("cargo-").unwrap_or(plugin)
}
