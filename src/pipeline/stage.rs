//! Pipeline stages, run states, and the stage wrapper

use crate::core::error::{ShipError, ShipResult};
use serde::Serialize;
use std::fmt;

/// Whether a stage's failure ends the run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum StageKind {
  Required,
  BestEffort,
}

/// Stages in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Stage {
  ResolveVersion,
  RestoreCache,
  InstallPlugins,
  Build,
  SaveCache,
  Package,
  CreateRelease,
  Upload,
}

impl Stage {
  pub fn kind(self) -> StageKind {
    match self {
      Stage::RestoreCache | Stage::InstallPlugins | Stage::SaveCache => StageKind::BestEffort,
      _ => StageKind::Required,
    }
  }

  pub fn label(self) -> &'static str {
    match self {
      Stage::ResolveVersion => "resolve version",
      Stage::RestoreCache => "restore cache",
      Stage::InstallPlugins => "install plugins",
      Stage::Build => "build",
      Stage::SaveCache => "save cache",
      Stage::Package => "package",
      Stage::CreateRelease => "create release",
      Stage::Upload => "upload assets",
    }
  }
}

impl fmt::Display for Stage {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.label())
  }
}

/// States of one run
///
/// `Idle → VersionResolved → CacheRestored → PluginsInstalled | PluginsSkipped →
/// Built → Packaged → ReleaseCreated → AssetsUploaded(1..=3) → Done`, with
/// `Failed(stage)` reachable from any required stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "detail", rename_all = "kebab-case")]
pub enum PipelineState {
  Idle,
  VersionResolved,
  CacheRestored,
  PluginsInstalled,
  PluginsSkipped,
  Built,
  Packaged,
  ReleaseCreated,
  AssetsUploaded(usize),
  Done,
  Failed(Stage),
}

impl fmt::Display for PipelineState {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      PipelineState::Idle => write!(f, "idle"),
      PipelineState::VersionResolved => write!(f, "version resolved"),
      PipelineState::CacheRestored => write!(f, "cache restored"),
      PipelineState::PluginsInstalled => write!(f, "plugins installed"),
      PipelineState::PluginsSkipped => write!(f, "plugins skipped"),
      PipelineState::Built => write!(f, "built"),
      PipelineState::Packaged => write!(f, "packaged"),
      PipelineState::ReleaseCreated => write!(f, "release created"),
      PipelineState::AssetsUploaded(n) => write!(f, "assets uploaded ({})", n),
      PipelineState::Done => write!(f, "done"),
      PipelineState::Failed(stage) => write!(f, "failed at {}", stage),
    }
  }
}

/// What a stage produced
#[derive(Debug)]
pub enum StageOutcome<T> {
  Completed(T),
  /// A best-effort stage failed; the run goes on
  Skipped { warning: String },
}

/// Run one stage
///
/// Required stages propagate their error. A best-effort stage's error becomes a
/// logged warning.
pub fn execute<T, F>(stage: Stage, op: F) -> ShipResult<StageOutcome<T>>
where
  F: FnOnce() -> ShipResult<T>,
{
  tracing::debug!(stage = %stage, "stage started");
  match op() {
    Ok(value) => {
      tracing::debug!(stage = %stage, "stage finished");
      Ok(StageOutcome::Completed(value))
    }
    Err(err) => match stage.kind() {
      StageKind::Required => {
        tracing::error!(stage = %stage, error = %err, "stage failed");
        Err(err)
      }
      StageKind::BestEffort => {
        let warning = format!("{} skipped: {}", stage, first_line(&err));
        tracing::warn!(stage = %stage, error = %err, "best-effort stage failed, continuing");
        Ok(StageOutcome::Skipped { warning })
      }
    },
  }
}

fn first_line(err: &ShipError) -> String {
  err.to_string().lines().next().unwrap_or_default().to_string()
}
