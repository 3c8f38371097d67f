//! Release pipeline execution
//!
//! One strictly sequential pass over the stages. Collaborators are injected: the
//! process runner, the release API, and observers that watch transitions. The
//! engine itself touches neither the environment nor the network.

use crate::cache::{CacheKey, ToolchainCache};
use crate::cargo::build::Builder;
use crate::cargo::package::Packager;
use crate::cargo::plugins::{PluginInstaller, PluginStatus};
use crate::cargo::runner::CommandRunner;
use crate::core::context::PipelineConfig;
use crate::core::error::{ShipError, ShipResult};
use crate::pipeline::stage::{PipelineState, Stage, StageOutcome, execute};
use crate::release::assets::{ReleaseLayout, release_title, upload_assets};
use crate::release::github::{ReleaseApi, ReleaseRecord};
use crate::release::publish::{ReleasePublisher, UploadOutcome};
use crate::release::version::{self, ReleaseTag};

/// Receives every state transition of a run
pub trait PipelineObserver {
  fn on_transition(&mut self, from: PipelineState, to: PipelineState);

  /// A best-effort stage was skipped
  fn on_warning(&mut self, _warning: &str) {}
}

/// Outcome of a run, including the trail of visited states
#[derive(Debug)]
pub struct PipelineReport {
  pub tag: Option<ReleaseTag>,
  pub states: Vec<PipelineState>,
  pub release: Option<ReleaseRecord>,
  /// Asset names attached to the release, in upload order
  pub uploaded: Vec<String>,
  pub warnings: Vec<String>,
  pub result: ShipResult<()>,
}

impl PipelineReport {
  fn new() -> Self {
    Self {
      tag: None,
      states: vec![PipelineState::Idle],
      release: None,
      uploaded: Vec::new(),
      warnings: Vec::new(),
      result: Ok(()),
    }
  }

  /// Current (last) state
  pub fn state(&self) -> PipelineState {
    self.states.last().copied().unwrap_or(PipelineState::Idle)
  }

  pub fn succeeded(&self) -> bool {
    self.result.is_ok() && self.state() == PipelineState::Done
  }

  pub fn into_result(self) -> ShipResult<()> {
    self.result
  }
}

pub struct Pipeline<'a> {
  config: &'a PipelineConfig,
  runner: &'a dyn CommandRunner,
  api: &'a dyn ReleaseApi,
  observers: Vec<&'a mut dyn PipelineObserver>,
}

impl<'a> Pipeline<'a> {
  pub fn new(config: &'a PipelineConfig, runner: &'a dyn CommandRunner, api: &'a dyn ReleaseApi) -> Self {
    Self {
      config,
      runner,
      api,
      observers: Vec::new(),
    }
  }

  pub fn observe(mut self, observer: &'a mut dyn PipelineObserver) -> Self {
    self.observers.push(observer);
    self
  }

  /// Run every stage; never panics, failures land in the report
  pub fn run(mut self) -> PipelineReport {
    let mut report = PipelineReport::new();
    tracing::info!(
      reference = %self.config.git_ref,
      tool = %self.config.package.tool,
      "release pipeline started"
    );

    match self.drive(&mut report) {
      Ok(()) => self.transition(&mut report, PipelineState::Done),
      Err((stage, err)) => {
        self.transition(&mut report, PipelineState::Failed(stage));
        report.result = Err(err);
      }
    }
    report
  }

  fn drive(&mut self, report: &mut PipelineReport) -> Result<(), (Stage, ShipError)> {
    let cfg = self.config;
    let runner = self.runner;
    let api = self.api;

    // Version
    let tag = required(Stage::ResolveVersion, || {
      Ok(version::resolve(&cfg.git_ref, cfg.release.require_semver)?)
    })?;
    tracing::info!(version = tag.version(), "version resolved");
    report.tag = Some(tag.clone());
    self.transition(report, PipelineState::VersionResolved);

    let layout = ReleaseLayout::new(
      &cfg.target_dir,
      cfg.package.target.as_deref(),
      &cfg.package.tool,
      &tag,
      cfg.package.architecture,
    );

    // Cache restore
    let cache = cfg
      .cache
      .as_ref()
      .map(|settings| (settings, ToolchainCache::new(settings.store_dir.clone(), settings.paths.clone())));
    let mut save_key = None;
    match &cache {
      Some((settings, store)) => {
        let key = self.best_effort(report, Stage::RestoreCache, || {
          CacheKey::compute(&cfg.workspace_root, &settings.lockfiles, &settings.os, Some(&settings.store_dir))
        });
        if let Some(key) = key
          && store.restore(&key).is_none()
        {
          save_key = Some(key);
        }
      }
      None => tracing::info!("toolchain cache disabled"),
    }
    self.transition(report, PipelineState::CacheRestored);

    // Plugins
    let installer = PluginInstaller::new(runner, &cfg.workspace_root, cfg.plugins.clone());
    match self.best_effort(report, Stage::InstallPlugins, || installer.ensure()) {
      Some(status) => {
        if let PluginStatus::Installed(names) = &status {
          tracing::info!(plugins = ?names, "plugins installed");
        }
        self.transition(report, PipelineState::PluginsInstalled);
      }
      None => self.transition(report, PipelineState::PluginsSkipped),
    }

    // Build
    let builder = Builder::new(runner, &cfg.workspace_root, &cfg.target_dir)
      .with_target(cfg.package.target.clone())
      .locked(cfg.locked);
    let artifact = required(Stage::Build, || builder.build(&layout.binary_path))?;
    self.transition(report, PipelineState::Built);

    // Cache save, only after a miss
    if let (Some((_, store)), Some(key)) = (&cache, &save_key) {
      self.best_effort(report, Stage::SaveCache, || store.save(key));
    }

    // Packages
    let packager = Packager::new(runner, cfg.package.clone());
    let packages = required(Stage::Package, || packager.package(&artifact, &tag, &layout))?;
    self.transition(report, PipelineState::Packaged);

    // Release
    let publisher = ReleasePublisher::new(
      api,
      cfg.release.on_existing,
      cfg.retry.create_release.clone(),
      cfg.retry.upload.clone(),
    );
    let title = release_title(&cfg.release.title, &tag);
    let record = required(Stage::CreateRelease, || {
      Ok(publisher.create_release(tag.version(), &title)?)
    })?;
    report.release = Some(record.clone());
    self.transition(report, PipelineState::ReleaseCreated);

    // Assets
    let assets = upload_assets(&artifact, &layout, &packages);
    required(Stage::Upload, || {
      let mut count = 0;
      publisher.upload_all(&record, &assets, |outcome| {
        count += 1;
        let name = match outcome {
          UploadOutcome::Uploaded(receipt) => receipt.name.clone(),
          UploadOutcome::AlreadyPresent(name) => name.clone(),
        };
        report.uploaded.push(name);
        self.transition(report, PipelineState::AssetsUploaded(count));
      })?;
      Ok(())
    })?;

    tracing::info!(
      tag = tag.version(),
      url = %record.html_url,
      assets = report.uploaded.len(),
      "release published"
    );
    Ok(())
  }

  fn transition(&mut self, report: &mut PipelineReport, to: PipelineState) {
    let from = report.state();
    tracing::info!(from = %from, to = %to, "pipeline transition");
    for observer in self.observers.iter_mut() {
      observer.on_transition(from, to);
    }
    report.states.push(to);
  }

  fn best_effort<T, F>(&mut self, report: &mut PipelineReport, stage: Stage, op: F) -> Option<T>
  where
    F: FnOnce() -> ShipResult<T>,
  {
    let warning = match execute(stage, op) {
      Ok(StageOutcome::Completed(value)) => return Some(value),
      Ok(StageOutcome::Skipped { warning }) => warning,
      Err(err) => format!("{} skipped: {}", stage, err),
    };
    for observer in self.observers.iter_mut() {
      observer.on_warning(&warning);
    }
    report.warnings.push(warning);
    None
  }
}

fn required<T, F>(stage: Stage, op: F) -> Result<T, (Stage, ShipError)>
where
  F: FnOnce() -> ShipResult<T>,
{
  match execute(stage, op) {
    Ok(StageOutcome::Completed(value)) => Ok(value),
    Ok(StageOutcome::Skipped { warning }) => Err((stage, ShipError::message(warning))),
    Err(err) => Err((stage, err)),
  }
}
