//! `cargo ship run` - the full release pipeline

use crate::cargo::runner::SystemRunner;
use crate::core::context::{PipelineEnv, ShipContext};
use crate::core::error::ShipResult;
use crate::pipeline::{Pipeline, PipelineReport};
use crate::release::github::GitHubClient;
use crate::ui::progress::StageProgress;
use std::io::IsTerminal;

/// Run the release pipeline for the triggering tag
pub fn run_pipeline(ctx: &ShipContext, env: &PipelineEnv, no_cache: bool) -> ShipResult<()> {
  tracing::debug!(env = ?env, "pipeline inputs");

  // Everything the run needs is checked before the first stage
  let config = ctx.pipeline_config(env, no_cache)?;
  let github = ctx.github_settings(env)?;
  let client = GitHubClient::new(&github.api_url, &github.repository, &github.token, github.timeout)?;
  let runner = SystemRunner;

  println!("🚀 Releasing {} from {}", config.package.tool, config.git_ref);
  println!("   Repository: {}", github.repository);
  println!();

  let mut progress = std::io::stderr()
    .is_terminal()
    .then(|| StageProgress::new(format!("{} release", config.package.tool)));
  let mut pipeline = Pipeline::new(&config, &runner, &client);
  if let Some(progress) = progress.as_mut() {
    pipeline = pipeline.observe(progress);
  }
  let report = pipeline.run();

  print_summary(&report);
  report.into_result()
}

fn print_summary(report: &PipelineReport) {
  println!();
  for warning in &report.warnings {
    println!("⚠️  {}", warning);
  }

  if report.succeeded() {
    let version = report.tag.as_ref().map(|t| t.version()).unwrap_or_default();
    println!("✅ Released {}", version);
    if let Some(release) = &report.release {
      println!("   {}", release.html_url);
    }
    for name in &report.uploaded {
      println!("   📦 {}", name);
    }
    return;
  }

  println!("❌ Pipeline stopped: {}", report.state());
  if let Some(release) = &report.release {
    println!("   Release left in place: {}", release.html_url);
  }
}
