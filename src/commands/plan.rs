//! `cargo ship plan` - show what a run would publish, without running it

use crate::core::context::{PipelineEnv, ShipContext};
use crate::core::error::ShipResult;
use crate::release::assets::{ArtifactKind, ReleaseLayout, release_title};
use crate::release::version;
use serde::Serialize;
use std::path::PathBuf;

/// One asset a run would upload
#[derive(Debug, Clone, Serialize)]
pub struct PlannedAsset {
  pub kind: ArtifactKind,
  pub name: String,
  pub path: PathBuf,
}

/// Everything derived from the tag before any stage runs
#[derive(Debug, Clone, Serialize)]
pub struct ReleasePlan {
  pub reference: String,
  pub version: String,
  pub tool: String,
  pub title: String,
  /// Assets in upload order
  pub assets: Vec<PlannedAsset>,
}

impl ReleasePlan {
  pub fn resolve(ctx: &ShipContext, env: &PipelineEnv) -> ShipResult<Self> {
    let config = ctx.pipeline_config(env, true)?;
    let tag = version::resolve(&config.git_ref, config.release.require_semver)?;
    let layout = ReleaseLayout::new(
      &config.target_dir,
      config.package.target.as_deref(),
      &config.package.tool,
      &tag,
      config.package.architecture,
    );

    let assets = ArtifactKind::UPLOAD_ORDER
      .iter()
      .map(|kind| {
        let (path, name) = layout.entry(*kind);
        PlannedAsset {
          kind: *kind,
          name: name.to_string(),
          path: path.to_path_buf(),
        }
      })
      .collect();

    Ok(Self {
      reference: tag.raw_ref().to_string(),
      version: tag.version().to_string(),
      title: release_title(&config.release.title, &tag),
      tool: config.package.tool,
      assets,
    })
  }
}

/// Run the plan command
pub fn run_plan(ctx: &ShipContext, env: &PipelineEnv, json: bool) -> ShipResult<()> {
  let plan = ReleasePlan::resolve(ctx, env)?;

  if json {
    println!("{}", serde_json::to_string_pretty(&plan)?);
    return Ok(());
  }

  println!("📦 Release Plan for '{}'", plan.tool);
  println!();
  println!("  Reference: {}", plan.reference);
  println!("  Version:   {}", plan.version);
  println!("  Title:     {}", plan.title);
  println!();
  println!("  Assets (upload order):");
  for asset in &plan.assets {
    println!("    {}", asset.name);
    println!("      ← {}", asset.path.display());
  }

  Ok(())
}
