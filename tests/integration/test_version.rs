//! Integration tests for `cargo ship version`

use crate::helpers::{TestProject, run_cargo_ship, run_cargo_ship_env, stderr, stdout};
use anyhow::Result;

#[test]
fn test_version_from_tag_ref() -> Result<()> {
  let project = TestProject::new("tool")?;

  let output = run_cargo_ship(&project.path, &["version", "refs/tags/1.2.3"])?;
  assert_eq!(stdout(&output).trim(), "1.2.3");

  let output = run_cargo_ship(&project.path, &["version", "refs/tags/v0.4.0-rc.1"])?;
  assert_eq!(stdout(&output).trim(), "v0.4.0-rc.1");

  Ok(())
}

#[test]
fn test_malformed_ref_exits_with_validation_code() -> Result<()> {
  let project = TestProject::new("tool")?;

  let output = run_cargo_ship_env(&project.path, &["version", "main"], &[])?;
  assert_eq!(output.status.code(), Some(3));
  assert!(stderr(&output).contains("Cannot resolve a version"));

  Ok(())
}

#[test]
fn test_non_semver_tag_respects_config() -> Result<()> {
  let project = TestProject::new("tool")?;

  let output = run_cargo_ship_env(&project.path, &["version", "refs/tags/latest"], &[])?;
  assert_eq!(output.status.code(), Some(3));

  project.ship_toml("[release]\nrequire_semver = false\n")?;
  let output = run_cargo_ship(&project.path, &["version", "refs/tags/latest"])?;
  assert_eq!(stdout(&output).trim(), "latest");

  Ok(())
}
