//! Integration tests for `cargo ship run`
//!
//! Only failure paths that stop before the platform is touched; the happy path
//! needs the packaging plugins and is covered by the pipeline engine tests.

use crate::helpers::{TestProject, run_cargo_ship_env, stderr};
use anyhow::Result;
use httpmock::prelude::*;

const NO_PLUGINS: &str = "[plugins]\ninstall = []\n";

#[test]
fn test_run_without_token_is_user_error() -> Result<()> {
  let project = TestProject::new("tool")?;

  let output = run_cargo_ship_env(
    &project.path,
    &["run", "--no-cache"],
    &[("GITHUB_REF", "refs/tags/1.2.3"), ("GITHUB_REPOSITORY", "acme/tool")],
  )?;

  assert_eq!(output.status.code(), Some(1));
  assert!(stderr(&output).contains("token"), "stderr: {}", stderr(&output));

  Ok(())
}

#[test]
fn test_run_with_malformed_ref_never_calls_platform() -> Result<()> {
  let project = TestProject::new("tool")?;
  project.ship_toml(NO_PLUGINS)?;

  let server = MockServer::start();
  let create = server.mock(|when, then| {
    when.method(POST).path("/repos/acme/tool/releases");
    then.status(201);
  });
  let lookup = server.mock(|when, then| {
    when.method(GET).path("/repos/acme/tool/releases/tags/main");
    then.status(404);
  });

  let api_url = server.base_url();
  let output = run_cargo_ship_env(
    &project.path,
    &["run", "--no-cache", "--ref", "refs/heads/main"],
    &[
      ("GITHUB_TOKEN", "secret-token"),
      ("GITHUB_REPOSITORY", "acme/tool"),
      ("GITHUB_API_URL", api_url.as_str()),
    ],
  )?;

  assert_eq!(output.status.code(), Some(3));
  assert_eq!(create.calls(), 0);
  assert_eq!(lookup.calls(), 0);
  assert!(!stderr(&output).contains("secret-token"));

  Ok(())
}

#[test]
fn test_run_stops_on_compile_error_before_release() -> Result<()> {
  let project = TestProject::new("tool")?;
  project.ship_toml(NO_PLUGINS)?;
  project.main_rs("fn main() {\n    let x: u32 = \"not a number\";\n}\n")?;

  let server = MockServer::start();
  let create = server.mock(|when, then| {
    when.method(POST).path("/repos/acme/tool/releases");
    then.status(201);
  });

  let api_url = server.base_url();
  let output = run_cargo_ship_env(
    &project.path,
    &["run", "--no-cache", "--ref", "refs/tags/1.2.3"],
    &[
      ("GITHUB_TOKEN", "secret-token"),
      ("GITHUB_REPOSITORY", "acme/tool"),
      ("GITHUB_API_URL", api_url.as_str()),
    ],
  )?;

  assert_eq!(output.status.code(), Some(4));
  assert_eq!(create.calls(), 0);
  assert!(!project.path.join("target/debian").exists());

  Ok(())
}
