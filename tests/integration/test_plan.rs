//! Integration tests for `cargo ship plan`

use crate::helpers::{TestProject, run_cargo_ship, run_cargo_ship_env};
use anyhow::Result;

#[test]
fn test_plan_json_lists_assets_in_upload_order() -> Result<()> {
  let project = TestProject::new("netbox2netshot")?;

  let output = run_cargo_ship(&project.path, &["plan", "--ref", "refs/tags/1.2.3", "--json"])?;
  let plan: serde_json::Value = serde_json::from_slice(&output.stdout)?;

  assert_eq!(plan["version"], "1.2.3");
  assert_eq!(plan["title"], "Release 1.2.3");
  assert_eq!(plan["tool"], "netbox2netshot");

  let names: Vec<&str> = plan["assets"]
    .as_array()
    .expect("assets array")
    .iter()
    .filter_map(|a| a["name"].as_str())
    .collect();
  assert_eq!(
    names,
    vec![
      "netbox2netshot-1.2.3",
      "netbox2netshot-1.2.3-1.x86_64.rpm",
      "netbox2netshot_1.2.3_amd64.deb",
    ]
  );

  let deb_path = plan["assets"][2]["path"].as_str().unwrap_or_default();
  assert!(deb_path.contains("debian"), "deb lands under target/debian: {}", deb_path);

  Ok(())
}

#[test]
fn test_plan_reads_ref_from_environment() -> Result<()> {
  let project = TestProject::new("tool")?;
  project.ship_toml("[release]\ntitle = \"tool {version}\"\n\n[package]\narchitecture = \"aarch64\"\n")?;

  let output = run_cargo_ship_env(
    &project.path,
    &["plan", "--json"],
    &[("GITHUB_REF", "refs/tags/2.0.0")],
  )?;
  assert!(output.status.success());
  let plan: serde_json::Value = serde_json::from_slice(&output.stdout)?;
  assert_eq!(plan["title"], "tool 2.0.0");
  assert_eq!(plan["assets"][2]["name"], "tool_2.0.0_arm64.deb");

  Ok(())
}

#[test]
fn test_plan_without_ref_is_user_error() -> Result<()> {
  let project = TestProject::new("tool")?;

  let output = run_cargo_ship_env(&project.path, &["plan"], &[])?;
  assert_eq!(output.status.code(), Some(1));

  Ok(())
}
