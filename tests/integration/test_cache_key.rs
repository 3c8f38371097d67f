//! Integration tests for `cargo ship cache-key`

use crate::helpers::{TestProject, run_cargo_ship, stdout};
use anyhow::Result;

#[test]
fn test_cache_key_tracks_lock_file() -> Result<()> {
  let project = TestProject::new("tool")?;

  let first = stdout(&run_cargo_ship(&project.path, &["cache-key", "--os", "Linux"])?);
  let again = stdout(&run_cargo_ship(&project.path, &["cache-key", "--os", "Linux"])?);
  assert!(first.trim().starts_with("Linux-cargo-"), "got {}", first);
  assert_eq!(first, again);

  let mac = stdout(&run_cargo_ship(&project.path, &["cache-key", "--os", "macOS"])?);
  assert!(mac.trim().starts_with("macOS-cargo-"));
  assert_eq!(
    mac.trim().trim_start_matches("macOS-"),
    first.trim().trim_start_matches("Linux-")
  );

  let lock = project.read_file("Cargo.lock")?;
  project.write_file("Cargo.lock", &format!("{}\n# changed\n", lock))?;
  let changed = stdout(&run_cargo_ship(&project.path, &["cache-key", "--os", "Linux"])?);
  assert_ne!(first, changed);

  Ok(())
}

#[test]
fn test_cache_key_json() -> Result<()> {
  let project = TestProject::new("tool")?;

  let output = run_cargo_ship(&project.path, &["cache-key", "--os", "Linux", "--json"])?;
  let value: serde_json::Value = serde_json::from_slice(&output.stdout)?;
  assert_eq!(value["os"], "Linux");
  assert_eq!(value["lock_hash"].as_str().map(str::len), Some(64));

  Ok(())
}
