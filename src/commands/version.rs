//! `cargo ship version` - resolve a reference without touching the workspace

use crate::core::config::ShipConfig;
use crate::core::error::ShipResult;
use crate::release::version;
use std::env;

/// Print the version a reference resolves to
pub fn run_version(reference: &str) -> ShipResult<()> {
  let config = ShipConfig::load(&env::current_dir()?)?;
  let tag = version::resolve(reference, config.release.require_semver)?;
  println!("{}", tag.version());
  Ok(())
}
