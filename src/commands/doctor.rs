//! Health check command for diagnosing a release environment
//!
//! Reports whether the toolchain and every packaging plugin can be started, and
//! whether ship.toml (if any) is valid.

use crate::cargo::plugins::subcommand;
use crate::cargo::runner::{CommandRunner, Invocation, SystemRunner};
use crate::core::config::ShipConfig;
use crate::core::error::{ShipError, ShipResult};
use serde::Serialize;
use std::env;
use std::path::Path;

/// Result of one check
#[derive(Debug, Clone, Serialize)]
pub struct CheckResult {
  pub check_name: String,
  pub passed: bool,
  /// Failing this check blocks a release
  pub required: bool,
  pub message: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub suggestion: Option<String>,
}

/// Run every check against `root`
pub fn run_checks(runner: &dyn CommandRunner, root: &Path) -> Vec<CheckResult> {
  let mut results = Vec::new();

  let config = match ShipConfig::load(root) {
    Ok(config) => {
      let message = match ShipConfig::find_config_path(root) {
        Some(path) => format!("loaded {}", path.display()),
        None => "no ship.toml, using defaults".to_string(),
      };
      results.push(CheckResult {
        check_name: "config".to_string(),
        passed: true,
        required: true,
        message,
        suggestion: None,
      });
      config
    }
    Err(e) => {
      results.push(CheckResult {
        check_name: "config".to_string(),
        passed: false,
        required: true,
        message: e.to_string(),
        suggestion: e.help_message(),
      });
      ShipConfig::default()
    }
  };

  for tool in ["cargo", "rustc"] {
    let inv = Invocation::new(tool, root).arg("--version");
    results.push(probe(runner, tool, &inv, true, format!("Install the Rust toolchain so `{}` is on PATH", tool)));
  }

  for plugin in &config.plugins.install {
    let inv = Invocation::new("cargo", root).args([subcommand(plugin), "--version"]);
    results.push(probe(
      runner,
      plugin,
      &inv,
      false,
      format!("cargo install {} (a run also tries this itself)", plugin),
    ));
  }

  results
}

fn probe(runner: &dyn CommandRunner, name: &str, inv: &Invocation, required: bool, suggestion: String) -> CheckResult {
  let (passed, message) = match runner.run(inv) {
    Ok(out) if out.success => (true, out.stdout.lines().next().unwrap_or_default().trim().to_string()),
    Ok(out) => (false, format!("`{}` exited with {}", inv, out.code.unwrap_or(-1))),
    Err(e) => (false, format!("`{}` could not be started: {}", inv, e)),
  };
  CheckResult {
    check_name: name.to_string(),
    passed,
    required,
    message,
    suggestion: (!passed).then_some(suggestion),
  }
}

/// Run the doctor command
pub fn run_doctor(json: bool) -> ShipResult<()> {
  let current_dir = env::current_dir()?;
  let results = run_checks(&SystemRunner, &current_dir);
  let blocking = results.iter().filter(|r| r.required && !r.passed).count();

  if json {
    println!("{}", serde_json::to_string_pretty(&results)?);
  } else {
    println!("🏥 Running release environment checks...\n");

    for result in &results {
      let icon = match (result.passed, result.required) {
        (true, _) => "✅",
        (false, true) => "❌",
        (false, false) => "⚠️ ",
      };
      println!("{} {}: {}", icon, result.check_name, result.message);
      if let Some(suggestion) = &result.suggestion {
        println!("   💡 Fix: {}", suggestion);
      }
    }

    let passed_count = results.iter().filter(|r| r.passed).count();
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("Summary: {}/{} checks passed", passed_count, results.len());
  }

  if blocking > 0 {
    return Err(ShipError::with_help(
      format!("{} required check(s) failed", blocking),
      "Fix the ❌ items above before running a release.",
    ));
  }

  if !json {
    println!("\n✨ Ready to ship.");
  }
  Ok(())
}
