//! External process execution
//!
//! Every toolchain call (cargo, rustc, packaging plugins) goes through
//! `CommandRunner` so the pipeline can run against a scripted fake.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// One process invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
  pub program: String,
  pub args: Vec<String>,
  pub cwd: PathBuf,
  /// Inherit stdout/stderr instead of capturing them
  pub stream: bool,
}

impl Invocation {
  pub fn new(program: impl Into<String>, cwd: &Path) -> Self {
    Self {
      program: program.into(),
      args: Vec::new(),
      cwd: cwd.to_path_buf(),
      stream: false,
    }
  }

  pub fn arg(mut self, arg: impl Into<String>) -> Self {
    self.args.push(arg.into());
    self
  }

  pub fn args<I, S>(mut self, args: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    self.args.extend(args.into_iter().map(Into::into));
    self
  }

  pub fn streamed(mut self) -> Self {
    self.stream = true;
    self
  }

  /// Value following `flag`, e.g. the path after `--output`
  #[cfg(test)]
  pub fn flag_value(&self, flag: &str) -> Option<&str> {
    self
      .args
      .iter()
      .position(|a| a == flag)
      .and_then(|idx| self.args.get(idx + 1))
      .map(String::as_str)
  }
}

impl fmt::Display for Invocation {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.program)?;
    for arg in &self.args {
      write!(f, " {}", arg)?;
    }
    Ok(())
  }
}

/// Result of a finished process
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
  pub success: bool,
  pub code: Option<i32>,
  pub stdout: String,
  pub stderr: String,
}

impl CommandOutput {
  /// Last `n` lines of stderr, for error reports
  pub fn stderr_tail(&self, n: usize) -> String {
    let lines: Vec<&str> = self.stderr.lines().collect();
    lines[lines.len().saturating_sub(n)..].join("\n")
  }
}

/// Runs external processes
pub trait CommandRunner {
  /// Run to completion; `Err` only when the process could not be started
  fn run(&self, invocation: &Invocation) -> io::Result<CommandOutput>;
}

/// Runner backed by `std::process::Command`
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
  fn run(&self, invocation: &Invocation) -> io::Result<CommandOutput> {
    tracing::debug!(command = %invocation, cwd = %invocation.cwd.display(), "exec");

    let mut cmd = Command::new(&invocation.program);
    cmd.current_dir(&invocation.cwd).args(&invocation.args);

    if invocation.stream {
      let status = cmd.stdin(Stdio::null()).status()?;
      return Ok(CommandOutput {
        success: status.success(),
        code: status.code(),
        stdout: String::new(),
        stderr: String::new(),
      });
    }

    let output = cmd.stdin(Stdio::null()).output()?;
    Ok(CommandOutput {
      success: output.status.success(),
      code: output.status.code(),
      stdout: String::from_utf8_lossy(&output.stdout).to_string(),
      stderr: String::from_utf8_lossy(&output.stderr).to_string(),
    })
  }
}
