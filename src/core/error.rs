//! Error types for cargo-ship with contextual messages and exit codes
//!
//! Every pipeline stage has its own error family so the process exit code can
//! report the first fatal stage. Each family knows how to suggest a next step.

use std::fmt;
use std::io;
use std::path::PathBuf;

/// Exit codes for cargo-ship
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
  /// User error (config, invalid args, missing files)
  User = 1,
  /// System error (I/O, spawning processes)
  System = 2,
  /// The triggering reference did not yield a usable version
  Validation = 3,
  /// Compilation failed
  Build = 4,
  /// Debian or RPM packaging failed
  Packaging = 5,
  /// Release creation or asset upload failed
  Publish = 6,
}

impl ExitCode {
  /// Convert to i32 for process exit
  pub fn as_i32(self) -> i32 {
    self as i32
  }
}

/// Main error type for cargo-ship
#[derive(Debug)]
pub enum ShipError {
  /// Configuration errors
  Config(ConfigError),

  /// Version resolution errors
  Version(VersionError),

  /// Compilation errors
  Build(BuildError),

  /// Packaging errors
  Package(PackageError),

  /// Release API errors
  Publish(PublishError),

  /// I/O errors
  Io(io::Error),

  /// A typed error with the operation that hit it; keeps the inner exit code
  Context { context: String, source: Box<ShipError> },

  /// Generic error with message and optional context
  Message {
    message: String,
    context: Option<String>,
    help: Option<String>,
  },
}

impl ShipError {
  /// Create a simple error message
  pub fn message(msg: impl Into<String>) -> Self {
    ShipError::Message {
      message: msg.into(),
      context: None,
      help: None,
    }
  }

  /// Create an error with help text
  pub fn with_help(msg: impl Into<String>, help: impl Into<String>) -> Self {
    ShipError::Message {
      message: msg.into(),
      context: None,
      help: Some(help.into()),
    }
  }

  /// Add context to an existing error
  pub fn context(self, ctx: impl Into<String>) -> Self {
    let ctx_str = ctx.into();
    match self {
      ShipError::Message { message, context, help } => ShipError::Message {
        message,
        context: Some(context.map(|c| format!("{}\n{}", ctx_str, c)).unwrap_or(ctx_str)),
        help,
      },
      ShipError::Context { context, source } => ShipError::Context {
        context: format!("{}: {}", ctx_str, context),
        source,
      },
      other => ShipError::Context {
        context: ctx_str,
        source: Box::new(other),
      },
    }
  }

  /// Get the appropriate exit code for this error
  pub fn exit_code(&self) -> ExitCode {
    match self {
      ShipError::Config(_) => ExitCode::User,
      ShipError::Version(_) => ExitCode::Validation,
      ShipError::Build(_) => ExitCode::Build,
      ShipError::Package(_) => ExitCode::Packaging,
      ShipError::Publish(_) => ExitCode::Publish,
      ShipError::Io(_) => ExitCode::System,
      ShipError::Message { .. } => ExitCode::User,
      ShipError::Context { source, .. } => source.exit_code(),
    }
  }

  /// Get contextual help message for this error
  pub fn help_message(&self) -> Option<String> {
    match self {
      ShipError::Config(e) => e.help_message(),
      ShipError::Version(e) => e.help_message(),
      ShipError::Build(e) => e.help_message(),
      ShipError::Package(e) => e.help_message(),
      ShipError::Publish(e) => e.help_message(),
      ShipError::Message { help, .. } => help.clone(),
      ShipError::Io(_) => None,
      ShipError::Context { source, .. } => source.help_message(),
    }
  }
}

impl fmt::Display for ShipError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ShipError::Config(e) => write!(f, "{}", e),
      ShipError::Version(e) => write!(f, "{}", e),
      ShipError::Build(e) => write!(f, "{}", e),
      ShipError::Package(e) => write!(f, "{}", e),
      ShipError::Publish(e) => write!(f, "{}", e),
      ShipError::Io(e) => write!(f, "I/O error: {}", e),
      ShipError::Context { context, source } => write!(f, "{}: {}", context, source),
      ShipError::Message { message, context, .. } => {
        write!(f, "{}", message)?;
        if let Some(ctx) = context {
          write!(f, "\n{}", ctx)?;
        }
        Ok(())
      }
    }
  }
}

impl std::error::Error for ShipError {
  fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
    match self {
      ShipError::Io(e) => Some(e),
      ShipError::Context { source, .. } => Some(source.as_ref()),
      _ => None,
    }
  }
}

impl From<io::Error> for ShipError {
  fn from(err: io::Error) -> Self {
    ShipError::Io(err)
  }
}

impl From<String> for ShipError {
  fn from(msg: String) -> Self {
    ShipError::message(msg)
  }
}

impl From<&str> for ShipError {
  fn from(msg: &str) -> Self {
    ShipError::message(msg)
  }
}

impl From<ConfigError> for ShipError {
  fn from(err: ConfigError) -> Self {
    ShipError::Config(err)
  }
}

impl From<VersionError> for ShipError {
  fn from(err: VersionError) -> Self {
    ShipError::Version(err)
  }
}

impl From<BuildError> for ShipError {
  fn from(err: BuildError) -> Self {
    ShipError::Build(err)
  }
}

impl From<PackageError> for ShipError {
  fn from(err: PackageError) -> Self {
    ShipError::Package(err)
  }
}

impl From<PublishError> for ShipError {
  fn from(err: PublishError) -> Self {
    ShipError::Publish(err)
  }
}

impl From<toml_edit::TomlError> for ShipError {
  fn from(err: toml_edit::TomlError) -> Self {
    ShipError::message(format!("TOML parse error: {}", err))
  }
}

impl From<toml_edit::de::Error> for ShipError {
  fn from(err: toml_edit::de::Error) -> Self {
    ShipError::message(format!("TOML deserialization error: {}", err))
  }
}

impl From<cargo_metadata::Error> for ShipError {
  fn from(err: cargo_metadata::Error) -> Self {
    ShipError::message(format!("Cargo metadata error: {}", err))
  }
}

impl From<serde_json::Error> for ShipError {
  fn from(err: serde_json::Error) -> Self {
    ShipError::message(format!("JSON error: {}", err))
  }
}

impl From<glob::PatternError> for ShipError {
  fn from(err: glob::PatternError) -> Self {
    ShipError::message(format!("Invalid glob pattern: {}", err))
  }
}

/// Configuration-related errors
#[derive(Debug)]
pub enum ConfigError {
  /// A value could not be determined from ship.toml, the environment or Cargo metadata
  MissingField { field: String },

  /// A value is present but unusable
  InvalidValue { field: String, reason: String },
}

impl ConfigError {
  fn help_message(&self) -> Option<String> {
    match self {
      ConfigError::MissingField { field } if field == "token" => {
        Some("Pass --token or export GITHUB_TOKEN with `contents: write` permission.".to_string())
      }
      ConfigError::MissingField { field } if field == "repository" => {
        Some("Pass --repository owner/name, export GITHUB_REPOSITORY, or set [github].repository in ship.toml.".to_string())
      }
      ConfigError::MissingField { field } => Some(format!("Set `{}` in ship.toml.", field)),
      ConfigError::InvalidValue { .. } => None,
    }
  }
}

impl fmt::Display for ConfigError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ConfigError::MissingField { field } => {
        write!(f, "Missing required configuration value: {}", field)
      }
      ConfigError::InvalidValue { field, reason } => {
        write!(f, "Invalid value for {}: {}", field, reason)
      }
    }
  }
}

/// Version resolution errors
#[derive(Debug)]
pub enum VersionError {
  /// The reference is not `<prefix>/<prefix>/<version>` shaped
  MalformedRef { raw: String },

  /// The version token is not a semantic version
  NotSemver { version: String, reason: String },
}

impl VersionError {
  fn help_message(&self) -> Option<String> {
    match self {
      VersionError::MalformedRef { .. } => {
        Some("The pipeline expects a tag push, e.g. GITHUB_REF=refs/tags/1.2.3.".to_string())
      }
      VersionError::NotSemver { .. } => Some(
        "Tag with a semantic version (1.2.3 or v1.2.3), or set `require_semver = false` under [release].".to_string(),
      ),
    }
  }
}

impl fmt::Display for VersionError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      VersionError::MalformedRef { raw } => {
        write!(f, "Cannot resolve a version from reference '{}'", raw)
      }
      VersionError::NotSemver { version, reason } => {
        write!(f, "Tag '{}' is not a semantic version: {}", version, reason)
      }
    }
  }
}

/// Compilation errors
#[derive(Debug)]
pub enum BuildError {
  /// The toolchain could not be started
  Spawn { program: String, reason: String },

  /// cargo build exited unsuccessfully
  Failed { code: Option<i32>, stderr: String },

  /// cargo build succeeded but the binary is not where it should be
  MissingBinary { path: PathBuf },

  /// Neither a configured target nor the host triple was available
  HostTriple { reason: String },
}

impl BuildError {
  fn help_message(&self) -> Option<String> {
    match self {
      BuildError::Spawn { program, .. } => Some(format!("Make sure `{}` is installed and on PATH.", program)),
      BuildError::MissingBinary { .. } => {
        Some("Check that [package].name matches the binary target name in Cargo.toml.".to_string())
      }
      BuildError::HostTriple { .. } => Some("Set [build].target in ship.toml.".to_string()),
      BuildError::Failed { .. } => None,
    }
  }
}

impl fmt::Display for BuildError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      BuildError::Spawn { program, reason } => write!(f, "Failed to execute {}: {}", program, reason),
      BuildError::Failed { code, stderr } => {
        write!(f, "cargo build failed with exit code: {}", code.unwrap_or(-1))?;
        if !stderr.is_empty() {
          write!(f, "\n{}", stderr)?;
        }
        Ok(())
      }
      BuildError::MissingBinary { path } => {
        write!(f, "Build succeeded but no binary was found at {}", path.display())
      }
      BuildError::HostTriple { reason } => write!(f, "Could not determine host target triple: {}", reason),
    }
  }
}

/// Packaging errors
#[derive(Debug)]
pub enum PackageError {
  /// The packaging tool could not be started
  Spawn { format: String, reason: String },

  /// The packaging tool exited unsuccessfully
  Failed {
    format: String,
    code: Option<i32>,
    stderr: String,
  },

  /// The packaging tool succeeded but produced nothing at the expected path
  MissingOutput { format: String, path: PathBuf },

  /// Package metadata could not be written into the manifest
  Manifest { path: PathBuf, reason: String },
}

impl PackageError {
  fn help_message(&self) -> Option<String> {
    match self {
      PackageError::Spawn { format, .. } | PackageError::Failed { format, .. } => {
        let plugin = if format == "deb" { "cargo-deb" } else { "cargo-generate-rpm" };
        Some(format!("Check that `{}` is installed: cargo install {}", plugin, plugin))
      }
      PackageError::Manifest { .. } => Some("Check [package].manifest in ship.toml.".to_string()),
      PackageError::MissingOutput { .. } => None,
    }
  }
}

impl fmt::Display for PackageError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      PackageError::Spawn { format, reason } => write!(f, "Failed to start {} packaging: {}", format, reason),
      PackageError::Failed { format, code, stderr } => {
        write!(f, "{} packaging failed with exit code: {}", format, code.unwrap_or(-1))?;
        if !stderr.is_empty() {
          write!(f, "\n{}", stderr)?;
        }
        Ok(())
      }
      PackageError::MissingOutput { format, path } => {
        write!(f, "{} packaging produced no file at {}", format, path.display())
      }
      PackageError::Manifest { path, reason } => {
        write!(f, "Failed to update package metadata in {}: {}", path.display(), reason)
      }
    }
  }
}

/// Release API errors
#[derive(Debug)]
pub enum PublishError {
  /// The request never got an HTTP response
  Transport { operation: String, reason: String },

  /// The platform answered with a non-success status
  Api {
    operation: String,
    status: u16,
    message: String,
  },

  /// A release already exists for the tag and reuse is not allowed
  ReleaseExists { tag: String, url: String },

  /// An asset file could not be read
  AssetUnreadable { path: PathBuf, reason: String },

  /// An upload failed after the release record was created
  PartialPublish {
    tag: String,
    url: String,
    uploaded: Vec<String>,
    missing: Vec<String>,
    cause: Box<PublishError>,
  },
}

impl PublishError {
  /// Whether retrying the same call could succeed
  pub fn is_transient(&self) -> bool {
    match self {
      PublishError::Transport { .. } => true,
      PublishError::Api { status, .. } => *status == 429 || *status >= 500,
      _ => false,
    }
  }

  fn help_message(&self) -> Option<String> {
    match self {
      PublishError::Api { status: 401, .. } | PublishError::Api { status: 403, .. } => {
        Some("Check that the token has `contents: write` permission on the repository.".to_string())
      }
      PublishError::ReleaseExists { .. } => Some(
        "Delete the existing release, or set `on_existing = \"reuse\"` under [release] to upload into it.".to_string(),
      ),
      PublishError::PartialPublish { missing, .. } => Some(format!(
        "The release was left in place. Re-run with `on_existing = \"reuse\"` to upload the missing asset(s): {}",
        missing.join(", ")
      )),
      _ => None,
    }
  }
}

impl fmt::Display for PublishError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      PublishError::Transport { operation, reason } => write!(f, "{} failed: {}", operation, reason),
      PublishError::Api {
        operation,
        status,
        message,
      } => write!(f, "{} rejected with HTTP {}: {}", operation, status, message),
      PublishError::ReleaseExists { tag, url } => {
        write!(f, "A release for tag '{}' already exists: {}", tag, url)
      }
      PublishError::AssetUnreadable { path, reason } => {
        write!(f, "Cannot read asset {}: {}", path.display(), reason)
      }
      PublishError::PartialPublish {
        tag,
        url,
        uploaded,
        missing,
        cause,
      } => {
        write!(f, "Release '{}' is incomplete: {}", tag, cause)?;
        write!(f, "\n  release:  {}", url)?;
        write!(
          f,
          "\n  uploaded: {}",
          if uploaded.is_empty() {
            "(none)".to_string()
          } else {
            uploaded.join(", ")
          }
        )?;
        write!(f, "\n  missing:  {}", missing.join(", "))
      }
    }
  }
}

/// Result type alias for cargo-ship
pub type ShipResult<T> = Result<T, ShipError>;

/// Helper trait to add context to Results
pub trait ResultExt<T> {
  /// Add context to an error result
  fn context(self, ctx: impl Into<String>) -> ShipResult<T>;

  /// Add context using a closure (lazy evaluation)
  fn with_context<F>(self, f: F) -> ShipResult<T>
  where
    F: FnOnce() -> String;
}

impl<T, E> ResultExt<T> for Result<T, E>
where
  E: Into<ShipError>,
{
  fn context(self, ctx: impl Into<String>) -> ShipResult<T> {
    self.map_err(|e| e.into().context(ctx))
  }

  fn with_context<F>(self, f: F) -> ShipResult<T>
  where
    F: FnOnce() -> String,
  {
    self.map_err(|e| e.into().context(f()))
  }
}

/// Pretty-print an error to stderr with help text
pub fn print_error(error: &ShipError) {
  eprintln!("\n❌ {}\n", error);

  if let Some(help) = error.help_message() {
    eprintln!("💡 Help: {}\n", help);
  }
}
