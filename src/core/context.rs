//! Run context - gather inputs once, pass everywhere
//!
//! # Design
//!
//! The pipeline never reads the process environment or the filesystem config on its
//! own. `main.rs` collects the CI inputs into a `PipelineEnv`, `ShipContext` loads
//! ship.toml and Cargo metadata, and the two are merged into a `PipelineConfig`.
//!
//! ```text
//! main.rs:
//!   PipelineEnv (clap + env) ──┐
//!   ShipContext::build()  ─────┴─> PipelineConfig -> Pipeline::run()
//! ```

use crate::cache::expand_path;
use crate::cargo::metadata::WorkspaceMetadata;
use crate::cargo::package::PackageSpec;
use crate::core::config::{ReleaseConfig, RetryConfig, ShipConfig, validate_repository};
use crate::core::error::{ConfigError, ShipError, ShipResult};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// Inputs a CI runner provides through the environment
#[derive(Clone, Default)]
pub struct PipelineEnv {
  /// Triggering reference, e.g. `refs/tags/1.2.3` (GITHUB_REF)
  pub git_ref: Option<String>,
  /// API token (GITHUB_TOKEN)
  pub token: Option<String>,
  /// owner/name (GITHUB_REPOSITORY)
  pub repository: Option<String>,
  /// API base URL (GITHUB_API_URL)
  pub api_url: Option<String>,
  /// Runner OS label (RUNNER_OS)
  pub os: Option<String>,
  pub home: Option<PathBuf>,
  pub cargo_home: Option<PathBuf>,
}

impl PipelineEnv {
  /// Fill the home directories from the process environment
  pub fn with_process_dirs(mut self) -> Self {
    self.home = std::env::var_os("HOME")
      .or_else(|| std::env::var_os("USERPROFILE"))
      .map(PathBuf::from);
    self.cargo_home = std::env::var_os("CARGO_HOME").map(PathBuf::from);
    self
  }
}

impl fmt::Debug for PipelineEnv {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("PipelineEnv")
      .field("git_ref", &self.git_ref)
      .field("token", &self.token.as_ref().map(|_| "***"))
      .field("repository", &self.repository)
      .field("api_url", &self.api_url)
      .field("os", &self.os)
      .field("home", &self.home)
      .field("cargo_home", &self.cargo_home)
      .finish()
  }
}

/// Resolved cache settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheSettings {
  pub store_dir: PathBuf,
  pub paths: Vec<PathBuf>,
  pub lockfiles: String,
  pub os: String,
}

/// Resolved hosting platform settings
#[derive(Clone)]
pub struct GithubSettings {
  pub api_url: String,
  pub repository: String,
  pub token: String,
  pub timeout: Duration,
}

/// Everything one pipeline run needs, with no further lookups
#[derive(Debug, Clone)]
pub struct PipelineConfig {
  pub git_ref: String,
  pub workspace_root: PathBuf,
  pub target_dir: PathBuf,
  pub package: PackageSpec,
  pub locked: bool,
  pub release: ReleaseConfig,
  /// `None` when caching is disabled
  pub cache: Option<CacheSettings>,
  pub plugins: Vec<String>,
  pub retry: RetryConfig,
}

/// Workspace-level data loaded once at startup
pub struct ShipContext {
  /// Workspace root directory
  pub root: PathBuf,

  /// Cargo metadata of the workspace (no dependency resolution)
  pub metadata: WorkspaceMetadata,

  /// ship.toml, or defaults when absent
  pub config: ShipConfig,
}

impl ShipContext {
  /// Load ship.toml and Cargo metadata for `workspace_root`
  pub fn build(workspace_root: &Path) -> ShipResult<Self> {
    let config = ShipConfig::load(workspace_root)?;
    let metadata = WorkspaceMetadata::load(workspace_root)?;
    let root = metadata.workspace_root().to_path_buf();
    Ok(Self { root, metadata, config })
  }

  /// Package metadata from ship.toml, falling back to Cargo metadata
  pub fn package_spec(&self) -> ShipResult<PackageSpec> {
    let cfg = &self.config.package;
    let defaults = self.metadata.package_defaults(cfg.name.as_deref());

    let tool = cfg
      .name
      .clone()
      .or(defaults.name)
      .ok_or_else(|| ShipError::Config(ConfigError::MissingField {
        field: "package.name".to_string(),
      }))?;

    let manifest = match (&cfg.manifest, defaults.manifest_path) {
      (Some(path), _) => self.root.join(path),
      (None, Some(path)) => path,
      (None, None) => self.root.join("Cargo.toml"),
    };

    Ok(PackageSpec {
      tool,
      maintainer: cfg.maintainer.clone().or(defaults.maintainer),
      description: cfg.description.clone().or(defaults.description),
      architecture: cfg.architecture,
      manifest,
      target: self.config.build.target.clone(),
    })
  }

  /// Cache settings, or `None` when caching is off
  pub fn cache_settings(&self, env: &PipelineEnv, no_cache: bool) -> Option<CacheSettings> {
    let cfg = &self.config.cache;
    if no_cache || !cfg.enabled {
      return None;
    }

    let mut paths = Vec::with_capacity(cfg.paths.len());
    for raw in &cfg.paths {
      match expand_path(raw, &self.root, env.home.as_deref(), env.cargo_home.as_deref()) {
        Some(path) => paths.push(path),
        None => tracing::warn!(path = %raw, "cannot expand cache path without a home directory, skipping"),
      }
    }

    Some(CacheSettings {
      store_dir: self.root.join(&cfg.dir),
      paths,
      lockfiles: cfg.lockfiles.clone(),
      os: env.os.clone().unwrap_or_else(crate::cache::host_os_label),
    })
  }

  /// API settings; CLI and environment values win over ship.toml
  pub fn github_settings(&self, env: &PipelineEnv) -> ShipResult<GithubSettings> {
    let repository = env
      .repository
      .clone()
      .filter(|r| !r.is_empty())
      .or_else(|| self.config.github.repository.clone())
      .ok_or_else(|| ShipError::Config(ConfigError::MissingField {
        field: "repository".to_string(),
      }))?;
    validate_repository(&repository)?;

    let token = env
      .token
      .clone()
      .filter(|t| !t.is_empty())
      .ok_or_else(|| ShipError::Config(ConfigError::MissingField {
        field: "token".to_string(),
      }))?;

    let api_url = env
      .api_url
      .clone()
      .filter(|u| !u.is_empty())
      .or_else(|| self.config.github.api_url.clone())
      .unwrap_or_else(|| DEFAULT_API_URL.to_string());

    Ok(GithubSettings {
      api_url,
      repository,
      token,
      timeout: Duration::from_secs(self.config.github.timeout_secs),
    })
  }

  /// Merge file config and environment into a run configuration
  pub fn pipeline_config(&self, env: &PipelineEnv, no_cache: bool) -> ShipResult<PipelineConfig> {
    let git_ref = env
      .git_ref
      .clone()
      .filter(|r| !r.is_empty())
      .ok_or_else(|| ShipError::with_help(
        "No triggering reference given",
        "Pass --ref refs/tags/<version> or export GITHUB_REF.",
      ))?;

    Ok(PipelineConfig {
      git_ref,
      workspace_root: self.root.clone(),
      target_dir: self.metadata.target_directory().to_path_buf(),
      package: self.package_spec()?,
      locked: self.config.build.locked,
      release: self.config.release.clone(),
      cache: self.cache_settings(env, no_cache),
      plugins: self.config.plugins.install.clone(),
      retry: self.config.retry.clone(),
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::fs;
  use tempfile::TempDir;

  fn project(ship_toml: Option<&str>) -> (TempDir, ShipContext) {
    let dir = TempDir::new().unwrap();
    fs::write(
      dir.path().join("Cargo.toml"),
      "[package]\nname = \"netbox2netshot\"\nversion = \"0.1.0\"\nedition = \"2021\"\nauthors = [\"Ops <ops@example.com>\"]\n",
    )
    .unwrap();
    fs::create_dir_all(dir.path().join("src")).unwrap();
    fs::write(dir.path().join("src/main.rs"), "fn main() {}\n").unwrap();
    if let Some(content) = ship_toml {
      fs::write(dir.path().join("ship.toml"), content).unwrap();
    }
    let ctx = ShipContext::build(dir.path()).unwrap();
    (dir, ctx)
  }

  fn env() -> PipelineEnv {
    PipelineEnv {
      git_ref: Some("refs/tags/1.2.3".to_string()),
      token: Some("secret".to_string()),
      repository: Some("example/netbox2netshot".to_string()),
      os: Some("Linux".to_string()),
      home: Some(PathBuf::from("/home/ci")),
      ..Default::default()
    }
  }

  #[test]
  fn test_package_spec_falls_back_to_metadata() {
    let (_dir, ctx) = project(None);
    let spec = ctx.package_spec().unwrap();
    assert_eq!(spec.tool, "netbox2netshot");
    assert_eq!(spec.maintainer.as_deref(), Some("Ops <ops@example.com>"));
    assert!(spec.manifest.ends_with("Cargo.toml"));
  }

  #[test]
  fn test_ship_toml_overrides_metadata() {
    let (_dir, ctx) = project(Some("[package]\nmaintainer = \"Release Bot <bot@example.com>\"\n"));
    let spec = ctx.package_spec().unwrap();
    assert_eq!(spec.tool, "netbox2netshot");
    assert_eq!(spec.maintainer.as_deref(), Some("Release Bot <bot@example.com>"));
  }

  #[test]
  fn test_cache_settings_expand_paths() {
    let (_dir, ctx) = project(None);
    let cache = ctx.cache_settings(&env(), false).unwrap();
    assert_eq!(cache.os, "Linux");
    assert_eq!(cache.paths[0], PathBuf::from("/home/ci/.cargo/registry"));
    assert!(cache.paths[2].ends_with("target"));
    assert!(ctx.cache_settings(&env(), true).is_none());
  }

  #[test]
  fn test_github_settings_precedence() {
    let (_dir, ctx) = project(Some(
      "[github]\nrepository = \"other/repo\"\napi_url = \"https://ghe.example.com/api/v3\"\n",
    ));
    let settings = ctx.github_settings(&env()).unwrap();
    assert_eq!(settings.repository, "example/netbox2netshot");
    assert_eq!(settings.api_url, "https://ghe.example.com/api/v3");

    let bare = PipelineEnv {
      repository: None,
      ..env()
    };
    assert_eq!(ctx.github_settings(&bare).unwrap().repository, "other/repo");
  }

  #[test]
  fn test_missing_token_is_config_error() {
    let (_dir, ctx) = project(None);
    let no_token = PipelineEnv { token: None, ..env() };
    let err = ctx.github_settings(&no_token).err().unwrap();
    assert!(matches!(err, ShipError::Config(ConfigError::MissingField { .. })));
    assert!(err.help_message().unwrap().contains("GITHUB_TOKEN"));
  }

  #[test]
  fn test_debug_redacts_token() {
    let rendered = format!("{:?}", env());
    assert!(!rendered.contains("secret"));
    assert!(rendered.contains("***"));
  }

  #[test]
  fn test_pipeline_config_requires_ref() {
    let (_dir, ctx) = project(None);
    let no_ref = PipelineEnv { git_ref: None, ..env() };
    assert!(ctx.pipeline_config(&no_ref, false).is_err());
    let config = ctx.pipeline_config(&env(), false).unwrap();
    assert_eq!(config.git_ref, "refs/tags/1.2.3");
    assert_eq!(config.plugins, vec!["cargo-deb", "cargo-generate-rpm"]);
  }
}
