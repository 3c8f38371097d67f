use crate::core::error::{ConfigError, ShipError, ShipResult, ResultExt};
use crate::release::assets::Architecture;
use crate::release::retry::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Configuration for cargo-ship
/// Searched in order: ship.toml, .ship.toml, .cargo/ship.toml, .config/ship.toml
///
/// Every section is optional; missing package fields fall back to Cargo metadata.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShipConfig {
  #[serde(default)]
  pub package: PackageConfig,
  #[serde(default)]
  pub build: BuildConfig,
  #[serde(default)]
  pub release: ReleaseConfig,
  #[serde(default)]
  pub github: GithubConfig,
  #[serde(default)]
  pub cache: CacheConfig,
  #[serde(default)]
  pub plugins: PluginsConfig,
  #[serde(default)]
  pub retry: RetryConfig,
}

/// Static package metadata shared by the deb and rpm packages
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PackageConfig {
  /// Binary / package name (default: root package name)
  #[serde(default)]
  pub name: Option<String>,

  /// Maintainer line (default: first author of the root package)
  #[serde(default)]
  pub maintainer: Option<String>,

  /// Package description (default: root package description)
  #[serde(default)]
  pub description: Option<String>,

  /// Target architecture of the packages
  #[serde(default)]
  pub architecture: Architecture,

  /// Manifest receiving package metadata, relative to the workspace root
  #[serde(default)]
  pub manifest: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BuildConfig {
  /// Explicit target triple (default: host)
  #[serde(default)]
  pub target: Option<String>,

  /// Pass --locked to cargo build
  #[serde(default)]
  pub locked: bool,
}

/// What to do when the tag already has a release on the platform
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExistingRelease {
  /// Abort before creating anything
  #[default]
  Fail,
  /// Upload into the existing release, skipping assets it already has
  Reuse,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReleaseConfig {
  /// Release title; `{version}` is replaced by the resolved version
  #[serde(default = "default_title")]
  pub title: String,

  #[serde(default)]
  pub on_existing: ExistingRelease,

  /// Reject tags that are not semantic versions
  #[serde(default = "default_true")]
  pub require_semver: bool,
}

fn default_title() -> String {
  "Release {version}".to_string()
}

fn default_true() -> bool {
  true
}

impl Default for ReleaseConfig {
  fn default() -> Self {
    Self {
      title: default_title(),
      on_existing: ExistingRelease::default(),
      require_semver: true,
    }
  }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GithubConfig {
  /// owner/name (default: GITHUB_REPOSITORY)
  #[serde(default)]
  pub repository: Option<String>,

  #[serde(default)]
  pub api_url: Option<String>,

  /// Per-request timeout
  #[serde(default = "default_timeout_secs")]
  pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
  300
}

impl Default for GithubConfig {
  fn default() -> Self {
    Self {
      repository: None,
      api_url: None,
      timeout_secs: default_timeout_secs(),
    }
  }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
  #[serde(default = "default_true")]
  pub enabled: bool,

  /// Cache store directory, relative to the workspace root
  #[serde(default = "default_cache_dir")]
  pub dir: PathBuf,

  /// Paths to snapshot; `~/` and `$CARGO_HOME/` prefixes are expanded
  #[serde(default = "default_cache_paths")]
  pub paths: Vec<String>,

  /// Glob selecting the lock files that key the cache
  #[serde(default = "default_lockfiles")]
  pub lockfiles: String,
}

fn default_cache_dir() -> PathBuf {
  PathBuf::from(".ship-cache")
}

fn default_cache_paths() -> Vec<String> {
  vec![
    "$CARGO_HOME/registry".to_string(),
    "$CARGO_HOME/git".to_string(),
    "target".to_string(),
  ]
}

fn default_lockfiles() -> String {
  "**/Cargo.lock".to_string()
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self {
      enabled: true,
      dir: default_cache_dir(),
      paths: default_cache_paths(),
      lockfiles: default_lockfiles(),
    }
  }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginsConfig {
  /// Cargo plugins to install before packaging (best-effort)
  #[serde(default = "default_plugins")]
  pub install: Vec<String>,
}

fn default_plugins() -> Vec<String> {
  vec!["cargo-deb".to_string(), "cargo-generate-rpm".to_string()]
}

impl Default for PluginsConfig {
  fn default() -> Self {
    Self {
      install: default_plugins(),
    }
  }
}

/// Retry policies for the remote calls
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RetryConfig {
  #[serde(default)]
  pub create_release: RetryPolicy,
  #[serde(default)]
  pub upload: RetryPolicy,
}

impl ShipConfig {
  /// Find config file in search order: ship.toml, .ship.toml, .cargo/ship.toml, .config/ship.toml
  pub fn find_config_path(path: &Path) -> Option<PathBuf> {
    let candidates = vec![
      path.join("ship.toml"),
      path.join(".ship.toml"),
      path.join(".cargo").join("ship.toml"),
      path.join(".config").join("ship.toml"),
    ];

    candidates.into_iter().find(|p| p.exists())
  }

  /// Load config, or defaults when no file exists
  pub fn load(path: &Path) -> ShipResult<Self> {
    let Some(config_path) = Self::find_config_path(path) else {
      return Ok(Self::default());
    };

    let content = fs::read_to_string(&config_path)
      .with_context(|| format!("Failed to read config from {}", config_path.display()))?;
    let config: ShipConfig = toml_edit::de::from_str(&content)
      .with_context(|| format!("Failed to parse config from {}", config_path.display()))?;

    config
      .validate()
      .map_err(|e| e.context(format!("Invalid configuration in {}", config_path.display())))?;

    Ok(config)
  }

  /// Check values serde cannot
  pub fn validate(&self) -> ShipResult<()> {
    if let Some(name) = &self.package.name
      && (name.is_empty() || name.contains('/') || name.contains(char::is_whitespace))
    {
      return Err(ShipError::Config(ConfigError::InvalidValue {
        field: "package.name".to_string(),
        reason: format!("'{}' is not a usable binary name", name),
      }));
    }

    if !self.release.title.contains("{version}") {
      return Err(ShipError::Config(ConfigError::InvalidValue {
        field: "release.title".to_string(),
        reason: "must contain the {version} placeholder".to_string(),
      }));
    }

    if let Some(repo) = &self.github.repository {
      validate_repository(repo)?;
    }

    if self.github.timeout_secs == 0 {
      return Err(ShipError::Config(ConfigError::InvalidValue {
        field: "github.timeout_secs".to_string(),
        reason: "must be greater than zero".to_string(),
      }));
    }

    for (field, policy) in [
      ("retry.create_release", &self.retry.create_release),
      ("retry.upload", &self.retry.upload),
    ] {
      policy.validate().map_err(|reason| {
        ShipError::Config(ConfigError::InvalidValue {
          field: field.to_string(),
          reason,
        })
      })?;
    }

    Ok(())
  }
}

/// Repositories are `owner/name`
pub fn validate_repository(repo: &str) -> ShipResult<()> {
  let mut parts = repo.split('/');
  match (parts.next(), parts.next(), parts.next()) {
    (Some(owner), Some(name), None) if !owner.is_empty() && !name.is_empty() => Ok(()),
    _ => Err(ShipError::Config(ConfigError::InvalidValue {
      field: "repository".to_string(),
      reason: format!("'{}' is not in owner/name form", repo),
    })),
  }
}
