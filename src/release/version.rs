//! Version resolution from the triggering tag reference

use crate::core::error::VersionError;
use serde::Serialize;

/// The tag that triggered the run, resolved once and never changed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReleaseTag {
  raw_ref: String,
  version: String,
}

impl ReleaseTag {
  /// The reference as received, e.g. `refs/tags/1.2.3`
  pub fn raw_ref(&self) -> &str {
    &self.raw_ref
  }

  /// The bare version token, e.g. `1.2.3`
  pub fn version(&self) -> &str {
    &self.version
  }
}

/// Resolve the version from a reference shaped `<prefix>/<prefix>/<version>`
///
/// The version is the final path segment. Every segment must be non-empty and there
/// must be at least three of them.
pub fn resolve(raw_ref: &str, require_semver: bool) -> Result<ReleaseTag, VersionError> {
  let segments: Vec<&str> = raw_ref.trim().split('/').collect();

  if segments.len() < 3 || segments.iter().any(|s| s.is_empty()) {
    return Err(VersionError::MalformedRef {
      raw: raw_ref.to_string(),
    });
  }

  let version = segments[segments.len() - 1];

  if require_semver && let Err(e) = parse_semver(version) {
    return Err(VersionError::NotSemver {
      version: version.to_string(),
      reason: e.to_string(),
    });
  }

  Ok(ReleaseTag {
    raw_ref: raw_ref.trim().to_string(),
    version: version.to_string(),
  })
}

fn parse_semver(token: &str) -> Result<semver::Version, semver::Error> {
  semver::Version::parse(token.strip_prefix('v').unwrap_or(token))
}
