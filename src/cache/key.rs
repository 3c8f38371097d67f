//! Cache keys: host OS plus a content hash of the dependency lock files

use crate::core::error::{ShipResult, ResultExt};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::fs;
use std::path::{Component, Path, PathBuf};

/// Key of one toolchain cache entry, rendered as `<os>-cargo-<sha256>`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheKey {
  pub os: String,
  pub lock_hash: String,
}

impl CacheKey {
  /// Hash every lock file matching `pattern` under `root`
  ///
  /// Files are visited in sorted path order; the key digest is SHA-256 over the
  /// concatenated per-file SHA-256 digests. Anything under a `target` directory,
  /// a hidden directory, or the cache store itself is ignored: a saved entry holds
  /// lock files of cached dependencies and must not feed the next key.
  pub fn compute(root: &Path, pattern: &str, os: &str, store_dir: Option<&Path>) -> ShipResult<Self> {
    let full_pattern = format!(
      "{}/{}",
      glob::Pattern::escape(&root.to_string_lossy()),
      pattern.trim_start_matches("./")
    );

    let options = glob::MatchOptions {
      require_literal_leading_dot: true,
      ..Default::default()
    };

    let mut files: Vec<PathBuf> = glob::glob_with(&full_pattern, options)?
      .filter_map(Result::ok)
      .filter(|p| p.is_file())
      .filter(|p| store_dir.is_none_or(|store| !p.starts_with(store)))
      .filter(|p| {
        !p.strip_prefix(root)
          .unwrap_or(p)
          .components()
          .any(|c| c == Component::Normal("target".as_ref()))
      })
      .collect();
    files.sort();

    if files.is_empty() {
      tracing::warn!(pattern, "no lock files matched; cache key covers no dependencies");
    }

    let mut contents = Vec::with_capacity(files.len());
    for file in &files {
      let bytes = fs::read(file).with_context(|| format!("Failed to read lock file {}", file.display()))?;
      contents.push(bytes);
    }

    Ok(Self::from_contents(os, contents.iter().map(Vec::as_slice)))
  }

  /// Key from already-read lock file contents, in order
  pub fn from_contents<'a>(os: &str, contents: impl IntoIterator<Item = &'a [u8]>) -> Self {
    let mut outer = Sha256::new();
    for bytes in contents {
      outer.update(Sha256::digest(bytes));
    }
    Self {
      os: os.to_string(),
      lock_hash: format!("{:x}", outer.finalize()),
    }
  }
}

impl fmt::Display for CacheKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}-cargo-{}", self.os, self.lock_hash)
  }
}

/// OS label in the style CI runners report it
pub fn host_os_label() -> String {
  match std::env::consts::OS {
    "linux" => "Linux".to_string(),
    "macos" => "macOS".to_string(),
    "windows" => "Windows".to_string(),
    other => other.to_string(),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::ToolchainCache;
  use tempfile::TempDir;

  #[test]
  fn test_key_is_deterministic() {
    let a = CacheKey::from_contents("Linux", [b"lock".as_slice()]);
    let b = CacheKey::from_contents("Linux", [b"lock".as_slice()]);
    assert_eq!(a, b);
    assert!(a.to_string().starts_with("Linux-cargo-"));
    assert_eq!(a.lock_hash.len(), 64);
  }

  #[test]
  fn test_key_scoped_by_os_and_content() {
    let base = CacheKey::from_contents("Linux", [b"lock".as_slice()]);
    assert_ne!(base.to_string(), CacheKey::from_contents("macOS", [b"lock".as_slice()]).to_string());
    assert_ne!(base, CacheKey::from_contents("Linux", [b"lock2".as_slice()]));
  }

  #[test]
  fn test_compute_finds_nested_lockfiles_and_skips_target() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("Cargo.lock"), "root").unwrap();
    fs::create_dir_all(dir.path().join("tools/x")).unwrap();
    fs::write(dir.path().join("tools/x/Cargo.lock"), "nested").unwrap();

    let before = CacheKey::compute(dir.path(), "**/Cargo.lock", "Linux", None).unwrap();

    fs::create_dir_all(dir.path().join("target/package/y")).unwrap();
    fs::write(dir.path().join("target/package/y/Cargo.lock"), "ignored").unwrap();
    let with_target = CacheKey::compute(dir.path(), "**/Cargo.lock", "Linux", None).unwrap();
    assert_eq!(before, with_target);

    let expected = CacheKey::from_contents("Linux", [b"root".as_slice(), b"nested".as_slice()]);
    assert_eq!(before, expected);

    fs::write(dir.path().join("tools/x/Cargo.lock"), "changed").unwrap();
    let after = CacheKey::compute(dir.path(), "**/Cargo.lock", "Linux", None).unwrap();
    assert_ne!(before, after);
  }

  #[test]
  fn test_saved_entry_does_not_change_key() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("work");
    fs::create_dir_all(&root).unwrap();
    fs::write(root.join("Cargo.lock"), "root").unwrap();

    let checkout = dir.path().join("cargo-home/git/checkouts/dep-1a2b/abc123");
    fs::create_dir_all(&checkout).unwrap();
    fs::write(checkout.join("Cargo.lock"), "dependency lock").unwrap();

    for store in [root.join(".ship-cache"), root.join("ship-cache")] {
      let first = CacheKey::compute(&root, "**/Cargo.lock", "Linux", Some(&store)).unwrap();
      let cache = ToolchainCache::new(store.clone(), vec![dir.path().join("cargo-home/git")]);
      cache.save(&first).unwrap();

      let second = CacheKey::compute(&root, "**/Cargo.lock", "Linux", Some(&store)).unwrap();
      assert_eq!(first, second, "entry under {} leaked into the key", store.display());
      assert!(cache.restore(&second).is_some());
    }
  }

  #[test]
  fn test_compute_without_lockfiles_still_yields_key() {
    let dir = TempDir::new().unwrap();
    let key = CacheKey::compute(dir.path(), "**/Cargo.lock", "Linux", None).unwrap();
    assert_eq!(key, CacheKey::from_contents("Linux", std::iter::empty()));
  }
}
