//! Directory-backed toolchain cache store
//!
//! Layout of one entry:
//!
//! ```text
//! <store>/<key>/manifest.json
//! <store>/<key>/data/<slot>/...   one slot per cached path
//! ```
//!
//! Entries are written into a staging directory and renamed into place. There is no
//! locking: two runs saving the same key race on the rename, the loser's snapshot is
//! dropped.

use crate::cache::key::CacheKey;
use crate::core::error::{ShipResult, ResultExt};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

const MANIFEST: &str = "manifest.json";
const DATA: &str = "data";

/// One cached path and the size of its snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedPath {
  pub source: PathBuf,
  pub slot: String,
  pub files: u64,
  pub bytes: u64,
}

/// Manifest of a stored cache entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheState {
  pub key: String,
  pub created_at: DateTime<Utc>,
  pub entries: Vec<CachedPath>,
}

/// Toolchain cache backed by a local directory
pub struct ToolchainCache {
  store_dir: PathBuf,
  paths: Vec<PathBuf>,
}

impl ToolchainCache {
  pub fn new(store_dir: PathBuf, paths: Vec<PathBuf>) -> Self {
    Self { store_dir, paths }
  }

  fn entry_dir(&self, key: &CacheKey) -> PathBuf {
    self.store_dir.join(key.to_string())
  }

  /// Restore the entry for `key` into place
  ///
  /// Returns `None` on a miss. A corrupt entry is logged, removed and reported as a
  /// miss; restore never fails the run.
  pub fn restore(&self, key: &CacheKey) -> Option<CacheState> {
    let dir = self.entry_dir(key);
    if !dir.is_dir() {
      tracing::info!(key = %key, "cache miss");
      return None;
    }

    let state = match self.verify(key, &dir) {
      Ok(state) => state,
      Err(reason) => {
        tracing::warn!(key = %key, %reason, "discarding corrupt cache entry");
        if let Err(e) = fs::remove_dir_all(&dir) {
          tracing::debug!(error = %e, "failed to remove corrupt cache entry");
        }
        return None;
      }
    };

    for entry in &state.entries {
      let slot = dir.join(DATA).join(&entry.slot);
      if let Err(e) = copy_tree(&slot, &entry.source) {
        tracing::warn!(
          key = %key,
          path = %entry.source.display(),
          error = %e,
          "cache restore incomplete, continuing without cache"
        );
        return None;
      }
    }

    tracing::info!(key = %key, paths = state.entries.len(), "cache restored");
    Some(state)
  }

  /// Check that an entry is intact
  fn verify(&self, key: &CacheKey, dir: &Path) -> Result<CacheState, String> {
    let raw = fs::read_to_string(dir.join(MANIFEST)).map_err(|e| format!("unreadable manifest: {}", e))?;
    let state: CacheState = serde_json::from_str(&raw).map_err(|e| format!("invalid manifest: {}", e))?;

    if state.key != key.to_string() {
      return Err(format!("manifest key '{}' does not match", state.key));
    }

    for entry in &state.entries {
      let slot = dir.join(DATA).join(&entry.slot);
      if !slot.exists() {
        return Err(format!("slot '{}' is missing", entry.slot));
      }
      let (files, bytes) = tree_stats(&slot).map_err(|e| format!("slot '{}' unreadable: {}", entry.slot, e))?;
      if files != entry.files || bytes != entry.bytes {
        return Err(format!(
          "slot '{}' holds {} files / {} bytes, manifest says {} / {}",
          entry.slot, files, bytes, entry.files, entry.bytes
        ));
      }
    }

    Ok(state)
  }

  /// Snapshot the configured paths under `key`
  pub fn save(&self, key: &CacheKey) -> ShipResult<CacheState> {
    fs::create_dir_all(&self.store_dir)
      .with_context(|| format!("Failed to create cache store {}", self.store_dir.display()))?;

    let staging = self
      .store_dir
      .join(format!(".{}.tmp-{}", key, std::process::id()));
    if staging.exists() {
      fs::remove_dir_all(&staging)?;
    }
    fs::create_dir_all(staging.join(DATA))?;

    let mut entries = Vec::new();
    for (idx, source) in self.paths.iter().enumerate() {
      if !source.exists() {
        tracing::debug!(path = %source.display(), "cache path does not exist, skipping");
        continue;
      }
      let slot = idx.to_string();
      let (files, bytes) = copy_tree(source, &staging.join(DATA).join(&slot))
        .with_context(|| format!("Failed to snapshot {}", source.display()))?;
      entries.push(CachedPath {
        source: source.clone(),
        slot,
        files,
        bytes,
      });
    }

    let state = CacheState {
      key: key.to_string(),
      created_at: Utc::now(),
      entries,
    };
    fs::write(staging.join(MANIFEST), serde_json::to_string_pretty(&state)?)?;

    let target = self.entry_dir(key);
    if target.exists() {
      fs::remove_dir_all(&target)?;
    }
    if let Err(e) = fs::rename(&staging, &target) {
      let _ = fs::remove_dir_all(&staging);
      if target.exists() {
        tracing::info!(key = %key, "cache entry written concurrently by another run, keeping theirs");
        return Ok(state);
      }
      return Err(e).with_context(|| format!("Failed to store cache entry {}", target.display()));
    }

    let total: u64 = state.entries.iter().map(|e| e.bytes).sum();
    tracing::info!(key = %key, paths = state.entries.len(), bytes = total, "cache saved");
    Ok(state)
  }
}

/// Copy a file or directory tree, merging into `dst`; symlinks are skipped
fn copy_tree(src: &Path, dst: &Path) -> io::Result<(u64, u64)> {
  let (mut files, mut bytes) = (0, 0);
  for entry in WalkDir::new(src).follow_links(false).follow_root_links(false) {
    let entry = entry?;
    let file_type = entry.file_type();
    if file_type.is_symlink() {
      continue;
    }

    let relative = entry.path().strip_prefix(src).map_err(io::Error::other)?;
    let target = if relative.as_os_str().is_empty() {
      dst.to_path_buf()
    } else {
      dst.join(relative)
    };
    if file_type.is_dir() {
      fs::create_dir_all(&target)?;
    } else {
      if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)?;
      }
      bytes += fs::copy(entry.path(), &target)?;
      files += 1;
    }
  }
  Ok((files, bytes))
}

/// Count files and bytes the way `copy_tree` does
fn tree_stats(path: &Path) -> io::Result<(u64, u64)> {
  let (mut files, mut bytes) = (0, 0);
  for entry in WalkDir::new(path).follow_links(false).follow_root_links(false) {
    let entry = entry?;
    if entry.file_type().is_file() {
      files += 1;
      bytes += entry.metadata()?.len();
    }
  }
  Ok((files, bytes))
}
