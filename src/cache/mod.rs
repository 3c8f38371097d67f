//! Toolchain cache
//!
//! - **key**: cache keys derived from the host OS and the lock file contents
//! - **store**: directory-backed store with corruption-tolerant restore

pub mod key;
pub mod store;

pub use key::{CacheKey, host_os_label};
pub use store::ToolchainCache;

use std::path::{Path, PathBuf};

/// Expand a configured cache path
///
/// `~/` resolves against `home`, `$CARGO_HOME/` against `cargo_home` (default
/// `<home>/.cargo`), anything relative against the workspace root. Returns `None`
/// when a needed home directory is unknown.
pub fn expand_path(raw: &str, root: &Path, home: Option<&Path>, cargo_home: Option<&Path>) -> Option<PathBuf> {
  if let Some(rest) = raw.strip_prefix("$CARGO_HOME") {
    let base = match cargo_home {
      Some(dir) => dir.to_path_buf(),
      None => home?.join(".cargo"),
    };
    return Some(join_rest(base, rest));
  }
  if let Some(rest) = raw.strip_prefix('~') {
    return Some(join_rest(home?.to_path_buf(), rest));
  }
  Some(root.join(raw))
}

fn join_rest(base: PathBuf, rest: &str) -> PathBuf {
  let rest = rest.trim_start_matches(['/', '\\']);
  if rest.is_empty() { base } else { base.join(rest) }
}
