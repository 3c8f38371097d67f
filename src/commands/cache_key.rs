//! `cargo ship cache-key` - print the toolchain cache key for this workspace

use crate::cache::{CacheKey, host_os_label};
use crate::core::context::ShipContext;
use crate::core::error::ShipResult;

/// Run the cache-key command
pub fn run_cache_key(ctx: &ShipContext, os: Option<String>, json: bool) -> ShipResult<()> {
  let os = os.filter(|o| !o.is_empty()).unwrap_or_else(host_os_label);
  let store_dir = ctx.root.join(&ctx.config.cache.dir);
  let key = CacheKey::compute(&ctx.root, &ctx.config.cache.lockfiles, &os, Some(&store_dir))?;

  if json {
    let value = serde_json::json!({
      "key": key.to_string(),
      "os": key.os,
      "lock_hash": key.lock_hash,
    });
    println!("{}", serde_json::to_string_pretty(&value)?);
  } else {
    println!("{}", key);
  }

  Ok(())
}
