// src/cli/cache.rs — `cache` subcommand

use crate::cache::ResultCache;
use crate::cli::CacheAction;
use crate::infra::paths;

pub fn run_cache(action: CacheAction) -> anyhow::Result<()> {
    let cache = ResultCache::persistent(paths::cache_dir())?;

    match action {
        CacheAction::Clear { target: Some(target) } => {
            let removed = cache.invalidate_target(&target);
            println!("Removed {removed} cached result(s) for {target}");
        }
        CacheAction::Clear { target: None } => {
            let removed = cache.clear()?;
            println!("Removed {removed} cached result(s)");
        }
        CacheAction::Purge => {
            let removed = cache.purge_expired();
            println!("Purged {removed} expired result(s)");
        }
    }
    Ok(())
}
