// src/cache/mod.rs — Result cache
//
// Keyed by (target, module, profile, args) with a per-entry TTL. Served
// results are flagged `from_cache`; the stored copy never is.

pub mod key;
pub mod store;

pub use key::CacheKey;
pub use store::ResultCache;
