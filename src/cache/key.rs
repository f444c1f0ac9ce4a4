// src/cache/key.rs — Deterministic cache keys

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::modules::Profile;

/// Identifies one cached invocation.
///
/// `fingerprint` covers everything that changes what the module actually
/// queries: the profile's own arguments and any caller-supplied ones. The readable fields are
/// kept for display and target-scoped invalidation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey {
    pub target: String,
    pub module: String,
    pub profile: String,
    pub fingerprint: String,
}

impl CacheKey {
    /// Key for running `profile` with caller-supplied `args`.
    pub fn for_profile(target: &str, module: &str, profile: &Profile, args: &[String]) -> Self {
        Self::build(target, module, &profile.name, &profile.args, args)
    }

    /// Key for a profile known only by name (no arguments of its own).
    pub fn derive(target: &str, module: &str, profile: &str, args: &[String]) -> Self {
        Self::build(target, module, profile, &[], args)
    }

    fn build(
        target: &str,
        module: &str,
        profile: &str,
        profile_args: &[String],
        args: &[String],
    ) -> Self {
        let target = normalize_target(target);

        let mut hasher = Sha256::new();
        for field in [target.as_str(), module, profile] {
            write_field(&mut hasher, field);
        }
        write_list(&mut hasher, profile_args);
        write_list(&mut hasher, args);

        Self {
            target,
            module: module.to_string(),
            profile: profile.to_string(),
            fingerprint: hex::encode(hasher.finalize()),
        }
    }

    /// File name used by the disk-backed store.
    pub fn file_name(&self) -> String {
        format!("{}.json", self.fingerprint)
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}/{}@{} [{}]",
            self.module,
            self.profile,
            self.target,
            &self.fingerprint[..12.min(self.fingerprint.len())]
        )
    }
}

/// Hostnames are case-insensitive; stray whitespace from the CLI is noise.
pub fn normalize_target(target: &str) -> String {
    target.trim().to_lowercase()
}

// Length prefix keeps ("ab", "c") and ("a", "bc") apart.
fn write_field(hasher: &mut Sha256, field: &str) {
    hasher.update((field.len() as u64).to_le_bytes());
    hasher.update(field.as_bytes());
}

fn write_list(hasher: &mut Sha256, items: &[String]) {
    hasher.update((items.len() as u64).to_le_bytes());
    for item in items {
        write_field(hasher, item);
    }
}
